//! Authenticated HTTP GET through a cluster route

use crate::error::QueryError;
use reqwest::{Certificate, Client};
use tracing::debug;

/// GET `url` with a bearer token
///
/// When `ca_pem` is given it becomes the only trusted root.
pub async fn fetch(url: &str, token: &str, ca_pem: Option<&[u8]>) -> Result<Vec<u8>, QueryError> {
    let http_err = |message: String| QueryError::Http {
        url: url.to_string(),
        message,
    };

    let mut builder = Client::builder();
    if let Some(pem) = ca_pem {
        let cert = Certificate::from_pem(pem).map_err(|e| QueryError::decode("CA bundle", e))?;
        builder = builder
            .tls_built_in_root_certs(false)
            .add_root_certificate(cert);
    }
    let client = builder.build().map_err(|e| http_err(e.to_string()))?;

    debug!(url = %url, "Proxy GET");
    let response = client
        .get(url)
        .bearer_auth(token)
        .send()
        .await
        .map_err(|e| http_err(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(http_err(format!("HTTP {}: {}", status, body.trim())));
    }

    let body = response.bytes().await.map_err(|e| http_err(e.to_string()))?;
    Ok(body.to_vec())
}
