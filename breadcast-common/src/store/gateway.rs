use super::{gateway_url, ObjectStore};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Read-only store over a public IPFS gateway
///
/// Serves recipe documents and background images without pinning
/// credentials. Writes are refused.
pub struct GatewayObjectStore {
    http_client: reqwest::Client,
    gateway: String,
}

impl GatewayObjectStore {
    pub fn new(gateway: &str) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("breadcast/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http_client,
            gateway: gateway.trim_end_matches('/').to_string(),
        })
    }

    pub(super) fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    fn read_only(operation: &str) -> Error {
        Error::Config(format!(
            "{} needs a Pinata JWT; the IPFS gateway is read-only",
            operation
        ))
    }
}

/// Map a non-success status to a store error carrying the response body
pub(super) async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::NOT_FOUND => Error::NotFound(format!("{}: {}", what, body)),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::Config(format!("{} rejected credentials ({})", what, status.as_u16()))
        }
        _ => Error::Store(format!("{} failed with {}: {}", what, status.as_u16(), body)),
    })
}

#[async_trait]
impl ObjectStore for GatewayObjectStore {
    async fn put(&self, _name: &str, _bytes: Vec<u8>) -> Result<String> {
        Err(Self::read_only("Pinning"))
    }

    async fn get(&self, id: &str) -> Result<Vec<u8>> {
        let url = self.url_for(id);
        debug!(url = %url, "Fetching from gateway");

        let response = self.http_client.get(&url).send().await?;
        let response = check_status(response, "gateway fetch").await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn list(&self) -> Result<BTreeSet<String>> {
        Err(Self::read_only("Listing pins"))
    }

    async fn delete(&self, _id: &str) -> Result<()> {
        Err(Self::read_only("Unpinning"))
    }

    fn url_for(&self, id: &str) -> String {
        gateway_url(&self.gateway, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_writes_are_refused() {
        let store = GatewayObjectStore::new("https://gw.example/").unwrap();

        assert!(matches!(store.put("frame.png", vec![1, 2, 3]).await, Err(Error::Config(_))));
        assert!(matches!(store.list().await, Err(Error::Config(_))));
        assert!(matches!(store.delete("QmA").await, Err(Error::Config(_))));
        assert_eq!(store.url_for("QmA"), "https://gw.example/ipfs/QmA");
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_an_http_error() {
        // Port 9 (discard) on loopback is not expected to speak HTTP
        let store = GatewayObjectStore::new("http://127.0.0.1:9").unwrap();
        assert!(store.get("QmA").await.is_err());
    }
}
