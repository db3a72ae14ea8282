use super::gateway::{check_status, GatewayObjectStore};
use super::ObjectStore;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

const PIN_LIST_PAGE_LIMIT: usize = 1000;

#[derive(Debug, Deserialize)]
struct PinFileResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

#[derive(Debug, Deserialize)]
struct PinListResponse {
    count: usize,
    #[serde(default)]
    rows: Vec<PinListRow>,
}

#[derive(Debug, Deserialize)]
struct PinListRow {
    ipfs_pin_hash: String,
}

/// Pin ids gathered across pages of the pin list
///
/// Pins added or removed while paging shift later pages, so ids may show up
/// twice or be skipped. Such a listing is still returned, flagged as shifted.
#[derive(Debug, Default)]
struct PinListing {
    ids: BTreeSet<String>,
    offset: usize,
    expected_count: Option<usize>,
    shifted: bool,
}

impl PinListing {
    /// Merge one page; returns whether another page should be requested
    fn absorb(&mut self, page: PinListResponse) -> bool {
        match self.expected_count {
            Some(count) if count != page.count => {
                warn!(before = count, after = page.count, "Pin count changed while listing");
                self.shifted = true;
            }
            _ => {}
        }
        self.expected_count = Some(page.count);

        let row_count = page.rows.len();
        for row in page.rows {
            if !self.ids.insert(row.ipfs_pin_hash.clone()) {
                warn!(cid = %row.ipfs_pin_hash, "Pin listed twice while paging");
                self.shifted = true;
            }
        }

        self.offset += row_count;
        row_count > 0 && self.offset < page.count
    }
}

/// Pinata pinning API for writes, IPFS gateway for reads
pub struct PinataObjectStore {
    gateway: GatewayObjectStore,
    api_url: String,
    jwt: String,
}

impl PinataObjectStore {
    pub fn new(api_url: &str, gateway: &str, jwt: &str) -> Result<Self> {
        if jwt.trim().is_empty() {
            return Err(Error::Config("Pinata JWT is empty".to_string()));
        }

        Ok(Self {
            gateway: GatewayObjectStore::new(gateway)?,
            api_url: api_url.trim_end_matches('/').to_string(),
            jwt: jwt.to_string(),
        })
    }

    fn http_client(&self) -> &reqwest::Client {
        self.gateway.http_client()
    }

    async fn list_page(&self, offset: usize) -> Result<PinListResponse> {
        let url = format!(
            "{}/data/pinList?status=pinned&pageLimit={}&pageOffset={}",
            self.api_url, PIN_LIST_PAGE_LIMIT, offset
        );
        debug!(url = %url, "Listing pins");

        let response = self.http_client().get(&url).bearer_auth(&self.jwt).send().await?;
        let response = check_status(response, "pin list").await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ObjectStore for PinataObjectStore {
    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<String> {
        let size = bytes.len();
        let metadata = serde_json::json!({ "name": name }).to_string();
        let options = serde_json::json!({ "cidVersion": 0 }).to_string();

        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(name.to_string()))
            .text("pinataMetadata", metadata)
            .text("pinataOptions", options);

        let url = format!("{}/pinning/pinFileToIPFS", self.api_url);
        let response = self
            .http_client()
            .post(&url)
            .bearer_auth(&self.jwt)
            .multipart(form)
            .send()
            .await?;
        let response = check_status(response, "pin").await?;
        let pinned: PinFileResponse = response.json().await?;

        info!(name = %name, cid = %pinned.ipfs_hash, bytes = size, "Pinned file");
        Ok(pinned.ipfs_hash)
    }

    async fn get(&self, id: &str) -> Result<Vec<u8>> {
        self.gateway.get(id).await
    }

    async fn list(&self) -> Result<BTreeSet<String>> {
        let mut listing = PinListing::default();
        loop {
            let page = self.list_page(listing.offset).await?;
            if !listing.absorb(page) {
                break;
            }
        }

        if listing.shifted {
            warn!(pins = listing.ids.len(), "Pin list changed while paging; result may be incomplete");
        }
        Ok(listing.ids)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let url = format!("{}/pinning/unpin/{}", self.api_url, id);
        let response = self.http_client().delete(&url).bearer_auth(&self.jwt).send().await?;
        check_status(response, "unpin").await?;

        info!(cid = %id, "Unpinned");
        Ok(())
    }

    fn url_for(&self, id: &str) -> String {
        self.gateway.url_for(id)
    }
}
