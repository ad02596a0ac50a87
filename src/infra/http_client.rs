use crate::app::ports::{DocumentFetcher, FetchedDocument};
use crate::constants::USER_AGENT;
use crate::error::{EtlError, Result};
use reqwest::blocking::Client;
use std::time::Duration;

pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| EtlError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl DocumentFetcher for ReqwestFetcher {
    fn fetch(&self, url: &str) -> std::result::Result<FetchedDocument, String> {
        tracing::info!("HTTP GET request to: {}", url);
        let resp = self.client.get(url).send().map_err(|e| e.to_string())?;
        let status = resp.status().as_u16();
        let body = resp.text().map_err(|e| e.to_string())?;
        tracing::info!("HTTP response: status={}, size={} bytes", status, body.len());
        Ok(FetchedDocument { status, body })
    }
}
