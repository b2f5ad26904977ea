use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use std::time::Duration;
use url::Url;

use super::cik::{Accession, Cik};
use super::rate_limiter::RateLimiter;
use crate::error::{NportError, Result};

pub const EDGAR_DATA_URL: &str = "https://data.sec.gov";
pub const EDGAR_ARCHIVES_URL: &str = "https://www.sec.gov";
pub const USER_AGENT: &str = "nport-holdings admin@example.com";

/// The two EDGAR resources the holdings pipeline reads.
#[async_trait]
pub trait EdgarSource: Send + Sync {
    /// Raw submissions index JSON for `cik`.
    async fn submissions(&self, cik: &Cik) -> Result<Vec<u8>>;

    /// Raw `primary_doc.xml` of one filing.
    async fn primary_document(&self, cik: &Cik, accession: &Accession) -> Result<Vec<u8>>;
}

#[derive(Clone)]
pub struct EdgarClient {
    client: Client,
    data_url: Url,
    archives_url: Url,
    limiter: RateLimiter,
}

impl EdgarClient {
    pub fn new(
        user_agent: &str,
        timeout: Duration,
        data_url: Url,
        archives_url: Url,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            data_url: with_trailing_slash(data_url),
            archives_url: with_trailing_slash(archives_url),
            limiter: RateLimiter::edgar().clone(),
        })
    }

    #[cfg(test)]
    fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn submissions_url(&self, cik: &Cik) -> Result<Url> {
        Ok(self
            .data_url
            .join(&format!("submissions/CIK{}.json", cik.padded()))?)
    }

    pub fn primary_document_url(&self, cik: &Cik, accession: &Accession) -> Result<Url> {
        Ok(self.archives_url.join(&format!(
            "Archives/edgar/data/{}/{}/primary_doc.xml",
            cik.as_u64(),
            accession.without_dashes()
        ))?)
    }

    async fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        let _permit = self.limiter.acquire().await?;

        debug!("Fetching URL: {}", url);
        // The gzip feature negotiates and decodes compression itself.
        let response = self.client.get(url.as_str()).send().await?;

        debug!("Response status: {}", response.status());
        if !response.status().is_success() {
            return Err(NportError::RemoteStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let content = response.bytes().await?;
        debug!("Received content length: {}", content.len());
        Ok(content.to_vec())
    }
}

#[async_trait]
impl EdgarSource for EdgarClient {
    async fn submissions(&self, cik: &Cik) -> Result<Vec<u8>> {
        let url = self.submissions_url(cik)?;
        self.fetch(&url).await
    }

    async fn primary_document(&self, cik: &Cik, accession: &Accession) -> Result<Vec<u8>> {
        let url = self.primary_document_url(cik, accession)?;
        self.fetch(&url).await
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
