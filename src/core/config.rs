use anyhow::{anyhow, Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::cache::{DEFAULT_CACHE_DIR, DEFAULT_CAPACITY};
use crate::edgar::client::{EDGAR_ARCHIVES_URL, EDGAR_DATA_URL, USER_AGENT};

#[derive(Clone, Debug)]
pub struct NportConfig {
    pub user_agent: String,
    pub cache_dir: PathBuf,
    pub cache_capacity: usize,
    pub bind_addr: SocketAddr,
    pub http_timeout: Duration,
    pub edgar_data_url: Url,
    pub edgar_archives_url: Url,
}

impl NportConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source; `from_env` passes the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let user_agent = lookup("USER_AGENT").unwrap_or_else(|| USER_AGENT.to_string());

        let cache_dir =
            PathBuf::from(lookup("NPORT_CACHE_DIR").unwrap_or_else(|| DEFAULT_CACHE_DIR.to_string()));

        let cache_capacity = match lookup("NPORT_CACHE_CAPACITY") {
            Some(raw) => raw
                .parse::<usize>()
                .with_context(|| format!("NPORT_CACHE_CAPACITY must be a number, got {:?}", raw))?,
            None => DEFAULT_CAPACITY,
        };
        if cache_capacity == 0 {
            return Err(anyhow!("NPORT_CACHE_CAPACITY must be at least 1"));
        }

        let bind_addr = lookup("NPORT_BIND_ADDR")
            .unwrap_or_else(|| "127.0.0.1:5000".to_string())
            .parse::<SocketAddr>()
            .context("NPORT_BIND_ADDR must be a socket address such as 127.0.0.1:5000")?;

        let http_timeout = match lookup("NPORT_HTTP_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(raw.parse::<u64>().with_context(|| {
                format!("NPORT_HTTP_TIMEOUT_SECS must be a number, got {:?}", raw)
            })?),
            None => Duration::from_secs(30),
        };

        let edgar_data_url = Url::parse(
            &lookup("EDGAR_DATA_URL").unwrap_or_else(|| EDGAR_DATA_URL.to_string()),
        )
        .context("EDGAR_DATA_URL is not a valid URL")?;

        let edgar_archives_url = Url::parse(
            &lookup("EDGAR_ARCHIVES_URL").unwrap_or_else(|| EDGAR_ARCHIVES_URL.to_string()),
        )
        .context("EDGAR_ARCHIVES_URL is not a valid URL")?;

        Ok(Self {
            user_agent,
            cache_dir,
            cache_capacity,
            bind_addr,
            http_timeout,
            edgar_data_url,
            edgar_archives_url,
        })
    }

    /// Per-process cache root for one-shot CLI runs, separate from
    /// `cache_dir`.
    pub fn scratch_cache_dir() -> PathBuf {
        std::env::temp_dir().join(format!("nport-cli-{}", std::process::id()))
    }
}
