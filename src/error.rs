//! Error types shared by the filing index client, the document cache and
//! the holdings extractor.

use std::fmt;
use thiserror::Error;

/// Coarse classification used by callers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Remote,
    Parse,
    NotFound,
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::Remote => write!(f, "remote"),
            ErrorKind::Parse => write!(f, "parse"),
            ErrorKind::NotFound => write!(f, "not found"),
            ErrorKind::Storage => write!(f, "storage"),
        }
    }
}

#[derive(Error, Debug)]
pub enum NportError {
    #[error("Invalid CIK format: {0:?}")]
    InvalidCik(String),

    #[error("Invalid accession number: {0:?}")]
    InvalidAccession(String),

    #[error("EDGAR request to {url} failed with status: {status}")]
    RemoteStatus { url: String, status: u16 },

    #[error("EDGAR request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("EDGAR rate limiter unavailable: {0}")]
    RateLimiter(#[from] tokio::sync::AcquireError),

    #[error("Invalid EDGAR URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Failed to parse submissions JSON: {0}")]
    IndexParse(#[from] serde_json::Error),

    #[error("Failed to parse NPORT-P document: {0}")]
    DocumentParse(String),

    #[error("No NPORT-P filings found for CIK {cik}")]
    NoFilings { cik: String },

    #[error("Cache error: {0}")]
    Cache(#[from] std::io::Error),
}

impl NportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NportError::InvalidCik(_) | NportError::InvalidAccession(_) => ErrorKind::Validation,
            NportError::RemoteStatus { .. }
            | NportError::Transport(_)
            | NportError::RateLimiter(_)
            | NportError::Url(_) => ErrorKind::Remote,
            NportError::IndexParse(_) | NportError::DocumentParse(_) => ErrorKind::Parse,
            NportError::NoFilings { .. } => ErrorKind::NotFound,
            NportError::Cache(_) => ErrorKind::Storage,
        }
    }
}

impl From<roxmltree::Error> for NportError {
    fn from(e: roxmltree::Error) -> Self {
        NportError::DocumentParse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NportError>;
