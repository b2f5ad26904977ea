use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{NportError, Result};

const CIK_MAX_DIGITS: usize = 10;

/// SEC Central Index Key, stored in its canonical 10-digit form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cik(String);

impl Cik {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty()
            || raw.len() > CIK_MAX_DIGITS
            || !raw.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(NportError::InvalidCik(raw.to_string()));
        }
        Ok(Cik(format!("{:0>10}", raw)))
    }

    /// Zero-padded form used by the submissions endpoint and cache keys.
    pub fn padded(&self) -> &str {
        &self.0
    }

    /// Integer form used in archive paths.
    pub fn as_u64(&self) -> u64 {
        // Ten ASCII digits always fit in a u64.
        self.0.bytes().fold(0, |acc, b| acc * 10 + u64::from(b - b'0'))
    }
}

impl fmt::Display for Cik {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Accession number in its dash-delimited form, e.g. `0000000000-25-000001`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Accession(String);

impl Accession {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty()
            || !raw.bytes().any(|b| b.is_ascii_digit())
            || !raw.bytes().all(|b| b.is_ascii_digit() || b == b'-')
        {
            return Err(NportError::InvalidAccession(raw.to_string()));
        }
        Ok(Accession(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn without_dashes(&self) -> String {
        self.0.replace('-', "")
    }
}

impl fmt::Display for Accession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
