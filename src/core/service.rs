use chrono::NaiveDate;
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cache::DocumentCache;
use crate::edgar::cik::{Accession, Cik};
use crate::edgar::client::EdgarSource;
use crate::edgar::filing::{fetch_filing_index, FilingIndex};
use crate::error::{NportError, Result};
use crate::nport::holdings::{extract_holdings, HoldingRecord};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundHoldings {
    pub fund_name: String,
    pub filing_date: NaiveDate,
    pub accession_number: Accession,
    pub data: Vec<HoldingRecord>,
}

impl FundHoldings {
    pub fn total_value(&self) -> f64 {
        self.data.iter().map(|h| h.value).sum()
    }
}

/// Looks up a fund's newest NPORT-P filing and its holdings.
#[derive(Clone)]
pub struct HoldingsService {
    source: Arc<dyn EdgarSource>,
    cache: Arc<DocumentCache>,
}

impl HoldingsService {
    pub fn new(source: Arc<dyn EdgarSource>, cache: Arc<DocumentCache>) -> Self {
        Self { source, cache }
    }

    pub fn cache(&self) -> &Arc<DocumentCache> {
        &self.cache
    }

    pub async fn filings(&self, raw_cik: &str) -> Result<FilingIndex> {
        let cik = Cik::parse(raw_cik)?;
        fetch_filing_index(self.source.as_ref(), &cik).await
    }

    pub async fn latest_holdings(&self, raw_cik: &str) -> Result<FundHoldings> {
        let cik = Cik::parse(raw_cik)?;
        let index = fetch_filing_index(self.source.as_ref(), &cik).await?;

        let latest = index.latest().ok_or_else(|| NportError::NoFilings {
            cik: cik.to_string(),
        })?;
        info!(
            "Most recent NPORT-P: {} filed on {}",
            latest.accession_number, latest.filing_date
        );

        let content = self
            .cache
            .get_document(self.source.as_ref(), &cik, &latest.accession_number)
            .await?;
        let data = extract_holdings(&content)?;
        info!(
            "Extracted {} holdings from {}",
            data.len(),
            latest.accession_number
        );

        Ok(FundHoldings {
            fund_name: index.fund_name.clone(),
            filing_date: latest.filing_date,
            accession_number: latest.accession_number.clone(),
            data,
        })
    }
}
