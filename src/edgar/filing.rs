use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::cik::{Accession, Cik};
use super::client::EdgarSource;
use crate::error::{NportError, Result};

pub const NPORT_P_FORM: &str = "NPORT-P";

// Only the fields the holdings pipeline reads; serde skips the rest.
#[derive(Debug, Deserialize)]
struct Submissions {
    name: String,
    filings: FilingsData,
}

#[derive(Debug, Deserialize)]
struct FilingsData {
    recent: RecentFilings,
}

#[derive(Debug, Deserialize)]
struct RecentFilings {
    #[serde(rename = "accessionNumber")]
    accession_number: Vec<String>,
    // Kept as text so a bad date on an unrelated form does not sink the index.
    #[serde(rename = "filingDate")]
    filing_date: Vec<String>,
    form: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingRecord {
    pub filing_date: NaiveDate,
    pub accession_number: Accession,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilingIndex {
    pub fund_name: String,
    /// NPORT-P filings, newest first.
    pub filings: Vec<FilingRecord>,
}

impl FilingIndex {
    pub fn latest(&self) -> Option<&FilingRecord> {
        self.filings.first()
    }
}

pub async fn fetch_filing_index(source: &dyn EdgarSource, cik: &Cik) -> Result<FilingIndex> {
    info!("Fetching submissions index for CIK {}", cik);
    let content = source.submissions(cik).await?;
    let index = parse_filing_index(&content)?;
    info!(
        "Found {} NPORT-P filings for {} ({})",
        index.filings.len(),
        index.fund_name,
        cik
    );
    Ok(index)
}

/// Selects the NPORT-P entries of a submissions index, newest first.
pub fn parse_filing_index(content: &[u8]) -> Result<FilingIndex> {
    let submissions: Submissions = serde_json::from_slice(content)?;
    let recent = submissions.filings.recent;

    if recent.form.len() != recent.accession_number.len()
        || recent.form.len() != recent.filing_date.len()
    {
        return Err(index_error(format!(
            "recent filings arrays differ in length: {} forms, {} accession numbers, {} dates",
            recent.form.len(),
            recent.accession_number.len(),
            recent.filing_date.len()
        )));
    }

    let mut filings = Vec::new();
    for ((form, accession), filing_date) in recent
        .form
        .iter()
        .zip(&recent.accession_number)
        .zip(&recent.filing_date)
    {
        if form != NPORT_P_FORM {
            continue;
        }
        let filing_date = NaiveDate::parse_from_str(filing_date, "%Y-%m-%d")
            .map_err(|_| index_error(format!("malformed filing date {:?}", filing_date)))?;
        let accession_number = Accession::parse(accession)
            .map_err(|_| index_error(format!("malformed accession number {:?}", accession)))?;
        filings.push(FilingRecord {
            filing_date,
            accession_number,
        });
    }

    filings.sort_by(|a, b| {
        (b.filing_date, &b.accession_number).cmp(&(a.filing_date, &a.accession_number))
    });
    debug!("Sorted NPORT-P filings: {:?}", filings);

    Ok(FilingIndex {
        fund_name: submissions.name,
        filings,
    })
}

fn index_error(msg: String) -> NportError {
    NportError::IndexParse(<serde_json::Error as serde::de::Error>::custom(msg))
}
