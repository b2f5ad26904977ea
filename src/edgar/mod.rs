pub mod cik;
pub mod client;
pub mod filing;
pub mod rate_limiter;

pub use cik::{Accession, Cik};
pub use client::{EdgarClient, EdgarSource};
pub use filing::{fetch_filing_index, FilingIndex, FilingRecord};
