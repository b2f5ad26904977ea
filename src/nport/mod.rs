pub mod holdings;

pub use holdings::{extract_holdings, HoldingRecord};
