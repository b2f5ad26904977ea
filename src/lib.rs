pub mod api;
pub mod cache;
pub mod core;
pub mod edgar;
pub mod error;
pub mod nport;
pub mod server;

// Re-exports
pub use crate::cache::DocumentCache;
pub use crate::core::service::{FundHoldings, HoldingsService};
pub use crate::edgar::{EdgarClient, EdgarSource};
pub use crate::error::{ErrorKind, NportError};
