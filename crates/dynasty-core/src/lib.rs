// Library root: league snapshots enriched with dynasty valuations.
//
// Collaborators (league data, valuation scraping) are abstract traits in
// `provider`; concrete HTTP implementations live in sibling crates.

pub mod analyzer;
pub mod cache;
pub mod clock;
pub mod config;
pub mod directory;
pub mod error;
pub mod leagues;
pub mod lineup;
pub mod names;
pub mod picks;
pub mod provider;
pub mod retry;
pub mod snapshot;
pub mod valuation;

pub use analyzer::Analyzer;
pub use error::{CoreError, UpstreamError};
