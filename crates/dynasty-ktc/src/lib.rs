// KeepTradeCut dynasty rankings scraper implementing the valuation provider
// contract.

pub mod clean;
pub mod rankings;

pub use clean::clean_listed_name;
pub use rankings::{KtcScraper, RowSelectors};
