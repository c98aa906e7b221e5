// Rankings page fetcher and parser.

use std::time::Duration;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use dynasty_core::config::KtcConfig;
use dynasty_core::provider::{RawValuation, ValuationProvider};
use dynasty_core::valuation::Position;
use dynasty_core::UpstreamError;

use crate::clean::clean_listed_name;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const DEFAULT_URL_TEMPLATE: &str =
    "https://keeptradecut.com/dynasty-rankings?page={page}&filters=QB|WR|RB|TE&format=0";
pub const DEFAULT_PAGES: u32 = 10;
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Compiled selectors for one ranking row and its cells.
pub struct RowSelectors {
    row: Selector,
    name: Selector,
    position: Selector,
    value: Selector,
}

impl RowSelectors {
    pub fn new() -> Result<Self, UpstreamError> {
        let parse = |css: &str| {
            Selector::parse(css)
                .map_err(|e| UpstreamError::decode("ktc selector", format!("{css}: {e}")))
        };
        Ok(Self {
            row: parse(".onePlayer")?,
            name: parse(".player-name")?,
            position: parse(".position")?,
            value: parse(".value")?,
        })
    }

    /// Every well-formed row on a rankings page. Rows missing a cell, with a
    /// non-numeric value, or outside QB/RB/WR/TE are skipped.
    pub fn parse_page(&self, html: &str) -> Vec<RawValuation> {
        let document = Html::parse_document(html);
        let mut rows = Vec::new();
        for (index, row) in document.select(&self.row).enumerate() {
            match self.parse_row(&row) {
                Some(valuation) => rows.push(valuation),
                None => debug!(index, "skipping malformed ranking row"),
            }
        }
        rows
    }

    fn parse_row(&self, row: &ElementRef<'_>) -> Option<RawValuation> {
        let name = clean_listed_name(&cell_text(row, &self.name)?);
        let rank_text = cell_text(row, &self.position)?;
        let value_text = cell_text(row, &self.value)?;

        if name.is_empty() {
            return None;
        }
        // "RB12" -> RB
        let position = Position::from_str_pos(&rank_text.chars().take(2).collect::<String>())?;
        let value = value_text.parse::<u32>().ok()?;

        Some(RawValuation {
            name,
            position,
            value,
        })
    }
}

/// Text of the first matching child, each text node trimmed and concatenated.
fn cell_text(row: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    let cell = row.select(selector).next()?;
    Some(cell.text().map(str::trim).collect::<String>())
}

// ---------------------------------------------------------------------------
// KtcScraper
// ---------------------------------------------------------------------------

pub struct KtcScraper {
    http: reqwest::Client,
    selectors: RowSelectors,
    url_template: String,
    pages: u32,
    page_delay: Duration,
}

impl KtcScraper {
    pub fn new(
        url_template: impl Into<String>,
        pages: u32,
        page_delay: Duration,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| UpstreamError::transport("build http client", e))?;
        Ok(Self {
            http,
            selectors: RowSelectors::new()?,
            url_template: url_template.into(),
            pages,
            page_delay,
        })
    }

    pub fn from_config(config: &KtcConfig) -> Result<Self, UpstreamError> {
        Self::new(
            config.url_template.clone(),
            config.pages,
            Duration::from_millis(config.page_delay_ms),
            Duration::from_secs(config.timeout_secs),
            &config.user_agent,
        )
    }

    /// Scraper for the public rankings with default settings.
    pub fn public() -> Result<Self, UpstreamError> {
        Self::new(
            DEFAULT_URL_TEMPLATE,
            DEFAULT_PAGES,
            Duration::ZERO,
            Duration::from_secs(30),
            DEFAULT_USER_AGENT,
        )
    }

    pub fn page_url(&self, page: u32) -> String {
        self.url_template.replace("{page}", &page.to_string())
    }

    async fn fetch_page(&self, page: u32) -> Result<String, UpstreamError> {
        const OP: &str = "scrape_values";
        let url = self.page_url(page);
        debug!(page, %url, "fetching rankings page");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| UpstreamError::transport(OP, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::status(OP, status.as_u16()));
        }
        response
            .text()
            .await
            .map_err(|e| UpstreamError::transport(OP, e))
    }
}

#[async_trait]
impl ValuationProvider for KtcScraper {
    /// Walk pages `0..pages`. A page with no rows ends the walk early.
    async fn scrape_values(&self) -> Result<Vec<RawValuation>, UpstreamError> {
        let mut all = Vec::new();
        for page in 0..self.pages {
            if page > 0 && !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }
            let html = self.fetch_page(page).await?;
            let rows = self.selectors.parse_page(&html);
            if rows.is_empty() {
                warn!(page, "rankings page had no rows, stopping");
                break;
            }
            debug!(page, rows = rows.len(), "rankings page parsed");
            all.extend(rows);
        }
        info!(count = all.len(), "ktc rankings scraped");
        Ok(all)
    }
}
