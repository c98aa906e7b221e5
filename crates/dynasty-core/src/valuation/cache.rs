// Valuation cache: one ranked pass, reused until it ages out.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use super::rank::rank_by_position;
use super::ValuationRecord;
use crate::cache::TtlCache;
use crate::clock::Clock;
use crate::error::UpstreamError;
use crate::provider::ValuationProvider;

/// One valuation pass and when it was generated.
#[derive(Debug, Clone)]
pub struct ValuationPass {
    pub records: Arc<Vec<ValuationRecord>>,
    pub fetched_at: Option<DateTime<Utc>>,
}

pub struct ValuationCache {
    provider: Arc<dyn ValuationProvider>,
    clock: Arc<dyn Clock>,
    cache: TtlCache<Vec<ValuationRecord>>,
}

impl ValuationCache {
    pub const DEFAULT_TTL_HOURS: i64 = 12;

    pub fn new(provider: Arc<dyn ValuationProvider>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            provider,
            clock,
            cache: TtlCache::new(ttl),
        }
    }

    /// Ranked valuations from the cache, scraping a fresh pass when the cached
    /// one is missing or older than the TTL.
    ///
    /// Scrape failures are returned to the caller. An empty pass is returned
    /// but not cached, so the next call scrapes again.
    pub async fn get_values(&self) -> Result<Arc<Vec<ValuationRecord>>, UpstreamError> {
        Ok(self.get_pass().await?.records)
    }

    /// Like [`get_values`](Self::get_values), with the generation time of the
    /// records returned. `fetched_at` is None for an empty pass.
    pub async fn get_pass(&self) -> Result<ValuationPass, UpstreamError> {
        let now = self.clock.now();
        let (records, fetched_at) = self
            .cache
            .fetch_stamped_if(
                now,
                || async {
                    let raw = self.provider.scrape_values().await?;
                    let records = rank_by_position(raw);
                    if records.is_empty() {
                        warn!("valuation scrape returned no rows");
                    } else {
                        info!(count = records.len(), "valuations refreshed");
                    }
                    Ok(records)
                },
                |records| !records.is_empty(),
            )
            .await?;
        Ok(ValuationPass {
            records,
            fetched_at,
        })
    }

    /// Generation time of the cached pass.
    pub async fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.cache.fetched_at().await
    }

    pub async fn invalidate(&self) {
        self.cache.invalidate().await;
    }
}
