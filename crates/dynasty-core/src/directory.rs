// Player directory cache. The directory is large and changes slowly, so it
// is fetched once per TTL and shared by every snapshot build.

use std::sync::Arc;

use chrono::Duration;
use tracing::info;

use crate::cache::TtlCache;
use crate::clock::Clock;
use crate::error::UpstreamError;
use crate::provider::{LeagueDataProvider, PlayerDirectory};

pub struct PlayerDirectoryCache {
    provider: Arc<dyn LeagueDataProvider>,
    clock: Arc<dyn Clock>,
    cache: TtlCache<PlayerDirectory>,
}

impl PlayerDirectoryCache {
    pub const DEFAULT_TTL_HOURS: i64 = 24;

    pub fn new(provider: Arc<dyn LeagueDataProvider>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            provider,
            clock,
            cache: TtlCache::new(ttl),
        }
    }

    pub async fn get(&self) -> Result<Arc<PlayerDirectory>, UpstreamError> {
        let now = self.clock.now();
        self.cache
            .get_or_refresh(now, || async {
                let players = self.provider.get_players().await?;
                info!(count = players.len(), "player directory refreshed");
                Ok(players)
            })
            .await
    }
}
