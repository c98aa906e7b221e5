// League cache: a user's dynasty leagues across seasons, grouped by name.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{Datelike, Duration};
use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cache::KeyedTtlCache;
use crate::clock::Clock;
use crate::error::UpstreamError;
use crate::provider::{LeagueDataProvider, LeagueMeta};

/// First season the platform has league history for.
pub const DEFAULT_FIRST_SEASON: i32 = 2018;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueEntry {
    pub league_id: String,
    pub season: i32,
    pub avatar: Option<String>,
}

/// League name → that league's seasons, newest first.
pub type UserLeagues = BTreeMap<String, Vec<LeagueEntry>>;

/// Keep dynasty leagues only, group them by name and order each group by
/// season descending. A league id seen twice is kept once.
pub fn group_leagues<I>(leagues: I) -> UserLeagues
where
    I: IntoIterator<Item = LeagueMeta>,
{
    let mut seen = HashSet::new();
    let mut grouped = UserLeagues::new();
    for league in leagues {
        if !league.is_dynasty() || !seen.insert(league.league_id.clone()) {
            continue;
        }
        grouped.entry(league.name).or_default().push(LeagueEntry {
            league_id: league.league_id,
            season: league.season,
            avatar: league.avatar,
        });
    }
    for entries in grouped.values_mut() {
        entries.sort_by(|a, b| b.season.cmp(&a.season));
    }
    grouped
}

pub struct LeagueCache {
    provider: Arc<dyn LeagueDataProvider>,
    clock: Arc<dyn Clock>,
    cache: KeyedTtlCache<String, UserLeagues>,
    first_season: i32,
    last_season: Option<i32>,
}

impl LeagueCache {
    pub const DEFAULT_TTL_HOURS: i64 = 1;

    pub fn new(provider: Arc<dyn LeagueDataProvider>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            provider,
            clock,
            cache: KeyedTtlCache::new(ttl),
            first_season: DEFAULT_FIRST_SEASON,
            last_season: None,
        }
    }

    /// Restrict the scan to `first..=last`; `last = None` means the clock's
    /// current year.
    pub fn with_seasons(mut self, first: i32, last: Option<i32>) -> Self {
        self.first_season = first;
        self.last_season = last;
        self
    }

    pub fn seasons(&self) -> std::ops::RangeInclusive<i32> {
        let last = self.last_season.unwrap_or_else(|| self.clock.now().year());
        self.first_season..=last
    }

    /// Every dynasty league the user belongs to, grouped by name.
    ///
    /// Seasons are fetched concurrently; one failed season fails the call and
    /// leaves the cached entry for this user untouched.
    pub async fn get_all_user_leagues(
        &self,
        user_id: &str,
    ) -> Result<Arc<UserLeagues>, UpstreamError> {
        let now = self.clock.now();
        let seasons = self.seasons();
        self.cache
            .get_or_refresh(&user_id.to_string(), now, || async move {
                let per_season = try_join_all(
                    seasons.map(|season| self.provider.get_user_leagues(user_id, season)),
                )
                .await?;
                let grouped = group_leagues(per_season.into_iter().flatten());
                info!(user_id, leagues = grouped.len(), "user leagues refreshed");
                Ok(grouped)
            })
            .await
    }

    pub async fn invalidate(&self, user_id: &str) {
        self.cache.invalidate(&user_id.to_string()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::LeagueSettings;

    fn meta(id: &str, name: &str, season: i32, league_type: u8) -> LeagueMeta {
        LeagueMeta {
            league_id: id.into(),
            name: name.into(),
            season,
            total_rosters: 12,
            avatar: None,
            roster_positions: Vec::new(),
            settings: LeagueSettings {
                league_type: Some(league_type),
                ..Default::default()
            },
        }
    }

    #[test]
    fn groups_by_name_newest_first() {
        let grouped = group_leagues(vec![
            meta("a22", "Alpha", 2022, 2),
            meta("b24", "Beta", 2024, 2),
            meta("a24", "Alpha", 2024, 2),
            meta("a23", "Alpha", 2023, 2),
        ]);
        let alpha: Vec<i32> = grouped["Alpha"].iter().map(|e| e.season).collect();
        assert_eq!(alpha, vec![2024, 2023, 2022]);
        assert_eq!(grouped["Beta"].len(), 1);
    }

    #[test]
    fn redraft_leagues_are_dropped() {
        let grouped = group_leagues(vec![
            meta("r1", "Redraft", 2024, 0),
            meta("k1", "Keeper", 2024, 1),
            meta("d1", "Dynasty", 2024, 2),
        ]);
        assert_eq!(grouped.keys().collect::<Vec<_>>(), vec!["Dynasty"]);
    }

    #[test]
    fn duplicate_league_ids_kept_once() {
        let grouped = group_leagues(vec![meta("d1", "D", 2024, 2), meta("d1", "D", 2024, 2)]);
        assert_eq!(grouped["D"].len(), 1);
    }

    #[test]
    fn missing_league_type_is_not_dynasty() {
        let mut league = meta("x", "X", 2024, 2);
        league.settings.league_type = None;
        assert!(group_leagues(vec![league]).is_empty());
    }
}
