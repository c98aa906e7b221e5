// Top-level facade: owns the caches and collaborators and exposes the
// operations callers use.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use tracing::info;

use crate::clock::Clock;
use crate::config::AnalyzerConfig;
use crate::directory::PlayerDirectoryCache;
use crate::error::{CoreError, Entity};
use crate::leagues::{LeagueCache, UserLeagues, DEFAULT_FIRST_SEASON};
use crate::names::{AliasTable, AliasedNormalizer, NameMatcher};
use crate::provider::{LeagueDataProvider, UserRecord, ValuationProvider};
use crate::retry::{RetryPolicy, Retrying};
use crate::snapshot::{LeagueSnapshot, SnapshotAssembler, TeamSnapshot};
use crate::valuation::{ValuationCache, ValuationRecord};

/// Tunables for an [`Analyzer`].
#[derive(Debug, Clone)]
pub struct AnalyzerOptions {
    pub valuation_ttl: Duration,
    pub player_directory_ttl: Duration,
    pub league_ttl: Duration,
    pub retry: RetryPolicy,
    pub first_season: i32,
    pub last_season: Option<i32>,
    pub aliases: AliasTable,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            valuation_ttl: Duration::hours(ValuationCache::DEFAULT_TTL_HOURS),
            player_directory_ttl: Duration::hours(PlayerDirectoryCache::DEFAULT_TTL_HOURS),
            league_ttl: Duration::hours(LeagueCache::DEFAULT_TTL_HOURS),
            retry: RetryPolicy::default(),
            first_season: DEFAULT_FIRST_SEASON,
            last_season: None,
            aliases: AliasTable::builtin(),
        }
    }
}

impl AnalyzerOptions {
    /// Options from loaded config. Configured aliases extend the built-in table.
    pub fn from_config(config: &AnalyzerConfig, aliases: &HashMap<String, String>) -> Self {
        let mut table = AliasTable::builtin();
        table.extend(aliases);
        Self {
            valuation_ttl: config.cache.valuation_ttl(),
            player_directory_ttl: config.cache.player_directory_ttl(),
            league_ttl: config.cache.league_ttl(),
            retry: config.retry.policy(),
            first_season: config.leagues.first_season,
            last_season: config.leagues.last_season,
            aliases: table,
        }
    }
}

pub struct Analyzer {
    provider: Arc<dyn LeagueDataProvider>,
    valuations: Arc<ValuationCache>,
    leagues: LeagueCache,
    assembler: SnapshotAssembler,
}

impl Analyzer {
    /// Wire the collaborators into the caches. Both collaborators are wrapped
    /// in the configured retry policy.
    pub fn new<L, V>(
        league_data: L,
        valuation_source: V,
        clock: Arc<dyn Clock>,
        options: AnalyzerOptions,
    ) -> Self
    where
        L: LeagueDataProvider + 'static,
        V: ValuationProvider + 'static,
    {
        let provider: Arc<dyn LeagueDataProvider> =
            Arc::new(Retrying::new(league_data, options.retry.clone()));
        let scraper: Arc<dyn ValuationProvider> =
            Arc::new(Retrying::new(valuation_source, options.retry.clone()));
        let matcher: Arc<dyn NameMatcher> = Arc::new(AliasedNormalizer::new(options.aliases));

        let valuations = Arc::new(ValuationCache::new(
            scraper,
            Arc::clone(&clock),
            options.valuation_ttl,
        ));
        let directory = Arc::new(PlayerDirectoryCache::new(
            Arc::clone(&provider),
            Arc::clone(&clock),
            options.player_directory_ttl,
        ));
        let leagues = LeagueCache::new(Arc::clone(&provider), Arc::clone(&clock), options.league_ttl)
            .with_seasons(options.first_season, options.last_season);
        let assembler = SnapshotAssembler::new(
            Arc::clone(&provider),
            Arc::clone(&valuations),
            directory,
            matcher,
            clock,
        );

        Self {
            provider,
            valuations,
            leagues,
            assembler,
        }
    }

    pub async fn build_snapshot(&self, league_id: &str) -> Result<LeagueSnapshot, CoreError> {
        self.assembler.build_snapshot(league_id).await
    }

    /// Ranked valuations from the valuation cache.
    pub async fn get_values(&self) -> Result<Arc<Vec<ValuationRecord>>, CoreError> {
        Ok(self.valuations.get_values().await?)
    }

    pub async fn get_all_user_leagues(&self, user_id: &str) -> Result<Arc<UserLeagues>, CoreError> {
        Ok(self.leagues.get_all_user_leagues(user_id).await?)
    }

    /// Like [`Analyzer::get_all_user_leagues`], starting from a username.
    pub async fn user_leagues(&self, username: &str) -> Result<Arc<UserLeagues>, CoreError> {
        let user = self.resolve_user(username).await?;
        self.get_all_user_leagues(&user.user_id).await
    }

    /// The team `username` owns in `league_id`.
    pub async fn team_for_user(
        &self,
        username: &str,
        league_id: &str,
    ) -> Result<TeamSnapshot, CoreError> {
        let user = self.resolve_user(username).await?;
        let mut snapshot = self.build_snapshot(league_id).await?;
        let team_id = snapshot
            .team_for_owner(&user.user_id)
            .map(|t| t.team_id)
            .ok_or_else(|| CoreError::not_found(Entity::Roster, format!("{username} in {league_id}")))?;
        snapshot
            .teams
            .remove(&team_id)
            .ok_or_else(|| CoreError::not_found(Entity::Roster, team_id.to_string()))
    }

    async fn resolve_user(&self, username: &str) -> Result<UserRecord, CoreError> {
        let user = self
            .provider
            .get_user(username)
            .await?
            .ok_or_else(|| CoreError::not_found(Entity::User, username))?;
        info!(username, user_id = %user.user_id, "user resolved");
        Ok(user)
    }
}
