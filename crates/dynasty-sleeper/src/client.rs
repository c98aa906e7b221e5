// HTTP client for the Sleeper public API.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use dynasty_core::config::SleeperConfig;
use dynasty_core::provider::{
    LeagueDataProvider, LeagueMeta, PlayerDirectory, RawRoster, TradeRecord, UserRecord,
};
use dynasty_core::UpstreamError;

use crate::wire::{self, WireLeague, WirePlayer, WireRoster, WireTradedPick, WireUser};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const DEFAULT_BASE_URL: &str = "https://api.sleeper.app/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// SleeperClient
// ---------------------------------------------------------------------------

pub struct SleeperClient {
    http: reqwest::Client,
    base_url: String,
}

impl SleeperClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::transport("build http client", e))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &SleeperConfig) -> Result<Self, UpstreamError> {
        Self::new(
            config.base_url.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Client against the public API with default settings.
    pub fn public() -> Result<Self, UpstreamError> {
        Self::new(DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` and decode the body. A 404 or a JSON `null` body is Ok(None).
    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
    ) -> Result<Option<T>, UpstreamError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!(operation, %url, "sleeper request");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| UpstreamError::transport(operation, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(UpstreamError::status(operation, status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::transport(operation, e))?;
        serde_json::from_slice::<Option<T>>(&body).map_err(|e| UpstreamError::decode(operation, e))
    }
}

#[async_trait]
impl LeagueDataProvider for SleeperClient {
    async fn get_user(&self, username: &str) -> Result<Option<UserRecord>, UpstreamError> {
        let user: Option<WireUser> = self.get_json("get_user", &format!("user/{username}")).await?;
        Ok(user.and_then(WireUser::into_record))
    }

    async fn get_user_leagues(
        &self,
        user_id: &str,
        season: i32,
    ) -> Result<Vec<LeagueMeta>, UpstreamError> {
        const OP: &str = "get_user_leagues";
        let leagues: Option<Vec<WireLeague>> = self
            .get_json(OP, &format!("user/{user_id}/leagues/nfl/{season}"))
            .await?;
        let mut out = Vec::new();
        for league in leagues.unwrap_or_default() {
            if let Some(meta) = league.into_meta(OP)? {
                out.push(meta);
            }
        }
        debug!(user_id, season, count = out.len(), "user leagues fetched");
        Ok(out)
    }

    async fn get_league(&self, league_id: &str) -> Result<Option<LeagueMeta>, UpstreamError> {
        const OP: &str = "get_league";
        let league: Option<WireLeague> = self.get_json(OP, &format!("league/{league_id}")).await?;
        match league {
            Some(league) => league.into_meta(OP),
            None => Ok(None),
        }
    }

    async fn get_rosters(&self, league_id: &str) -> Result<Vec<RawRoster>, UpstreamError> {
        let rosters: Option<Vec<WireRoster>> = self
            .get_json("get_rosters", &format!("league/{league_id}/rosters"))
            .await?;
        Ok(rosters
            .unwrap_or_default()
            .into_iter()
            .map(RawRoster::from)
            .collect())
    }

    async fn get_traded_picks(&self, league_id: &str) -> Result<Vec<TradeRecord>, UpstreamError> {
        const OP: &str = "get_traded_picks";
        let picks: Option<Vec<WireTradedPick>> = self
            .get_json(OP, &format!("league/{league_id}/traded_picks"))
            .await?;
        picks
            .unwrap_or_default()
            .into_iter()
            .map(|p| p.into_record(OP))
            .collect()
    }

    async fn get_players(&self) -> Result<PlayerDirectory, UpstreamError> {
        let players: Option<HashMap<String, WirePlayer>> =
            self.get_json("get_players", "players/nfl").await?;
        let directory = wire::into_directory(players.unwrap_or_default());
        info!(count = directory.len(), "sleeper player directory fetched");
        Ok(directory)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
