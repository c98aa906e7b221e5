// Bounded retry with exponential backoff around collaborator calls.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::UpstreamError;
use crate::provider::{
    LeagueDataProvider, LeagueMeta, PlayerDirectory, RawRoster, RawValuation, TradeRecord,
    UserRecord, ValuationProvider,
};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first. 1 disables retrying.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(4),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (0-based), capped at `max_backoff`.
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let secs = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.max_backoff.as_secs_f64() {
            self.max_backoff
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    /// Run `call` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent. The last error is returned unchanged.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, UpstreamError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.backoff_for(attempt - 1);
                    warn!(
                        operation,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "upstream call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Provider decorator applying a [`RetryPolicy`] to every call.
pub struct Retrying<P> {
    inner: P,
    policy: RetryPolicy,
}

impl<P> Retrying<P> {
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<P: LeagueDataProvider> LeagueDataProvider for Retrying<P> {
    async fn get_user(&self, username: &str) -> Result<Option<UserRecord>, UpstreamError> {
        self.policy
            .run("get_user", || self.inner.get_user(username))
            .await
    }

    async fn get_user_leagues(
        &self,
        user_id: &str,
        season: i32,
    ) -> Result<Vec<LeagueMeta>, UpstreamError> {
        self.policy
            .run("get_user_leagues", || self.inner.get_user_leagues(user_id, season))
            .await
    }

    async fn get_league(&self, league_id: &str) -> Result<Option<LeagueMeta>, UpstreamError> {
        self.policy
            .run("get_league", || self.inner.get_league(league_id))
            .await
    }

    async fn get_rosters(&self, league_id: &str) -> Result<Vec<RawRoster>, UpstreamError> {
        self.policy
            .run("get_rosters", || self.inner.get_rosters(league_id))
            .await
    }

    async fn get_traded_picks(&self, league_id: &str) -> Result<Vec<TradeRecord>, UpstreamError> {
        self.policy
            .run("get_traded_picks", || self.inner.get_traded_picks(league_id))
            .await
    }

    async fn get_players(&self) -> Result<PlayerDirectory, UpstreamError> {
        self.policy
            .run("get_players", || self.inner.get_players())
            .await
    }
}

#[async_trait]
impl<P: ValuationProvider> ValuationProvider for Retrying<P> {
    async fn scrape_values(&self) -> Result<Vec<RawValuation>, UpstreamError> {
        self.policy
            .run("scrape_values", || self.inner.scrape_values())
            .await
    }
}
