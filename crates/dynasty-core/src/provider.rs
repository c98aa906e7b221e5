// Collaborator contracts: the league-data provider and the valuation provider.
//
// These are the only seams through which the core touches the network. The
// types here are already decoded into domain form; wire formats belong to the
// implementing crates.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::UpstreamError;
use crate::valuation::Position;

/// League-local team identifier (the platform's roster id).
pub type RosterId = u32;

/// Player directory keyed by player id.
pub type PlayerDirectory = HashMap<String, PlayerRecord>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: String,
    pub username: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeagueSettings {
    pub draft_rounds: u32,
    /// IR slot count.
    pub reserve_slots: u32,
    pub taxi_slots: u32,
    /// League format flag; 2 marks keeper/dynasty leagues.
    pub league_type: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueMeta {
    pub league_id: String,
    pub name: String,
    pub season: i32,
    pub total_rosters: u32,
    pub avatar: Option<String>,
    /// Raw starter/bench slot list, one entry per slot (e.g. "QB", "FLEX", "BN").
    pub roster_positions: Vec<String>,
    pub settings: LeagueSettings,
}

impl LeagueMeta {
    pub fn is_dynasty(&self) -> bool {
        self.settings.league_type == Some(2)
    }
}

/// Standings fields as reported by the platform, unmodified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RosterSettings {
    pub wins: Option<u32>,
    pub losses: Option<u32>,
    pub ties: Option<u32>,
    pub fpts: Option<u32>,
    pub fpts_against: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRoster {
    pub roster_id: RosterId,
    /// None for orphaned rosters.
    pub owner_id: Option<String>,
    pub players: Vec<String>,
    pub starters: Vec<String>,
    pub reserve: Vec<String>,
    pub taxi: Vec<String>,
    pub settings: RosterSettings,
}

/// A traded future pick: the `round` pick of `season` originally allocated to
/// `from_team` now belongs to `to_team`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub season: i32,
    pub round: u32,
    pub from_team: RosterId,
    pub to_team: RosterId,
    pub previous_owner: Option<RosterId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub player_id: String,
    pub full_name: Option<String>,
    pub position: Option<String>,
    pub team: Option<String>,
    pub status: Option<String>,
    pub birth_date: Option<String>,
    pub headshot: Option<String>,
}

/// One unranked row from a valuation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawValuation {
    pub name: String,
    pub position: Position,
    pub value: u32,
}

#[async_trait]
pub trait LeagueDataProvider: Send + Sync {
    async fn get_user(&self, username: &str) -> Result<Option<UserRecord>, UpstreamError>;

    async fn get_user_leagues(
        &self,
        user_id: &str,
        season: i32,
    ) -> Result<Vec<LeagueMeta>, UpstreamError>;

    async fn get_league(&self, league_id: &str) -> Result<Option<LeagueMeta>, UpstreamError>;

    async fn get_rosters(&self, league_id: &str) -> Result<Vec<RawRoster>, UpstreamError>;

    async fn get_traded_picks(&self, league_id: &str) -> Result<Vec<TradeRecord>, UpstreamError>;

    async fn get_players(&self) -> Result<PlayerDirectory, UpstreamError>;
}

#[async_trait]
pub trait ValuationProvider: Send + Sync {
    async fn scrape_values(&self) -> Result<Vec<RawValuation>, UpstreamError>;
}

#[async_trait]
impl<T: LeagueDataProvider + ?Sized> LeagueDataProvider for Arc<T> {
    async fn get_user(&self, username: &str) -> Result<Option<UserRecord>, UpstreamError> {
        (**self).get_user(username).await
    }

    async fn get_user_leagues(
        &self,
        user_id: &str,
        season: i32,
    ) -> Result<Vec<LeagueMeta>, UpstreamError> {
        (**self).get_user_leagues(user_id, season).await
    }

    async fn get_league(&self, league_id: &str) -> Result<Option<LeagueMeta>, UpstreamError> {
        (**self).get_league(league_id).await
    }

    async fn get_rosters(&self, league_id: &str) -> Result<Vec<RawRoster>, UpstreamError> {
        (**self).get_rosters(league_id).await
    }

    async fn get_traded_picks(&self, league_id: &str) -> Result<Vec<TradeRecord>, UpstreamError> {
        (**self).get_traded_picks(league_id).await
    }

    async fn get_players(&self) -> Result<PlayerDirectory, UpstreamError> {
        (**self).get_players().await
    }
}

#[async_trait]
impl<T: ValuationProvider + ?Sized> ValuationProvider for Arc<T> {
    async fn scrape_values(&self) -> Result<Vec<RawValuation>, UpstreamError> {
        (**self).scrape_values().await
    }
}
