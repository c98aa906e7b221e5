// Sleeper wire formats and their conversion into core types.
//
// Sleeper is loose with types: seasons arrive as strings, most collections
// may be `null`, and unknown users/leagues come back as a `null` body or an
// object without an id. Everything here is lenient on input and strict on
// output.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use dynasty_core::provider::{
    LeagueMeta, LeagueSettings, PlayerDirectory, PlayerRecord, RawRoster, RosterSettings,
    TradeRecord, UserRecord,
};
use dynasty_core::UpstreamError;

/// Fallback headshot when the player metadata carries none.
const HEADSHOT_CDN: &str = "https://sleepercdn.com/content/nfl/players/thumb";

/// A season that may be encoded as `"2024"` or `2024`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireSeason {
    Text(String),
    Number(i64),
}

impl WireSeason {
    pub fn parse(&self, operation: &str) -> Result<i32, UpstreamError> {
        match self {
            WireSeason::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| UpstreamError::decode(operation, format!("bad season {s:?}"))),
            WireSeason::Number(n) => i32::try_from(*n)
                .map_err(|_| UpstreamError::decode(operation, format!("bad season {n}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct WireUser {
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub display_name: Option<String>,
}

impl WireUser {
    /// None when the body carries no user id.
    pub fn into_record(self) -> Option<UserRecord> {
        let user_id = self.user_id.filter(|id| !id.is_empty())?;
        Some(UserRecord {
            user_id,
            username: self.username,
            display_name: self.display_name,
        })
    }
}

// ---------------------------------------------------------------------------
// Leagues
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireLeagueSettings {
    pub draft_rounds: Option<u32>,
    pub reserve_slots: Option<u32>,
    pub taxi_slots: Option<u32>,
    #[serde(rename = "type")]
    pub league_type: Option<u8>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireLeague {
    pub league_id: Option<String>,
    pub name: Option<String>,
    pub season: Option<WireSeason>,
    pub total_rosters: Option<u32>,
    pub avatar: Option<String>,
    pub roster_positions: Option<Vec<String>>,
    pub settings: Option<WireLeagueSettings>,
}

impl WireLeague {
    /// Ok(None) when the body carries no league id.
    pub fn into_meta(self, operation: &str) -> Result<Option<LeagueMeta>, UpstreamError> {
        let Some(league_id) = self.league_id.filter(|id| !id.is_empty()) else {
            return Ok(None);
        };
        let season = self
            .season
            .ok_or_else(|| UpstreamError::decode(operation, format!("league {league_id} has no season")))?
            .parse(operation)?;
        let settings = self.settings.unwrap_or_default();
        Ok(Some(LeagueMeta {
            name: self.name.unwrap_or_default(),
            season,
            total_rosters: self.total_rosters.unwrap_or_default(),
            avatar: self.avatar,
            roster_positions: self.roster_positions.unwrap_or_default(),
            settings: LeagueSettings {
                draft_rounds: settings.draft_rounds.unwrap_or_default(),
                reserve_slots: settings.reserve_slots.unwrap_or_default(),
                taxi_slots: settings.taxi_slots.unwrap_or_default(),
                league_type: settings.league_type,
            },
            league_id,
        }))
    }
}

// ---------------------------------------------------------------------------
// Rosters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireRosterSettings {
    pub wins: Option<u32>,
    pub losses: Option<u32>,
    pub ties: Option<u32>,
    pub fpts: Option<u32>,
    pub fpts_against: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireRoster {
    pub roster_id: u32,
    pub owner_id: Option<String>,
    pub players: Option<Vec<String>>,
    pub starters: Option<Vec<String>>,
    pub reserve: Option<Vec<String>>,
    pub taxi: Option<Vec<String>>,
    pub settings: Option<WireRosterSettings>,
}

impl From<WireRoster> for RawRoster {
    fn from(w: WireRoster) -> Self {
        let settings = w.settings.unwrap_or_default();
        RawRoster {
            roster_id: w.roster_id,
            owner_id: w.owner_id.filter(|id| !id.is_empty()),
            players: w.players.unwrap_or_default(),
            starters: w.starters.unwrap_or_default(),
            reserve: w.reserve.unwrap_or_default(),
            taxi: w.taxi.unwrap_or_default(),
            settings: RosterSettings {
                wins: settings.wins,
                losses: settings.losses,
                ties: settings.ties,
                fpts: settings.fpts,
                fpts_against: settings.fpts_against,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Traded picks
// ---------------------------------------------------------------------------

/// `roster_id` is the pick's original owner, `owner_id` its current owner.
#[derive(Debug, Clone, Deserialize)]
pub struct WireTradedPick {
    pub season: WireSeason,
    pub round: u32,
    pub roster_id: u32,
    pub owner_id: u32,
    pub previous_owner_id: Option<u32>,
}

impl WireTradedPick {
    pub fn into_record(self, operation: &str) -> Result<TradeRecord, UpstreamError> {
        Ok(TradeRecord {
            season: self.season.parse(operation)?,
            round: self.round,
            from_team: self.roster_id,
            to_team: self.owner_id,
            previous_owner: self.previous_owner_id,
        })
    }
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct WirePlayer {
    pub player_id: Option<String>,
    pub full_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub position: Option<String>,
    pub team: Option<String>,
    pub status: Option<String>,
    pub birth_date: Option<String>,
    pub metadata: Option<Value>,
}

impl WirePlayer {
    /// Team defenses carry no `full_name`; their first and last names are
    /// joined instead.
    pub fn into_record(self, key: &str) -> PlayerRecord {
        let player_id = self
            .player_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| key.to_string());
        let full_name = self.full_name.filter(|n| !n.trim().is_empty()).or_else(|| {
            let joined = [self.first_name.as_deref(), self.last_name.as_deref()]
                .into_iter()
                .flatten()
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            (!joined.is_empty()).then_some(joined)
        });
        let headshot = self
            .metadata
            .as_ref()
            .and_then(|m| m.get("headshot"))
            .and_then(Value::as_str)
            .filter(|h| !h.is_empty())
            .map(String::from)
            .unwrap_or_else(|| format!("{HEADSHOT_CDN}/{player_id}.jpg"));
        PlayerRecord {
            full_name,
            position: self.position,
            team: self.team.filter(|t| !t.is_empty()),
            status: self.status,
            birth_date: self.birth_date,
            headshot: Some(headshot),
            player_id,
        }
    }
}

pub fn into_directory(players: HashMap<String, WirePlayer>) -> PlayerDirectory {
    players
        .into_iter()
        .map(|(key, player)| {
            let record = player.into_record(&key);
            (key, record)
        })
        .collect()
}
