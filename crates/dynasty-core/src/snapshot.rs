// Snapshot assembly: joins rosters, the player directory, valuations and the
// pick ledger into one per-team view of a league.
//
// The join itself (`assemble`) is pure. `SnapshotAssembler` owns the fetch
// sequence around it and the per-league build locks.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::directory::PlayerDirectoryCache;
use crate::error::{CoreError, Entity};
use crate::lineup::RosterSlots;
use crate::names::NameMatcher;
use crate::picks::{self, DraftPick};
use crate::provider::{
    LeagueDataProvider, LeagueMeta, PlayerDirectory, RawRoster, RosterId, RosterSettings,
    TradeRecord,
};
use crate::valuation::{ValuationCache, ValuationPass, ValuationRecord};

/// Team abbreviation used for players without an NFL team.
pub const FREE_AGENT_TEAM: &str = "FA";

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Position bucket. Anything outside the four skill positions lands in `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Bucket {
    QB,
    RB,
    WR,
    TE,
    Other,
}

impl Bucket {
    pub const ALL: [Bucket; 5] = [Bucket::QB, Bucket::RB, Bucket::WR, Bucket::TE, Bucket::Other];

    pub fn for_position(position: Option<&str>) -> Self {
        match position.map(str::trim) {
            Some(p) if p.eq_ignore_ascii_case("QB") => Bucket::QB,
            Some(p) if p.eq_ignore_ascii_case("RB") => Bucket::RB,
            Some(p) if p.eq_ignore_ascii_case("WR") => Bucket::WR,
            Some(p) if p.eq_ignore_ascii_case("TE") => Bucket::TE,
            _ => Bucket::Other,
        }
    }

    pub fn display_str(self) -> &'static str {
        match self {
            Bucket::QB => "QB",
            Bucket::RB => "RB",
            Bucket::WR => "WR",
            Bucket::TE => "TE",
            Bucket::Other => "OTHER",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_str())
    }
}

/// A rostered player with directory details and the valuation join applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedPlayer {
    pub player_id: String,
    pub name: Option<String>,
    pub position: Option<String>,
    pub team: String,
    pub status: Option<String>,
    pub birth_date: Option<String>,
    pub headshot: Option<String>,
    /// None for free agents.
    pub team_logo: Option<String>,
    /// 0 when no valuation matched.
    pub value: u32,
    pub positional_rank: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionGroup {
    pub players: Vec<EnrichedPlayer>,
    pub total_value: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub wins: Option<u32>,
    pub losses: Option<u32>,
    pub ties: Option<u32>,
    pub points_for: Option<u32>,
    pub points_against: Option<u32>,
}

impl From<&RosterSettings> for TeamRecord {
    fn from(s: &RosterSettings) -> Self {
        Self {
            wins: s.wins,
            losses: s.losses,
            ties: s.ties,
            points_for: s.fpts,
            points_against: s.fpts_against,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSnapshot {
    pub team_id: RosterId,
    pub owner_id: Option<String>,
    /// All resolved players, value descending.
    pub players: Vec<EnrichedPlayer>,
    pub positions: BTreeMap<Bucket, PositionGroup>,
    pub total_value: u64,
    pub picks: Vec<DraftPick>,
    pub starters: Vec<String>,
    pub reserve: Vec<String>,
    pub taxi: Vec<String>,
    pub record: TeamRecord,
}

impl TeamSnapshot {
    pub fn bucket(&self, bucket: Bucket) -> Option<&PositionGroup> {
        self.positions.get(&bucket)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueInfo {
    pub league_id: String,
    pub name: String,
    pub season: i32,
    pub total_rosters: u32,
    pub draft_rounds: u32,
    pub avatar: Option<String>,
    pub roster_slots: RosterSlots,
}

impl From<&LeagueMeta> for LeagueInfo {
    fn from(meta: &LeagueMeta) -> Self {
        Self {
            league_id: meta.league_id.clone(),
            name: meta.name.clone(),
            season: meta.season,
            total_rosters: meta.total_rosters,
            draft_rounds: meta.settings.draft_rounds,
            avatar: meta.avatar.clone(),
            roster_slots: RosterSlots::from_league(&meta.roster_positions, &meta.settings),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueSnapshot {
    pub league: LeagueInfo,
    pub teams: BTreeMap<RosterId, TeamSnapshot>,
    pub generated_at: DateTime<Utc>,
    /// Generation time of the valuation data joined in; None when the last
    /// valuation pass came back empty.
    pub valuations_fetched_at: Option<DateTime<Utc>>,
}

impl LeagueSnapshot {
    pub fn team_for_owner(&self, owner_id: &str) -> Option<&TeamSnapshot> {
        self.teams
            .values()
            .find(|t| t.owner_id.as_deref() == Some(owner_id))
    }
}

// ---------------------------------------------------------------------------
// Pure assembly
// ---------------------------------------------------------------------------

const TEAM_LOGO_BASE: &str = "https://a.espncdn.com/i/teamlogos/nfl/500";

/// Logo URL for an NFL team abbreviation; free agents have none.
pub fn team_logo(team: &str) -> Option<String> {
    if team.is_empty() || team == FREE_AGENT_TEAM {
        return None;
    }
    Some(format!("{TEAM_LOGO_BASE}/{}.png", team.to_ascii_lowercase()))
}

/// Inputs to one snapshot build, already fetched.
pub struct SnapshotInputs<'a> {
    pub league: &'a LeagueMeta,
    pub rosters: &'a [RawRoster],
    pub traded: &'a [TradeRecord],
    pub directory: &'a PlayerDirectory,
    pub valuations: &'a [ValuationRecord],
}

/// Lookup from match key to valuation. Later records overwrite earlier ones
/// with the same key; records whose key is empty are never indexed.
pub fn index_valuations<'a>(
    records: &'a [ValuationRecord],
    matcher: &dyn NameMatcher,
) -> HashMap<String, &'a ValuationRecord> {
    let mut index = HashMap::with_capacity(records.len());
    for record in records {
        let key = matcher.key(&record.name);
        if key.is_empty() {
            continue;
        }
        if let Some(previous) = index.insert(key, record) {
            debug!(
                kept = %record.name,
                dropped = %previous.name,
                "valuation key collision"
            );
        }
    }
    index
}

pub fn assemble(
    inputs: SnapshotInputs<'_>,
    matcher: &dyn NameMatcher,
    generated_at: DateTime<Utc>,
    valuations_fetched_at: Option<DateTime<Utc>>,
) -> LeagueSnapshot {
    let index = index_valuations(inputs.valuations, matcher);
    let mut ledger = picks::build_picks(inputs.league, inputs.rosters, inputs.traded);

    let teams = inputs
        .rosters
        .iter()
        .map(|roster| {
            let team_picks = ledger.remove(&roster.roster_id).unwrap_or_default();
            let team = assemble_team(roster, inputs.directory, &index, matcher, team_picks);
            (roster.roster_id, team)
        })
        .collect();

    LeagueSnapshot {
        league: LeagueInfo::from(inputs.league),
        teams,
        generated_at,
        valuations_fetched_at,
    }
}

fn assemble_team(
    roster: &RawRoster,
    directory: &PlayerDirectory,
    index: &HashMap<String, &ValuationRecord>,
    matcher: &dyn NameMatcher,
    picks: Vec<DraftPick>,
) -> TeamSnapshot {
    let mut players: Vec<EnrichedPlayer> = Vec::with_capacity(roster.players.len());
    for player_id in &roster.players {
        let Some(entry) = directory.get(player_id) else {
            debug!(roster_id = roster.roster_id, %player_id, "player not in directory");
            continue;
        };
        let key = matcher.key_opt(entry.full_name.as_deref());
        let matched = if key.is_empty() { None } else { index.get(&key).copied() };
        if matched.is_none() {
            debug!(%player_id, name = ?entry.full_name, "no valuation match");
        }
        let team = entry
            .team
            .clone()
            .unwrap_or_else(|| FREE_AGENT_TEAM.to_string());
        players.push(EnrichedPlayer {
            player_id: player_id.clone(),
            name: entry.full_name.clone(),
            position: entry.position.clone(),
            team_logo: team_logo(&team),
            team,
            status: entry.status.clone(),
            birth_date: entry.birth_date.clone(),
            headshot: entry.headshot.clone(),
            value: matched.map_or(0, |v| v.value),
            positional_rank: matched.map(|v| v.positional_rank),
        });
    }

    // Stable: equal values keep roster order.
    players.sort_by(|a, b| b.value.cmp(&a.value));

    let mut positions: BTreeMap<Bucket, PositionGroup> = Bucket::ALL
        .iter()
        .map(|b| (*b, PositionGroup::default()))
        .collect();
    for player in &players {
        let group = positions
            .entry(Bucket::for_position(player.position.as_deref()))
            .or_default();
        group.total_value += u64::from(player.value);
        group.players.push(player.clone());
    }
    let total_value = positions.values().map(|g| g.total_value).sum();

    TeamSnapshot {
        team_id: roster.roster_id,
        owner_id: roster.owner_id.clone(),
        players,
        positions,
        total_value,
        picks,
        starters: roster.starters.clone(),
        reserve: roster.reserve.clone(),
        taxi: roster.taxi.clone(),
        record: TeamRecord::from(&roster.settings),
    }
}

// ---------------------------------------------------------------------------
// Assembler
// ---------------------------------------------------------------------------

pub struct SnapshotAssembler {
    provider: Arc<dyn LeagueDataProvider>,
    valuations: Arc<ValuationCache>,
    directory: Arc<PlayerDirectoryCache>,
    matcher: Arc<dyn NameMatcher>,
    clock: Arc<dyn Clock>,
    build_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SnapshotAssembler {
    pub fn new(
        provider: Arc<dyn LeagueDataProvider>,
        valuations: Arc<ValuationCache>,
        directory: Arc<PlayerDirectoryCache>,
        matcher: Arc<dyn NameMatcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            provider,
            valuations,
            directory,
            matcher,
            clock,
            build_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn build_lock(&self, league_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.build_locks.lock().await;
        locks
            .entry(league_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the league's lock entry once no other build holds or awaits it.
    async fn release_build_lock(&self, league_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.build_locks.lock().await;
        // Clones are only taken under the map lock: ours plus the map's.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(league_id);
        }
    }

    /// Leagues with a build in progress or waiting.
    pub async fn active_builds(&self) -> usize {
        self.build_locks.lock().await.len()
    }

    /// Fetch everything a league needs and assemble it.
    ///
    /// Fails with `NotFound` when the league id does not resolve. Any
    /// collaborator failure aborts the build; nothing partial is returned.
    pub async fn build_snapshot(&self, league_id: &str) -> Result<LeagueSnapshot, CoreError> {
        let lock = self.build_lock(league_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.build_locked(league_id).await
        };
        self.release_build_lock(league_id, lock).await;
        result
    }

    async fn build_locked(&self, league_id: &str) -> Result<LeagueSnapshot, CoreError> {
        let league = self
            .provider
            .get_league(league_id)
            .await?
            .ok_or_else(|| CoreError::not_found(Entity::League, league_id))?;

        let (rosters, traded, directory, pass) = tokio::try_join!(
            self.provider.get_rosters(league_id),
            self.provider.get_traded_picks(league_id),
            self.directory.get(),
            self.valuations.get_pass(),
        )?;
        let ValuationPass {
            records: valuations,
            fetched_at: pass_fetched_at,
        } = pass;

        let snapshot = assemble(
            SnapshotInputs {
                league: &league,
                rosters: &rosters,
                traded: &traded,
                directory: &directory,
                valuations: &valuations,
            },
            self.matcher.as_ref(),
            self.clock.now(),
            pass_fetched_at,
        );
        info!(
            league_id,
            teams = snapshot.teams.len(),
            valuations = valuations.len(),
            "snapshot built"
        );
        Ok(snapshot)
    }
}
