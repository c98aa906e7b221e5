// End-to-end tests of the Analyzer against in-memory collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};

use dynasty_core::analyzer::AnalyzerOptions;
use dynasty_core::clock::{Clock, ManualClock};
use dynasty_core::config::AnalyzerConfig;
use dynasty_core::error::Entity;
use dynasty_core::picks::PickOrigin;
use dynasty_core::provider::{
    LeagueDataProvider, LeagueMeta, LeagueSettings, PlayerDirectory, PlayerRecord, RawRoster,
    RawValuation, RosterSettings, TradeRecord, UserRecord, ValuationProvider,
};
use dynasty_core::retry::RetryPolicy;
use dynasty_core::snapshot::Bucket;
use dynasty_core::valuation::Position;
use dynasty_core::{Analyzer, CoreError, UpstreamError};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeLeagueData {
    users: HashMap<String, UserRecord>,
    user_leagues: HashMap<(String, i32), Vec<LeagueMeta>>,
    leagues: HashMap<String, LeagueMeta>,
    rosters: Vec<RawRoster>,
    traded: Vec<TradeRecord>,
    players: PlayerDirectory,
    /// Roster fetches that fail before one succeeds.
    roster_failures: AtomicU32,
    roster_failure_status: u16,
    league_calls: AtomicU32,
    roster_calls: AtomicU32,
    player_calls: AtomicU32,
    user_league_calls: AtomicU32,
}

#[async_trait]
impl LeagueDataProvider for FakeLeagueData {
    async fn get_user(&self, username: &str) -> Result<Option<UserRecord>, UpstreamError> {
        Ok(self.users.get(username).cloned())
    }

    async fn get_user_leagues(
        &self,
        user_id: &str,
        season: i32,
    ) -> Result<Vec<LeagueMeta>, UpstreamError> {
        self.user_league_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .user_leagues
            .get(&(user_id.to_string(), season))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_league(&self, league_id: &str) -> Result<Option<LeagueMeta>, UpstreamError> {
        self.league_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.leagues.get(league_id).cloned())
    }

    async fn get_rosters(&self, _league_id: &str) -> Result<Vec<RawRoster>, UpstreamError> {
        self.roster_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.roster_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.roster_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(UpstreamError::status("get_rosters", self.roster_failure_status));
        }
        Ok(self.rosters.clone())
    }

    async fn get_traded_picks(&self, _league_id: &str) -> Result<Vec<TradeRecord>, UpstreamError> {
        Ok(self.traded.clone())
    }

    async fn get_players(&self) -> Result<PlayerDirectory, UpstreamError> {
        self.player_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.players.clone())
    }
}

struct FakeValuations {
    rows: Vec<RawValuation>,
    calls: AtomicU32,
}

#[async_trait]
impl ValuationProvider for FakeValuations {
    async fn scrape_values(&self) -> Result<Vec<RawValuation>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.clone())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn league(id: &str, name: &str, season: i32) -> LeagueMeta {
    LeagueMeta {
        league_id: id.into(),
        name: name.into(),
        season,
        total_rosters: 2,
        avatar: Some(format!("avatar-{id}")),
        roster_positions: ["QB", "RB", "WR", "TE", "SUPER_FLEX", "BN", "BN"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        settings: LeagueSettings {
            draft_rounds: 3,
            reserve_slots: 2,
            taxi_slots: 0,
            league_type: Some(2),
        },
    }
}

fn player(id: &str, name: &str, position: &str, team: Option<&str>) -> (String, PlayerRecord) {
    (
        id.to_string(),
        PlayerRecord {
            player_id: id.into(),
            full_name: Some(name.into()),
            position: Some(position.into()),
            team: team.map(String::from),
            ..Default::default()
        },
    )
}

fn raw(name: &str, position: Position, value: u32) -> RawValuation {
    RawValuation {
        name: name.into(),
        position,
        value,
    }
}

fn fake_league_data() -> FakeLeagueData {
    let mut fake = FakeLeagueData {
        roster_failure_status: 503,
        ..Default::default()
    };
    fake.users.insert(
        "alice".into(),
        UserRecord {
            user_id: "u-alice".into(),
            username: Some("alice".into()),
            display_name: Some("Alice".into()),
        },
    );
    fake.users.insert(
        "carol".into(),
        UserRecord {
            user_id: "u-carol".into(),
            username: Some("carol".into()),
            display_name: None,
        },
    );
    fake.leagues.insert("L24".into(), league("L24", "Dynasty Bros", 2024));
    for (season, id) in [(2022, "L22"), (2023, "L23"), (2024, "L24")] {
        let mut leagues = vec![league(id, "Dynasty Bros", season)];
        if season == 2024 {
            let mut redraft = league("R24", "Office Redraft", season);
            redraft.settings.league_type = Some(0);
            leagues.push(redraft);
        }
        fake.user_leagues.insert(("u-alice".into(), season), leagues);
    }
    fake.rosters = vec![
        RawRoster {
            roster_id: 1,
            owner_id: Some("u-alice".into()),
            players: vec!["p1".into(), "p2".into(), "gone".into(), "p3".into()],
            starters: vec!["p1".into()],
            settings: RosterSettings {
                wins: Some(10),
                losses: Some(4),
                ties: Some(0),
                fpts: Some(1712),
                fpts_against: Some(1498),
            },
            ..Default::default()
        },
        RawRoster {
            roster_id: 2,
            owner_id: Some("u-bob".into()),
            players: vec!["p4".into(), "p5".into()],
            ..Default::default()
        },
    ];
    fake.traded = vec![
        TradeRecord {
            season: 2025,
            round: 1,
            from_team: 1,
            to_team: 2,
            previous_owner: None,
        },
        TradeRecord {
            season: 2030,
            round: 1,
            from_team: 2,
            to_team: 1,
            previous_owner: None,
        },
    ];
    fake.players = [
        player("p1", "Josh Allen", "QB", Some("BUF")),
        player("p2", "Chig Okonkwo", "TE", Some("TEN")),
        player("p3", "Practice Squad Guy", "WR", None),
        player("p4", "Ja'Marr Chase", "WR", Some("CIN")),
        player("p5", "Harrison Butker", "K", Some("KC")),
    ]
    .into_iter()
    .collect();
    fake
}

fn fake_valuations() -> FakeValuations {
    FakeValuations {
        rows: vec![
            raw("Josh Allen", Position::QB, 9800),
            raw("Lamar Jackson", Position::QB, 9100),
            raw("Chigoziem Okonkwo", Position::TE, 2400),
            raw("Ja'Marr Chase", Position::WR, 9900),
        ],
        calls: AtomicU32::new(0),
    }
}

struct Harness {
    analyzer: Analyzer,
    league_data: Arc<FakeLeagueData>,
    valuations: Arc<FakeValuations>,
    clock: Arc<ManualClock>,
}

fn harness_with(league_data: FakeLeagueData, options: AnalyzerOptions) -> Harness {
    let league_data = Arc::new(league_data);
    let valuations = Arc::new(fake_valuations());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 11, 1, 12, 0, 0).unwrap(),
    ));
    let analyzer = Analyzer::new(
        Arc::clone(&league_data),
        Arc::clone(&valuations),
        Arc::clone(&clock) as Arc<dyn Clock>,
        options,
    );
    Harness {
        analyzer,
        league_data,
        valuations,
        clock,
    }
}

fn options() -> AnalyzerOptions {
    AnalyzerOptions {
        retry: RetryPolicy::none(),
        first_season: 2022,
        ..AnalyzerOptions::default()
    }
}

fn harness() -> Harness {
    harness_with(fake_league_data(), options())
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[tokio::test]
async fn snapshot_joins_rosters_values_and_picks() {
    let h = harness();
    let snap = h.analyzer.build_snapshot("L24").await.unwrap();

    assert_eq!(snap.league.name, "Dynasty Bros");
    assert_eq!(snap.league.roster_slots.starters(), 5);
    assert_eq!(snap.league.roster_slots.get("BN"), Some(2));
    assert_eq!(snap.league.roster_slots.get("IR"), Some(2));
    assert_eq!(snap.league.roster_slots.get("TAXI"), None);
    assert_eq!(snap.generated_at, h.clock.now());
    assert_eq!(snap.valuations_fetched_at, Some(h.clock.now()));

    let alice = &snap.teams[&1];
    assert_eq!(alice.players.len(), 3, "missing directory entry is skipped");
    assert_eq!(alice.players[0].name.as_deref(), Some("Josh Allen"));
    assert_eq!(alice.players[0].positional_rank, Some(1));
    let te = alice.bucket(Bucket::TE).unwrap();
    assert_eq!(te.players[0].value, 2400, "alias joins the short name");
    let wr = alice.bucket(Bucket::WR).unwrap();
    assert_eq!(wr.players[0].value, 0);
    assert_eq!(wr.players[0].positional_rank, None);
    assert_eq!(wr.players[0].team, "FA");
    assert_eq!(alice.total_value, 9800 + 2400);
    assert_eq!(alice.record.wins, Some(10));
    assert_eq!(alice.record.points_for, Some(1712));

    let bob = &snap.teams[&2];
    assert_eq!(bob.bucket(Bucket::Other).unwrap().players.len(), 1);
    assert_eq!(bob.bucket(Bucket::WR).unwrap().total_value, 9900);
}

#[tokio::test]
async fn snapshot_pick_ledger() {
    let h = harness();
    let snap = h.analyzer.build_snapshot("L24").await.unwrap();

    let all: Vec<_> = snap.teams.values().flat_map(|t| t.picks.iter()).collect();
    // The 2030 trade widens the season scope: two seasons of three rounds.
    assert_eq!(all.len(), 2 * 3 * 2);

    let moved = snap.teams[&2]
        .picks
        .iter()
        .find(|p| p.season == 2025 && p.round == 1 && p.original_owner == 1)
        .unwrap();
    assert_eq!(moved.current_owner, 2);
    assert_eq!(moved.previous_owner, Some(1));
    assert_eq!(moved.origin, PickOrigin::Traded);
    assert!(snap.teams[&1]
        .picks
        .iter()
        .all(|p| p.current_owner == 1));
}

#[tokio::test]
async fn unknown_league_is_not_found() {
    let h = harness();
    let err = h.analyzer.build_snapshot("nope").await.unwrap_err();
    match err {
        CoreError::NotFound { entity, id } => {
            assert_eq!(entity, Entity::League);
            assert_eq!(id, "nope");
        }
        other => panic!("expected NotFound, got {other}"),
    }
}

#[tokio::test]
async fn upstream_failure_aborts_build_without_poisoning_caches() {
    let mut fake = fake_league_data();
    fake.roster_failures = AtomicU32::new(1);
    fake.roster_failure_status = 400;
    let h = harness_with(fake, options());

    let err = h.analyzer.build_snapshot("L24").await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::Upstream(UpstreamError::Status { status: 400, .. })
    ));

    let snap = h.analyzer.build_snapshot("L24").await.unwrap();
    assert_eq!(snap.teams.len(), 2);
    assert_eq!(h.league_data.roster_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried() {
    let mut fake = fake_league_data();
    fake.roster_failures = AtomicU32::new(2);
    let opts = AnalyzerOptions {
        retry: RetryPolicy::default(),
        ..options()
    };
    let h = harness_with(fake, opts);

    let snap = h.analyzer.build_snapshot("L24").await.unwrap();
    assert_eq!(snap.teams.len(), 2);
    assert_eq!(h.league_data.roster_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn caches_are_reused_until_expiry() {
    let h = harness();
    h.analyzer.build_snapshot("L24").await.unwrap();
    h.analyzer.build_snapshot("L24").await.unwrap();
    assert_eq!(h.valuations.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.league_data.player_calls.load(Ordering::SeqCst), 1);

    h.clock.advance(Duration::hours(13));
    h.analyzer.build_snapshot("L24").await.unwrap();
    assert_eq!(h.valuations.calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.league_data.player_calls.load(Ordering::SeqCst), 1);

    h.clock.advance(Duration::hours(12));
    h.analyzer.build_snapshot("L24").await.unwrap();
    assert_eq!(h.league_data.player_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn concurrent_builds_share_cold_caches() {
    let h = harness();
    let (a, b) = tokio::join!(
        h.analyzer.build_snapshot("L24"),
        h.analyzer.build_snapshot("L24")
    );
    assert_eq!(a.unwrap().teams, b.unwrap().teams);
    assert_eq!(h.valuations.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.league_data.player_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn get_values_ranks_by_position() {
    let h = harness();
    let values = h.analyzer.get_values().await.unwrap();
    let lamar = values.iter().find(|v| v.name == "Lamar Jackson").unwrap();
    assert_eq!(lamar.positional_rank, 2);
    let chase = values.iter().find(|v| v.name == "Ja'Marr Chase").unwrap();
    assert_eq!(chase.positional_rank, 1);
}

// ---------------------------------------------------------------------------
// Users and leagues
// ---------------------------------------------------------------------------

#[tokio::test]
async fn user_leagues_grouped_newest_first() {
    let h = harness();
    let leagues = h.analyzer.user_leagues("alice").await.unwrap();

    assert_eq!(leagues.len(), 1, "redraft league is filtered out");
    let seasons: Vec<i32> = leagues["Dynasty Bros"].iter().map(|e| e.season).collect();
    assert_eq!(seasons, vec![2024, 2023, 2022]);
    assert_eq!(leagues["Dynasty Bros"][0].league_id, "L24");
    assert_eq!(leagues["Dynasty Bros"][0].avatar.as_deref(), Some("avatar-L24"));

    // 2022..=2024 from the clock's year.
    assert_eq!(h.league_data.user_league_calls.load(Ordering::SeqCst), 3);
    h.analyzer.get_all_user_leagues("u-alice").await.unwrap();
    assert_eq!(h.league_data.user_league_calls.load(Ordering::SeqCst), 3);

    h.clock.advance(Duration::hours(2));
    h.analyzer.get_all_user_leagues("u-alice").await.unwrap();
    assert_eq!(h.league_data.user_league_calls.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn unknown_user_is_not_found() {
    let h = harness();
    let err = h.analyzer.user_leagues("nobody").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(err, CoreError::NotFound { entity: Entity::User, .. }));
}

#[tokio::test]
async fn team_for_user_finds_owned_roster() {
    let h = harness();
    let team = h.analyzer.team_for_user("alice", "L24").await.unwrap();
    assert_eq!(team.team_id, 1);
    assert_eq!(team.owner_id.as_deref(), Some("u-alice"));

    let err = h.analyzer.team_for_user("carol", "L24").await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { entity: Entity::Roster, .. }));
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const ANALYZER_TOML: &str = r#"
[cache]
valuation_ttl_hours = 1
player_directory_ttl_hours = 24
league_ttl_hours = 1

[retry]
max_attempts = 1
initial_backoff_ms = 10
max_backoff_ms = 10
multiplier = 1.0

[leagues]
first_season = 2024
"#;

#[tokio::test]
async fn configured_alias_and_ttl_reach_the_analyzer() {
    let config: AnalyzerConfig = toml::from_str(ANALYZER_TOML).unwrap();
    let aliases = HashMap::from([("Practice Squad Guy".to_string(), "Lamar Jackson".to_string())]);
    let h = harness_with(
        fake_league_data(),
        AnalyzerOptions::from_config(&config, &aliases),
    );

    let snap = h.analyzer.build_snapshot("L24").await.unwrap();
    let wr = snap.teams[&1].bucket(Bucket::WR).unwrap();
    assert_eq!(wr.players[0].name.as_deref(), Some("Practice Squad Guy"));
    assert_eq!(wr.players[0].value, 9100, "configured alias joins the name");
    let te = snap.teams[&1].bucket(Bucket::TE).unwrap();
    assert_eq!(te.players[0].value, 2400, "built-in aliases are kept");

    // A one-hour valuation window instead of the twelve-hour default.
    h.clock.advance(Duration::minutes(90));
    h.analyzer.build_snapshot("L24").await.unwrap();
    assert_eq!(h.valuations.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn without_alias_the_name_stays_unmatched() {
    let h = harness();
    let snap = h.analyzer.build_snapshot("L24").await.unwrap();
    let wr = snap.teams[&1].bucket(Bucket::WR).unwrap();
    assert_eq!(wr.players[0].value, 0);
}
