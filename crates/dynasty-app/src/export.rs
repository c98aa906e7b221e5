// CSV export of a league snapshot: one row per rostered player and one row
// per owned pick.

use std::io;

use serde::Serialize;

use dynasty_core::picks::{DraftPick, PickOrigin};
use dynasty_core::provider::RosterId;
use dynasty_core::snapshot::{Bucket, EnrichedPlayer, LeagueSnapshot, TeamSnapshot};

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    league_id: &'a str,
    team_id: RosterId,
    owner_id: Option<&'a str>,
    kind: &'static str,
    player_id: Option<&'a str>,
    name: Option<&'a str>,
    position: Option<&'a str>,
    bucket: Option<Bucket>,
    team: Option<&'a str>,
    value: Option<u32>,
    positional_rank: Option<u32>,
    season: Option<i32>,
    round: Option<u32>,
    original_owner: Option<RosterId>,
    previous_owner: Option<RosterId>,
    origin: Option<PickOrigin>,
}

impl<'a> ExportRow<'a> {
    fn base(league_id: &'a str, team: &'a TeamSnapshot, kind: &'static str) -> Self {
        Self {
            league_id,
            team_id: team.team_id,
            owner_id: team.owner_id.as_deref(),
            kind,
            player_id: None,
            name: None,
            position: None,
            bucket: None,
            team: None,
            value: None,
            positional_rank: None,
            season: None,
            round: None,
            original_owner: None,
            previous_owner: None,
            origin: None,
        }
    }

    fn player(league_id: &'a str, team: &'a TeamSnapshot, p: &'a EnrichedPlayer) -> Self {
        Self {
            player_id: Some(p.player_id.as_str()),
            name: p.name.as_deref(),
            position: p.position.as_deref(),
            bucket: Some(Bucket::for_position(p.position.as_deref())),
            team: Some(p.team.as_str()),
            value: Some(p.value),
            positional_rank: p.positional_rank,
            ..Self::base(league_id, team, "player")
        }
    }

    fn pick(league_id: &'a str, team: &'a TeamSnapshot, pick: &DraftPick) -> Self {
        Self {
            season: Some(pick.season),
            round: Some(pick.round),
            original_owner: Some(pick.original_owner),
            previous_owner: pick.previous_owner,
            origin: Some(pick.origin),
            ..Self::base(league_id, team, "pick")
        }
    }
}

/// Write `snapshot` as CSV. Returns the number of data rows written.
pub fn write_snapshot_csv<W: io::Write>(
    snapshot: &LeagueSnapshot,
    writer: W,
) -> Result<usize, csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    let league_id = snapshot.league.league_id.as_str();
    let mut rows = 0;

    for team in snapshot.teams.values() {
        for player in &team.players {
            wtr.serialize(ExportRow::player(league_id, team, player))?;
            rows += 1;
        }
        for pick in &team.picks {
            wtr.serialize(ExportRow::pick(league_id, team, pick))?;
            rows += 1;
        }
    }

    wtr.flush()?;
    Ok(rows)
}
