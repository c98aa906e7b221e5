// Draft pick ledger: the default pick allocation for every team, with traded
// picks moved to their current owners.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::provider::{LeagueMeta, RawRoster, RosterId, TradeRecord};

/// (season, round, original owner): unique per ledger, never mutated.
pub type PickKey = (i32, u32, RosterId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickOrigin {
    Generated,
    Traded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftPick {
    pub season: i32,
    pub round: u32,
    pub original_owner: RosterId,
    pub current_owner: RosterId,
    /// Team that held the pick before the last applied trade.
    pub previous_owner: Option<RosterId>,
    pub origin: PickOrigin,
}

impl DraftPick {
    fn generated(season: i32, round: u32, owner: RosterId) -> Self {
        Self {
            season,
            round,
            original_owner: owner,
            current_owner: owner,
            previous_owner: None,
            origin: PickOrigin::Generated,
        }
    }

    pub fn key(&self) -> PickKey {
        (self.season, self.round, self.original_owner)
    }
}

/// Seasons with picks in play: every traded season plus the league's next draft.
pub fn pick_seasons(league_season: i32, traded: &[TradeRecord]) -> BTreeSet<i32> {
    let mut seasons: BTreeSet<i32> = traded.iter().map(|t| t.season).collect();
    seasons.insert(league_season + 1);
    seasons
}

/// Build every team's current picks for a league.
///
/// Trades apply in input order, so a later trade of the same pick wins.
/// Callers must pass trades chronologically.
pub fn build_picks(
    league: &LeagueMeta,
    rosters: &[RawRoster],
    traded: &[TradeRecord],
) -> BTreeMap<RosterId, Vec<DraftPick>> {
    let seasons = pick_seasons(league.season, traded);
    build_picks_for_seasons(&seasons, league.settings.draft_rounds, rosters, traded)
}

/// Ledger construction over an explicit season scope. Trades that reference a
/// pick outside the generated scope are ignored.
pub fn build_picks_for_seasons(
    seasons: &BTreeSet<i32>,
    draft_rounds: u32,
    rosters: &[RawRoster],
    traded: &[TradeRecord],
) -> BTreeMap<RosterId, Vec<DraftPick>> {
    let mut picks = Vec::with_capacity(seasons.len() * rosters.len() * draft_rounds as usize);
    for &season in seasons {
        for roster in rosters {
            for round in 1..=draft_rounds {
                picks.push(DraftPick::generated(season, round, roster.roster_id));
            }
        }
    }

    let index: HashMap<PickKey, usize> = picks
        .iter()
        .enumerate()
        .map(|(i, p)| (p.key(), i))
        .collect();

    for trade in traded {
        let key = (trade.season, trade.round, trade.from_team);
        let Some(&idx) = index.get(&key) else {
            debug!(
                season = trade.season,
                round = trade.round,
                from_team = trade.from_team,
                "traded pick outside generated scope, ignoring"
            );
            continue;
        };
        let pick = &mut picks[idx];
        pick.current_owner = trade.to_team;
        pick.previous_owner = Some(trade.previous_owner.unwrap_or(trade.from_team));
        pick.origin = PickOrigin::Traded;
    }

    let known: HashSet<RosterId> = rosters.iter().map(|r| r.roster_id).collect();
    let mut by_owner: BTreeMap<RosterId, Vec<DraftPick>> =
        known.iter().map(|&id| (id, Vec::new())).collect();

    for pick in picks {
        if !known.contains(&pick.current_owner) {
            debug!(
                season = pick.season,
                round = pick.round,
                current_owner = pick.current_owner,
                "pick owner is not a team in this league, dropping"
            );
            continue;
        }
        by_owner.entry(pick.current_owner).or_default().push(pick);
    }

    by_owner
}
