// Roster slot configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::provider::LeagueSettings;

pub const BENCH_SLOT: &str = "BN";
pub const IR_SLOT: &str = "IR";
pub const TAXI_SLOT: &str = "TAXI";

/// Slot label -> count, e.g. `{"QB": 1, "SUPER_FLEX": 1, "BN": 12, "IR": 3}`.
///
/// Starter and bench counts come from the league's slot list; IR and taxi
/// counts come from league settings and are only present when non-zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RosterSlots(BTreeMap<String, u32>);

impl RosterSlots {
    pub fn from_league(roster_positions: &[String], settings: &LeagueSettings) -> Self {
        let mut slots: BTreeMap<String, u32> = BTreeMap::new();
        for slot in roster_positions {
            *slots.entry(slot.clone()).or_insert(0) += 1;
        }
        if settings.reserve_slots > 0 {
            slots.insert(IR_SLOT.to_string(), settings.reserve_slots);
        }
        if settings.taxi_slots > 0 {
            slots.insert(TAXI_SLOT.to_string(), settings.taxi_slots);
        }
        RosterSlots(slots)
    }

    pub fn get(&self, slot: &str) -> Option<u32> {
        self.0.get(slot).copied()
    }

    /// Number of starting slots (everything except bench, IR and taxi).
    pub fn starters(&self) -> u32 {
        self.0
            .iter()
            .filter(|(slot, _)| !matches!(slot.as_str(), BENCH_SLOT | IR_SLOT | TAXI_SLOT))
            .map(|(_, n)| n)
            .sum()
    }

    pub fn bench(&self) -> u32 {
        self.get(BENCH_SLOT).unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
