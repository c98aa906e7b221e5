// Positional ranking of one valuation pass.

use std::collections::{HashMap, HashSet};

use super::{Position, ValuationRecord};
use crate::provider::RawValuation;

/// Rank raw rows within their position by value, highest first.
///
/// Ties keep source order. The output keeps source order too; only the
/// `positional_rank` field reflects the sort. Repeated (name, position) rows
/// keep their first occurrence.
pub fn rank_by_position(raw: Vec<RawValuation>) -> Vec<ValuationRecord> {
    let mut seen: HashSet<(String, Position)> = HashSet::new();
    let rows: Vec<RawValuation> = raw
        .into_iter()
        .filter(|r| seen.insert((r.name.clone(), r.position)))
        .collect();

    let mut groups: HashMap<Position, Vec<usize>> = HashMap::new();
    for (idx, row) in rows.iter().enumerate() {
        groups.entry(row.position).or_default().push(idx);
    }

    let mut ranks = vec![0u32; rows.len()];
    for indices in groups.values_mut() {
        // sort_by is stable, so equal values stay in source order.
        indices.sort_by(|&a, &b| rows[b].value.cmp(&rows[a].value));
        for (rank, &idx) in indices.iter().enumerate() {
            ranks[idx] = rank as u32 + 1;
        }
    }

    rows.into_iter()
        .zip(ranks)
        .map(|(row, positional_rank)| ValuationRecord {
            name: row.name,
            position: row.position,
            value: row.value,
            positional_rank,
        })
        .collect()
}
