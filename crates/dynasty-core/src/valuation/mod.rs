// Dynasty valuations: positions, ranked records, and the refresh cache.

pub mod cache;
pub mod rank;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use cache::{ValuationCache, ValuationPass};
pub use rank::rank_by_position;

/// Positions the rankings site values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    QB,
    RB,
    WR,
    TE,
}

impl Position {
    pub const ALL: [Position; 4] = [Position::QB, Position::RB, Position::WR, Position::TE];

    /// Parse a position abbreviation, case-insensitively.
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "QB" => Some(Position::QB),
            "RB" => Some(Position::RB),
            "WR" => Some(Position::WR),
            "TE" => Some(Position::TE),
            _ => None,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            Position::QB => "QB",
            Position::RB => "RB",
            Position::WR => "WR",
            Position::TE => "TE",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_str())
    }
}

/// A ranked valuation. `positional_rank` is only meaningful within the pass
/// that produced it; a refresh recomputes every rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationRecord {
    pub name: String,
    pub position: Position,
    pub value: u32,
    pub positional_rank: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_str_pos_accepts_known_positions() {
        assert_eq!(Position::from_str_pos("QB"), Some(Position::QB));
        assert_eq!(Position::from_str_pos("rb"), Some(Position::RB));
        assert_eq!(Position::from_str_pos(" Wr "), Some(Position::WR));
        assert_eq!(Position::from_str_pos("TE"), Some(Position::TE));
    }

    #[test]
    fn from_str_pos_rejects_others() {
        assert_eq!(Position::from_str_pos("K"), None);
        assert_eq!(Position::from_str_pos("DEF"), None);
        assert_eq!(Position::from_str_pos(""), None);
    }

    #[test]
    fn display_roundtrip() {
        for pos in Position::ALL {
            assert_eq!(Position::from_str_pos(pos.display_str()), Some(pos));
        }
    }
}
