// Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dynasty_core::valuation::Position;

#[derive(Debug, Parser)]
#[command(name = "dynasty")]
#[command(about = "Dynasty fantasy football rosters enriched with trade values")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// List a user's dynasty leagues, grouped by name
    Leagues {
        /// Sleeper username
        username: String,
    },

    /// Build a full league snapshot
    Snapshot {
        league_id: String,
        /// Write the snapshot as CSV to this path instead of printing JSON
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Show the team a user owns in a league
    Roster { username: String, league_id: String },

    /// Show ranked player values
    Values {
        /// Only this position (QB, RB, WR, TE)
        #[arg(short, long, value_parser = parse_position)]
        position: Option<Position>,
        /// Maximum number of rows
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

fn parse_position(s: &str) -> Result<Position, String> {
    Position::from_str_pos(s).ok_or_else(|| format!("unknown position `{s}`; expected QB, RB, WR or TE"))
}
