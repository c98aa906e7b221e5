// Command execution. Output goes to the given writer as pretty JSON; lookups
// that fail to resolve print a structured not-found object instead.

use std::io::Write;

use anyhow::Context;
use serde::Serialize;
use serde_json::json;
use tracing::info;

use dynasty_core::valuation::ValuationRecord;
use dynasty_core::{Analyzer, CoreError};

use crate::cli::Command;
use crate::export;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    NotFound,
}

fn print_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).context("failed to serialize output")?;
    writeln!(out)?;
    Ok(())
}

pub async fn run<W: Write>(
    analyzer: &Analyzer,
    command: Command,
    out: &mut W,
) -> anyhow::Result<Outcome> {
    let result = execute(analyzer, command, out).await;
    match result {
        Err(CommandError::Core(CoreError::NotFound { entity, id })) => {
            let message = CoreError::not_found(entity, id.clone()).to_string();
            print_json(
                out,
                &json!({
                    "error": "not_found",
                    "entity": entity.to_string(),
                    "id": id,
                    "message": message,
                }),
            )?;
            Ok(Outcome::NotFound)
        }
        Err(CommandError::Core(err)) => Err(err).context("upstream request failed"),
        Err(CommandError::Other(err)) => Err(err),
        Ok(()) => Ok(Outcome::Done),
    }
}

enum CommandError {
    Core(CoreError),
    Other(anyhow::Error),
}

impl From<CoreError> for CommandError {
    fn from(err: CoreError) -> Self {
        CommandError::Core(err)
    }
}

impl From<anyhow::Error> for CommandError {
    fn from(err: anyhow::Error) -> Self {
        CommandError::Other(err)
    }
}

async fn execute<W: Write>(
    analyzer: &Analyzer,
    command: Command,
    out: &mut W,
) -> Result<(), CommandError> {
    match command {
        Command::Leagues { username } => {
            let leagues = analyzer.user_leagues(&username).await?;
            info!(%username, leagues = leagues.len(), "leagues listed");
            print_json(out, leagues.as_ref())?;
        }
        Command::Snapshot { league_id, csv } => {
            let snapshot = analyzer.build_snapshot(&league_id).await?;
            match csv {
                Some(path) => {
                    let file = std::fs::File::create(&path)
                        .with_context(|| format!("failed to create {}", path.display()))?;
                    let rows = export::write_snapshot_csv(&snapshot, file)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    info!(%league_id, rows, path = %path.display(), "snapshot exported");
                    print_json(out, &json!({ "written": path, "rows": rows }))?;
                }
                None => print_json(out, &snapshot)?,
            }
        }
        Command::Roster {
            username,
            league_id,
        } => {
            let team = analyzer.team_for_user(&username, &league_id).await?;
            print_json(out, &team)?;
        }
        Command::Values { position, limit } => {
            let values = analyzer.get_values().await?;
            let selected = select_values(&values, position, limit);
            print_json(out, &selected)?;
        }
    }
    Ok(())
}

/// Values filtered to one position (if given) and ordered by value, highest
/// first, truncated to `limit`.
pub fn select_values(
    values: &[ValuationRecord],
    position: Option<dynasty_core::valuation::Position>,
    limit: Option<usize>,
) -> Vec<&ValuationRecord> {
    let mut selected: Vec<&ValuationRecord> = values
        .iter()
        .filter(|v| position.map_or(true, |p| v.position == p))
        .collect();
    selected.sort_by(|a, b| b.value.cmp(&a.value));
    if let Some(limit) = limit {
        selected.truncate(limit);
    }
    selected
}
