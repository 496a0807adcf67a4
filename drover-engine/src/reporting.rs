//! Local campaign statistics.
//!
//! Joins the sent log with the CSV outputs of external ingestion tooling
//! (`bounces.csv`, `replies.csv`, `opens.csv`, when present) into one
//! `stats.csv`. Purely local file aggregation; absent inputs simply yield
//! all-false columns.

use std::path::{Path, PathBuf};

use ahash::AHashSet;
use serde::Serialize;

use crate::{context::RunContext, error::EngineError};

/// One joined row of `stats.csv`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StatsRow {
    pub email: String,
    pub sent: bool,
    pub bounced: bool,
    pub replied: bool,
    pub opened: bool,
}

/// Build the joined statistics for one campaign.
///
/// # Errors
/// Returns an error if the sent log exists but cannot be read.
pub fn build_stats(ctx: &RunContext, campaign: &str) -> Result<Vec<StatsRow>, EngineError> {
    let logs_dir = ctx.logs_dir(campaign);

    let sent = match std::fs::read_to_string(ctx.sent_log_path(campaign)) {
        Ok(raw) => raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToString::to_string)
            .collect::<Vec<_>>(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(e.into()),
    };

    let bounces = read_column(&logs_dir.join("bounces.csv"), "bounced_email");
    let replies = read_column(&logs_dir.join("replies.csv"), "email");
    let opens = read_column(&logs_dir.join("opens.csv"), "to");

    Ok(sent
        .into_iter()
        .map(|email| {
            let key = email.to_lowercase();
            StatsRow {
                bounced: bounces.contains(&key),
                replied: replies.contains(&key),
                opened: opens.contains(&key),
                sent: true,
                email,
            }
        })
        .collect())
}

/// Write `stats.csv` into the campaign's logs directory.
///
/// # Errors
/// Returns an error if serialization or the write fails.
pub fn write_stats(
    ctx: &RunContext,
    campaign: &str,
    rows: &[StatsRow],
) -> Result<PathBuf, EngineError> {
    let path = ctx.stats_path(campaign);
    std::fs::create_dir_all(ctx.logs_dir(campaign))?;

    let mut writer = csv::Writer::from_path(&path)
        .map_err(|e| EngineError::Io(std::io::Error::other(e)))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| EngineError::Io(std::io::Error::other(e)))?;
    }
    writer.flush()?;
    Ok(path)
}

/// Read one named column from a CSV file into a lowercased set. A missing
/// or unparseable file is simply an empty set.
fn read_column(path: &Path, column: &str) -> AHashSet<String> {
    let Ok(mut reader) = csv::Reader::from_path(path) else {
        return AHashSet::default();
    };
    let Ok(headers) = reader.headers().cloned() else {
        return AHashSet::default();
    };
    let Some(index) = headers.iter().position(|name| name == column) else {
        return AHashSet::default();
    };

    reader
        .records()
        .filter_map(Result::ok)
        .filter_map(|record| record.get(index).map(|value| value.trim().to_lowercase()))
        .filter(|value| !value.is_empty())
        .collect()
}
