use std::path::PathBuf;

use thiserror::Error;

/// Conditions that halt the pipeline before the current stage writes anything.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unmapped opponents need an abbreviation: {}", .0.join(", "))]
    UnmappedOpponents(Vec<String>),
    #[error("no season configured for calendar year {0}")]
    UnknownSeasonYear(i32),
    #[error("duplicate match keys in {table}: {}", .keys.join(", "))]
    DuplicateMatchKeys { table: String, keys: Vec<String> },
    #[error(
        "match keys differ between schedule and stats ({} only in schedule, {} only in stats)",
        .only_in_schedule.len(),
        .only_in_stats.len()
    )]
    MatchKeyMismatch {
        only_in_schedule: Vec<String>,
        only_in_stats: Vec<String>,
    },
    #[error("{} is missing required column '{column}'", .path.display())]
    MissingColumn { path: PathBuf, column: String },
    #[error("{} row {row}: invalid {column} value '{value}'", .path.display())]
    InvalidValue {
        path: PathBuf,
        row: usize,
        column: String,
        value: String,
    },
}
