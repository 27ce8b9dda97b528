use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;

use crate::config::PipelineConfig;
use crate::schedule::{self, SCHEDULE_COLUMNS, ScheduleRow};
use crate::stats::{StatField, StatLine, format_stat, parse_stat_cell};
use crate::stats_merge::{self, StatRow};
use crate::table::{Row, Table, fmt_bool, fmt_opt, write_csv_atomic};
use crate::validate::{self, IntegrityReport};

/// A schedule row joined with its stat line.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedMatch {
    pub schedule: ScheduleRow,
    pub sets_played: Option<u32>,
    pub stats_available: bool,
    pub stats: StatLine,
}

impl MergedMatch {
    pub fn eligible(&self) -> bool {
        self.schedule.did_play && self.stats_available && self.sets_played.is_some()
    }

    pub fn played_all_sets(&self) -> bool {
        self.schedule.did_play
            && self.sets_played.is_some()
            && self.sets_played == self.schedule.set_count()
    }
}

pub fn merged_columns() -> Vec<String> {
    SCHEDULE_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(["sets_played".to_string(), "stats_available".to_string()])
        .chain(StatField::ALL.iter().map(|f| f.canonical_name().to_string()))
        .collect()
}

impl MergedMatch {
    pub fn to_record(&self) -> Vec<String> {
        let mut out = self.schedule.to_record();
        out.push(fmt_opt(self.sets_played));
        out.push(fmt_bool(self.stats_available));
        out.extend(
            StatField::ALL
                .iter()
                .map(|f| format_stat(*f, self.stats.get(*f))),
        );
        out
    }

    pub fn from_row(row: &Row<'_>) -> Result<MergedMatch> {
        let mut stats = StatLine::default();
        for field in StatField::ALL {
            let column = field.canonical_name();
            if let Some(raw) = row.cell(column) {
                stats.set(field, parse_stat_cell(raw).map_err(|_| row.invalid(column, raw))?);
            }
        }
        Ok(MergedMatch {
            schedule: ScheduleRow::from_row(row)?,
            sets_played: row.opt_parse("sets_played")?,
            stats_available: row.flag("stats_available")?,
            stats,
        })
    }
}

/// Left-join the schedule with the stat rows. Key sets must already agree.
pub fn join(
    cfg: &PipelineConfig,
    schedule: Vec<ScheduleRow>,
    stats: &[StatRow],
) -> Vec<MergedMatch> {
    let by_key: HashMap<&str, &StatRow> = stats.iter().map(|r| (r.match_key.as_str(), r)).collect();
    schedule
        .into_iter()
        .map(|row| {
            let stat = by_key.get(row.match_key.as_str());
            MergedMatch {
                sets_played: stat.and_then(|s| s.sets_played),
                stats_available: cfg.has_stats(row.season),
                stats: stat.map(|s| s.stats).unwrap_or_default(),
                schedule: row,
            }
        })
        .collect()
}

pub fn write_merged(path: &Path, rows: &[MergedMatch]) -> Result<usize> {
    write_csv_atomic(path, &merged_columns(), rows.iter().map(MergedMatch::to_record))
}

pub fn load_merged(path: &Path) -> Result<Vec<MergedMatch>> {
    let table = Table::read(path)?;
    table.require_columns(&["match_key", "season", "date", "sets_played", "stats_available"])?;
    table
        .rows()
        .map(|row| MergedMatch::from_row(&row))
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("decode merged dataset {}", path.display()))
}

#[derive(Debug, Clone)]
pub struct FinalMergeReport {
    pub rows: usize,
    pub path: PathBuf,
    pub integrity: IntegrityReport,
}

impl FinalMergeReport {
    pub fn validation_passed(&self) -> bool {
        self.integrity.is_clean()
    }
}

/// Stage 4: validate schedule against stats, then write `full_merged_dataset.csv`.
/// Key problems halt before anything is written; stat mismatches only mark
/// the report as failed.
pub fn run(cfg: &PipelineConfig) -> Result<FinalMergeReport> {
    let schedule = schedule::load_cleaned_schedule(&cfg.cleaned_schedule_path())?;
    let stats = stats_merge::load_stat_rows(&cfg.all_stats_path())?;
    info!(
        "loaded {} schedule rows and {} stat rows",
        schedule.len(),
        stats.len()
    );

    validate::ensure_unique("cleaned schedule", schedule.iter().map(|r| r.match_key.as_str()))?;
    validate::ensure_unique("all stats", stats.iter().map(|r| r.match_key.as_str()))?;
    validate::compare_match_keys(
        schedule.iter().map(|r| r.match_key.as_str()),
        stats.iter().map(|r| r.match_key.as_str()),
    )?;
    let integrity = validate::check_stat_integrity(cfg, &stats)?;

    let merged = join(cfg, schedule, &stats);
    let path = cfg.merged_dataset_path();
    let rows = write_merged(&path, &merged)?;
    info!("merged dataset: {rows} matches -> {}", path.display());
    Ok(FinalMergeReport {
        rows,
        path,
        integrity,
    })
}
