use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use anyhow::Result;
use log::{info, warn};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::season::Season;
use crate::stats::{StatField, format_stat};
use crate::stats_merge::{self, StatRow};

const MAX_SHOWN_MISMATCHES: usize = 10;

/// Fails when any key repeats inside one table.
pub fn ensure_unique<'a>(
    table: &str,
    keys: impl IntoIterator<Item = &'a str>,
) -> Result<(), PipelineError> {
    let mut seen = BTreeSet::new();
    let mut dupes = BTreeSet::new();
    for key in keys {
        if !seen.insert(key) {
            dupes.insert(key.to_string());
        }
    }
    if dupes.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::DuplicateMatchKeys {
            table: table.to_string(),
            keys: dupes.into_iter().collect(),
        })
    }
}

/// Both tables must describe exactly the same matches.
pub fn compare_match_keys<'a, 'b>(
    schedule_keys: impl IntoIterator<Item = &'a str>,
    stats_keys: impl IntoIterator<Item = &'b str>,
) -> Result<(), PipelineError> {
    let schedule: BTreeSet<&str> = schedule_keys.into_iter().collect();
    let stats: BTreeSet<&str> = stats_keys.into_iter().collect();
    let only_in_schedule: Vec<String> = schedule.difference(&stats).map(|k| k.to_string()).collect();
    let only_in_stats: Vec<String> = stats.difference(&schedule).map(|k| k.to_string()).collect();
    if only_in_schedule.is_empty() && only_in_stats.is_empty() {
        info!("match keys align: {} matches", schedule.len());
        return Ok(());
    }
    for key in &only_in_schedule {
        warn!("only in schedule: {key}");
    }
    for key in &only_in_stats {
        warn!("only in stats: {key}");
    }
    Err(PipelineError::MatchKeyMismatch {
        only_in_schedule,
        only_in_stats,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatMismatch {
    pub season: Season,
    pub match_key: String,
    pub field: StatField,
    pub season_value: Option<f64>,
    pub merged_value: Option<f64>,
}

impl fmt::Display for StatMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}: season file '{}' vs all stats '{}'",
            self.season,
            self.match_key,
            self.field.suffixed_name(),
            format_stat(self.field, self.season_value),
            format_stat(self.field, self.merged_value)
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct IntegrityReport {
    pub seasons_checked: Vec<Season>,
    pub missing_files: Vec<PathBuf>,
    pub mismatches: Vec<StatMismatch>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.missing_files.is_empty() && self.mismatches.is_empty()
    }
}

/// Compare one season's merged rows against the all-stats rows of that season
/// that carry a result.
pub fn compare_season(
    season: Season,
    season_rows: &[StatRow],
    all_rows: &[StatRow],
) -> Result<Vec<StatMismatch>, PipelineError> {
    ensure_unique(
        &format!("{season} season stats"),
        season_rows.iter().map(|r| r.match_key.as_str()),
    )?;
    let merged: Vec<&StatRow> = all_rows
        .iter()
        .filter(|r| r.season == season && r.result.is_some())
        .collect();
    ensure_unique(
        &format!("{season} all stats"),
        merged.iter().map(|r| r.match_key.as_str()),
    )?;

    let by_key: BTreeMap<&str, &StatRow> =
        merged.iter().map(|r| (r.match_key.as_str(), *r)).collect();
    let mut keyed: Vec<&StatRow> = season_rows.iter().collect();
    keyed.sort_by(|a, b| a.match_key.cmp(&b.match_key));

    let mut out = Vec::new();
    for row in keyed {
        let Some(other) = by_key.get(row.match_key.as_str()) else {
            continue;
        };
        for field in StatField::ALL {
            let (a, b) = (row.stats.get(field), other.stats.get(field));
            if a != b {
                out.push(StatMismatch {
                    season,
                    match_key: row.match_key.clone(),
                    field,
                    season_value: a,
                    merged_value: b,
                });
            }
        }
    }
    Ok(out)
}

/// Re-read the per-season merges from disk and check them against all stats.
/// Mismatches are logged and reported; duplicate keys are fatal.
pub fn check_stat_integrity(cfg: &PipelineConfig, all_rows: &[StatRow]) -> Result<IntegrityReport> {
    let mut report = IntegrityReport::default();
    for season in &cfg.stat_seasons {
        let path = cfg.season_stats_path(*season);
        if !path.exists() {
            warn!("missing season stats file {}", path.display());
            report.missing_files.push(path);
            continue;
        }
        let season_rows = stats_merge::load_stat_rows(&path)?;
        let mismatches = compare_season(*season, &season_rows, all_rows)?;
        if mismatches.is_empty() {
            info!("{season}: stats match exactly");
        } else {
            warn!(
                "{season}: {} stat mismatches, showing up to {MAX_SHOWN_MISMATCHES}",
                mismatches.len()
            );
            for m in mismatches.iter().take(MAX_SHOWN_MISMATCHES) {
                warn!("  {m}");
            }
        }
        report.seasons_checked.push(*season);
        report.mismatches.extend(mismatches);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::StatLine;

    fn row(key: &str, kills: Option<f64>, result: Option<&str>) -> StatRow {
        let mut stats = StatLine::default();
        stats.set(StatField::Kills, kills);
        StatRow {
            match_key: key.to_string(),
            date: None,
            result: result.map(str::to_string),
            opponent: None,
            season: Season::Freshman,
            sets_played: Some(3),
            stats,
        }
    }

    #[test]
    fn key_mismatch_reports_both_sides() {
        let err = compare_match_keys(["a", "b", "c"], ["b", "c", "d"]).unwrap_err();
        match err {
            PipelineError::MatchKeyMismatch {
                only_in_schedule,
                only_in_stats,
            } => {
                assert_eq!(only_in_schedule, vec!["a".to_string()]);
                assert_eq!(only_in_stats, vec!["d".to_string()]);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(compare_match_keys(["x"], ["x"]).is_ok());
    }

    #[test]
    fn duplicates_are_fatal() {
        let err = ensure_unique("t", ["k1", "k2", "k1"]).unwrap_err();
        assert!(matches!(err, PipelineError::DuplicateMatchKeys { ref keys, .. } if keys == &["k1".to_string()]));
    }

    #[test]
    fn season_compare_ignores_rows_without_result() {
        let season_rows = vec![row("FR_1", Some(4.0), Some("W")), row("FR_2", Some(1.0), Some("L"))];
        let all_rows = vec![row("FR_1", Some(5.0), Some("W")), row("FR_2", None, None)];
        let got = compare_season(Season::Freshman, &season_rows, &all_rows).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].match_key, "FR_1");
        assert_eq!(got[0].field, StatField::Kills);
        assert_eq!(got[0].merged_value, Some(5.0));
    }
}
