use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::schedule::{self, ScheduleRow};
use crate::season::Season;
use crate::stats::{StatCategory, StatField, StatLine, format_stat, parse_stat_cell};
use crate::table::{DATE_FORMAT, Row, Table, fmt_opt, write_csv_atomic};

pub const META_COLUMNS: [&str; 6] = [
    "match_key",
    "date",
    "result",
    "opponent",
    "season",
    "sets_played",
];

/// Header of the per-season and all-stats files.
pub fn stat_columns() -> Vec<String> {
    META_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(StatField::ALL.iter().map(|f| f.suffixed_name()))
        .collect()
}

/// One match in a merged stat table.
#[derive(Debug, Clone, PartialEq)]
pub struct StatRow {
    pub match_key: String,
    pub date: Option<NaiveDate>,
    /// Result cell as the sheet records it ("W", "L 1-2").
    pub result: Option<String>,
    pub opponent: Option<String>,
    pub season: Season,
    pub sets_played: Option<u32>,
    pub stats: StatLine,
}

impl StatRow {
    fn placeholder(row: &ScheduleRow) -> StatRow {
        StatRow {
            match_key: row.match_key.clone(),
            date: Some(row.date),
            result: None,
            opponent: Some(row.opponent.clone()),
            season: row.season,
            sets_played: None,
            stats: StatLine::default(),
        }
    }

    pub fn to_record(&self) -> Vec<String> {
        let mut out = vec![
            self.match_key.clone(),
            self.date
                .map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_default(),
            self.result.clone().unwrap_or_default(),
            self.opponent.clone().unwrap_or_default(),
            self.season.to_string(),
            fmt_opt(self.sets_played),
        ];
        out.extend(
            StatField::ALL
                .iter()
                .map(|f| format_stat(*f, self.stats.get(*f))),
        );
        out
    }

    pub fn from_row(row: &Row<'_>) -> Result<StatRow> {
        let mut stats = StatLine::default();
        for field in StatField::ALL {
            let column = field.suffixed_name();
            if let Some(raw) = row.cell(&column) {
                let value = parse_stat_cell(raw).map_err(|_| row.invalid(&column, raw))?;
                stats.set(field, value);
            }
        }
        Ok(StatRow {
            match_key: row.text("match_key")?.to_string(),
            date: match row.opt_text("date") {
                Some(_) => Some(row.date("date")?),
                None => None,
            },
            result: row.opt_text("result"),
            opponent: row.opt_text("opponent"),
            season: row.parse("season")?,
            sets_played: row.opt_parse("sets_played")?,
            stats,
        })
    }
}

/// Sheet dates are `MM/DD` (season year implied), `MM/DD/YYYY` or ISO.
fn parse_sheet_date(raw: &str, year: Option<i32>) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%m/%d/%Y") {
        return Some(d);
    }
    let (month, day) = raw.split_once('/')?;
    NaiveDate::from_ymd_opt(year?, month.trim().parse().ok()?, day.trim().parse().ok()?)
}

fn read_category(
    path: &Path,
    season: Season,
    category: StatCategory,
    year: Option<i32>,
    merged: &mut BTreeMap<String, StatRow>,
    diagnostics: &mut Vec<String>,
) -> Result<()> {
    let table = Table::read(path)?;
    if !table.has_column("match_key") {
        let msg = format!("{} missing 'match_key' column, skipped", path.display());
        warn!("{msg}");
        diagnostics.push(msg);
        return Ok(());
    }

    let mut seen = BTreeSet::new();
    let mut dupes = BTreeSet::new();
    for row in table.rows() {
        let key = row.text("match_key")?;
        if key.is_empty() {
            continue;
        }
        if !seen.insert(key.to_string()) {
            dupes.insert(key.to_string());
        }
    }
    if !dupes.is_empty() {
        return Err(PipelineError::DuplicateMatchKeys {
            table: path.display().to_string(),
            keys: dupes.into_iter().collect(),
        }
        .into());
    }

    for row in table.rows() {
        let key = row.text("match_key")?;
        if key.is_empty() {
            continue;
        }
        let entry = merged.entry(key.to_string()).or_insert_with(|| StatRow {
            match_key: key.to_string(),
            date: row
                .cell("date")
                .and_then(|raw| parse_sheet_date(raw, year)),
            result: row.opt_text("result"),
            opponent: row.opt_text("opponent"),
            season,
            sets_played: None,
            stats: StatLine::default(),
        });
        if entry.sets_played.is_none() {
            entry.sets_played = row
                .opt_parse::<f64>("sets_played")?
                .map(|v| v.round() as u32);
        }
        for field in category.fields() {
            if let Some(raw) = row.cell(field.raw_name()) {
                let value =
                    parse_stat_cell(raw).map_err(|_| row.invalid(field.raw_name(), raw))?;
                entry.stats.set(field, value);
            }
        }
    }
    debug!("{season} {category}: {} rows from {}", table.len(), path.display());
    Ok(())
}

#[derive(Debug, Clone)]
pub struct SeasonStats {
    pub season: Season,
    pub rows: Vec<StatRow>,
    pub categories_loaded: usize,
    pub diagnostics: Vec<String>,
}

/// Outer-join the category sheets of one season on `match_key`.
pub fn load_season(cfg: &PipelineConfig, season: Season) -> Result<SeasonStats> {
    let dir = cfg.raw_season_dir(season);
    let year = cfg.year_for_season(season);
    let mut merged = BTreeMap::new();
    let mut diagnostics = Vec::new();
    let mut categories_loaded = 0;
    for category in StatCategory::ALL {
        let path = dir.join(category.file_name());
        if !path.exists() {
            let msg = format!("missing stat sheet {}", path.display());
            warn!("{msg}");
            diagnostics.push(msg);
            continue;
        }
        read_category(&path, season, category, year, &mut merged, &mut diagnostics)
            .with_context(|| format!("merge {season} {category}"))?;
        categories_loaded += 1;
    }
    let mut rows: Vec<StatRow> = merged.into_values().collect();
    sort_rows(&mut rows);
    Ok(SeasonStats {
        season,
        rows,
        categories_loaded,
        diagnostics,
    })
}

fn sort_rows(rows: &mut [StatRow]) {
    rows.sort_by(|a, b| {
        a.season
            .cmp(&b.season)
            .then(a.date.cmp(&b.date))
            .then(a.match_key.cmp(&b.match_key))
    });
}

#[derive(Debug, Clone)]
pub struct MergedStats {
    pub seasons: Vec<SeasonStats>,
    pub all: Vec<StatRow>,
    pub placeholders: usize,
    pub dnp: usize,
}

impl MergedStats {
    pub fn diagnostics(&self) -> impl Iterator<Item = &String> {
        self.seasons.iter().flat_map(|s| s.diagnostics.iter())
    }
}

/// Combine stat-bearing seasons with schedule-derived placeholder rows.
pub fn merge(cfg: &PipelineConfig, schedule: &[ScheduleRow]) -> Result<MergedStats> {
    let seasons = cfg
        .stat_seasons
        .par_iter()
        .map(|season| load_season(cfg, *season))
        .collect::<Result<Vec<_>>>()?;

    let mut all: Vec<StatRow> = seasons.iter().flat_map(|s| s.rows.iter().cloned()).collect();
    let sheet_keys: BTreeSet<&str> = seasons
        .iter()
        .flat_map(|s| s.rows.iter().map(|r| r.match_key.as_str()))
        .collect();

    let mut placeholders = 0;
    let mut dnp_rows = Vec::new();
    let mut collisions = Vec::new();
    for row in schedule {
        if !cfg.has_stats(row.season) {
            let mut placeholder = StatRow::placeholder(row);
            placeholder.result = row.result.map(|r| r.to_string());
            placeholder.sets_played = cfg
                .sets_played_overrides
                .get(&row.match_key)
                .copied()
                .or(row.set_count());
            dnp_rows.push(placeholder);
            placeholders += 1;
        } else if !row.did_play {
            if sheet_keys.contains(row.match_key.as_str()) {
                collisions.push(row.match_key.clone());
            }
            dnp_rows.push(StatRow::placeholder(row));
        }
    }
    if !collisions.is_empty() {
        return Err(PipelineError::DuplicateMatchKeys {
            table: "dnp placeholders".to_string(),
            keys: collisions,
        }
        .into());
    }
    let dnp = dnp_rows.len() - placeholders;
    all.extend(dnp_rows);
    sort_rows(&mut all);

    Ok(MergedStats {
        seasons,
        all,
        placeholders,
        dnp,
    })
}

pub fn write_stat_rows(path: &Path, rows: &[StatRow]) -> Result<usize> {
    write_csv_atomic(path, &stat_columns(), rows.iter().map(StatRow::to_record))
}

pub fn load_stat_rows(path: &Path) -> Result<Vec<StatRow>> {
    let table = Table::read(path)?;
    table.require_columns(&["match_key", "season"])?;
    table
        .rows()
        .map(|row| StatRow::from_row(&row))
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("decode stat table {}", path.display()))
}

#[derive(Debug, Clone)]
pub struct MergeReport {
    pub season_files: Vec<(Season, PathBuf, usize)>,
    pub all_path: PathBuf,
    pub total_rows: usize,
    pub placeholders: usize,
    pub dnp: usize,
    pub diagnostics: Vec<String>,
}

/// Stage 2: per-season stat merges plus `all_stats_merged.csv`.
pub fn run(cfg: &PipelineConfig) -> Result<MergeReport> {
    let schedule = schedule::load_cleaned_schedule(&cfg.cleaned_schedule_path())?;
    let merged = merge(cfg, &schedule)?;

    let mut season_files = Vec::new();
    for season in &merged.seasons {
        if season.categories_loaded == 0 {
            warn!("{}: no stat sheets found, season file not written", season.season);
            continue;
        }
        let path = cfg.season_stats_path(season.season);
        let n = write_stat_rows(&path, &season.rows)?;
        info!("{}: {n} matches -> {}", season.season, path.display());
        season_files.push((season.season, path, n));
    }

    let all_path = cfg.all_stats_path();
    let total_rows = write_stat_rows(&all_path, &merged.all)?;
    info!(
        "all stats: {total_rows} rows ({} placeholders, {} dnp) -> {}",
        merged.placeholders,
        merged.dnp,
        all_path.display()
    );

    let mut diagnostics: Vec<String> = merged.diagnostics().cloned().collect();
    diagnostics.extend(
        merged
            .all
            .iter()
            .filter(|r| r.date.is_none())
            .map(|r| format!("{}: unparseable date", r.match_key)),
    );
    Ok(MergeReport {
        season_files,
        all_path,
        total_rows,
        placeholders: merged.placeholders,
        dnp: merged.dnp,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_dates_take_the_season_year() {
        assert_eq!(
            parse_sheet_date("9/07", Some(2019)),
            NaiveDate::from_ymd_opt(2019, 9, 7)
        );
        assert_eq!(
            parse_sheet_date("2016-10-01", Some(2019)),
            NaiveDate::from_ymd_opt(2016, 10, 1)
        );
        assert_eq!(
            parse_sheet_date("10/01/2017", None),
            NaiveDate::from_ymd_opt(2017, 10, 1)
        );
        assert_eq!(parse_sheet_date("09/07", None), None);
        assert_eq!(parse_sheet_date("soon", Some(2019)), None);
    }

    #[test]
    fn header_lists_every_suffixed_field() {
        let cols = stat_columns();
        assert_eq!(cols.len(), META_COLUMNS.len() + StatField::COUNT);
        assert!(cols.contains(&"blk_err_blocking".to_string()));
        assert!(cols.contains(&"points_serving".to_string()));
    }
}
