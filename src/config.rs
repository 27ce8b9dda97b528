use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::opponents::OpponentTable;
use crate::season::Season;
use crate::stats::StatField;

pub const DEFAULT_CONFIG_FILE: &str = "vb_career.json";

/// Everything the pipeline used to hard-code, passed explicitly to each stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub season_years: BTreeMap<i32, Season>,
    /// Seasons that have per-category stat sheets.
    pub stat_seasons: Vec<Season>,
    pub opponents: OpponentTable,
    pub calendar: CalendarConfig,
    /// Manual `sets_played` for placeholder rows, keyed by match key.
    pub sets_played_overrides: BTreeMap<String, u32>,
    pub weights: PerformanceWeights,
    pub thresholds: FlagThresholds,
    pub high_fields: Vec<StatField>,
    pub streak_scope: StreakScope,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            season_years: BTreeMap::from([
                (2016, Season::Freshman),
                (2017, Season::Sophomore),
                (2018, Season::Junior),
                (2019, Season::Senior),
            ]),
            stat_seasons: vec![Season::Freshman, Season::Sophomore, Season::Senior],
            opponents: OpponentTable::default(),
            calendar: CalendarConfig::default(),
            sets_played_overrides: BTreeMap::from([("JR_09-27_BOHS_1".to_string(), 1)]),
            weights: PerformanceWeights::default(),
            thresholds: FlagThresholds::default(),
            high_fields: vec![
                StatField::Kills,
                StatField::Aces,
                StatField::Points,
                StatField::Digs,
                StatField::Receiving,
                StatField::Assists,
                StatField::TotalBlocks,
            ],
            streak_scope: StreakScope::Season,
        }
    }
}

impl PipelineConfig {
    /// Load a JSON override file; absent keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parse config {}", path.display()))
    }

    /// `path` if given, else `vb_career.json` when present, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let fallback = Path::new(DEFAULT_CONFIG_FILE);
        if fallback.exists() {
            return Self::load(fallback);
        }
        Ok(Self::default())
    }

    pub fn season_for_year(&self, year: i32) -> Option<Season> {
        self.season_years.get(&year).copied()
    }

    pub fn year_for_season(&self, season: Season) -> Option<i32> {
        self.season_years
            .iter()
            .find(|(_, s)| **s == season)
            .map(|(year, _)| *year)
    }

    pub fn has_stats(&self, season: Season) -> bool {
        self.stat_seasons.contains(&season)
    }

    pub fn raw_schedule_path(&self) -> PathBuf {
        self.data_dir.join("schedules").join("master_schedule.csv")
    }

    pub fn raw_season_dir(&self, season: Season) -> PathBuf {
        self.data_dir.join("raw").join(season.folder())
    }

    pub fn cleaned_dir(&self) -> PathBuf {
        self.data_dir.join("cleaned")
    }

    pub fn cleaned_schedule_path(&self) -> PathBuf {
        self.cleaned_dir().join("cleaned_master_schedule.csv")
    }

    pub fn season_stats_path(&self, season: Season) -> PathBuf {
        self.cleaned_dir()
            .join(format!("{}_stats_merged.csv", season.folder()))
    }

    pub fn all_stats_path(&self) -> PathBuf {
        self.cleaned_dir().join("all_stats_merged.csv")
    }

    pub fn merged_dataset_path(&self) -> PathBuf {
        self.data_dir.join("full_merged_dataset.csv")
    }

    pub fn enriched_path(&self) -> PathBuf {
        self.data_dir.join("enriched_matches.csv")
    }

    pub fn archive_path(&self) -> PathBuf {
        self.data_dir.join("enriched_matches.sqlite")
    }

    pub fn workbook_path(&self) -> PathBuf {
        self.data_dir.join("career_summary.xlsx")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatedOpponent {
    pub date: NaiveDate,
    pub opponent: String,
}

/// Dates and keys that classify matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    pub tournament_dates: Vec<NaiveDate>,
    pub championship_dates: Vec<NaiveDate>,
    pub championship_keys: Vec<String>,
    pub event_names: BTreeMap<NaiveDate, String>,
    pub forfeits: Vec<DatedOpponent>,
    pub sick_dates: Vec<NaiveDate>,
    pub injured_dates: Vec<NaiveDate>,
    pub favorite_matches: Vec<String>,
    /// Month and day, `MM-DD`.
    pub birthday: Option<String>,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        let events: &[(&str, &str)] = &[
            ("2016-09-09", "FSDB Invitational 2016"),
            ("2016-09-24", "Model Invitational 2016"),
            ("2016-10-07", "SpikeOut 2016 @ Indiana"),
            ("2016-10-08", "SpikeOut 2016 @ Indiana"),
            ("2016-11-09", "DCSAA State Tournament Quarterfinals"),
            ("2016-11-10", "DCSAA State Tournament Semifinals"),
            ("2016-11-11", "DCSAA State Tournament Championship"),
            ("2017-09-23", "Model Invitational 2017"),
            ("2017-10-06", "SpikeOut 2017 @ Maryland"),
            ("2017-10-07", "SpikeOut 2017 @ Maryland"),
            ("2017-10-23", "PVAC Tournament Quarterfinals"),
            ("2017-10-25", "PVAC Tournament Semifinals"),
            ("2017-10-30", "PVAC Tournament Championship"),
            ("2017-11-07", "DCSAA State Tournament First Round"),
            ("2017-11-08", "DCSAA State Tournament Quarterfinals"),
            ("2018-09-08", "Fredericksburg Invitational 2018"),
            ("2018-09-22", "Model Invitational 2018"),
            ("2018-10-05", "SpikeOut 2018 @ Model"),
            ("2018-10-06", "SpikeOut 2018 @ Model"),
            ("2018-10-22", "PVAC Tournament Quarterfinals"),
            ("2018-10-29", "PVAC Tournament Championship"),
            ("2018-11-06", "DCSAA State Tournament First Round"),
            ("2019-09-07", "Fredericksburg Invitational 2019"),
            ("2019-09-14", "Oriole Classic 2019 @ Maryland"),
            ("2019-09-21", "Model Invitational 2019"),
            ("2019-10-04", "SpikeOut 2019 @ Riverside"),
            ("2019-10-05", "SpikeOut 2019 @ Riverside"),
            ("2019-10-12", "Tiger Paws Invitational 2019 @ Wilson"),
            ("2019-10-23", "PVAC Tournament Quarterfinals"),
            ("2019-10-28", "PVAC Tournament Semifinals"),
            ("2019-10-30", "PVAC Tournament Championship"),
            ("2019-11-05", "DCSAA State Tournament First Round"),
            ("2019-11-06", "DCSAA State Tournament Quarterfinals"),
        ];
        Self {
            tournament_dates: dates(&[
                "2016-09-09", "2016-09-24", "2016-10-07", "2016-10-08", "2017-09-23",
                "2017-10-06", "2017-10-07", "2018-09-08", "2018-09-22", "2018-10-05",
                "2018-10-06", "2019-09-07", "2019-09-14", "2019-09-21", "2019-10-04",
                "2019-10-05", "2019-10-12",
            ]),
            championship_dates: dates(&["2016-11-11", "2017-10-30", "2018-10-29", "2019-10-30"]),
            championship_keys: vec!["SR_10-05_TSD_2".to_string()],
            event_names: events
                .iter()
                .filter_map(|(d, name)| Some((parse_date(d)?, name.to_string())))
                .collect(),
            forfeits: [
                ("2016-09-24", "Connelly School of the Holy Child"),
                ("2019-10-21", "McLean"),
            ]
            .iter()
            .filter_map(|(d, opponent)| {
                Some(DatedOpponent {
                    date: parse_date(d)?,
                    opponent: opponent.to_string(),
                })
            })
            .collect(),
            sick_dates: dates(&["2016-09-27", "2017-09-18"]),
            injured_dates: dates(&["2017-11-07", "2017-11-08"]),
            favorite_matches: Vec::new(),
            birthday: Some("09-21".to_string()),
        }
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn dates(raw: &[&str]) -> Vec<NaiveDate> {
    raw.iter().filter_map(|d| parse_date(d)).collect()
}

/// Points per skill event in the composite performance score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceWeights {
    pub kills: f64,
    pub kill_pct: f64,
    pub aces: f64,
    pub ace_pct: f64,
    pub digs: f64,
    pub assists: f64,
    pub serve_receptions: f64,
    pub receiving_errors: f64,
    pub kill_errors: f64,
    pub serve_errors: f64,
    pub full_match_bonus: f64,
}

impl Default for PerformanceWeights {
    fn default() -> Self {
        Self {
            kills: 1.5,
            kill_pct: 10.0,
            aces: 1.3,
            ace_pct: 8.0,
            digs: 1.0,
            assists: 0.5,
            serve_receptions: 0.8,
            receiving_errors: -1.3,
            kill_errors: -1.0,
            serve_errors: -1.0,
            full_match_bonus: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagThresholds {
    pub high_importance: u8,
    pub clutch_percentile: f64,
    pub highlight_percentile: f64,
    pub deciding_set_margin: i32,
    pub dominant_sweep_margin: f64,
    pub high_margin_win: f64,
    pub low_margin_loss: f64,
    pub needed_win_losses: u32,
    pub low_error_max: f64,
}

impl Default for FlagThresholds {
    fn default() -> Self {
        Self {
            high_importance: 2,
            clutch_percentile: 75.0,
            highlight_percentile: 90.0,
            deciding_set_margin: 2,
            dominant_sweep_margin: 0.2,
            high_margin_win: 0.6,
            low_margin_loss: -0.1,
            needed_win_losses: 2,
            low_error_max: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakScope {
    Season,
    Career,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_the_four_seasons() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.season_for_year(2018), Some(Season::Junior));
        assert_eq!(cfg.year_for_season(Season::Senior), Some(2019));
        assert!(!cfg.has_stats(Season::Junior));
        assert_eq!(cfg.calendar.tournament_dates.len(), 17);
        assert_eq!(cfg.calendar.event_names.len(), 33);
        assert_eq!(cfg.weights.kills, 1.5);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let raw = r#"{"data_dir":"fixtures","weights":{"kills":2.0},"streak_scope":"career"}"#;
        let cfg: PipelineConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("fixtures"));
        assert_eq!(cfg.weights.kills, 2.0);
        assert_eq!(cfg.weights.aces, 1.3);
        assert_eq!(cfg.streak_scope, StreakScope::Career);
        assert_eq!(cfg.stat_seasons.len(), 3);
    }

    #[test]
    fn config_round_trips_through_json() {
        let cfg = PipelineConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.season_years, cfg.season_years);
        assert_eq!(back.calendar.event_names, cfg.calendar.event_names);
        assert_eq!(back.high_fields, cfg.high_fields);
    }
}
