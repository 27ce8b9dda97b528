use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use chrono::{Datelike, NaiveDate};
use log::{debug, info};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::milestones;
use crate::opponents::key_slug;
use crate::outcome::{self, Outcome, SetTally};
use crate::season::Season;
use crate::table::{
    DATE_FORMAT, Row, Table, fmt_bool, fmt_opt, fmt_opt_bool, fmt_opt_f64, write_csv_atomic,
};

/// Position within a season or career, by tertile-style cuts of the match index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Early,
    Mid,
    Late,
}

impl Stage {
    /// Cut `position` (1-based, of `n`) at the given quantile fractions,
    /// interpolating between the first and last index like `qcut`.
    pub fn from_position(position: u32, n: u32, cuts: [(u32, u32); 2]) -> Stage {
        if n <= 1 {
            return Stage::Early;
        }
        let span = f64::from(n - 1);
        let edge = |(num, den): (u32, u32)| 1.0 + span * f64::from(num) / f64::from(den);
        let p = f64::from(position);
        if p <= edge(cuts[0]) {
            Stage::Early
        } else if p <= edge(cuts[1]) {
            Stage::Mid
        } else {
            Stage::Late
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Early => "early",
            Stage::Mid => "mid",
            Stage::Late => "late",
        })
    }
}

impl FromStr for Stage {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw {
            "early" => Ok(Stage::Early),
            "mid" => Ok(Stage::Mid),
            "late" => Ok(Stage::Late),
            other => Err(anyhow!("unknown stage '{other}'")),
        }
    }
}

const SEASON_CUTS: [(u32, u32); 2] = [(1, 3), (2, 3)];
const CAREER_CUTS: [(u32, u32); 2] = [(1, 4), (3, 4)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    Regular,
    TournamentPool,
    Playoff,
    Championship,
    Forfeit,
    Injured,
    Sick,
}

impl MatchType {
    pub fn name(self) -> &'static str {
        match self {
            MatchType::Regular => "regular",
            MatchType::TournamentPool => "tournament_pool",
            MatchType::Playoff => "playoff",
            MatchType::Championship => "championship",
            MatchType::Forfeit => "forfeit",
            MatchType::Injured => "injured",
            MatchType::Sick => "sick",
        }
    }

    /// Ordinal importance label and score.
    pub fn importance(self) -> (&'static str, u8) {
        match self {
            MatchType::TournamentPool => ("normal", 1),
            MatchType::Playoff => ("high", 2),
            MatchType::Championship => ("high", 3),
            MatchType::Regular | MatchType::Forfeit | MatchType::Injured | MatchType::Sick => {
                ("low", 0)
            }
        }
    }

    pub fn importance_score(self) -> u8 {
        self.importance().1
    }
}

impl FromStr for MatchType {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        Ok(match raw {
            "regular" => MatchType::Regular,
            "tournament_pool" => MatchType::TournamentPool,
            "playoff" => MatchType::Playoff,
            "championship" => MatchType::Championship,
            "forfeit" => MatchType::Forfeit,
            "injured" => MatchType::Injured,
            "sick" => MatchType::Sick,
            other => return Err(anyhow!("unknown match type '{other}'")),
        })
    }
}

/// One cleaned schedule row.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRow {
    pub match_key: String,
    pub career_match_index: u32,
    pub career_stage: Stage,
    pub season: Season,
    pub season_match_number: u32,
    pub season_stage: Stage,
    pub date: NaiveDate,
    pub week_of_season: u32,
    pub days_since_last_match: i64,
    pub is_back_to_back: bool,
    pub match_density_3days: u32,
    pub match_no: u32,
    pub total_matches_that_day: u32,
    pub multi_game_day: bool,
    pub first_match_of_day: Option<bool>,
    pub last_match_of_day: Option<bool>,
    pub same_day_opponent_seq: u32,
    pub total_sets_that_day: u32,
    pub opponent: String,
    pub opponent_slug: String,
    pub season_opponent_seq: u32,
    pub is_repeat_opponent: bool,
    pub rivalry: bool,
    pub deaf_school: bool,
    pub match_type: MatchType,
    pub event_name: Option<String>,
    pub milestone_flag: String,
    pub result: Option<Outcome>,
    pub set_scores: Option<String>,
    pub set_result: Option<SetTally>,
    pub comeback_win: bool,
    pub revenge_match: bool,
    pub redemption_game: bool,
    pub total_points_for: Option<u32>,
    pub total_points_against: Option<u32>,
    pub margin_pct: Option<f64>,
    pub high_margin_win: bool,
    pub low_margin_loss: bool,
    pub location: Option<String>,
    pub injured: bool,
    pub sick: bool,
    pub forfeited: bool,
    pub did_play: bool,
    pub favorite_match: bool,
    pub birthday_match: bool,
    pub is_conference: bool,
    pub is_playoffs: bool,
    pub is_tournament: bool,
    pub is_championship: bool,
    pub maxpreps: Option<String>,
}

pub const SCHEDULE_COLUMNS: [&str; 55] = [
    "match_key",
    "career_match_index",
    "career_stage",
    "season",
    "season_match_number",
    "season_stage",
    "date",
    "day_of_week",
    "week_of_season",
    "days_since_last_match",
    "is_back_to_back",
    "match_density_3days",
    "match_no",
    "total_matches_that_day",
    "multi_game_day",
    "first_match_of_day",
    "last_match_of_day",
    "same_day_opponent_seq",
    "total_sets_that_day",
    "opponent",
    "opponent_slug",
    "season_opponent_seq",
    "is_repeat_opponent",
    "rivalry",
    "deaf_school",
    "match_type",
    "game_importance",
    "game_importance_score",
    "event_name",
    "milestone_flag",
    "result",
    "set_scores",
    "set_result",
    "set_count",
    "set_diff",
    "comeback_win",
    "revenge_match",
    "redemption_game",
    "total_points_for",
    "total_points_against",
    "margin_pct",
    "high_margin_win",
    "low_margin_loss",
    "location",
    "injured",
    "sick",
    "forfeited",
    "did_play",
    "favorite_match",
    "birthday_match",
    "is_conference",
    "is_playoffs",
    "is_tournament",
    "is_championship",
    "maxpreps",
];

impl ScheduleRow {
    pub fn set_count(&self) -> Option<u32> {
        self.set_result.map(SetTally::count)
    }

    pub fn set_diff(&self) -> Option<i32> {
        self.set_result.map(SetTally::diff)
    }

    pub fn importance_score(&self) -> u8 {
        self.match_type.importance_score()
    }

    pub fn to_record(&self) -> Vec<String> {
        let (importance, importance_score) = self.match_type.importance();
        vec![
            self.match_key.clone(),
            self.career_match_index.to_string(),
            self.career_stage.to_string(),
            self.season.to_string(),
            self.season_match_number.to_string(),
            self.season_stage.to_string(),
            self.date.format(DATE_FORMAT).to_string(),
            self.date.format("%A").to_string(),
            self.week_of_season.to_string(),
            self.days_since_last_match.to_string(),
            fmt_bool(self.is_back_to_back),
            self.match_density_3days.to_string(),
            self.match_no.to_string(),
            self.total_matches_that_day.to_string(),
            fmt_bool(self.multi_game_day),
            fmt_opt_bool(self.first_match_of_day),
            fmt_opt_bool(self.last_match_of_day),
            self.same_day_opponent_seq.to_string(),
            self.total_sets_that_day.to_string(),
            self.opponent.clone(),
            self.opponent_slug.clone(),
            self.season_opponent_seq.to_string(),
            fmt_bool(self.is_repeat_opponent),
            fmt_bool(self.rivalry),
            fmt_bool(self.deaf_school),
            self.match_type.name().to_string(),
            importance.to_string(),
            importance_score.to_string(),
            self.event_name.clone().unwrap_or_default(),
            self.milestone_flag.clone(),
            fmt_opt(self.result),
            self.set_scores.clone().unwrap_or_default(),
            fmt_opt(self.set_result),
            fmt_opt(self.set_count()),
            fmt_opt(self.set_diff()),
            fmt_bool(self.comeback_win),
            fmt_bool(self.revenge_match),
            fmt_bool(self.redemption_game),
            fmt_opt(self.total_points_for),
            fmt_opt(self.total_points_against),
            fmt_opt_f64(self.margin_pct),
            fmt_bool(self.high_margin_win),
            fmt_bool(self.low_margin_loss),
            self.location.clone().unwrap_or_default(),
            fmt_bool(self.injured),
            fmt_bool(self.sick),
            fmt_bool(self.forfeited),
            fmt_bool(self.did_play),
            fmt_bool(self.favorite_match),
            fmt_bool(self.birthday_match),
            fmt_bool(self.is_conference),
            fmt_bool(self.is_playoffs),
            fmt_bool(self.is_tournament),
            fmt_bool(self.is_championship),
            self.maxpreps.clone().unwrap_or_default(),
        ]
    }

    /// Rebuild from a cleaned schedule row; derived columns are recomputed, not read.
    pub fn from_row(row: &Row<'_>) -> Result<ScheduleRow> {
        Ok(ScheduleRow {
            match_key: row.text("match_key")?.to_string(),
            career_match_index: row.parse("career_match_index")?,
            career_stage: row.parse("career_stage")?,
            season: row.parse("season")?,
            season_match_number: row.parse("season_match_number")?,
            season_stage: row.parse("season_stage")?,
            date: row.date("date")?,
            week_of_season: row.parse("week_of_season")?,
            days_since_last_match: row.parse("days_since_last_match")?,
            is_back_to_back: row.flag("is_back_to_back")?,
            match_density_3days: row.parse("match_density_3days")?,
            match_no: row.parse("match_no")?,
            total_matches_that_day: row.parse("total_matches_that_day")?,
            multi_game_day: row.flag("multi_game_day")?,
            first_match_of_day: row.opt_flag("first_match_of_day")?,
            last_match_of_day: row.opt_flag("last_match_of_day")?,
            same_day_opponent_seq: row.parse("same_day_opponent_seq")?,
            total_sets_that_day: row.parse("total_sets_that_day")?,
            opponent: row.text("opponent")?.to_string(),
            opponent_slug: row.text("opponent_slug")?.to_string(),
            season_opponent_seq: row.parse("season_opponent_seq")?,
            is_repeat_opponent: row.flag("is_repeat_opponent")?,
            rivalry: row.flag("rivalry")?,
            deaf_school: row.flag("deaf_school")?,
            match_type: row.parse("match_type")?,
            event_name: row.opt_text("event_name"),
            milestone_flag: row.opt_text("milestone_flag").unwrap_or_default(),
            result: row.opt_parse("result")?,
            set_scores: row.opt_text("set_scores"),
            set_result: row.opt_parse("set_result")?,
            comeback_win: row.flag("comeback_win")?,
            revenge_match: row.flag("revenge_match")?,
            redemption_game: row.flag("redemption_game")?,
            total_points_for: row.opt_parse("total_points_for")?,
            total_points_against: row.opt_parse("total_points_against")?,
            margin_pct: row.opt_parse("margin_pct")?,
            high_margin_win: row.flag("high_margin_win")?,
            low_margin_loss: row.flag("low_margin_loss")?,
            location: row.opt_text("location"),
            injured: row.flag("injured")?,
            sick: row.flag("sick")?,
            forfeited: row.flag("forfeited")?,
            did_play: row.flag("did_play")?,
            favorite_match: row.flag("favorite_match")?,
            birthday_match: row.flag("birthday_match")?,
            is_conference: row.flag("is_conference")?,
            is_playoffs: row.flag("is_playoffs")?,
            is_tournament: row.flag("is_tournament")?,
            is_championship: row.flag("is_championship")?,
            maxpreps: row.opt_text("maxpreps"),
        })
    }
}

/// A master-schedule line before any derivation.
#[derive(Debug, Clone)]
struct RawMatch {
    file_order: usize,
    date: NaiveDate,
    opponent: String,
    result: Option<Outcome>,
    set_scores: Option<String>,
    set_result: Option<SetTally>,
    location: Option<String>,
    is_conference: bool,
    is_playoffs: bool,
    is_tournament: bool,
    maxpreps: Option<String>,
}

const RAW_REQUIRED: [&str; 2] = ["date", "opponent"];

fn parse_raw_date(row: &Row<'_>) -> Result<NaiveDate> {
    let raw = row.text("date")?;
    NaiveDate::parse_from_str(raw, "%m/%d/%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, DATE_FORMAT))
        .map_err(|_| row.invalid("date", raw).into())
}

fn read_raw(table: &Table, cfg: &PipelineConfig) -> Result<Vec<RawMatch>> {
    table.require_columns(&RAW_REQUIRED)?;
    let mut out = Vec::with_capacity(table.len());
    for (file_order, row) in table.rows().enumerate() {
        out.push(RawMatch {
            file_order,
            date: parse_raw_date(&row)?,
            opponent: cfg.opponents.canonical_name(row.text("opponent")?),
            result: row.opt_parse("result")?,
            set_scores: row.opt_text("set_scores"),
            set_result: row.opt_parse("set_result")?,
            location: row.opt_text("location"),
            is_conference: row.flag("is_conference")?,
            is_playoffs: row.flag("is_playoffs")?,
            is_tournament: row.flag("is_tournament")?,
            maxpreps: row.opt_text("maxpreps"),
        });
    }
    Ok(out)
}

/// Turn the raw master schedule into cleaned rows in career order.
pub fn normalize_schedule(table: &Table, cfg: &PipelineConfig) -> Result<Vec<ScheduleRow>> {
    let mut raw = read_raw(table, cfg)?;
    raw.sort_by(|a, b| a.date.cmp(&b.date).then(a.file_order.cmp(&b.file_order)));

    let slugs = cfg
        .opponents
        .resolve_all(raw.iter().map(|m| m.opponent.as_str()))?;
    let seasons = raw
        .iter()
        .map(|m| {
            cfg.season_for_year(m.date.year())
                .ok_or(PipelineError::UnknownSeasonYear(m.date.year()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let n = raw.len();
    let career_n = n as u32;
    let milestone_sets = milestones::milestone_sets(&seasons);

    let mut per_day: HashMap<NaiveDate, u32> = HashMap::new();
    let mut sets_per_day: HashMap<NaiveDate, u32> = HashMap::new();
    let mut per_season: HashMap<Season, u32> = HashMap::new();
    let mut season_start: HashMap<Season, NaiveDate> = HashMap::new();
    for (m, season) in raw.iter().zip(&seasons) {
        *per_day.entry(m.date).or_default() += 1;
        *sets_per_day.entry(m.date).or_default() += m.set_result.map(SetTally::count).unwrap_or(0);
        *per_season.entry(*season).or_default() += 1;
        season_start.entry(*season).or_insert(m.date);
    }

    // Last recorded result per (season, opponent), for redemption lookups.
    let mut season_final_result: HashMap<(Season, &str), Outcome> = HashMap::new();
    for (m, season) in raw.iter().zip(&seasons) {
        if let Some(result) = m.result {
            season_final_result.insert((*season, m.opponent.as_str()), result);
        }
    }

    let dates: Vec<NaiveDate> = raw.iter().map(|m| m.date).collect();
    let mut day_seq: HashMap<NaiveDate, u32> = HashMap::new();
    let mut day_opponent_seq: HashMap<(NaiveDate, &str), u32> = HashMap::new();
    let mut season_seq: HashMap<Season, u32> = HashMap::new();
    let mut season_opponent_seq: HashMap<(Season, &str), u32> = HashMap::new();
    let mut last_vs_opponent: HashMap<(Season, &str), Option<Outcome>> = HashMap::new();

    let mut out = Vec::with_capacity(n);
    for (idx, m) in raw.iter().enumerate() {
        let season = seasons[idx];
        let slug = &slugs[idx];
        let opponent = m.opponent.as_str();

        let match_no = bump(&mut day_seq, m.date);
        let total_matches_that_day = per_day[&m.date];
        let multi_game_day = total_matches_that_day > 1;
        let same_day_opponent_seq = bump(&mut day_opponent_seq, (m.date, opponent));
        let season_match_number = bump(&mut season_seq, season);
        let season_opponent_seq = bump(&mut season_opponent_seq, (season, opponent));

        let match_key = format!(
            "{}_{}_{}_{}",
            season.code(),
            m.date.format("%m-%d"),
            key_slug(slug),
            match_no
        );

        let forfeited = cfg
            .calendar
            .forfeits
            .iter()
            .any(|f| f.date == m.date && cfg.opponents.canonical_name(&f.opponent) == opponent);
        let sick = cfg.calendar.sick_dates.contains(&m.date);
        let injured = cfg.calendar.injured_dates.contains(&m.date);
        let is_championship = cfg.calendar.championship_dates.contains(&m.date)
            || cfg.calendar.championship_keys.contains(&match_key);
        let is_tournament_date = cfg.calendar.tournament_dates.contains(&m.date);
        let match_type = if forfeited {
            MatchType::Forfeit
        } else if injured {
            MatchType::Injured
        } else if sick {
            MatchType::Sick
        } else if is_championship {
            MatchType::Championship
        } else if m.is_playoffs {
            MatchType::Playoff
        } else if is_tournament_date {
            MatchType::TournamentPool
        } else {
            MatchType::Regular
        };

        let prev_vs_opponent = last_vs_opponent
            .insert((season, opponent), m.result)
            .flatten();
        let revenge_match = prev_vs_opponent == Some(Outcome::Loss) && m.result == Some(Outcome::Win);
        let redemption_game = m.result == Some(Outcome::Win)
            && season
                .previous()
                .and_then(|prev| season_final_result.get(&(prev, opponent)).copied())
                == Some(Outcome::Loss);

        let sets = m
            .set_scores
            .as_deref()
            .map(|s| outcome::team_set_scores(s, m.result))
            .unwrap_or_default();
        let totals = outcome::point_totals(&sets);
        let margin_pct = totals.and_then(|(f, a)| {
            let total = f + a;
            (total > 0).then(|| (f64::from(f) - f64::from(a)) / f64::from(total))
        });

        let days_since_last_match = if idx == 0 {
            0
        } else {
            (m.date - raw[idx - 1].date).num_days()
        };
        let window_start = m.date - chrono::Duration::days(2);
        let density = dates.partition_point(|d| *d <= m.date) - dates.partition_point(|d| *d < window_start);

        let birthday_match = cfg
            .calendar
            .birthday
            .as_deref()
            .is_some_and(|b| m.date.format("%m-%d").to_string() == b);

        out.push(ScheduleRow {
            career_match_index: idx as u32 + 1,
            career_stage: Stage::from_position(idx as u32 + 1, career_n, CAREER_CUTS),
            season,
            season_match_number,
            season_stage: Stage::from_position(season_match_number, per_season[&season], SEASON_CUTS),
            date: m.date,
            week_of_season: ((m.date - season_start[&season]).num_days() / 7 + 1) as u32,
            days_since_last_match,
            is_back_to_back: days_since_last_match == 1,
            match_density_3days: density as u32,
            match_no,
            total_matches_that_day,
            multi_game_day,
            first_match_of_day: multi_game_day.then_some(match_no == 1),
            last_match_of_day: multi_game_day.then_some(match_no == total_matches_that_day),
            same_day_opponent_seq,
            total_sets_that_day: sets_per_day[&m.date],
            opponent: m.opponent.clone(),
            opponent_slug: slug.clone(),
            season_opponent_seq,
            is_repeat_opponent: season_opponent_seq > 1,
            rivalry: cfg.opponents.is_rival(slug),
            deaf_school: cfg.opponents.is_deaf_school(slug),
            match_type,
            event_name: cfg.calendar.event_names.get(&m.date).cloned(),
            milestone_flag: milestones::render(&milestone_sets[idx]),
            result: m.result,
            set_scores: m.set_scores.clone(),
            set_result: m.set_result,
            comeback_win: outcome::is_comeback(&sets, m.result),
            revenge_match,
            redemption_game,
            total_points_for: totals.map(|t| t.0),
            total_points_against: totals.map(|t| t.1),
            margin_pct,
            high_margin_win: m.result == Some(Outcome::Win)
                && margin_pct.is_some_and(|p| p >= cfg.thresholds.high_margin_win),
            low_margin_loss: m.result == Some(Outcome::Loss)
                && margin_pct.is_some_and(|p| p >= cfg.thresholds.low_margin_loss),
            location: m.location.clone(),
            injured,
            sick,
            forfeited,
            did_play: !(forfeited || sick || injured),
            favorite_match: cfg.calendar.favorite_matches.contains(&match_key),
            birthday_match,
            is_conference: m.is_conference,
            is_playoffs: m.is_playoffs,
            is_tournament: m.is_tournament,
            is_championship,
            maxpreps: m.maxpreps.clone(),
            match_key,
        });
    }
    Ok(out)
}

fn bump<K: std::hash::Hash + Eq>(counter: &mut HashMap<K, u32>, key: K) -> u32 {
    let slot = counter.entry(key).or_default();
    *slot += 1;
    *slot
}

pub fn write_schedule(path: &Path, rows: &[ScheduleRow]) -> Result<usize> {
    write_csv_atomic(path, &SCHEDULE_COLUMNS, rows.iter().map(ScheduleRow::to_record))
}

pub fn load_cleaned_schedule(path: &Path) -> Result<Vec<ScheduleRow>> {
    let table = Table::read(path)?;
    table.require_columns(&["match_key", "season", "date", "opponent"])?;
    table
        .rows()
        .map(|row| ScheduleRow::from_row(&row))
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("decode cleaned schedule {}", path.display()))
}

#[derive(Debug, Clone)]
pub struct ScheduleReport {
    pub rows: usize,
    pub per_season: BTreeMap<Season, usize>,
}

/// Stage 1: raw master schedule to `cleaned_master_schedule.csv`.
pub fn run(cfg: &PipelineConfig) -> Result<ScheduleReport> {
    let raw_path = cfg.raw_schedule_path();
    info!("normalizing schedule {}", raw_path.display());
    let table = Table::read(&raw_path)?;
    let rows = normalize_schedule(&table, cfg)?;

    let mut per_season = BTreeMap::new();
    for row in &rows {
        *per_season.entry(row.season).or_default() += 1;
    }
    for (season, count) in &per_season {
        debug!("schedule {season}: {count} matches");
    }

    let out = cfg.cleaned_schedule_path();
    write_schedule(&out, &rows)?;
    info!("schedule cleaned: {} rows -> {}", rows.len(), out.display());
    Ok(ScheduleReport {
        rows: rows.len(),
        per_season,
    })
}
