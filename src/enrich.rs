use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use log::info;

use crate::config::{PipelineConfig, StreakScope};
use crate::final_merge::{self, MergedMatch, merged_columns};
use crate::highs::{self, HighInput, Highs};
use crate::narrative::{self, NarrativeFlags, NarrativeInput};
use crate::outcome::Outcome;
use crate::percentile;
use crate::performance::{self, Performance};
use crate::season::Season;
use crate::streaks::{self, Streak};
use crate::table::{fmt_bool, fmt_opt, fmt_opt_f64, write_csv_atomic};

pub const TAG_COLUMNS: [&str; 27] = [
    "played_all_sets",
    "win_streak",
    "loss_streak",
    "prev_result",
    "prev_win_streak",
    "prev_loss_streak",
    "was_set_swept",
    "swept_opponent",
    "deciding_set_played",
    "dominant_sweep",
    "deciding_set_win",
    "deciding_set_loss",
    "team_needed_win",
    "confidence_boost_game",
    "low_error_game",
    "performance_score",
    "performance_per_set",
    "season_avg_performance",
    "performance_efficiency",
    "offensive_focus",
    "defensive_impact",
    "performance_percentile",
    "season_highs_flags",
    "career_highs_flags",
    "record_breaker_flag",
    "clutch_performance",
    "highlight_match",
];

pub fn enriched_columns() -> Vec<String> {
    let mut cols = merged_columns();
    cols.extend(TAG_COLUMNS.iter().map(|c| c.to_string()));
    cols
}

/// A merged match with every derived tag.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedMatch {
    pub merged: MergedMatch,
    pub played_all_sets: bool,
    pub streak: Streak,
    pub prev_result: Option<Outcome>,
    pub prev_streak: Option<Streak>,
    pub performance: Performance,
    pub season_avg_performance: Option<f64>,
    pub percentile: Option<f64>,
    pub highs: Highs,
    pub flags: NarrativeFlags,
}

impl EnrichedMatch {
    pub fn season(&self) -> Season {
        self.merged.schedule.season
    }

    pub fn result(&self) -> Option<Outcome> {
        self.merged.schedule.result
    }

    pub fn to_record(&self) -> Vec<String> {
        let f = &self.flags;
        let p = &self.performance;
        let mut out = self.merged.to_record();
        out.extend([
            fmt_bool(self.played_all_sets),
            self.streak.wins.to_string(),
            self.streak.losses.to_string(),
            fmt_opt(self.prev_result),
            fmt_opt(self.prev_streak.map(|s| s.wins)),
            fmt_opt(self.prev_streak.map(|s| s.losses)),
            fmt_bool(f.was_set_swept),
            fmt_bool(f.swept_opponent),
            fmt_bool(f.deciding_set_played),
            fmt_bool(f.dominant_sweep),
            fmt_bool(f.deciding_set_win),
            fmt_bool(f.deciding_set_loss),
            fmt_bool(f.team_needed_win),
            fmt_bool(f.confidence_boost_game),
            fmt_bool(f.low_error_game),
            fmt_opt_f64(p.score),
            fmt_opt_f64(p.per_set),
            fmt_opt_f64(self.season_avg_performance),
            fmt_opt_f64(p.efficiency),
            fmt_opt_f64(p.offensive_focus),
            fmt_opt_f64(p.defensive_impact),
            fmt_opt_f64(self.percentile),
            self.highs.season_label(),
            self.highs.career_label(),
            fmt_bool(self.highs.record_breaker()),
            fmt_bool(f.clutch_performance),
            fmt_bool(f.highlight_match),
        ]);
        out
    }
}

/// Season order, then date, then the within-day sequence.
pub fn sort_matches(rows: &mut [MergedMatch]) {
    rows.sort_by(|a, b| {
        let (a, b) = (&a.schedule, &b.schedule);
        a.season
            .cmp(&b.season)
            .then(a.date.cmp(&b.date))
            .then(a.match_no.cmp(&b.match_no))
    });
}

/// Run every tag derivation over the merged dataset.
pub fn derive_tags(cfg: &PipelineConfig, mut rows: Vec<MergedMatch>) -> Vec<EnrichedMatch> {
    sort_matches(&mut rows);

    let streaks = match cfg.streak_scope {
        StreakScope::Season => {
            streaks::grouped_streaks(&rows, |m| m.schedule.result, |m| m.schedule.season)
        }
        StreakScope::Career => streaks::streaks(rows.iter().map(|m| m.schedule.result)),
    };

    let performances: Vec<Performance> = rows
        .iter()
        .map(|m| {
            performance::evaluate(
                &m.stats,
                m.sets_played,
                m.played_all_sets(),
                m.eligible(),
                &cfg.weights,
            )
        })
        .collect();
    let scores: Vec<Option<f64>> = performances.iter().map(|p| p.score).collect();
    let seasons: Vec<Season> = rows.iter().map(|m| m.schedule.season).collect();

    let mut by_season: BTreeMap<Season, Vec<Option<f64>>> = BTreeMap::new();
    for (season, score) in seasons.iter().zip(&scores) {
        by_season.entry(*season).or_default().push(*score);
    }
    let season_avg: BTreeMap<Season, Option<f64>> = by_season
        .into_iter()
        .map(|(season, scores)| (season, performance::mean(scores)))
        .collect();

    let percentiles = percentile::grouped_percentiles(&scores, &seasons);

    let highs = {
        let inputs: Vec<HighInput<'_, Season>> = rows
            .iter()
            .map(|m| HighInput {
                scope: m.schedule.season,
                eligible: m.eligible(),
                stats: &m.stats,
            })
            .collect();
        highs::detect(&inputs, &cfg.high_fields)
    };
    let results: Vec<Option<Outcome>> = rows.iter().map(|m| m.schedule.result).collect();

    let mut out = Vec::with_capacity(rows.len());
    for (idx, merged) in rows.into_iter().enumerate() {
        let prev = idx.checked_sub(1);
        let prev_result = prev.and_then(|p| results[p]);
        let prev_streak = prev.map(|p| streaks[p]);
        let s = &merged.schedule;
        let flags = narrative::derive(
            &NarrativeInput {
                did_play: s.did_play,
                eligible: merged.eligible(),
                result: s.result,
                set_result: s.set_result,
                set_scores: s.set_scores.as_deref(),
                margin_pct: s.margin_pct,
                prev_loss_streak: prev_streak.map(|p| p.losses),
                importance_score: s.importance_score(),
                is_playoffs: s.is_playoffs,
                rivalry: s.rivalry,
                redemption_game: s.redemption_game,
                comeback_win: s.comeback_win,
                percentile: percentiles[idx],
                stats: &merged.stats,
            },
            &cfg.thresholds,
        );
        out.push(EnrichedMatch {
            played_all_sets: merged.played_all_sets(),
            streak: streaks[idx],
            prev_result,
            prev_streak,
            performance: performances[idx],
            season_avg_performance: season_avg.get(&s.season).copied().flatten(),
            percentile: percentiles[idx],
            highs: highs[idx].clone(),
            flags,
            merged,
        });
    }
    out
}

pub fn write_enriched(path: &Path, rows: &[EnrichedMatch]) -> Result<usize> {
    write_csv_atomic(path, &enriched_columns(), rows.iter().map(EnrichedMatch::to_record))
}

#[derive(Debug, Clone)]
pub struct EnrichReport {
    pub path: PathBuf,
    pub rows: Vec<EnrichedMatch>,
}

/// Stage 3: `full_merged_dataset.csv` to `enriched_matches.csv`.
pub fn run(cfg: &PipelineConfig) -> Result<EnrichReport> {
    let merged = final_merge::load_merged(&cfg.merged_dataset_path())?;
    let rows = derive_tags(cfg, merged);
    let path = cfg.enriched_path();
    let n = write_enriched(&path, &rows)?;
    let scored = rows.iter().filter(|r| r.performance.score.is_some()).count();
    info!("tagged {n} matches ({scored} scored) -> {}", path.display());
    Ok(EnrichReport { path, rows })
}
