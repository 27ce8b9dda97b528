use crate::config::PerformanceWeights;
use crate::stats::{StatField, StatLine};

/// Composite score and the scalars derived from it for one match. Every
/// field is `None` for matches that are not eligible.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Performance {
    pub score: Option<f64>,
    pub per_set: Option<f64>,
    pub efficiency: Option<f64>,
    pub offensive_focus: Option<f64>,
    pub defensive_impact: Option<f64>,
}

/// Weighted offensive and full composite sums. Missing stats count as zero.
fn weighted_terms(stats: &StatLine, played_all_sets: bool, w: &PerformanceWeights) -> (f64, f64) {
    let offense = stats.or_zero(StatField::Kills) * w.kills
        + stats.or_zero(StatField::KillPct) * w.kill_pct
        + stats.or_zero(StatField::Aces) * w.aces
        + stats.or_zero(StatField::AcePct) * w.ace_pct;
    let support = stats.or_zero(StatField::Digs) * w.digs
        + stats.or_zero(StatField::Assists) * w.assists
        + stats.or_zero(StatField::Receiving) * w.serve_receptions;
    let errors = stats.or_zero(StatField::ReceivingErrors) * w.receiving_errors
        + stats.or_zero(StatField::KillErrors) * w.kill_errors
        + stats.or_zero(StatField::ServeErrors) * w.serve_errors;
    let bonus = if played_all_sets { w.full_match_bonus } else { 0.0 };
    (offense, offense + support + errors + bonus)
}

pub fn composite_score(stats: &StatLine, played_all_sets: bool, w: &PerformanceWeights) -> f64 {
    weighted_terms(stats, played_all_sets, w).1
}

const ERROR_FIELDS: [StatField; 3] = [
    StatField::KillErrors,
    StatField::ServeErrors,
    StatField::ReceivingErrors,
];

/// Kill, serve and receiving errors, missing ones counted as zero.
pub fn unforced_errors(stats: &StatLine) -> f64 {
    ERROR_FIELDS.iter().map(|f| stats.or_zero(*f)).sum()
}

/// Kill, serve and receiving errors, or `None` unless all three were recorded.
pub fn recorded_errors(stats: &StatLine) -> Option<f64> {
    ERROR_FIELDS
        .iter()
        .map(|f| stats.get(*f))
        .sum::<Option<f64>>()
}

pub fn evaluate(
    stats: &StatLine,
    sets_played: Option<u32>,
    played_all_sets: bool,
    eligible: bool,
    w: &PerformanceWeights,
) -> Performance {
    if !eligible {
        return Performance::default();
    }
    let (offense, score) = weighted_terms(stats, played_all_sets, w);
    let sets = sets_played.filter(|s| *s > 0).map(f64::from);
    Performance {
        score: Some(score),
        per_set: sets.map(|s| score / s),
        efficiency: Some(score / (1.0 + unforced_errors(stats))),
        offensive_focus: (score != 0.0).then(|| offense / score),
        defensive_impact: sets.map(|s| {
            (stats.or_zero(StatField::Digs) + stats.or_zero(StatField::Receiving)) / s
        }),
    }
}

/// Mean of the non-null scores, or `None` when there are none.
pub fn mean(scores: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, n) = scores
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}
