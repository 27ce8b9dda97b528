use std::collections::BTreeMap;

use crate::enrich::EnrichedMatch;
use crate::outcome::Outcome;
use crate::performance;
use crate::season::Season;
use crate::stats::StatField;
use crate::table::{fmt_f64, fmt_opt_f64};

pub const SUMMARY_COLUMNS: [&str; 11] = [
    "season",
    "matches",
    "wins",
    "losses",
    "ties",
    "played",
    "kills",
    "aces",
    "digs",
    "total_blocks",
    "avg_performance",
];

const TOTAL_FIELDS: [StatField; 4] = [
    StatField::Kills,
    StatField::Aces,
    StatField::Digs,
    StatField::TotalBlocks,
];

#[derive(Debug, Clone, PartialEq)]
pub struct SeasonSummary {
    pub season: Season,
    pub matches: usize,
    pub wins: usize,
    pub losses: usize,
    pub ties: usize,
    pub played: usize,
    /// Totals of `TOTAL_FIELDS`, `None` for seasons without stat sheets.
    pub totals: Option<[f64; 4]>,
    pub avg_performance: Option<f64>,
}

impl SeasonSummary {
    pub fn record(&self) -> String {
        format!("{}-{}-{}", self.wins, self.losses, self.ties)
    }

    pub fn total(&self, field: StatField) -> Option<f64> {
        let idx = TOTAL_FIELDS.iter().position(|f| *f == field)?;
        self.totals.map(|t| t[idx])
    }

    pub fn to_record(&self) -> Vec<String> {
        let mut out = vec![
            self.season.to_string(),
            self.matches.to_string(),
            self.wins.to_string(),
            self.losses.to_string(),
            self.ties.to_string(),
            self.played.to_string(),
        ];
        out.extend(TOTAL_FIELDS.iter().map(|f| fmt_opt_f64(self.total(*f))));
        out.push(fmt_opt_f64(self.avg_performance));
        out
    }
}

/// Per-season record and totals, in season order.
pub fn summarize(rows: &[EnrichedMatch]) -> Vec<SeasonSummary> {
    let mut by_season: BTreeMap<Season, Vec<&EnrichedMatch>> = BTreeMap::new();
    for row in rows {
        by_season.entry(row.season()).or_default().push(row);
    }
    by_season
        .into_iter()
        .map(|(season, rows)| {
            let count = |want: Outcome| rows.iter().filter(|r| r.result() == Some(want)).count();
            let has_stats = rows.iter().any(|r| r.merged.stats_available);
            let totals = has_stats.then(|| {
                TOTAL_FIELDS.map(|f| {
                    rows.iter()
                        .filter(|r| r.merged.eligible())
                        .map(|r| r.merged.stats.or_zero(f))
                        .sum::<f64>()
                })
            });
            SeasonSummary {
                season,
                matches: rows.len(),
                wins: count(Outcome::Win),
                losses: count(Outcome::Loss),
                ties: count(Outcome::Tie),
                played: rows.iter().filter(|r| r.merged.schedule.did_play).count(),
                totals,
                avg_performance: performance::mean(rows.iter().map(|r| r.performance.score)),
            }
        })
        .collect()
}

/// One line per season for the run log.
pub fn describe(summary: &SeasonSummary) -> String {
    let avg = summary
        .avg_performance
        .map(fmt_f64)
        .unwrap_or_else(|| "n/a".to_string());
    match summary.total(StatField::Kills) {
        Some(kills) => format!(
            "{}: {} matches, record {}, {} kills, avg performance {avg}",
            summary.season,
            summary.matches,
            summary.record(),
            fmt_f64(kills)
        ),
        None => format!(
            "{}: {} matches, record {}, no stat sheets",
            summary.season,
            summary.matches,
            summary.record()
        ),
    }
}
