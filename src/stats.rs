use std::fmt;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

/// One stat sheet per category per season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatCategory {
    Attacking,
    BallHandling,
    Blocking,
    Digging,
    ServeReceiving,
    Serving,
}

impl StatCategory {
    pub const ALL: [StatCategory; 6] = [
        StatCategory::Attacking,
        StatCategory::BallHandling,
        StatCategory::Blocking,
        StatCategory::Digging,
        StatCategory::ServeReceiving,
        StatCategory::Serving,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StatCategory::Attacking => "attacking",
            StatCategory::BallHandling => "ball_handling",
            StatCategory::Blocking => "blocking",
            StatCategory::Digging => "digging",
            StatCategory::ServeReceiving => "serve_receiving",
            StatCategory::Serving => "serving",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.csv", self.name())
    }

    pub fn fields(self) -> impl Iterator<Item = StatField> {
        StatField::ALL.into_iter().filter(move |f| f.category() == self)
    }
}

impl fmt::Display for StatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatField {
    Kills,
    KillsPerSet,
    KillPct,
    KillAttempts,
    KillErrors,
    HitPct,
    Assists,
    AssistsPerSet,
    BallHandlingAttempts,
    BallHandlingErrors,
    SoloBlocks,
    AssistedBlocks,
    TotalBlocks,
    BlocksPerSet,
    BlockErrors,
    Digs,
    DigErrors,
    DigsPerSet,
    Receiving,
    ReceivingErrors,
    ReceivingPerSet,
    Aces,
    AcesPerSet,
    AcePct,
    ServeAttempts,
    ServeErrors,
    ServePct,
    Points,
}

impl StatField {
    pub const COUNT: usize = 28;

    pub const ALL: [StatField; StatField::COUNT] = [
        StatField::Kills,
        StatField::KillsPerSet,
        StatField::KillPct,
        StatField::KillAttempts,
        StatField::KillErrors,
        StatField::HitPct,
        StatField::Assists,
        StatField::AssistsPerSet,
        StatField::BallHandlingAttempts,
        StatField::BallHandlingErrors,
        StatField::SoloBlocks,
        StatField::AssistedBlocks,
        StatField::TotalBlocks,
        StatField::BlocksPerSet,
        StatField::BlockErrors,
        StatField::Digs,
        StatField::DigErrors,
        StatField::DigsPerSet,
        StatField::Receiving,
        StatField::ReceivingErrors,
        StatField::ReceivingPerSet,
        StatField::Aces,
        StatField::AcesPerSet,
        StatField::AcePct,
        StatField::ServeAttempts,
        StatField::ServeErrors,
        StatField::ServePct,
        StatField::Points,
    ];

    pub fn category(self) -> StatCategory {
        use StatField::*;
        match self {
            Kills | KillsPerSet | KillPct | KillAttempts | KillErrors | HitPct => {
                StatCategory::Attacking
            }
            Assists | AssistsPerSet | BallHandlingAttempts | BallHandlingErrors => {
                StatCategory::BallHandling
            }
            SoloBlocks | AssistedBlocks | TotalBlocks | BlocksPerSet | BlockErrors => {
                StatCategory::Blocking
            }
            Digs | DigErrors | DigsPerSet => StatCategory::Digging,
            Receiving | ReceivingErrors | ReceivingPerSet => StatCategory::ServeReceiving,
            Aces | AcesPerSet | AcePct | ServeAttempts | ServeErrors | ServePct | Points => {
                StatCategory::Serving
            }
        }
    }

    /// Column header as it appears in the raw category sheet.
    pub fn raw_name(self) -> &'static str {
        use StatField::*;
        match self {
            Kills => "kills",
            KillsPerSet => "kills_per_set",
            KillPct => "kill_pct",
            KillAttempts => "kill_att",
            KillErrors => "kill_err",
            HitPct => "hit_pct",
            Assists => "assists",
            AssistsPerSet => "assists_per_set",
            BallHandlingAttempts => "ball_handling_att",
            BallHandlingErrors => "ball_handling_err",
            SoloBlocks => "solo_blks",
            AssistedBlocks => "assisted_blks",
            TotalBlocks => "total_blks",
            BlocksPerSet => "blks_per_set",
            BlockErrors => "blk_err",
            Digs => "digs",
            DigErrors => "dig_err",
            DigsPerSet => "digs_per_set",
            Receiving => "receiving",
            ReceivingErrors => "receiving_err",
            ReceivingPerSet => "receiving_per_set",
            Aces => "aces",
            AcesPerSet => "aces_per_set",
            AcePct => "ace_pct",
            ServeAttempts => "serve_att",
            ServeErrors => "serve_err",
            ServePct => "serve_pct",
            Points => "points",
        }
    }

    /// Column header in the merged and enriched datasets.
    pub fn canonical_name(self) -> &'static str {
        use StatField::*;
        match self {
            Kills => "kills",
            KillsPerSet => "kills_per_set",
            KillPct => "kill_pct",
            KillAttempts => "kill_attempts",
            KillErrors => "kill_errors",
            HitPct => "hit_pct",
            Assists => "assists",
            AssistsPerSet => "assists_per_set",
            BallHandlingAttempts => "ball_handling_attempts",
            BallHandlingErrors => "ball_handling_errors",
            SoloBlocks => "solo_blocks",
            AssistedBlocks => "assisted_blocks",
            TotalBlocks => "total_blocks",
            BlocksPerSet => "blocks_per_set",
            BlockErrors => "block_errors",
            Digs => "digs",
            DigErrors => "dig_errors",
            DigsPerSet => "digs_per_set",
            Receiving => "receiving",
            ReceivingErrors => "receiving_errors",
            ReceivingPerSet => "receiving_per_set",
            Aces => "aces",
            AcesPerSet => "aces_per_set",
            AcePct => "ace_pct",
            ServeAttempts => "serve_attempts",
            ServeErrors => "serve_errors",
            ServePct => "serve_pct",
            Points => "points",
        }
    }

    /// Category-suffixed header used by the per-season stat merges ("kills_attacking").
    pub fn suffixed_name(self) -> String {
        format!("{}_{}", self.raw_name(), self.category().name())
    }

    pub fn is_count(self) -> bool {
        use StatField::*;
        !matches!(
            self,
            KillsPerSet
                | KillPct
                | HitPct
                | AssistsPerSet
                | BlocksPerSet
                | DigsPerSet
                | ReceivingPerSet
                | AcesPerSet
                | AcePct
                | ServePct
        )
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// A match's stat values. `None` means unknown; `Some(0.0)` is a recorded zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatLine {
    values: [Option<f64>; StatField::COUNT],
}

impl Default for StatLine {
    fn default() -> Self {
        Self {
            values: [None; StatField::COUNT],
        }
    }
}

impl StatLine {
    pub fn get(&self, field: StatField) -> Option<f64> {
        self.values[field.index()]
    }

    pub fn set(&mut self, field: StatField, value: Option<f64>) {
        self.values[field.index()] = value;
    }

    /// Missing values read as zero, for additive formulas over eligible matches.
    pub fn or_zero(&self, field: StatField) -> f64 {
        self.get(field).unwrap_or(0.0)
    }
}

/// Parse a stat cell. Empty cells and dashes are unknown; `%` values become fractions.
pub fn parse_stat_cell(raw: &str) -> Result<Option<f64>> {
    let s = raw.trim();
    if s.is_empty() || s == "-" || s.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    if let Some(pct) = s.strip_suffix('%') {
        let v = pct
            .trim()
            .parse::<f64>()
            .map_err(|_| anyhow!("invalid percent '{raw}'"))?;
        return Ok(Some(v / 100.0));
    }
    s.parse::<f64>()
        .map(Some)
        .map_err(|_| anyhow!("invalid number '{raw}'"))
}

pub fn format_stat(field: StatField, value: Option<f64>) -> String {
    match value {
        None => String::new(),
        Some(v) if field.is_count() => format!("{}", v.round() as i64),
        Some(v) => crate::table::fmt_f64(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_field_belongs_to_one_category() {
        let total: usize = StatCategory::ALL.iter().map(|c| c.fields().count()).sum();
        assert_eq!(total, StatField::COUNT);
        for (idx, field) in StatField::ALL.iter().enumerate() {
            assert_eq!(field.index(), idx);
        }
    }

    #[test]
    fn names_follow_sheet_conventions() {
        assert_eq!(StatField::KillAttempts.suffixed_name(), "kill_att_attacking");
        assert_eq!(StatField::TotalBlocks.canonical_name(), "total_blocks");
        assert_eq!(StatField::Receiving.suffixed_name(), "receiving_serve_receiving");
    }

    #[test]
    fn cells_distinguish_unknown_from_zero() {
        assert_eq!(parse_stat_cell("").unwrap(), None);
        assert_eq!(parse_stat_cell(" - ").unwrap(), None);
        assert_eq!(parse_stat_cell("0").unwrap(), Some(0.0));
        assert_eq!(parse_stat_cell("25%").unwrap(), Some(0.25));
        assert!(parse_stat_cell("lots").is_err());
    }

    #[test]
    fn counts_render_without_decimals() {
        assert_eq!(format_stat(StatField::Kills, Some(7.0)), "7");
        assert_eq!(format_stat(StatField::KillPct, Some(0.33333)), "0.3333");
        assert_eq!(format_stat(StatField::Digs, None), "");
    }
}
