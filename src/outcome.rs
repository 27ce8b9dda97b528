use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Win,
    Loss,
    Tie,
}

impl Outcome {
    pub fn code(self) -> &'static str {
        match self {
            Outcome::Win => "W",
            Outcome::Loss => "L",
            Outcome::Tie => "T",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Outcome {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        // Stat sheets sometimes carry the tally in the same cell ("W 2-1").
        let head = raw.trim().split_whitespace().next().unwrap_or_default();
        match head.to_ascii_uppercase().as_str() {
            "W" => Ok(Outcome::Win),
            "L" => Ok(Outcome::Loss),
            "T" => Ok(Outcome::Tie),
            other => Err(anyhow!("unknown result '{other}'")),
        }
    }
}

/// Sets won and lost, from the team's perspective ("2-1").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetTally {
    pub won: u32,
    pub lost: u32,
}

impl SetTally {
    pub fn count(self) -> u32 {
        self.won + self.lost
    }

    pub fn diff(self) -> i32 {
        self.won as i32 - self.lost as i32
    }

    /// The match needed every available set: best-of-3 went to 3, best-of-5 went to 5.
    pub fn went_the_distance(self) -> bool {
        self.won.abs_diff(self.lost) == 1 && self.won.max(self.lost) >= 2
    }

    pub fn is_sweep_win(self) -> bool {
        self.lost == 0 && self.won >= 2
    }

    pub fn is_sweep_loss(self) -> bool {
        self.won == 0 && self.lost >= 2
    }
}

impl fmt::Display for SetTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.won, self.lost)
    }
}

impl FromStr for SetTally {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let (won, lost) = parse_pair(raw).ok_or_else(|| anyhow!("invalid set tally '{raw}'"))?;
        Ok(SetTally { won, lost })
    }
}

/// One set's points, already from the team's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetScore {
    pub team: u32,
    pub opponent: u32,
}

impl SetScore {
    pub fn margin(self) -> i32 {
        self.team as i32 - self.opponent as i32
    }
}

/// Parse a set score list. Scores are listed winner-first, so a lost match
/// is flipped to the team's perspective. Unparseable entries are skipped.
pub fn team_set_scores(raw: &str, result: Option<Outcome>) -> Vec<SetScore> {
    raw.split(',')
        .filter_map(parse_pair)
        .map(|(a, b)| match result {
            Some(Outcome::Loss) => SetScore { team: b, opponent: a },
            _ => SetScore { team: a, opponent: b },
        })
        .collect()
}

pub fn point_totals(sets: &[SetScore]) -> Option<(u32, u32)> {
    if sets.is_empty() {
        return None;
    }
    Some(sets.iter().fold((0, 0), |(f, a), s| (f + s.team, a + s.opponent)))
}

/// Won the match after dropping the first set.
pub fn is_comeback(sets: &[SetScore], result: Option<Outcome>) -> bool {
    result == Some(Outcome::Win) && sets.first().is_some_and(|s| s.margin() < 0)
}

fn parse_pair(raw: &str) -> Option<(u32, u32)> {
    let (a, b) = raw.trim().split_once('-')?;
    Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
}
