use crate::config::FlagThresholds;
use crate::outcome::{self, Outcome, SetTally};
use crate::performance;
use crate::stats::StatLine;

/// Already-derived fields of one match that the storyline predicates read.
#[derive(Debug, Clone, Copy)]
pub struct NarrativeInput<'a> {
    pub did_play: bool,
    pub eligible: bool,
    pub result: Option<Outcome>,
    pub set_result: Option<SetTally>,
    pub set_scores: Option<&'a str>,
    pub margin_pct: Option<f64>,
    pub prev_loss_streak: Option<u32>,
    pub importance_score: u8,
    pub is_playoffs: bool,
    pub rivalry: bool,
    pub redemption_game: bool,
    pub comeback_win: bool,
    pub percentile: Option<f64>,
    pub stats: &'a StatLine,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NarrativeFlags {
    pub was_set_swept: bool,
    pub swept_opponent: bool,
    pub deciding_set_played: bool,
    pub dominant_sweep: bool,
    pub deciding_set_win: bool,
    pub deciding_set_loss: bool,
    pub team_needed_win: bool,
    pub confidence_boost_game: bool,
    pub low_error_game: bool,
    pub clutch_performance: bool,
    pub highlight_match: bool,
}

fn last_set_margin(input: &NarrativeInput<'_>) -> Option<i32> {
    let sets = outcome::team_set_scores(input.set_scores?, input.result);
    sets.last().map(|s| s.margin().abs())
}

pub fn derive(input: &NarrativeInput<'_>, t: &FlagThresholds) -> NarrativeFlags {
    let tally = input.set_result;
    let was_set_swept = tally.is_some_and(SetTally::is_sweep_loss);
    let swept_opponent = tally.is_some_and(SetTally::is_sweep_win);
    let deciding_set_played = tally.is_some_and(SetTally::went_the_distance);

    let tight_finish = deciding_set_played
        && input.did_play
        && last_set_margin(input) == Some(t.deciding_set_margin);

    let team_needed_win = input
        .prev_loss_streak
        .is_some_and(|n| n >= t.needed_win_losses);

    let high_stakes = input.importance_score >= t.high_importance;
    let clutch_performance =
        high_stakes && input.percentile.is_some_and(|p| p >= t.clutch_percentile);
    let highlight_match = input
        .percentile
        .is_some_and(|p| p >= t.highlight_percentile)
        && (high_stakes
            || input.is_playoffs
            || input.rivalry
            || input.redemption_game
            || input.comeback_win);

    NarrativeFlags {
        was_set_swept,
        swept_opponent,
        deciding_set_played,
        dominant_sweep: swept_opponent
            && input.margin_pct.is_some_and(|m| m >= t.dominant_sweep_margin),
        deciding_set_win: tight_finish && input.result == Some(Outcome::Win),
        deciding_set_loss: tight_finish && input.result == Some(Outcome::Loss),
        team_needed_win,
        confidence_boost_game: team_needed_win && input.result == Some(Outcome::Win),
        low_error_game: input.eligible
            && performance::recorded_errors(input.stats).is_some_and(|e| e <= t.low_error_max),
        clutch_performance,
        highlight_match,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::StatField;

    fn base(stats: &StatLine) -> NarrativeInput<'_> {
        NarrativeInput {
            did_play: true,
            eligible: true,
            result: Some(Outcome::Win),
            set_result: Some(SetTally { won: 2, lost: 1 }),
            set_scores: Some("25-20,20-25,15-13"),
            margin_pct: Some(0.05),
            prev_loss_streak: Some(0),
            importance_score: 0,
            is_playoffs: false,
            rivalry: false,
            redemption_game: false,
            comeback_win: false,
            percentile: Some(50.0),
            stats,
        }
    }

    #[test]
    fn deciding_set_needs_a_two_point_finish() {
        let stats = StatLine::default();
        let t = FlagThresholds::default();
        let flags = derive(&base(&stats), &t);
        assert!(flags.deciding_set_played);
        assert!(flags.deciding_set_win);
        assert!(!flags.deciding_set_loss);

        let mut input = base(&stats);
        input.set_scores = Some("25-20,20-25,15-10");
        assert!(!derive(&input, &t).deciding_set_win);

        // Lost 1-2, final set listed winner-first as 16-14.
        let mut input = base(&stats);
        input.result = Some(Outcome::Loss);
        input.set_result = Some(SetTally { won: 1, lost: 2 });
        input.set_scores = Some("25-20,20-25,16-14");
        let flags = derive(&input, &t);
        assert!(flags.deciding_set_loss);
        assert!(!flags.deciding_set_win);
    }

    #[test]
    fn sweeps_and_dominance() {
        let stats = StatLine::default();
        let t = FlagThresholds::default();
        let mut input = base(&stats);
        input.set_result = Some(SetTally { won: 2, lost: 0 });
        input.margin_pct = Some(0.25);
        let flags = derive(&input, &t);
        assert!(flags.swept_opponent && flags.dominant_sweep);
        assert!(!flags.deciding_set_played);

        input.margin_pct = None;
        assert!(!derive(&input, &t).dominant_sweep);
    }

    #[test]
    fn lagged_loss_streak_drives_needed_win() {
        let stats = StatLine::default();
        let t = FlagThresholds::default();
        let mut input = base(&stats);
        input.prev_loss_streak = Some(2);
        let flags = derive(&input, &t);
        assert!(flags.team_needed_win && flags.confidence_boost_game);

        input.result = Some(Outcome::Loss);
        let flags = derive(&input, &t);
        assert!(flags.team_needed_win && !flags.confidence_boost_game);

        input.prev_loss_streak = None;
        assert!(!derive(&input, &t).team_needed_win);
    }

    #[test]
    fn clutch_and_highlight_thresholds() {
        let stats = StatLine::default();
        let t = FlagThresholds::default();
        let mut input = base(&stats);
        input.importance_score = 2;
        input.percentile = Some(75.0);
        let flags = derive(&input, &t);
        assert!(flags.clutch_performance);
        assert!(!flags.highlight_match);

        input.importance_score = 0;
        input.percentile = Some(95.0);
        assert!(!derive(&input, &t).highlight_match);
        input.rivalry = true;
        assert!(derive(&input, &t).highlight_match);

        input.percentile = None;
        let flags = derive(&input, &t);
        assert!(!flags.highlight_match && !flags.clutch_performance);
    }

    #[test]
    fn low_error_game_counts_three_error_kinds() {
        let mut stats = StatLine::default();
        stats.set(StatField::KillErrors, Some(1.0));
        stats.set(StatField::ServeErrors, Some(1.0));
        let t = FlagThresholds::default();
        // Receiving errors unknown.
        assert!(!derive(&base(&stats), &t).low_error_game);
        stats.set(StatField::ReceivingErrors, Some(0.0));
        assert!(derive(&base(&stats), &t).low_error_game);
        stats.set(StatField::ReceivingErrors, Some(1.0));
        assert!(!derive(&base(&stats), &t).low_error_game);

        let mut input = base(&stats);
        input.eligible = false;
        assert!(!derive(&input, &t).low_error_game);
    }

    #[test]
    fn low_error_game_needs_recorded_errors() {
        let stats = StatLine::default();
        let flags = derive(&base(&stats), &FlagThresholds::default());
        assert!(!flags.low_error_game);
    }
}
