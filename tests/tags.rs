use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use vb_career::outcome::Outcome;
use vb_career::percentile::{average_rank_percentiles, grouped_percentiles};
use vb_career::streaks::streaks;

fn sample_scores(rng: &mut StdRng, n: usize) -> Vec<Option<f64>> {
    use rand::Rng;
    (0..n)
        .map(|_| {
            if rng.gen_bool(0.15) {
                None
            } else {
                // Coarse values so ties actually occur.
                Some(f64::from(rng.gen_range(0..12u32)) * 2.5)
            }
        })
        .collect()
}

#[test]
fn percentiles_do_not_depend_on_row_order() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..25 {
        let scores = sample_scores(&mut rng, 40);
        let base = average_rank_percentiles(&scores);

        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.shuffle(&mut rng);
        let shuffled: Vec<Option<f64>> = order.iter().map(|i| scores[*i]).collect();
        let got = average_rank_percentiles(&shuffled);

        for (pos, idx) in order.iter().enumerate() {
            assert_eq!(got[pos], base[*idx]);
        }
    }
}

#[test]
fn percentiles_stay_in_range_and_track_score_order() {
    let mut rng = StdRng::seed_from_u64(11);
    let scores = sample_scores(&mut rng, 60);
    let pct = average_rank_percentiles(&scores);
    for (a, pa) in scores.iter().zip(&pct) {
        assert_eq!(a.is_some(), pa.is_some());
        if let Some(p) = pa {
            assert!(*p > 0.0 && *p <= 100.0);
        }
        for (b, pb) in scores.iter().zip(&pct) {
            if let (Some(a), Some(b), Some(pa), Some(pb)) = (a, b, pa, pb) {
                if a < b {
                    assert!(pa < pb);
                }
                if a == b {
                    assert_eq!(pa, pb);
                }
            }
        }
    }
}

#[test]
fn grouped_percentiles_match_ranking_each_group_alone() {
    let mut rng = StdRng::seed_from_u64(3);
    let scores = sample_scores(&mut rng, 30);
    let groups: Vec<u8> = (0..30).map(|i| (i % 3) as u8).collect();
    let got = grouped_percentiles(&scores, &groups);
    for g in 0..3u8 {
        let members: Vec<usize> = (0..30).filter(|i| groups[*i] == g).collect();
        let alone =
            average_rank_percentiles(&members.iter().map(|i| scores[*i]).collect::<Vec<_>>());
        for (i, expected) in members.iter().zip(alone) {
            assert_eq!(got[*i], expected);
        }
    }
}

#[test]
fn streak_counters_are_never_both_running() {
    let mut rng = StdRng::seed_from_u64(19);
    let choices = [
        Some(Outcome::Win),
        Some(Outcome::Loss),
        Some(Outcome::Tie),
        None,
    ];
    let results: Vec<Option<Outcome>> = (0..200)
        .map(|_| *choices.choose(&mut rng).unwrap())
        .collect();
    let got = streaks(results.iter().copied());
    for (idx, s) in got.iter().enumerate() {
        assert!(s.wins == 0 || s.losses == 0);
        match results[idx] {
            Some(Outcome::Win) => {
                let before = idx.checked_sub(1).map_or(0, |p| got[p].wins);
                assert_eq!(s.wins, before + 1);
            }
            Some(Outcome::Loss) => {
                let before = idx.checked_sub(1).map_or(0, |p| got[p].losses);
                assert_eq!(s.losses, before + 1);
            }
            _ => assert_eq!((s.wins, s.losses), (0, 0)),
        }
    }
}
