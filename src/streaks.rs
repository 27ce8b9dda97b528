use crate::outcome::Outcome;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Streak {
    pub wins: u32,
    pub losses: u32,
}

impl Streak {
    /// Advance past one match. Ties and unknown results reset both runs.
    pub fn step(self, result: Option<Outcome>) -> Streak {
        match result {
            Some(Outcome::Win) => Streak {
                wins: self.wins + 1,
                losses: 0,
            },
            Some(Outcome::Loss) => Streak {
                wins: 0,
                losses: self.losses + 1,
            },
            Some(Outcome::Tie) | None => Streak::default(),
        }
    }
}

/// Running streaks, inclusive of each match, over a chronologically ordered scope.
pub fn streaks<I>(results: I) -> Vec<Streak>
where
    I: IntoIterator<Item = Option<Outcome>>,
{
    let mut current = Streak::default();
    results
        .into_iter()
        .map(|result| {
            current = current.step(result);
            current
        })
        .collect()
}

/// Streaks computed independently per contiguous group; `group_of` gives each
/// entry's group key and entries must already be ordered by group.
pub fn grouped_streaks<T, K, R, G>(items: &[T], result_of: R, group_of: G) -> Vec<Streak>
where
    K: PartialEq,
    R: Fn(&T) -> Option<Outcome>,
    G: Fn(&T) -> K,
{
    let mut out = Vec::with_capacity(items.len());
    let mut current = Streak::default();
    let mut last_group: Option<K> = None;
    for item in items {
        let group = group_of(item);
        if last_group.as_ref() != Some(&group) {
            current = Streak::default();
        }
        current = current.step(result_of(item));
        out.push(current);
        last_group = Some(group);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use Outcome::*;

    #[test]
    fn tie_resets_both_runs() {
        let got = streaks([Some(Win), Some(Win), Some(Loss), Some(Tie), Some(Win)]);
        let wins: Vec<u32> = got.iter().map(|s| s.wins).collect();
        let losses: Vec<u32> = got.iter().map(|s| s.losses).collect();
        assert_eq!(wins, vec![1, 2, 0, 0, 1]);
        assert_eq!(losses, vec![0, 0, 1, 0, 0]);
    }

    #[test]
    fn never_both_nonzero() {
        let seq = [
            Some(Loss),
            Some(Loss),
            None,
            Some(Win),
            Some(Loss),
            Some(Win),
            Some(Win),
            Some(Tie),
        ];
        for s in streaks(seq) {
            assert!(s.wins == 0 || s.losses == 0);
        }
    }

    #[test]
    fn groups_restart_counting() {
        let items = [(1, Win), (1, Win), (2, Win), (2, Loss), (2, Loss)];
        let got = grouped_streaks(&items, |(_, r)| Some(*r), |(g, _)| *g);
        assert_eq!(got[1].wins, 2);
        assert_eq!(got[2].wins, 1);
        assert_eq!(got[4].losses, 2);
    }
}
