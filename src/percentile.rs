use std::cmp::Ordering;

/// Average-rank percentiles in `(0, 100]`. `None` entries stay out of the
/// population and come back as `None`; results line up with `values`.
pub fn average_rank_percentiles(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut present: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(idx, v)| v.filter(|x| x.is_finite()).map(|x| (idx, x)))
        .collect();
    let mut out = vec![None; values.len()];
    let n = present.len();
    if n == 0 {
        return out;
    }
    present.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && present[end].1 == present[start].1 {
            end += 1;
        }
        // Ranks start..end (0-based) map to 1-based start+1..=end.
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        let pct = avg_rank / n as f64 * 100.0;
        for (idx, _) in &present[start..end] {
            out[*idx] = Some(pct);
        }
        start = end;
    }
    out
}

/// Percentiles computed within each group; `groups[i]` is the key of `values[i]`.
pub fn grouped_percentiles<K: Ord + Clone>(
    values: &[Option<f64>],
    groups: &[K],
) -> Vec<Option<f64>> {
    debug_assert_eq!(values.len(), groups.len());
    let mut out = vec![None; values.len()];
    let mut keys: Vec<K> = groups.to_vec();
    keys.sort();
    keys.dedup();
    for key in keys {
        let members: Vec<usize> = (0..groups.len()).filter(|i| groups[*i] == key).collect();
        let scoped: Vec<Option<f64>> = members.iter().map(|i| values[*i]).collect();
        for (slot, pct) in members.iter().zip(average_rank_percentiles(&scoped)) {
            out[*slot] = pct;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ties_share_the_mean_rank() {
        let got = average_rank_percentiles(&[Some(10.0), Some(10.0), Some(20.0)]);
        assert_eq!(got, vec![Some(50.0), Some(50.0), Some(100.0)]);
    }

    #[test]
    fn nulls_are_not_ranked() {
        let got = average_rank_percentiles(&[None, Some(3.0), Some(1.0), None]);
        assert_eq!(got, vec![None, Some(100.0), Some(50.0), None]);
        assert!(average_rank_percentiles(&[None]).iter().all(Option::is_none));
    }

    #[test]
    fn groups_rank_independently() {
        let values = [Some(1.0), Some(100.0), Some(2.0), Some(5.0)];
        let groups = ["a", "b", "a", "b"];
        let got = grouped_percentiles(&values, &groups);
        assert_eq!(got, vec![Some(50.0), Some(100.0), Some(100.0), Some(50.0)]);
    }
}
