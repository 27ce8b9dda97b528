use std::collections::HashMap;
use std::hash::Hash;

use crate::stats::{StatField, StatLine};

/// One entry of the high-water-mark population.
#[derive(Debug, Clone, Copy)]
pub struct HighInput<'a, K> {
    pub scope: K,
    pub eligible: bool,
    pub stats: &'a StatLine,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Highs {
    pub season: Vec<StatField>,
    pub career: Vec<StatField>,
}

impl Highs {
    pub fn season_label(&self) -> String {
        label(&self.season)
    }

    pub fn career_label(&self) -> String {
        label(&self.career)
    }

    pub fn record_breaker(&self) -> bool {
        !self.career.is_empty()
    }
}

fn label(fields: &[StatField]) -> String {
    fields
        .iter()
        .map(|f| f.canonical_name())
        .collect::<Vec<_>>()
        .join(";")
}

fn bump_max(slot: &mut Option<f64>, value: f64) {
    if slot.is_none_or(|cur| value > cur) {
        *slot = Some(value);
    }
}

/// Season and career highs for each entry. Only eligible entries with a
/// recorded value compete; ties at the maximum all hold the high, and a
/// maximum of zero awards nothing.
pub fn detect<K: Eq + Hash + Copy>(rows: &[HighInput<'_, K>], fields: &[StatField]) -> Vec<Highs> {
    let mut career_max: Vec<Option<f64>> = vec![None; fields.len()];
    let mut scope_max: HashMap<K, Vec<Option<f64>>> = HashMap::new();
    for row in rows.iter().filter(|r| r.eligible) {
        let scoped = scope_max
            .entry(row.scope)
            .or_insert_with(|| vec![None; fields.len()]);
        for (idx, field) in fields.iter().enumerate() {
            if let Some(v) = row.stats.get(*field) {
                bump_max(&mut career_max[idx], v);
                bump_max(&mut scoped[idx], v);
            }
        }
    }

    let holds = |value: Option<f64>, max: Option<f64>| match (value, max) {
        (Some(v), Some(m)) => m > 0.0 && v == m,
        _ => false,
    };

    rows.iter()
        .map(|row| {
            if !row.eligible {
                return Highs::default();
            }
            let scoped = scope_max.get(&row.scope);
            let mut highs = Highs::default();
            for (idx, field) in fields.iter().enumerate() {
                let value = row.stats.get(*field);
                if holds(value, scoped.and_then(|s| s[idx])) {
                    highs.season.push(*field);
                }
                if holds(value, career_max[idx]) {
                    highs.career.push(*field);
                }
            }
            highs
        })
        .collect()
}
