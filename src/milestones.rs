use std::collections::BTreeSet;

use crate::season::Season;

/// Positional landmarks of a career; ordering controls how labels render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Milestone {
    FirstCareer,
    FirstOfSeason(Season),
    LastOfSeason(Season),
    LastCareer,
}

impl Milestone {
    pub fn label(self) -> String {
        match self {
            Milestone::FirstCareer => "first MSSD match".to_string(),
            Milestone::FirstOfSeason(s) => format!("first {s} match"),
            Milestone::LastOfSeason(s) => format!("last {s} match"),
            Milestone::LastCareer => "last MSSD match".to_string(),
        }
    }
}

/// Milestones per match, given each match's season in career order.
pub fn milestone_sets(seasons: &[Season]) -> Vec<BTreeSet<Milestone>> {
    let mut out = vec![BTreeSet::new(); seasons.len()];
    let Some(last) = seasons.len().checked_sub(1) else {
        return out;
    };
    out[0].insert(Milestone::FirstCareer);
    out[last].insert(Milestone::LastCareer);

    for (idx, season) in seasons.iter().enumerate() {
        if idx == 0 || seasons[idx - 1] != *season {
            out[idx].insert(Milestone::FirstOfSeason(*season));
        }
        if idx == last || seasons[idx + 1] != *season {
            out[idx].insert(Milestone::LastOfSeason(*season));
        }
    }
    out
}

pub fn render(set: &BTreeSet<Milestone>) -> String {
    set.iter()
        .map(|m| m.label())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_union_without_clobbering() {
        use Season::*;
        let sets = milestone_sets(&[Freshman, Freshman, Sophomore, Senior, Senior]);
        let labels: Vec<String> = sets.iter().map(render).collect();
        assert_eq!(labels[0], "first MSSD match; first FR match");
        assert_eq!(labels[1], "last FR match");
        assert_eq!(labels[2], "first SO match; last SO match");
        assert_eq!(labels[3], "first SR match");
        assert_eq!(labels[4], "last SR match; last MSSD match");
    }

    #[test]
    fn single_match_career_holds_every_label() {
        let sets = milestone_sets(&[Season::Junior]);
        assert_eq!(
            render(&sets[0]),
            "first MSSD match; first JR match; last JR match; last MSSD match"
        );
        assert!(milestone_sets(&[]).is_empty());
    }

    #[test]
    fn first_match_does_not_depend_on_which_seasons_exist() {
        let sets = milestone_sets(&[Season::Sophomore, Season::Senior]);
        assert!(sets[0].contains(&Milestone::FirstCareer));
    }
}
