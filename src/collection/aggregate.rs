use std::collections::HashMap;

use bitvec::prelude::*;

use crate::mutation::{mutation_summary, Mutation};
use crate::sample::Sample;

/// Frequency ranking of the distinct mutations in a set of samples, with
/// per-mutation membership bits for the exact lost-mutation score.
#[derive(Debug, Clone, Default)]
pub struct MutationCensus {
    ranked: Vec<(Mutation, usize)>,
    membership: Vec<BitVec>,
    sample_count: usize,
    total_mutations: usize,
}

impl MutationCensus {
    /// Tally `samples`. Ranking is count descending, then position, then
    /// token text, so equal counts always come out in the same order.
    pub fn count<'a>(samples: impl IntoIterator<Item = &'a Sample>) -> Self {
        let samples: Vec<&Sample> = samples.into_iter().collect();
        let mut index: HashMap<Mutation, usize> = HashMap::new();
        let mut distinct: Vec<Mutation> = Vec::new();
        let mut membership: Vec<BitVec> = Vec::new();
        let mut total_mutations = 0;

        for (s, sample) in samples.iter().enumerate() {
            total_mutations += sample.mutations().len();
            for mutation in sample.mutations() {
                let slot = *index.entry(*mutation).or_insert_with(|| {
                    distinct.push(*mutation);
                    membership.push(bitvec![0; samples.len()]);
                    distinct.len() - 1
                });
                membership[slot].set(s, true);
            }
        }

        let mut order: Vec<usize> = (0..distinct.len()).collect();
        order.sort_by(|&a, &b| {
            membership[b]
                .count_ones()
                .cmp(&membership[a].count_ones())
                .then(distinct[a].position.cmp(&distinct[b].position))
                .then_with(|| distinct[a].to_string().cmp(&distinct[b].to_string()))
        });

        let ranked = order
            .iter()
            .map(|&i| (distinct[i], membership[i].count_ones()))
            .collect();
        let membership = order.iter().map(|&i| membership[i].clone()).collect();

        Self {
            ranked,
            membership,
            sample_count: samples.len(),
            total_mutations,
        }
    }

    /// `(mutation, sample count)` in rank order.
    pub fn ranked(&self) -> &[(Mutation, usize)] {
        &self.ranked
    }

    /// Samples counted.
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Whether no mutation was seen.
    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    /// Indices (in counting order) of the samples carrying the mutation at
    /// `rank`.
    pub fn carriers(&self, rank: usize) -> Vec<usize> {
        self.membership
            .get(rank)
            .map(|bits| bits.iter_ones().collect())
            .unwrap_or_default()
    }

    /// Summed over samples: top-`k` mutations the sample lacks plus its own
    /// mutations outside the top `k`.
    pub fn lost_mutations(&self, k: usize) -> usize {
        let k = k.min(self.ranked.len());
        let ticked: usize = self.membership[..k].iter().map(|bits| bits.count_ones()).sum();
        self.sample_count * k + self.total_mutations - 2 * ticked
    }

    /// Grow the prefix while the lost-mutation score strictly falls.
    pub fn representative_set(&self) -> RepresentativeSet {
        let n = self.ranked.len();
        let scores: Vec<usize> = (0..=n).map(|k| self.lost_mutations(k)).collect();
        let size = scores
            .windows(2)
            .position(|w| w[1] >= w[0])
            .unwrap_or(n);

        RepresentativeSet {
            mutations: self.ranked[..size].iter().map(|(m, _)| *m).collect(),
            scores,
            size,
        }
    }
}

/// Elbow-selected prefix of the ranked mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepresentativeSet {
    /// Selected prefix length.
    pub size: usize,
    /// The selected mutations in rank order.
    pub mutations: Vec<Mutation>,
    /// Lost-mutation score for every prefix length `0..=n`.
    pub scores: Vec<usize>,
}

impl RepresentativeSet {
    /// Selected tokens space-joined; empty when nothing was selected.
    pub fn signature(&self) -> String {
        mutation_summary(&self.mutations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Reference;
    use crate::EngineConfig;

    fn samples(summaries: &[&str]) -> Vec<Sample> {
        let reference = Reference::new("ref", "M".repeat(600), 1);
        summaries
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let mut sample = Sample::new(format!("s{i}"));
                sample.load_mutations(s, &reference, &EngineConfig::default());
                sample
            })
            .collect()
    }

    #[test]
    fn ranks_by_frequency() {
        let group = samples(&["N501Y", "N501Y K417+", "N501Y", "", "D614G"]);
        let census = MutationCensus::count(&group);
        let tokens: Vec<String> = census.ranked().iter().map(|(m, _)| m.to_string()).collect();
        assert_eq!(tokens, vec!["N501Y", "K417+", "D614G"]);
        assert_eq!(census.ranked()[0].1, 3);
        assert_eq!(census.carriers(0), vec![0, 1, 2]);
    }

    #[test]
    fn elbow_keeps_majority_mutation() {
        let group = samples(&["N501Y", "N501Y K417+", "N501Y", "", ""]);
        let set = MutationCensus::count(&group).representative_set();
        assert_eq!(set.scores[0], 4);
        assert_eq!(set.scores[1], 3);
        assert_eq!(set.size, 1);
        assert_eq!(set.signature(), "N501Y");
    }

    #[test]
    fn strictly_falling_scores_select_everything() {
        let group = samples(&["N501Y D614G", "N501Y D614G"]);
        let set = MutationCensus::count(&group).representative_set();
        assert_eq!(set.scores, vec![4, 2, 0]);
        assert_eq!(set.size, 2);
    }

    #[test]
    fn empty_group_has_empty_signature() {
        let set = MutationCensus::count(&[]).representative_set();
        assert_eq!(set.size, 0);
        assert_eq!(set.signature(), "");
    }
}
