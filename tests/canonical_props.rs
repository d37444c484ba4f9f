use std::collections::BTreeSet;

use mutscan::alignment::left_justify_deletions;
use mutscan::mutation::{mutation_summary, parse_summary};
use mutscan::sample::{organise_map, Reference};
use mutscan::{Change, Mutation};
use proptest::prelude::*;

fn apply_deletions(reference: &str, mutations: &[Mutation]) -> String {
    let deleted: BTreeSet<i32> = mutations.iter().map(|m| m.position).collect();
    reference
        .chars()
        .enumerate()
        .filter(|(i, _)| !deleted.contains(&(*i as i32 + 1)))
        .map(|(_, c)| c)
        .collect()
}

fn deletion_run(reference: &str, start: usize, len: usize) -> Vec<Mutation> {
    (start..start + len)
        .map(|p| Mutation::deletion(reference.as_bytes()[p - 1], p as i32))
        .collect()
}

fn residue() -> impl Strategy<Value = u8> {
    prop_oneof![Just(b'A'), Just(b'G'), Just(b'C')]
}

fn change() -> impl Strategy<Value = Change> {
    prop_oneof![
        (b'A'..=b'Z').prop_map(Change::Substitution),
        Just(Change::Insertion),
        Just(Change::Deletion),
        Just(Change::GlycanGained),
        Just(Change::GlycanLost),
    ]
}

proptest! {
    #[test]
    fn justified_run_encodes_the_same_sample(
        reference in proptest::collection::vec(residue(), 8..30),
        run in 1usize..4,
        seed in any::<usize>(),
    ) {
        let reference = String::from_utf8(reference).expect("ascii residues");
        let n = reference.len();
        // internal run: starts after residue 1, ends before residue n
        let start = 2 + seed % (n - run - 1);
        let original = deletion_run(&reference, start, run);
        let snapshot = Reference::new("ref", reference.as_str(), 1);

        let mut justified = original.clone();
        left_justify_deletions(&mut justified, &snapshot, snapshot.span());

        prop_assert_eq!(justified.len(), run);
        prop_assert!(justified.iter().all(Mutation::is_deletion));
        let first = justified[0].position;
        prop_assert!(first <= start as i32, "runs only move left");
        for (offset, mutation) in justified.iter().enumerate() {
            prop_assert_eq!(mutation.position, first + offset as i32);
            prop_assert_eq!(
                Some(mutation.from),
                snapshot.residue_at(mutation.position),
                "from residue follows the reference"
            );
        }
        prop_assert_eq!(
            apply_deletions(&reference, &justified),
            apply_deletions(&reference, &original)
        );

        let mut again = justified.clone();
        let report = left_justify_deletions(&mut again, &snapshot, snapshot.span());
        prop_assert_eq!(again, justified);
        prop_assert_eq!(report.runs_shifted, 0);
    }

    #[test]
    fn summary_tokens_round_trip(
        mutations in proptest::collection::vec((b'A'..=b'Z', 1i32..2000, change()), 0..12),
    ) {
        let mutations: Vec<Mutation> = mutations
            .into_iter()
            .map(|(from, position, change)| Mutation::new(from, position, change))
            .collect();
        let (parsed, errors) = parse_summary(&mutation_summary(&mutations));
        prop_assert!(errors.is_empty());
        prop_assert_eq!(parsed, mutations);
    }

    #[test]
    fn coordinate_map_tracks_surviving_residues(
        reference in proptest::collection::vec(residue(), 4..40),
        picks in proptest::collection::btree_set(any::<usize>(), 0..6),
    ) {
        let reference = String::from_utf8(reference).expect("ascii residues");
        let deleted: BTreeSet<usize> = picks.iter().map(|p| 1 + p % reference.len()).collect();
        let mutations: Vec<Mutation> = deleted
            .iter()
            .map(|&p| Mutation::deletion(reference.as_bytes()[p - 1], p as i32))
            .collect();
        let result = apply_deletions(&reference, &mutations);
        let map = organise_map(result.len(), 1, &mutations);

        let mut previous = None;
        for position in 1..=reference.len() {
            if deleted.contains(&position) {
                continue;
            }
            let index = map.sample_index(position as i32);
            prop_assert!(index.is_some(), "surviving residue {} is mapped", position);
            let index = index.unwrap_or_default();
            prop_assert_eq!(result.as_bytes()[index], reference.as_bytes()[position - 1]);
            prop_assert!(previous.map_or(true, |p| index > p), "indices increase");
            previous = Some(index);
        }
    }
}
