use std::collections::{BTreeSet, HashSet};

use blake3::hash;
use mutscan::collection::io::render_mutation_table;
use mutscan::{EngineConfig, GroupTree, MutationEngine, Sample};

const REFERENCE: &str =
    "MFVFLVLLPLVSSQCVNLTTRTQLPPAYTNSFTRGVYYPDKVFRSSVLHSTQDLFLPFFSNVTWFHAIHVSGTNGTKRFDN";

fn samples() -> Vec<(&'static str, String)> {
    vec![
        ("s1", REFERENCE.replacen("NLTT", "NLTN", 1)),
        ("s2", REFERENCE.replacen("RSSV", "RSV", 1)),
        ("s3", REFERENCE.replacen("VLLPL", "VPL", 1)),
        ("s4", REFERENCE.replacen("GVYY", "GVWYY", 1)),
        ("s5", REFERENCE.to_string()),
    ]
}

fn run(order: &[(&'static str, String)]) -> MutationEngine {
    let mut engine = MutationEngine::new(EngineConfig::default()).expect("engine initialises");
    engine
        .add_sample(Sample::protein("reference", REFERENCE))
        .expect("reference added");
    for (name, sequence) in order {
        engine
            .add_sample(Sample::protein(*name, sequence))
            .expect("sample added");
    }
    engine.compare_all().expect("comparison succeeds");
    engine
}

#[test]
fn mutation_calling_is_deterministic() {
    let order = samples();
    let mut fingerprints = HashSet::new();
    let mut tables = HashSet::new();
    for _ in 0..5 {
        let engine = run(&order);
        fingerprints.insert(engine.store().fingerprint());
        let table = render_mutation_table(engine.store().samples().map(|(_, s)| s))
            .expect("rendering succeeds");
        tables.insert(hash(table.as_bytes()));
    }

    assert_eq!(fingerprints.len(), 1, "store contents diverged across runs");
    assert_eq!(tables.len(), 1, "tables diverged across runs");
}

#[test]
fn per_sample_results_do_not_depend_on_insertion_order() {
    let forward = samples();
    let mut backward = forward.clone();
    backward.reverse();

    let collect = |engine: &MutationEngine| -> BTreeSet<(String, String)> {
        engine
            .store()
            .samples()
            .map(|(_, s)| (s.name().to_string(), s.fingerprint().to_hex().to_string()))
            .collect()
    };

    let a = run(&forward);
    let b = run(&backward);
    assert_eq!(collect(&a), collect(&b));

    let describe = |engine: &MutationEngine| engine.describe(GroupTree::ROOT).expect("describe");
    assert_eq!(describe(&a), describe(&b));
}
