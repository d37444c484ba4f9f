use std::io::Cursor;

use mutscan::collection::io::read_metadata;
use mutscan::sequence::ReadingFrameLocator;
use mutscan::{EngineConfig, GroupTree, Mutation, MutationEngine, Sample};

const SPIKE: &str =
    "MFVFLVLLPLVSSQCVNLTTRTQLPPAYTNSFTRGVYYPDKVFRSSVLHSTQDLFLPFFSNVTWFHAIHVSGTNGTKRFDN";

fn engine_with(reference: &str) -> MutationEngine {
    let mut engine = MutationEngine::new(EngineConfig::default()).expect("engine initialises");
    engine
        .add_sample(Sample::protein("reference", reference))
        .expect("reference added");
    engine
}

fn codon(residue: char) -> &'static str {
    match residue {
        'A' => "GCT",
        'C' => "TGT",
        'D' => "GAT",
        'E' => "GAA",
        'F' => "TTT",
        'G' => "GGT",
        'H' => "CAT",
        'I' => "ATT",
        'K' => "AAA",
        'L' => "CTG",
        'M' => "ATG",
        'N' => "AAC",
        'P' => "CCA",
        'Q' => "CAA",
        'R' => "CGT",
        'S' => "TCT",
        'T' => "ACC",
        'V' => "GTT",
        'W' => "TGG",
        'Y' => "TAC",
        other => panic!("no codon for {other}"),
    }
}

fn back_translate(protein: &str) -> String {
    protein.chars().map(codon).collect()
}

#[test]
fn reading_frame_translation_keeps_the_stop_marker() {
    let orfs: Vec<_> = ReadingFrameLocator::new(b"GGGATGAAATAAGGG").collect();
    assert_eq!(orfs.len(), 1);
    assert_eq!(orfs[0].start, 3);
    assert_eq!(orfs[0].protein, "MK ");
}

#[test]
fn nucleotide_sample_is_translated_anchored_and_called() {
    let mutant = SPIKE.replacen("NLTT", "NLTN", 1);
    let nucleotides = format!("CC{}TAAGG", back_translate(&mutant));

    let mut engine = engine_with(SPIKE);
    let id = engine
        .add_sample(Sample::nucleotide("nt", &nucleotides))
        .expect("sample added");
    assert_eq!(engine.store().sample(id).result(), Some(mutant.as_str()));

    let report = engine.compare_all().expect("comparison succeeds");
    assert_eq!(report.compared, 1);
    assert_eq!(engine.store().sample(id).mutation_summary(), "T20N");
}

#[test]
fn aligned_and_stored_deletions_agree_after_justification() {
    // 10..=16 read AAGAGAL: deleting 13-14 or 14-15 leaves the same protein
    let reference = "MFVFLVCDPAAGAGALTTRTQLPPAYTNSF";
    let sample = format!("{}{}", &reference[..12], &reference[14..]);

    let mut engine = engine_with(reference);
    let aligned = engine
        .add_sample(Sample::protein("aligned", &sample))
        .expect("sample added");
    engine.compare_all().expect("comparison succeeds");

    let table = read_metadata(Cursor::new("name,mutations\nstored,G14- A15-\n"))
        .expect("table parses");
    let config = engine.config().clone();
    engine.store_mut().load_metadata(table, &config);
    let stored = engine
        .add_sample(Sample::new("stored"))
        .expect("sample added");

    let store = engine.store();
    assert_eq!(store.sample(aligned).mutation_summary(), "A11- G12-");
    assert_eq!(store.sample(stored).mutation_summary(), "A11- G12-");
    assert_eq!(store.sample(aligned).one_sided_mutations(store.sample(stored)), 0);
}

#[test]
fn numeric_requirements_respect_residue_boundaries() {
    let mut engine = engine_with(&"M".repeat(600));
    let table = read_metadata(Cursor::new(
        "name,mutations\nlong,N470Y\nexact,K47E\nboth,K47E N470Y\n",
    ))
    .expect("table parses");
    let config = engine.config().clone();
    engine.store_mut().load_metadata(table, &config);
    for name in ["long", "exact", "both"] {
        engine.add_sample(Sample::new(name)).expect("sample added");
    }

    let names = |expression: &str| -> Vec<String> {
        engine
            .filter(expression)
            .expect("filter runs")
            .into_iter()
            .map(|id| engine.store().sample(id).name().to_string())
            .collect()
    };

    assert_eq!(names("47"), vec!["exact", "both"]);
    assert_eq!(names("470Y"), vec!["long", "both"]);
    assert_eq!(names("47,!470"), vec!["exact"]);
    assert_eq!(names(""), vec!["long", "exact", "both"]);
}

#[test]
fn representative_signature_follows_the_elbow() {
    let mut engine = engine_with(&"M".repeat(600));
    let table = read_metadata(Cursor::new(
        "name,mutations\na,N501Y\nb,N501Y K417+\nc,N501Y\nd,\ne,\n",
    ))
    .expect("table parses");
    let config = engine.config().clone();
    engine.store_mut().load_metadata(table, &config);
    for name in ["a", "b", "c", "d", "e"] {
        engine.add_sample(Sample::new(name)).expect("sample added");
    }

    let census = engine
        .store()
        .census(GroupTree::ROOT, engine.config())
        .expect("root group exists");
    assert_eq!(census.sample_count(), 5);
    assert_eq!(census.lost_mutations(0), 4);
    assert_eq!(census.lost_mutations(1), 3);
    assert_eq!(engine.describe(GroupTree::ROOT).expect("describe"), "N501Y");
}

#[test]
fn requirement_groups_partition_the_root() {
    let mut engine = engine_with(SPIKE);
    let variants = [
        ("n1", SPIKE.replacen("NLTT", "NLTN", 1)),
        ("n2", SPIKE.replacen("NLTT", "NLTN", 1).replacen("KRFDN", "KRFGN", 1)),
        ("wt", SPIKE.to_string()),
    ];
    for (name, sequence) in &variants {
        engine
            .add_sample(Sample::protein(*name, sequence))
            .expect("sample added");
    }
    engine.compare_all().expect("comparison succeeds");

    let with = engine.requirement_group("T20N").expect("group built");
    let without = engine.store_mut().select_inverse(with).expect("inverse built");

    let store = engine.store();
    let group = store.groups().get(with).expect("group exists");
    assert_eq!(group.members().len(), 3, "reference plus two carriers");
    assert_eq!(store.groups().get(without).expect("group exists").members().len(), 2);
    assert_eq!(engine.describe(with).expect("describe"), "T20N");

    let n2 = store.id("n2").expect("n2 stored");
    assert!(store.sample(n2).has_mutation(&Mutation::substitution(b'D', 80, b'G')));
}

#[test]
fn insertions_and_pre_aligned_gaps_call_cleanly() {
    let mut engine = engine_with(SPIKE);
    let inserted = format!("{}WWW{}", &SPIKE[..39], &SPIKE[39..]);
    let gapped = format!("{}--{}", &SPIKE[..20], &SPIKE[20..]);
    let ins = engine
        .add_sample(Sample::protein("ins", &inserted))
        .expect("sample added");
    let gap = engine
        .add_sample(Sample::protein("gap", &gapped))
        .expect("sample added");
    engine.compare_all().expect("comparison succeeds");

    let store = engine.store();
    // anchoring keeps the reference length, so the tail reads as deleted
    assert_eq!(store.sample(ins).mutation_summary(), "W40+ F79- D80- N81-");
    assert_eq!(store.sample(gap).mutation_summary(), "");

    let census = store
        .census(GroupTree::ROOT, engine.config())
        .expect("root group exists");
    assert_eq!(census.sample_count(), 2);
    assert_eq!(census.lost_mutations(0), 4, "one token per inserted site");
}
