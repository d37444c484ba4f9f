//! Performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use mutscan::{EngineConfig, MutationEngine, RequirementSet, Sample};

const SPIKE: &str =
    "MFVFLVLLPLVSSQCVNLTTRTQLPPAYTNSFTRGVYYPDKVFRSSVLHSTQDLFLPFFSNVTWFHAIHVSGTNGTKRFDN";

fn variant(i: usize) -> String {
    let mut residues = SPIKE.as_bytes().to_vec();
    residues[(i * 7) % residues.len()] = b'W';
    if i % 3 == 0 {
        residues.remove(45);
    }
    String::from_utf8_lossy(&residues).into_owned()
}

fn loaded_engine(samples: usize) -> MutationEngine {
    let mut engine = MutationEngine::new(EngineConfig::default()).expect("valid config");
    engine
        .add_sample(Sample::protein("reference", SPIKE))
        .expect("reference added");
    for i in 0..samples {
        engine
            .add_sample(Sample::protein(format!("s{i}"), &variant(i)))
            .expect("sample added");
    }
    engine
}

fn benchmark_compare(c: &mut Criterion) {
    c.bench_function("compare_all_n=200", |b| {
        b.iter_batched(
            || loaded_engine(200),
            |mut engine| black_box(engine.compare_all().expect("comparison succeeds")),
            BatchSize::LargeInput,
        );
    });
}

fn benchmark_filter(c: &mut Criterion) {
    let mut engine = loaded_engine(200);
    engine.compare_all().expect("comparison succeeds");
    let requirements = RequirementSet::parse("20W,!45-");

    c.bench_function("requirement_filter_n=200", |b| {
        b.iter(|| {
            let hits = engine
                .store()
                .samples()
                .filter(|(_, s)| requirements.matches(s))
                .count();
            black_box(hits)
        });
    });
}

criterion_group!(benches, benchmark_compare, benchmark_filter);
criterion_main!(benches);
