use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use mutscan::collection::io::{
    read_fasta, read_metadata, write_alignment, write_mutation_table, write_result_fasta,
};
use mutscan::sequence::ReadingFrameLocator;
use mutscan::{EngineConfig, GroupTree, MutationEngine, Sample, SampleStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mutscan", about = "Canonical mutation calling against a reference protein")]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG).
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct ReferenceArgs {
    /// Reference FASTA; the first record is the reference protein.
    reference: PathBuf,
    /// Number given to the reference's first residue.
    #[arg(long, default_value_t = 1)]
    first_residue: i32,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare samples to the reference and write the mutation table.
    Call {
        #[command(flatten)]
        reference: ReferenceArgs,
        /// Sample FASTA.
        samples: PathBuf,
        /// Samples are nucleotide sequences to translate.
        #[arg(long)]
        nucleotide: bool,
        /// Metadata CSV to attach (first column = sample name).
        #[arg(long)]
        metadata: Option<PathBuf>,
        /// Mutation table output (default: stdout).
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Also write the anchored protein sequences as FASTA.
        #[arg(long)]
        results: Option<PathBuf>,
        /// Also write every alignment track.
        #[arg(long)]
        alignments: Option<PathBuf>,
        /// Keep deletions where the aligner placed them.
        #[arg(long)]
        no_justify: bool,
        /// Annotate glycosylation-site gains and losses.
        #[arg(long)]
        glycosylation: bool,
        /// Anchor probe length.
        #[arg(long, default_value_t = 10)]
        probe_length: usize,
    },
    /// List samples of a mutation table satisfying a requirement expression.
    Filter {
        #[command(flatten)]
        reference: ReferenceArgs,
        /// Mutation table (`sequence_name,mutations`).
        table: PathBuf,
        /// Comma-separated requirements, e.g. `501Y,!69-`.
        expression: String,
        /// Keep samples flagged problematic.
        #[arg(long)]
        include_problematic: bool,
    },
    /// Rank mutation frequencies of a mutation table.
    Summarise {
        #[command(flatten)]
        reference: ReferenceArgs,
        /// Mutation table (`sequence_name,mutations`).
        table: PathBuf,
        /// Ranked mutations to print.
        #[arg(long, default_value_t = 20)]
        top: usize,
    },
    /// List open reading frames of nucleotide records.
    Orfs {
        /// Nucleotide FASTA.
        sequences: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = EngineConfig::default().with_verbose(cli.verbose);

    match cli.command {
        Commands::Call {
            reference,
            samples,
            nucleotide,
            metadata,
            output,
            results,
            alignments,
            no_justify,
            glycosylation,
            probe_length,
        } => {
            let config = config
                .with_left_justify_deletions(!no_justify)
                .with_glycosylation(glycosylation)
                .with_probe_length(probe_length);
            run_call(
                config,
                &reference,
                &samples,
                nucleotide,
                metadata.as_deref(),
                Outputs {
                    table: output,
                    results,
                    alignments,
                },
            )?
        }
        Commands::Filter {
            reference,
            table,
            expression,
            include_problematic,
        } => run_filter(
            config.with_exclude_problematic(!include_problematic),
            &reference,
            &table,
            &expression,
        )?,
        Commands::Summarise {
            reference,
            table,
            top,
        } => run_summarise(config, &reference, &table, top)?,
        Commands::Orfs { sequences } => run_orfs(&sequences)?,
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

struct Outputs {
    table: Option<PathBuf>,
    results: Option<PathBuf>,
    alignments: Option<PathBuf>,
}

fn open_fasta(path: &Path) -> Result<Vec<(String, String)>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    read_fasta(BufReader::new(file)).with_context(|| format!("failed to parse {}", path.display()))
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn engine_with_reference(config: EngineConfig, args: &ReferenceArgs) -> Result<MutationEngine> {
    let records = open_fasta(&args.reference)?;
    let Some((name, sequence)) = records.into_iter().next() else {
        bail!("reference file {} has no records", args.reference.display());
    };

    let mut engine = MutationEngine::new(config)?
        .with_store(SampleStore::new().with_first_residue(args.first_residue));
    engine.add_sample(Sample::protein(name, &sequence))?;
    Ok(engine)
}

fn run_call(
    config: EngineConfig,
    reference: &ReferenceArgs,
    samples_path: &Path,
    nucleotide: bool,
    metadata: Option<&Path>,
    outputs: Outputs,
) -> Result<()> {
    let mut engine = engine_with_reference(config, reference)?;

    if let Some(path) = metadata {
        let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let table = read_metadata(BufReader::new(file))
            .with_context(|| format!("failed to parse metadata {}", path.display()))?;
        let config = engine.config().clone();
        engine.store_mut().load_metadata(table, &config);
    }

    for (name, sequence) in open_fasta(samples_path)? {
        let sample = if nucleotide {
            Sample::nucleotide(name, &sequence)
        } else {
            Sample::protein(name, &sequence)
        };
        if let Err(err) = engine.add_sample(sample) {
            warn!(%err, "skipping sample");
        }
    }

    let report = engine.compare_all()?;
    info!(
        compared = report.compared,
        failed = report.failed,
        problematic = report.problematic,
        "comparison complete"
    );

    let samples = || engine.store().samples().map(|(_, s)| s);
    match &outputs.table {
        Some(path) => {
            let mut writer = create(path)?;
            write_mutation_table(&mut writer, samples())?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            write_mutation_table(&mut writer, samples())?;
        }
    }

    if let Some(path) = &outputs.results {
        let written = write_result_fasta(&mut create(path)?, samples())?;
        info!(written, path = %path.display(), "wrote protein sequences");
    }

    if let Some(path) = &outputs.alignments {
        let mut writer = create(path)?;
        for sample in samples() {
            if let Some(track) = sample.track() {
                write_alignment(&mut writer, sample.name(), track)?;
            }
        }
        writer.flush()?;
    }

    Ok(())
}

fn engine_from_table(
    config: EngineConfig,
    reference: &ReferenceArgs,
    table_path: &Path,
) -> Result<MutationEngine> {
    let mut engine = engine_with_reference(config, reference)?;
    let file = File::open(table_path)
        .with_context(|| format!("failed to open {}", table_path.display()))?;
    let table = read_metadata(BufReader::new(file))
        .with_context(|| format!("failed to parse {}", table_path.display()))?;
    let names: Vec<String> = table.rows.iter().map(|r| r.id.clone()).collect();

    let config = engine.config().clone();
    engine.store_mut().load_metadata(table, &config);
    let reference_name = engine.store().reference()?.name().to_string();
    for name in names.into_iter().filter(|n| *n != reference_name) {
        engine.add_sample(Sample::new(name))?;
    }
    Ok(engine)
}

fn run_filter(
    config: EngineConfig,
    reference: &ReferenceArgs,
    table: &Path,
    expression: &str,
) -> Result<()> {
    let engine = engine_from_table(config, reference, table)?;
    let hits = engine.filter(expression)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for id in &hits {
        writeln!(out, "{}", engine.store().sample(*id).name())?;
    }
    info!(matched = hits.len(), total = engine.store().len() - 1, %expression, "filter complete");
    Ok(())
}

fn run_summarise(
    config: EngineConfig,
    reference: &ReferenceArgs,
    table: &Path,
    top: usize,
) -> Result<()> {
    let engine = engine_from_table(config, reference, table)?;
    let census = engine
        .store()
        .census(GroupTree::ROOT, engine.config())?;
    let set = census.representative_set();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "mutation,samples")?;
    for (mutation, count) in census.ranked().iter().take(top) {
        writeln!(out, "{mutation},{count}")?;
    }
    writeln!(out)?;
    writeln!(out, "representative ({}): {}", set.size, set.signature())?;
    Ok(())
}

fn run_orfs(path: &Path) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "name\tstart\tstop\tresidues\tprotein")?;
    for (name, sequence) in open_fasta(path)? {
        for orf in ReadingFrameLocator::new(sequence.as_bytes()) {
            writeln!(
                out,
                "{name}\t{}\t{}\t{}\t{}",
                orf.start,
                orf.stop,
                orf.protein.len(),
                orf.protein.trim_end()
            )?;
        }
    }
    Ok(())
}
