//! linkage-dedup CLI - duplicate detection for product record tables.

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use indicatif::{ProgressBar, ProgressStyle};
use linkage_core::{Blake3Hasher, HashFunction, IdKind, RecordTable, XxHash3};
use linkage_dedup::{
    cluster_matches, evaluate, read_pair_files, read_pairs_as, read_records, write_pairs,
    write_pairs_csv,
    DatasetConfig, ExactDuplicateFinder, ExtractorPreset, IdPair, InputFormat, Metrics,
    MissingValuePolicy, Pipeline, PipelineStats,
};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// JSON output for a match run.
#[derive(Serialize)]
struct MatchReport<'a> {
    input: String,
    output: Option<String>,
    config: String,
    stats: &'a PipelineStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics: Option<Metrics>,
    pairs: &'a [IdPair],
}

/// JSON output for an exact-duplicate run.
#[derive(Serialize)]
struct ExactReport<'a> {
    input: String,
    output: Option<String>,
    total_records: usize,
    duplicate_pairs: usize,
    clusters: usize,
    elapsed_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics: Option<Metrics>,
    pairs: &'a [IdPair],
}

/// File format for record input.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum Format {
    /// Auto-detect from file extension
    Auto,
    /// Comma-separated values with a header row
    Csv,
    /// JSON Lines format
    Jsonl,
}

/// Content hash used for exact duplicate detection.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum HashKind {
    /// BLAKE3 (cryptographic)
    Blake3,
    /// XXH3-128 (fast, non-cryptographic)
    Xxh3,
}

/// Duplicate detection for product record tables.
///
/// Groups records into blocks by extracted key tokens, compares pairs inside
/// each block with token-set Jaccard similarity, and reports the pairs above
/// a threshold. Optionally evaluates them against labeled ground truth.
#[derive(Parser, Debug)]
#[command(name = "linkage-dedup")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (debug logging unless RUST_LOG is set).
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find likely duplicate pairs with blocking and Jaccard scoring
    Match(MatchArgs),
    /// Evaluate a pairs file against ground truth
    Evaluate(EvaluateArgs),
    /// Find exact duplicates by content hash
    Exact(ExactArgs),
    /// Print preset configurations as JSON
    Presets {
        /// Preset to print (all presets if omitted)
        name: Option<String>,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct MatchArgs {
    /// Input record file (CSV or JSONL).
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output CSV of `lid,rid` pairs (stdout if omitted; in the report with --json).
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Named extractor preset (default: title-patterns).
    #[arg(long, conflicts_with = "config")]
    preset: Option<String>,

    /// JSON dataset configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Field compared with Jaccard similarity (overrides configuration).
    #[arg(short = 'f', long)]
    field: Option<String>,

    /// Similarity threshold (0.0-1.0). Pairs scoring below it are dropped.
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Blocks with at least this many records are skipped.
    #[arg(long)]
    size_cutoff: Option<usize>,

    /// Column holding the record id.
    #[arg(long)]
    id_field: Option<String>,

    /// Ground truth CSV with `lid,rid` columns.
    #[arg(short, long, value_name = "GROUND_TRUTH")]
    ground_truth: Option<PathBuf>,

    /// Input format (auto-detect from file extension by default).
    #[arg(long, value_enum, default_value = "auto")]
    format: Format,

    /// Score candidates in parallel.
    #[arg(long)]
    parallel: bool,

    /// Treat missing comparison values as the literal token "nan".
    #[arg(long)]
    missing_as_nan: bool,

    /// Output results as JSON.
    #[arg(long)]
    json: bool,

    /// Show progress spinner.
    #[arg(long)]
    progress: bool,
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    /// CSV of reported `lid,rid` pairs.
    #[arg(value_name = "PAIRS")]
    pairs: PathBuf,

    /// Ground truth CSV with `lid,rid` columns.
    #[arg(short, long, value_name = "GROUND_TRUTH")]
    ground_truth: PathBuf,

    /// Output results as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct ExactArgs {
    /// Input record file (CSV or JSONL).
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output CSV of `lid,rid` pairs (stdout if omitted; in the report with --json).
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Comma-separated fields whose concatenation is hashed.
    #[arg(long, value_delimiter = ',', required = true)]
    fields: Vec<String>,

    /// Column holding the record id.
    #[arg(long, default_value = "id")]
    id_field: String,

    /// Hash function.
    #[arg(long, value_enum, default_value = "blake3")]
    hash: HashKind,

    /// Ground truth CSV with `lid,rid` columns.
    #[arg(short, long, value_name = "GROUND_TRUTH")]
    ground_truth: Option<PathBuf>,

    /// Input format (auto-detect from file extension by default).
    #[arg(long, value_enum, default_value = "auto")]
    format: Format,

    /// Output results as JSON.
    #[arg(long)]
    json: bool,
}

/// Print an error and exit with status 1.
fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {message}");
    std::process::exit(1);
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Create a spinner for indeterminate progress.
fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Determine the effective format for a file path.
fn detect_format(path: &Path, explicit_format: Format) -> Result<InputFormat, String> {
    match explicit_format {
        Format::Auto => InputFormat::from_path(path).ok_or_else(|| {
            format!(
                "Cannot detect format from file extension: {}",
                path.display()
            )
        }),
        Format::Csv => Ok(InputFormat::Csv),
        Format::Jsonl => Ok(InputFormat::Jsonl),
    }
}

/// Resolve the dataset configuration from preset/file and flag overrides.
fn resolve_config(args: &MatchArgs) -> (DatasetConfig, String) {
    let (mut config, source) = match (&args.config, &args.preset) {
        (Some(path), _) => match DatasetConfig::from_json_file(path) {
            Ok(c) => (c, path.display().to_string()),
            Err(e) => fail(e),
        },
        (None, Some(name)) => match name.parse::<ExtractorPreset>() {
            Ok(p) => (p.config(), p.name().to_string()),
            Err(e) => fail(e),
        },
        (None, None) => {
            let p = ExtractorPreset::TitlePatterns;
            (p.config(), p.name().to_string())
        }
    };

    if let Some(field) = &args.field {
        config.pipeline.compare_field = field.clone();
    }
    if let Some(threshold) = args.threshold {
        config.pipeline.similarity_threshold = threshold;
    }
    if let Some(cutoff) = args.size_cutoff {
        config.pipeline.size_cutoff = cutoff;
    }
    if let Some(id_field) = &args.id_field {
        config.id_field = id_field.clone();
    }
    if args.parallel {
        config.pipeline.parallel = true;
    }
    if args.missing_as_nan {
        config.pipeline.missing_values = MissingValuePolicy::LiteralNan;
    }
    (config, source)
}

/// Write pairs to a file, or to stdout when no path is given. With `json`
/// the pairs go into the report instead of stdout.
fn emit_pairs(
    output: Option<&PathBuf>,
    json: bool,
    pairs: &[IdPair],
) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        Some(path) => write_pairs_csv(path, pairs)?,
        None if !json => write_pairs(io::stdout().lock(), pairs)?,
        None => {}
    }
    Ok(())
}

fn print_metrics(metrics: &Metrics) {
    eprintln!();
    eprintln!("Evaluation Results:");
    eprintln!("{metrics}");
}

/// Read ground truth with the id kind of the table it labels.
fn load_ground_truth(
    path: Option<&PathBuf>,
    kind: IdKind,
) -> Result<Option<Vec<IdPair>>, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(p) => Some(read_pairs_as(p, kind)?),
        None => None,
    })
}

fn run_match(args: &MatchArgs, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (config, source) = resolve_config(args);

    if !(0.0..=1.0).contains(&config.pipeline.similarity_threshold) {
        fail("threshold must be between 0.0 and 1.0");
    }
    if config.pipeline.size_cutoff == 0 {
        fail("size cutoff must be > 0");
    }

    let input_format = detect_format(&args.input, args.format).unwrap_or_else(|e| fail(e));

    if verbose && !args.json {
        eprintln!("Configuration:");
        eprintln!("  Input: {}", args.input.display());
        if let Some(ref output) = args.output {
            eprintln!("  Output: {}", output.display());
        }
        eprintln!("  Format: {:?}", input_format);
        eprintln!("  Extractor: {source}");
        eprintln!("  Id field: {}", config.id_field);
        eprintln!("  Compare field: {}", config.pipeline.compare_field);
        eprintln!("  Threshold: {}", config.pipeline.similarity_threshold);
        eprintln!("  Size cutoff: {}", config.pipeline.size_cutoff);
        eprintln!("  Parallel: {}", config.pipeline.parallel);
        eprintln!();
    }

    let start = Instant::now();
    let pb = (args.progress && !args.json).then(|| create_spinner("Reading input file..."));

    let table: RecordTable = read_records(&args.input, input_format, &config.id_field)?;
    if table.is_empty() && !args.json {
        eprintln!("Warning: No records found in input file");
    }
    let truth = load_ground_truth(args.ground_truth.as_ref(), table.id_kind())?;

    if let Some(ref pb) = pb {
        pb.set_message(format!("Matching {} records...", table.len()));
    }

    let pipeline = Pipeline::from_dataset(&config, &table)?;
    let output = pipeline.run(&table)?;
    let matches = output.matches();
    let metrics = truth.as_deref().map(|t| evaluate(&matches, t));

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    emit_pairs(args.output.as_ref(), args.json, &matches)?;

    let stats = &output.stats;
    if args.json {
        let report = MatchReport {
            input: args.input.display().to_string(),
            output: args.output.as_ref().map(|p| p.display().to_string()),
            config: source,
            stats,
            metrics,
            pairs: &matches,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        eprintln!();
        eprintln!("Matching Results:");
        eprintln!("  Total records:     {}", stats.records);
        eprintln!("  Blocks:            {}", stats.blocks);
        eprintln!("  Unblocked records: {}", stats.unblocked_records);
        eprintln!("  Largest block:     {}", stats.largest_block);
        eprintln!(
            "  Skipped blocks:    {} ({} records)",
            stats.skipped_blocks, stats.skipped_records
        );
        eprintln!("  Candidate pairs:   {}", stats.candidate_pairs);
        eprintln!("  Matched pairs:     {}", stats.matched_pairs);
        eprintln!("  Duplicate clusters: {}", stats.clusters);
        if let Some(ref m) = metrics {
            print_metrics(m);
        }
        eprintln!();
        eprintln!("Total time: {:.3}s", start.elapsed().as_secs_f64());
    }

    Ok(())
}

fn run_evaluate(args: &EvaluateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (matches, truth) = read_pair_files(&args.pairs, &args.ground_truth)?;
    let metrics = evaluate(&matches, &truth);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
    } else {
        print_metrics(&metrics);
    }
    Ok(())
}

fn find_exact<H: HashFunction>(
    hasher: H,
    table: &RecordTable,
    fields: &[&str],
) -> Result<Vec<IdPair>, Box<dyn std::error::Error>> {
    Ok(ExactDuplicateFinder::new(hasher, table, fields)?.find(table))
}

fn run_exact(args: &ExactArgs) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();
    let input_format = detect_format(&args.input, args.format).unwrap_or_else(|e| fail(e));
    let table = read_records(&args.input, input_format, &args.id_field)?;
    let truth = load_ground_truth(args.ground_truth.as_ref(), table.id_kind())?;

    let fields: Vec<&str> = args.fields.iter().map(String::as_str).collect();
    let pairs = match args.hash {
        HashKind::Blake3 => find_exact(Blake3Hasher::new(), &table, &fields)?,
        HashKind::Xxh3 => find_exact(XxHash3::new(), &table, &fields)?,
    };
    let clusters = cluster_matches(&table, &pairs).len();
    let metrics = truth.as_deref().map(|t| evaluate(&pairs, t));

    emit_pairs(args.output.as_ref(), args.json, &pairs)?;

    if args.json {
        let report = ExactReport {
            input: args.input.display().to_string(),
            output: args.output.as_ref().map(|p| p.display().to_string()),
            total_records: table.len(),
            duplicate_pairs: pairs.len(),
            clusters,
            elapsed_secs: start.elapsed().as_secs_f64(),
            metrics,
            pairs: &pairs,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        eprintln!();
        eprintln!("Exact Duplicate Results:");
        eprintln!("  Total records:     {}", table.len());
        eprintln!("  Duplicate pairs:   {}", pairs.len());
        eprintln!("  Duplicate clusters: {clusters}");
        if let Some(ref m) = metrics {
            print_metrics(m);
        }
    }
    Ok(())
}

fn run_presets(name: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    match name {
        Some(name) => {
            let preset: ExtractorPreset = name.parse().unwrap_or_else(|e| fail(e));
            println!("{}", preset.config().to_json()?);
        }
        None => {
            let mut all = serde_json::Map::new();
            for preset in ExtractorPreset::ALL {
                all.insert(
                    preset.name().to_string(),
                    serde_json::to_value(preset.config())?,
                );
            }
            println!("{}", serde_json::to_string_pretty(&all)?);
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match &cli.command {
        Commands::Match(args) => run_match(args, cli.verbose),
        Commands::Evaluate(args) => run_evaluate(args),
        Commands::Exact(args) => run_exact(args),
        Commands::Presets { name } => run_presets(name.as_deref()),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(*shell, &mut cmd, "linkage-dedup", &mut io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        fail(e);
    }
}
