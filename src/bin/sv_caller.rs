use std::fs::create_dir_all;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use fxhash::FxHashMap;
use indicatif::{ProgressBar, ProgressStyle};

use sv_caller::config::Config;
use sv_caller::driver::{DeltaTables, Driver};
use sv_caller::io::{read_fasta, read_index_file, read_overlaps_file, write_deltas, write_index_file, write_overlaps_file};
use sv_caller::overlap::{Anchor, MergedAnchor};
use sv_caller::seq::SeqStore;

/// Detect structural variants (INS/DEL/DUP/INV/TRA) between a reference
/// sequence and a query, either a fully assembled sequence or a set of
/// placed segments.
#[derive(Parser)]
#[command(
    name = "sv_caller",
    about = "Detect structural variants between a reference and a query sequence",
    long_about = "Detect structural variants between a reference and a query sequence.

EXAMPLES:
    // Run every phase against an assembled query
    $ sv_caller -a --ref genome.fa --sv query.fa --output-dir out/

    // Split into phases against a set of placed segments
    $ sv_caller -i --ref genome.fa --output-dir out/
    $ sv_caller -m --ref genome.fa --segments segments.fa --output-dir out/
    $ sv_caller -s --ref genome.fa --segments segments.fa --output-dir out/
    ",
    author = "sv_caller contributors",
    version = "0.1.0"
)]
#[clap(group = ArgGroup::new("phases").required(true).args(&["build_index", "merge_overlaps", "find_deltas", "all"]).multiple(true))]
struct Cli {
    /// Reference FASTA-like input [path]
    #[clap(long = "ref", value_parser, required = true, help_heading = "Core")]
    pub ref_path: PathBuf,

    /// Output directory for side-files and the deltas BED output [path]
    #[clap(short = 'o', long, value_parser, required = true, help_heading = "Core")]
    pub output_dir: PathBuf,

    /// Fully assembled query FASTA-like input [path]
    ///
    /// When given, `-s` diffs it directly against `--ref` rather than
    /// falling back to placed segments.
    #[clap(long, value_parser, help_heading = "Core")]
    pub sv: Option<PathBuf>,

    /// Segment FASTA-like input [path]
    #[clap(long, value_parser, help_heading = "Core")]
    pub segments: Option<PathBuf>,

    /// Build the minimizer index [flag]
    #[clap(short = 'i', long = "build-index", group = "phases", help_heading = "Phases (at least one)")]
    pub build_index: bool,

    /// Find and merge segment overlaps [flag]
    #[clap(short = 'm', long = "merge-overlaps", group = "phases", help_heading = "Phases (at least one)")]
    pub merge_overlaps: bool,

    /// Find deltas [flag]
    #[clap(short = 's', long = "find-deltas", group = "phases", help_heading = "Phases (at least one)")]
    pub find_deltas: bool,

    /// Run every phase [flag]
    #[clap(short = 'a', long = "all", group = "phases", help_heading = "Phases (at least one)")]
    pub all: bool,

    /// k-mer length used by the rolling hash [integer]
    #[clap(long, default_value_t = Config::default().hash_size, help_heading = "Tuning")]
    pub hash_size: usize,

    /// Minimizer window size [integer]
    #[clap(long, default_value_t = Config::default().window_size, help_heading = "Tuning")]
    pub window_size: usize,

    /// Size of one Myers diff chunk [integer]
    #[clap(long, default_value_t = Config::default().chunk_size, help_heading = "Tuning")]
    pub chunk_size: usize,

    /// Minimum anchor count for an orientation to be selected [integer]
    #[clap(long, default_value_t = Config::default().overlap_min_count, help_heading = "Tuning")]
    pub overlap_min_count: usize,

    /// Minimum merged-anchor count to keep [integer]
    #[clap(long, default_value_t = Config::default().minimizer_min_count, help_heading = "Tuning")]
    pub minimizer_min_count: usize,

    /// Minimum merged-anchor length to keep [integer]
    #[clap(long, default_value_t = Config::default().minimizer_min_len, help_heading = "Tuning")]
    pub minimizer_min_len: usize,

    /// Maximum allowed ref/segment growth mismatch while merging anchors [integer]
    #[clap(long, default_value_t = Config::default().minimizer_max_diff, help_heading = "Tuning")]
    pub minimizer_max_diff: u64,

    /// Minimum delta length to keep [integer]
    #[clap(long, default_value_t = Config::default().delta_min_len, help_heading = "Tuning")]
    pub delta_min_len: usize,

    /// Maximum delta length to keep [integer]
    #[clap(long, default_value_t = Config::default().delta_max_len, help_heading = "Tuning")]
    pub delta_max_len: usize,

    /// Deltas at or below this reference length are dropped at set time [integer]
    #[clap(long, default_value_t = Config::default().delta_ignore_len, help_heading = "Tuning")]
    pub delta_ignore_len: usize,

    /// Density sweep window [integer]
    #[clap(long, default_value_t = Config::default().density_window_size, help_heading = "Tuning")]
    pub density_window_size: usize,

    /// Noise rate for density hysteresis [float]
    #[clap(long, default_value_t = Config::default().noise_rate, help_heading = "Tuning")]
    pub noise_rate: f64,

    /// Signal rate for density hysteresis [float]
    #[clap(long, default_value_t = Config::default().signal_rate, help_heading = "Tuning")]
    pub signal_rate: f64,

    /// Mismatch penalty applied by the fuzzy kernel [integer]
    #[clap(long, default_value_t = Config::default().dp_penalty, help_heading = "Tuning")]
    pub dp_penalty: i64,

    /// Overlap slack used by loose range comparisons [integer]
    #[clap(long, default_value_t = Config::default().gap_max_diff, help_heading = "Tuning")]
    pub gap_max_diff: u64,

    /// Strict acceptance ratio for FuzzyCompare [float]
    #[clap(long, default_value_t = Config::default().strict_equal_rate, help_heading = "Tuning")]
    pub strict_equal_rate: f64,

    /// Fuzzy acceptance ratio for FuzzyCompare [float]
    #[clap(long, default_value_t = Config::default().fuzzy_equal_rate, help_heading = "Tuning")]
    pub fuzzy_equal_rate: f64,

    /// Number of threads to use [integer]
    #[clap(short = 't', long, default_value = "0", help_heading = "Core")]
    pub n_threads: usize,
}

impl Cli {
    fn to_config(&self) -> Config {
        Config {
            hash_size: self.hash_size,
            window_size: self.window_size,
            chunk_size: self.chunk_size,
            overlap_min_count: self.overlap_min_count,
            minimizer_min_count: self.minimizer_min_count,
            minimizer_min_len: self.minimizer_min_len,
            minimizer_max_diff: self.minimizer_max_diff,
            delta_min_len: self.delta_min_len,
            delta_max_len: self.delta_max_len,
            delta_ignore_len: self.delta_ignore_len,
            density_window_size: self.density_window_size,
            noise_rate: self.noise_rate,
            signal_rate: self.signal_rate,
            dp_penalty: self.dp_penalty,
            gap_max_diff: self.gap_max_diff,
            strict_equal_rate: self.strict_equal_rate,
            fuzzy_equal_rate: self.fuzzy_equal_rate,
            ..Config::default()
        }
    }

    fn wants_index(&self) -> bool {
        self.build_index || self.all
    }

    fn wants_merge(&self) -> bool {
        self.merge_overlaps || self.all
    }

    fn wants_deltas(&self) -> bool {
        self.find_deltas || self.all
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{:?}", e);
        std::process::exit(1);
    }
    std::process::exit(0);
}

fn new_progress_bar() -> Arc<ProgressBar> {
    let pb = Arc::new(ProgressBar::new(0));
    pb.set_style(
        ProgressStyle::default_bar()
            .template("       {bar:40} {pos}/{len} [{elapsed_precise}] {msg}")
            .unwrap(),
    );
    pb
}

fn run() -> Result<()> {
    env_logger::init();
    let start_time = Instant::now();
    let opt = Cli::parse();

    create_dir_all(&opt.output_dir).context("cannot create output_dir")?;

    if opt.n_threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(opt.n_threads)
            .build_global()
            .context("building Rayon thread pool")?;
    }

    let driver = Driver::new(opt.to_config());
    let index_path = opt.output_dir.join("index.txt");
    let overlaps_path = opt.output_dir.join("overlaps.txt");
    let deltas_path = opt.output_dir.join("deltas.bed");

    println!("Start: Loading reference");
    let ref_store = read_fasta(&opt.ref_path).context("loading --ref")?;

    let mut index = None;
    if opt.wants_index() {
        println!("Start: Building index");
        index = Some(driver.build_index(&ref_store, &new_progress_bar()));
        write_index_file(index.as_ref().unwrap(), &index_path).context("writing index side-file")?;
    }

    let mut merged: Option<FxHashMap<String, Vec<MergedAnchor>>> = None;
    if opt.wants_merge() {
        let segments_path = opt.segments.as_ref().context("--segments is required for -m/-a")?;
        println!("Start: Finding and merging overlaps");
        let mut seg_store = read_fasta(segments_path).context("loading --segments")?;
        let index = match &index {
            Some(idx) => idx.clone(),
            None => read_index_file(&index_path).context("reading index side-file (run -i first or pass -a)")?,
        };
        let result = driver.merge_segments(&mut seg_store, &index, &ref_store, &new_progress_bar())?;
        write_overlaps_file(&merged_to_anchors(&result), &overlaps_path).context("writing overlaps side-file")?;
        merged = Some(result);
    }

    if opt.wants_deltas() {
        println!("Start: Finding deltas");
        let tables = if let Some(sv_path) = &opt.sv {
            let sv_store = read_fasta(sv_path).context("loading --sv")?;
            driver.find_deltas_assembled(&ref_store, &sv_store, &new_progress_bar())
        } else {
            let segments_path = opt.segments.as_ref().context("--segments is required for -s without --sv")?;
            let seg_store = read_fasta(segments_path).context("loading --segments")?;
            let merged = match merged {
                Some(m) => m,
                None => anchors_to_merged(read_overlaps_file(&overlaps_path).context("reading overlaps side-file (run -m first or pass -a)")?),
            };
            driver.find_deltas_from_segments(&ref_store, &seg_store, &merged, &new_progress_bar())
        };

        println!("Start: Writing deltas");
        write_deltas_tables(&tables, &deltas_path)?;
    }

    let elapsed = start_time.elapsed();
    println!("Elapsed time: {:.2?}", elapsed);
    Ok(())
}

fn write_deltas_tables(tables: &DeltaTables, path: &PathBuf) -> Result<()> {
    write_deltas(&tables.ins, &tables.del, &tables.dup, &tables.inv, &tables.tra, path).context("writing deltas output")
}

fn merged_to_anchors(merged: &FxHashMap<String, Vec<MergedAnchor>>) -> Vec<Anchor> {
    merged
        .values()
        .flatten()
        .map(|m| Anchor {
            range_ref: m.range_ref.clone(),
            key_seg: m.key_seg.clone(),
            range_seg: m.range_seg.clone(),
            orientation: m.orientation,
        })
        .collect()
}

fn anchors_to_merged(anchors: Vec<Anchor>) -> FxHashMap<String, Vec<MergedAnchor>> {
    let mut by_chrom: FxHashMap<String, Vec<MergedAnchor>> = FxHashMap::default();
    for a in anchors {
        let chrom = a.range_ref.owner.clone().unwrap_or_default();
        by_chrom.entry(chrom).or_default().push(MergedAnchor {
            range_ref: a.range_ref,
            key_seg: a.key_seg,
            range_seg: a.range_seg,
            orientation: a.orientation,
            count: 1,
        });
    }
    by_chrom
}
