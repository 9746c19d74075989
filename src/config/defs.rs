use std::path::PathBuf;
use std::sync::Arc;
use std::collections::HashMap;
use lazy_static::lazy_static;
use log::LevelFilter;
use thiserror::Error;
use tokio::sync::Semaphore;
use crate::cli::Arguments;

// External software
pub const TRIM_GALORE_TAG: &str = "trim_galore";
pub const BOWTIE2_TAG: &str = "bowtie2";
pub const BOWTIE2_BUILD_TAG: &str = "bowtie2-build";
pub const BWA_TAG: &str = "bwa";
pub const SAMTOOLS_TAG: &str = "samtools";
pub const GATK_TAG: &str = "gatk";
pub const BAM_COVERAGE_TAG: &str = "bamCoverage";
pub const MACS2_TAG: &str = "macs2";
pub const MAKE_TAG_DIRECTORY_TAG: &str = "makeTagDirectory";
pub const FIND_PEAKS_TAG: &str = "findPeaks";
pub const ANNOTATE_PEAKS_TAG: &str = "annotatePeaks.pl";
pub const FIND_MOTIFS_GENOME_TAG: &str = "findMotifsGenome.pl";
pub const RSCRIPT_TAG: &str = "Rscript";


lazy_static! {
    /// Flag used to ask each tool for its version during the presence check.
    /// bwa has no version flag and prints its usage instead.
    pub static ref TOOL_VERSION_FLAGS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert(TRIM_GALORE_TAG, "--version");
        m.insert(BOWTIE2_TAG, "--version");
        m.insert(BOWTIE2_BUILD_TAG, "--version");
        m.insert(BWA_TAG, "");
        m.insert(SAMTOOLS_TAG, "--version");
        m.insert(GATK_TAG, "--version");
        m.insert(BAM_COVERAGE_TAG, "--version");
        m.insert(MACS2_TAG, "--version");
        m.insert(MAKE_TAG_DIRECTORY_TAG, "");
        m.insert(FIND_PEAKS_TAG, "");
        m.insert(ANNOTATE_PEAKS_TAG, "");
        m.insert(FIND_MOTIFS_GENOME_TAG, "");
        m.insert(RSCRIPT_TAG, "--version");
        m
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamtoolsSubcommand {
    View,
    Sort,
    Stats,
    Index,
}

impl SamtoolsSubcommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            SamtoolsSubcommand::View => "view",
            SamtoolsSubcommand::Sort => "sort",
            SamtoolsSubcommand::Stats => "stats",
            SamtoolsSubcommand::Index => "index",
        }
    }
}

// Static Filenames
pub const WORKDIR_PREFIX: &str = "chip_seq_workdir_";
pub const FASTQC_DIRNAME: &str = "fastqc";
pub const DUPLICATE_METRICS_DIRNAME: &str = "duplicate-metrics";
pub const LOG_DIRNAME: &str = "log";
pub const MACS2_DIRNAME: &str = "macs2";
pub const HOMER_DIRNAME: &str = "homer";
pub const FASTQC_REPORT_SUFFIXES: &[&'static str] = &["fastqc.html", "fastqc.zip", "trimming_report.txt"];
pub const FASTQ_SUFFIXES: &[&'static str] = &[".fq", ".fq.gz", ".fastq", ".fastq.gz"];
pub const ANNOTATED_SUFFIX: &str = "annotated";


// Static Parameters
pub const TRIM_GALORE_MAX_N: u32 = 0;
pub const CUTADAPT_TOTAL_CORES: u32 = 2; // trim_galore: 2 cores for cutadapt use up to 9 in total
pub const GATK_REMOVE_DUPLICATES: &str = "false";
pub const BAM_COVERAGE_BIN_SIZE: u32 = 10;
pub const VALID_CHROM_PREFIX: &str = "chr";
pub const HOMER_HEADER_PREFIX: &str = "#PeakID";
pub const COVPLOT_WEIGHT_COL: &str = "V4";

/// MACS2 `--gsize` shortcuts and the base counts they stand for.
pub const GENOME_SIZE_SHORTCUTS: &[(&str, u64)] = &[
    ("hs", 2_700_000_000),
    ("mm", 1_870_000_000),
    ("ce", 90_000_000),
    ("dm", 120_000_000),
];

/// Continuation used when rendering a command for the logs.
pub const CMD_LINEBREAK: &str = " \\\n  ";


pub struct RunConfig {
    pub cwd: PathBuf,
    pub work_dir: PathBuf,
    pub out_dir: PathBuf,
    pub args: Arguments,
    pub threads: usize,
    pub job_semaphore: Arc<Semaphore>,
}

impl RunConfig {
    pub fn new(args: Arguments, cwd: PathBuf, work_dir: PathBuf, out_dir: PathBuf, threads: usize) -> Self {
        let threads = threads.max(1);
        RunConfig {
            cwd,
            work_dir,
            out_dir,
            args,
            threads,
            job_semaphore: Arc::new(Semaphore::new(threads)),
        }
    }

    pub fn dry_run(&self) -> bool {
        self.args.dry_run
    }

    pub fn debug(&self) -> bool {
        self.args.debug
    }
}


/// `--verbose` -> Debug, otherwise Info.
pub fn log_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}


#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid FASTQ input: {0}")]
    InvalidFastqFormat(String),

    #[error("I/O error: {0}")]
    IOError(String),

    #[error("{tool} failed: {error}")]
    ToolExecution { tool: String, error: String },

    #[error("Required tools are missing: {}", .0.join(", "))]
    MissingTools(Vec<String>),

    #[error("Malformed peak file {path} at line {line}: {reason}")]
    InvalidPeakFile { path: PathBuf, line: usize, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::IOError(err.to_string())
    }
}
