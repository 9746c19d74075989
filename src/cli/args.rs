use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq)]
pub enum ReadAligner {
    #[default]
    Bowtie2,
    Bwa,
}

/// bowtie2 preset modes, rendered as `--<name>` on the bowtie2 command line.
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq)]
pub enum Bowtie2Mode {
    VeryFast,
    VeryFastLocal,
    Fast,
    FastLocal,
    #[default]
    Sensitive,
    SensitiveLocal,
    VerySensitive,
    VerySensitiveLocal,
}

impl Bowtie2Mode {
    pub fn as_flag(&self) -> String {
        let name = self
            .to_possible_value()
            .map(|v| v.get_name().to_string())
            .unwrap_or_else(|| "sensitive".to_string());
        format!("--{}", name)
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Hash)]
pub enum PeakCaller {
    Macs2,
    Homer,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "chipseq-pipeline",
    version,
    about = "ChIP-seq pipeline: trimming, alignment, duplicate marking, peak calling, annotation and motif finding"
)]
pub struct Arguments {

    #[arg(short = 'r', long = "ref-fa", help = "Path to the reference genome fasta file")]
    pub ref_fa: String,

    #[arg(short = '1', long = "fq1", help = "Path to the treatment read 1 fastq file")]
    pub fq1: String,

    #[arg(short = '2', long = "fq2", help = "Path to the treatment read 2 fastq file (paired-end)")]
    pub fq2: Option<String>,

    #[arg(long = "control-fq1", help = "Path to the control (input) read 1 fastq file")]
    pub control_fq1: Option<String>,

    #[arg(long = "control-fq2", help = "Path to the control (input) read 2 fastq file")]
    pub control_fq2: Option<String>,

    #[arg(short = 'g', long = "gtf", help = "Optional GTF passed to HOMER annotatePeaks.pl")]
    pub gtf: Option<String>,

    #[arg(long, default_value_t = 20)]
    pub base_quality_cutoff: u32,

    #[arg(long, default_value_t = 20)]
    pub min_read_length: u32,

    #[arg(long, default_value_t = -1, allow_hyphen_values = true, help = "Maximum read length after trimming; -1 for no limit")]
    pub max_read_length: i64,

    #[arg(long, default_value = "bowtie2", value_enum)]
    pub read_aligner: ReadAligner,

    #[arg(long, default_value = "sensitive", value_enum)]
    pub bowtie2_mode: Bowtie2Mode,

    #[arg(long, action, help = "Do not save sorted BAM files in outdir")]
    pub discard_bam: bool,

    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        default_value = "macs2,homer",
        help = "Comma-separated list of peak callers"
    )]
    pub peak_callers: Vec<PeakCaller>,

    #[arg(long, default_value = "hs", help = "Effective genome size: a MACS shortcut (hs, mm, ce, dm) or a number such as 5.1e7")]
    pub effective_genome_size: String,

    #[arg(long, default_value_t = 0.05)]
    pub fdr: f64,

    #[arg(long, default_value = "hg38", help = "HOMER genome build used for annotation and motif finding")]
    pub genome_version: String,

    #[arg(long, default_value_t = 200, help = "Region size given to findMotifsGenome.pl -size")]
    pub fragment_size: u32,

    #[arg(long, action)]
    pub skip_trimming: bool,

    #[arg(long, action)]
    pub skip_mark_duplicates: bool,

    #[arg(long, action)]
    pub skip_motif_finding: bool,

    #[arg(short = 'o', long = "outdir", default_value = "chip_seq_pipeline_outdir")]
    pub out_dir: String,

    #[arg(short = 't', long, default_value_t = 4)]
    pub threads: usize,

    #[arg(short = 'd', long, action, help = "Keep the working directory after the run")]
    pub debug: bool,

    #[arg(long, action, help = "Log every command without executing it")]
    pub dry_run: bool,

    #[arg(short = 'v', long = "verbose", action)]
    pub verbose: bool,
}

impl Arguments {
    /// Minimal argument set around the required inputs, mirroring the CLI defaults.
    #[doc(hidden)]
    pub fn new(ref_fa: &str, fq1: &str, fq2: Option<&str>) -> Self {
        let mut argv = vec!["chipseq-pipeline", "-r", ref_fa, "-1", fq1];
        if let Some(fq2) = fq2 {
            argv.push("-2");
            argv.push(fq2);
        }
        Arguments::parse_from(argv)
    }
}
