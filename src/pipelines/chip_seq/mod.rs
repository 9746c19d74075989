//! ChIP-seq pipeline: trim -> align -> mark duplicates -> coverage tracks ->
//! peak calling -> annotation -> motif finding -> coverage plots -> cleanup.

pub mod trimming;
pub mod mapping;
pub mod mark_duplicates;
pub mod bam2bigwig;
pub mod peak_calling;
pub mod peak_annotation;
pub mod motif_finding;
pub mod chipseeker;
pub mod cleanup;

use std::path::PathBuf;
use std::sync::Arc;
use log::info;
use crate::cli::{Arguments, PeakCaller, ReadAligner};
use crate::config::defs::{
    PipelineError, RunConfig, ANNOTATE_PEAKS_TAG, BAM_COVERAGE_TAG, BOWTIE2_BUILD_TAG, BOWTIE2_TAG,
    BWA_TAG, FIND_MOTIFS_GENOME_TAG, FIND_PEAKS_TAG, GATK_TAG, MACS2_TAG, MAKE_TAG_DIRECTORY_TAG,
    RSCRIPT_TAG, SAMTOOLS_TAG, TRIM_GALORE_TAG,
};
use crate::utils::command::check_versions;
use crate::utils::fastq::check_fastq;
use crate::utils::file::resolve_path;
use peak_calling::{EffectiveGenomeSize, PeakFile};

pub const TREATMENT: &str = "treatment";
pub const CONTROL: &str = "control";

/// One sequenced library: single-end when `fq2` is absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub fq1: PathBuf,
    pub fq2: Option<PathBuf>,
}

impl Sample {
    pub fn paired(&self) -> bool {
        self.fq2.is_some()
    }
}

/// Everything a run leaves behind in the output directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChipSeqOutputs {
    pub treatment_bam: PathBuf,
    pub control_bam: Option<PathBuf>,
    pub bigwigs: Vec<PathBuf>,
    pub peak_files: Vec<PeakFile>,
    pub annotated_peak_files: Vec<PathBuf>,
    pub motif_dirs: Vec<PathBuf>,
    pub covplots: Vec<PathBuf>,
    pub log_files: Vec<PathBuf>,
}


/// Builds treatment and optional control samples from the arguments.
/// Control reads are optional but treatment and control must agree on pairedness.
pub fn samples_from_args(args: &Arguments, cwd: &std::path::Path) -> Result<(Sample, Option<Sample>), PipelineError> {
    let treatment = Sample {
        name: TREATMENT.to_string(),
        fq1: resolve_path(&args.fq1, cwd),
        fq2: args.fq2.as_ref().map(|f| resolve_path(f, cwd)),
    };

    let control = match (&args.control_fq1, &args.control_fq2) {
        (None, None) => None,
        (None, Some(_)) => {
            return Err(PipelineError::InvalidConfig(
                "--control-fq2 given without --control-fq1".to_string(),
            ))
        }
        (Some(fq1), fq2) => Some(Sample {
            name: CONTROL.to_string(),
            fq1: resolve_path(fq1, cwd),
            fq2: fq2.as_ref().map(|f| resolve_path(f, cwd)),
        }),
    };

    if let Some(control) = &control {
        if control.paired() != treatment.paired() {
            return Err(PipelineError::InvalidConfig(
                "Treatment and control must both be single-end or both paired-end".to_string(),
            ));
        }
    }
    Ok((treatment, control))
}


/// Reference must exist; every FASTQ must hold at least one record.
pub fn validate_inputs(ref_fa: &std::path::Path, samples: &[&Sample]) -> Result<(), PipelineError> {
    if !ref_fa.is_file() {
        return Err(PipelineError::InvalidConfig(format!(
            "Reference fasta not found: {}",
            ref_fa.display()
        )));
    }
    for sample in samples {
        let fastqs = std::iter::once(&sample.fq1).chain(sample.fq2.iter());
        for fq in fastqs {
            let first_id = check_fastq(fq)?;
            info!("{} input {} OK (first read {})", sample.name, fq.display(), first_id);
        }
    }
    Ok(())
}


/// External binaries this run will call, given its options.
pub fn required_tools(args: &Arguments) -> Vec<&'static str> {
    let mut tools = Vec::new();
    if !args.skip_trimming {
        tools.push(TRIM_GALORE_TAG);
    }
    match args.read_aligner {
        ReadAligner::Bowtie2 => {
            tools.push(BOWTIE2_BUILD_TAG);
            tools.push(BOWTIE2_TAG);
        }
        ReadAligner::Bwa => tools.push(BWA_TAG),
    }
    tools.push(SAMTOOLS_TAG);
    if !args.skip_mark_duplicates {
        tools.push(GATK_TAG);
    }
    tools.push(BAM_COVERAGE_TAG);
    if args.peak_callers.contains(&PeakCaller::Macs2) {
        tools.push(MACS2_TAG);
    }
    if args.peak_callers.contains(&PeakCaller::Homer) {
        tools.push(MAKE_TAG_DIRECTORY_TAG);
        tools.push(FIND_PEAKS_TAG);
    }
    tools.push(ANNOTATE_PEAKS_TAG);
    if !args.skip_motif_finding {
        tools.push(FIND_MOTIFS_GENOME_TAG);
    }
    tools.push(RSCRIPT_TAG);
    tools
}


/// Run function for the ChIP-seq pipeline
///
/// # Arguments
///
/// * `config` - RunConfig struct from main.
///
/// # Returns
/// Result<ChipSeqOutputs, PipelineError>
pub async fn run(config: Arc<RunConfig>) -> Result<ChipSeqOutputs, PipelineError> {
    println!("\n-------------\n ChIP-seq\n-------------\n");
    let args = &config.args;

    if args.peak_callers.is_empty() {
        return Err(PipelineError::InvalidConfig("No peak caller selected".to_string()));
    }
    EffectiveGenomeSize::parse(&args.effective_genome_size)?;

    let ref_fa = resolve_path(&args.ref_fa, &config.cwd);
    let (treatment, control) = samples_from_args(args, &config.cwd)?;
    let mut samples = vec![&treatment];
    samples.extend(control.iter());
    validate_inputs(&ref_fa, &samples)?;

    if config.dry_run() {
        info!("Dry run: commands are logged, not executed");
    } else {
        let versions = check_versions(required_tools(args)).await?;
        for (tool, version) in versions {
            info!("Found {}: {}", tool, version);
        }
    }
    if control.is_none() {
        info!("No control sample given; peaks are called on treatment only");
    }

    let (treatment, control) = if args.skip_trimming {
        info!("Skipping trimming");
        (treatment, control)
    } else {
        trimming::run_trimming(&config, &treatment, control.as_ref()).await?
    };

    let (treatment_bam, control_bam) =
        mapping::run_mapping(&config, &ref_fa, &treatment, control.as_ref()).await?;

    let (treatment_bam, control_bam) = if args.skip_mark_duplicates {
        info!("Skipping duplicate marking");
        (treatment_bam, control_bam)
    } else {
        mark_duplicates::run_mark_duplicates(&config, &treatment_bam, control_bam.as_deref()).await?
    };

    let bigwigs = bam2bigwig::run_bam2bigwig(&config, &treatment_bam, control_bam.as_deref()).await?;

    let peak_files = peak_calling::run_peak_calling(
        &config,
        &treatment_bam,
        control_bam.as_deref(),
        treatment.paired(),
    )
    .await?;
    let peak_paths: Vec<PathBuf> = peak_files.iter().map(|p| p.path.clone()).collect();

    let annotated_peak_files = peak_annotation::run_peak_annotation(&config, &peak_paths).await?;

    let motif_dirs = if args.skip_motif_finding {
        info!("Skipping motif finding");
        Vec::new()
    } else {
        motif_finding::run_motif_finding(&config, &peak_paths).await?
    };

    let covplots = chipseeker::run_chipseeker(&config, &peak_paths).await?;

    let log_files = cleanup::run_cleanup(&config)?;

    info!("ChIP-seq pipeline finished; results in {}", config.out_dir.display());
    Ok(ChipSeqOutputs {
        treatment_bam,
        control_bam,
        bigwigs,
        peak_files,
        annotated_peak_files,
        motif_dirs,
        covplots,
        log_files,
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_samples_from_args() -> anyhow::Result<()> {
        let mut args = Arguments::new("ref.fa", "t_R1.fq.gz", Some("t_R2.fq.gz"));
        args.control_fq1 = Some("c_R1.fq.gz".to_string());
        args.control_fq2 = Some("/abs/c_R2.fq.gz".to_string());

        let (treatment, control) = samples_from_args(&args, Path::new("/data"))?;
        assert_eq!(treatment.fq1, PathBuf::from("/data/t_R1.fq.gz"));
        assert!(treatment.paired());
        let control = control.expect("control sample");
        assert_eq!(control.name, CONTROL);
        assert_eq!(control.fq2, Some(PathBuf::from("/abs/c_R2.fq.gz")));
        Ok(())
    }

    #[test]
    fn test_samples_pairedness_mismatch() {
        let mut args = Arguments::new("ref.fa", "t_R1.fq.gz", Some("t_R2.fq.gz"));
        args.control_fq1 = Some("c_R1.fq.gz".to_string());
        assert!(matches!(
            samples_from_args(&args, Path::new("/data")),
            Err(PipelineError::InvalidConfig(_))
        ));

        let mut args = Arguments::new("ref.fa", "t.fq", None);
        args.control_fq2 = Some("c_R2.fq.gz".to_string());
        assert!(samples_from_args(&args, Path::new("/data")).is_err());
    }

    #[test]
    fn test_required_tools() {
        let mut args = Arguments::new("ref.fa", "t.fq", None);
        let tools = required_tools(&args);
        assert!(tools.contains(&TRIM_GALORE_TAG));
        assert!(tools.contains(&BOWTIE2_TAG));
        assert!(!tools.contains(&BWA_TAG));
        assert!(tools.contains(&MACS2_TAG));
        assert!(tools.contains(&FIND_PEAKS_TAG));

        args.read_aligner = ReadAligner::Bwa;
        args.skip_trimming = true;
        args.skip_motif_finding = true;
        args.peak_callers = vec![PeakCaller::Macs2];
        let tools = required_tools(&args);
        assert!(tools.contains(&BWA_TAG));
        assert!(!tools.contains(&TRIM_GALORE_TAG));
        assert!(!tools.contains(&FIND_MOTIFS_GENOME_TAG));
        assert!(!tools.contains(&FIND_PEAKS_TAG));
    }

    #[test]
    fn test_validate_inputs_missing_reference() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let sample = Sample {
            name: TREATMENT.to_string(),
            fq1: dir.path().join("t.fq"),
            fq2: None,
        };
        let err = validate_inputs(&dir.path().join("missing.fa"), &[&sample]).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
        Ok(())
    }
}
