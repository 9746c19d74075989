use std::path::{Path, PathBuf};
use log::info;
use crate::config::defs::{PipelineError, RunConfig, FASTQC_DIRNAME, FASTQC_REPORT_SUFFIXES};
use crate::pipelines::chip_seq::Sample;
use crate::utils::command::trim_galore::TrimGaloreConfig;
use crate::utils::command::{generate_cli, run_tool, Redirect};
use crate::utils::file::{fastq_stem, move_files_with_suffix};


/// Names trim_galore gives its outputs in `work_dir`.
///
/// # Returns
/// Paired: (`<stem>_val_1.fq.gz`, `<stem>_val_2.fq.gz`); single-end: (`<stem>_trimmed.fq.gz`, None)
pub fn trimmed_fastq_paths(sample: &Sample, work_dir: &Path) -> (PathBuf, Option<PathBuf>) {
    match &sample.fq2 {
        Some(fq2) => (
            work_dir.join(format!("{}_val_1.fq.gz", fastq_stem(&sample.fq1))),
            Some(work_dir.join(format!("{}_val_2.fq.gz", fastq_stem(fq2)))),
        ),
        None => (work_dir.join(format!("{}_trimmed.fq.gz", fastq_stem(&sample.fq1))), None),
    }
}


/// `--max-read-length` as trim_galore's `--max_length`; zero or negative means no limit.
pub fn max_read_length(value: i64) -> Result<Option<u32>, PipelineError> {
    if value <= 0 {
        return Ok(None);
    }
    u32::try_from(value).map(Some).map_err(|_| {
        PipelineError::InvalidConfig(format!("--max-read-length {} is out of range", value))
    })
}


/// Trims one sample with trim_galore and moves its FastQC reports to `<outdir>/fastqc`.
///
/// # Returns
/// The sample pointing at the trimmed reads.
pub async fn trim_galore(config: &RunConfig, sample: &Sample) -> Result<Sample, PipelineError> {
    let args = &config.args;
    let max_length = max_read_length(args.max_read_length)?;

    let trim_config = TrimGaloreConfig {
        fq1: sample.fq1.clone(),
        fq2: sample.fq2.clone(),
        quality: args.base_quality_cutoff,
        min_length: args.min_read_length,
        max_length,
        output_dir: config.work_dir.clone(),
    };
    let log = config.out_dir.join("trim_galore.log");
    let call = generate_cli(config, &trim_config).log_to(Redirect::Append(log));
    run_tool(config, &call).await?;

    let (fq1, fq2) = trimmed_fastq_paths(sample, &config.work_dir);

    if !config.dry_run() {
        let dst_dir = config.out_dir.join(FASTQC_DIRNAME);
        let moved = move_files_with_suffix(&config.work_dir, FASTQC_REPORT_SUFFIXES, &dst_dir)?;
        info!("Moved {} trimming reports to {}", moved.len(), dst_dir.display());
    }

    Ok(Sample {
        name: sample.name.clone(),
        fq1,
        fq2,
    })
}


pub async fn run_trimming(
    config: &RunConfig,
    treatment: &Sample,
    control: Option<&Sample>,
) -> Result<(Sample, Option<Sample>), PipelineError> {
    let treatment = trim_galore(config, treatment).await?;
    let control = match control {
        Some(control) => Some(trim_galore(config, control).await?),
        None => None,
    };
    Ok((treatment, control))
}
