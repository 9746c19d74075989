use std::path::{Path, PathBuf};
use log::info;
use crate::cli::ReadAligner;
use crate::config::defs::{PipelineError, RunConfig, SamtoolsSubcommand};
use crate::pipelines::chip_seq::Sample;
use crate::utils::command::bowtie2::{Bowtie2BuildConfig, Bowtie2Config};
use crate::utils::command::bwa::{BwaIndexConfig, BwaMemConfig};
use crate::utils::command::samtools::SamtoolsConfig;
use crate::utils::command::{generate_cli, run_tool, Redirect};
use crate::utils::file::{file_name_string, file_path_manipulator, move_file};


/// Builds the aligner index for the reference once per run.
///
/// # Returns
/// Index prefix inside the working directory.
pub async fn build_index(config: &RunConfig, ref_fa: &Path) -> Result<PathBuf, PipelineError> {
    match config.args.read_aligner {
        ReadAligner::Bowtie2 => {
            let index = config.work_dir.join("bowtie2-index");
            let build = Bowtie2BuildConfig {
                ref_fa: ref_fa.to_path_buf(),
                index: index.clone(),
            };
            let log = config.out_dir.join("bowtie2-build.log");
            run_tool(config, &generate_cli(config, &build).log_to(Redirect::Truncate(log))).await?;
            Ok(index)
        }
        ReadAligner::Bwa => {
            let index = config.work_dir.join("bwa-index");
            let build = BwaIndexConfig {
                ref_fa: ref_fa.to_path_buf(),
                prefix: index.clone(),
            };
            let log = config.out_dir.join("bwa-index.log");
            run_tool(config, &generate_cli(config, &build).stderr(Redirect::Truncate(log))).await?;
            Ok(index)
        }
    }
}


/// Aligns one sample to SAM with the configured aligner.
pub async fn align_reads(config: &RunConfig, index: &Path, sample: &Sample) -> Result<PathBuf, PipelineError> {
    let sam = work_file(config, &sample.name, "mapped.sam");
    let call = match config.args.read_aligner {
        ReadAligner::Bowtie2 => {
            let bowtie2 = Bowtie2Config {
                index: index.to_path_buf(),
                fq1: sample.fq1.clone(),
                fq2: sample.fq2.clone(),
                sam: sam.clone(),
                mode: config.args.bowtie2_mode,
            };
            let log = config.out_dir.join(format!("bowtie2-[{}].log", sample.name));
            generate_cli(config, &bowtie2).log_to(Redirect::Truncate(log))
        }
        ReadAligner::Bwa => {
            let bwa = BwaMemConfig {
                index: index.to_path_buf(),
                fq1: sample.fq1.clone(),
                fq2: sample.fq2.clone(),
                sam: sam.clone(),
            };
            let log = config.out_dir.join(format!("bwa-mem-[{}].log", sample.name));
            generate_cli(config, &bwa).stderr(Redirect::Truncate(log))
        }
    };
    run_tool(config, &call).await?;
    Ok(sam)
}


/// SAM -> BAM -> coordinate sorted BAM, both in the working directory.
pub async fn sam_to_sorted_bam(config: &RunConfig, sam: &Path, name: &str) -> Result<PathBuf, PipelineError> {
    let bam = work_file(config, name, "mapped.bam");
    let sorted_bam = work_file(config, name, "sorted.bam");
    let log = Redirect::Append(config.out_dir.join("samtools.log"));

    let view = SamtoolsConfig {
        subcommand: SamtoolsSubcommand::View,
        subcommand_fields: vec![
            ("-b".to_string(), None),
            ("-h".to_string(), None),
            ("-o".to_string(), Some(bam.to_string_lossy().into_owned())),
            (sam.to_string_lossy().into_owned(), None),
        ],
    };
    run_tool(config, &generate_cli(config, &view).stderr(log.clone())).await?;

    let sort = SamtoolsConfig {
        subcommand: SamtoolsSubcommand::Sort,
        subcommand_fields: vec![
            ("-o".to_string(), Some(sorted_bam.to_string_lossy().into_owned())),
            (bam.to_string_lossy().into_owned(), None),
        ],
    };
    run_tool(config, &generate_cli(config, &sort).stderr(log)).await?;
    Ok(sorted_bam)
}


/// Writes `samtools stats` for a BAM to `<outdir>/<name>-mapping-stats.txt`.
pub async fn mapping_stats(config: &RunConfig, bam: &Path, name: &str) -> Result<PathBuf, PipelineError> {
    let stats_txt = file_path_manipulator(Path::new(name), Some(&config.out_dir), None, Some("mapping-stats.txt"), "-");
    let stats = SamtoolsConfig {
        subcommand: SamtoolsSubcommand::Stats,
        subcommand_fields: vec![(bam.to_string_lossy().into_owned(), None)],
    };
    let call = generate_cli(config, &stats)
        .stdout(Redirect::Truncate(stats_txt.clone()))
        .stderr(Redirect::Append(config.out_dir.join("samtools.log")));
    run_tool(config, &call).await?;
    Ok(stats_txt)
}


/// Moves the sorted BAM into the output directory unless BAMs are discarded.
pub fn keep_bam(config: &RunConfig, bam: &Path) -> Result<PathBuf, PipelineError> {
    if config.args.discard_bam {
        return Ok(bam.to_path_buf());
    }
    let dst = config.out_dir.join(file_name_string(bam));
    if !config.dry_run() {
        move_file(bam, &dst)?;
    }
    info!("Keeping {}", dst.display());
    Ok(dst)
}


/// Maps one sample: align, convert, sort, stats, keep.
pub async fn map_sample(config: &RunConfig, index: &Path, sample: &Sample) -> Result<PathBuf, PipelineError> {
    let sam = align_reads(config, index, sample).await?;
    let sorted_bam = sam_to_sorted_bam(config, &sam, &sample.name).await?;
    mapping_stats(config, &sorted_bam, &sample.name).await?;
    keep_bam(config, &sorted_bam)
}


pub async fn run_mapping(
    config: &RunConfig,
    ref_fa: &Path,
    treatment: &Sample,
    control: Option<&Sample>,
) -> Result<(PathBuf, Option<PathBuf>), PipelineError> {
    let index = build_index(config, ref_fa).await?;
    let treatment_bam = map_sample(config, &index, treatment).await?;
    let control_bam = match control {
        Some(control) => Some(map_sample(config, &index, control).await?),
        None => None,
    };
    Ok((treatment_bam, control_bam))
}


fn work_file(config: &RunConfig, name: &str, suffix: &str) -> PathBuf {
    file_path_manipulator(Path::new(name), Some(&config.work_dir), None, Some(suffix), "-")
}
