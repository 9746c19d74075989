use std::path::{Path, PathBuf};
use log::debug;
use crate::config::defs::{PipelineError, RunConfig, SamtoolsSubcommand};
use crate::utils::command::deeptools::BamCoverageConfig;
use crate::utils::command::samtools::SamtoolsConfig;
use crate::utils::command::{generate_cli, run_tool, Redirect};
use crate::utils::file::{edit_file_path, file_name_string};


/// `samtools index` unless `<bam>.bai` already exists.
pub async fn index_bam(config: &RunConfig, bam: &Path) -> Result<(), PipelineError> {
    let bai = PathBuf::from(format!("{}.bai", bam.display()));
    if bai.exists() {
        debug!("{} already indexed", bam.display());
        return Ok(());
    }
    let index = SamtoolsConfig {
        subcommand: SamtoolsSubcommand::Index,
        subcommand_fields: vec![(bam.to_string_lossy().into_owned(), None)],
    };
    let log = Redirect::Append(config.out_dir.join("samtools.log"));
    run_tool(config, &generate_cli(config, &index).stderr(log)).await
}


/// Writes a 10 bp bin bigWig coverage track to `<outdir>/<stem>.bw`.
pub async fn bam_coverage(config: &RunConfig, bam: &Path) -> Result<PathBuf, PipelineError> {
    let bigwig = edit_file_path(bam, ".bam", ".bw", &config.out_dir);
    let coverage = BamCoverageConfig {
        bam: bam.to_path_buf(),
        bigwig: bigwig.clone(),
    };
    let log = config.out_dir.join(format!("bamCoverage-[{}].log", file_name_string(bam)));
    run_tool(config, &generate_cli(config, &coverage).log_to(Redirect::Truncate(log))).await?;
    Ok(bigwig)
}


pub async fn run_bam2bigwig(
    config: &RunConfig,
    treatment_bam: &Path,
    control_bam: Option<&Path>,
) -> Result<Vec<PathBuf>, PipelineError> {
    let bams: Vec<&Path> = std::iter::once(treatment_bam).chain(control_bam).collect();

    for bam in &bams {
        index_bam(config, bam).await?;
    }
    let mut bigwigs = Vec::new();
    for bam in &bams {
        bigwigs.push(bam_coverage(config, bam).await?);
    }
    Ok(bigwigs)
}
