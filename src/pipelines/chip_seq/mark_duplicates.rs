use std::fs;
use std::path::{Path, PathBuf};
use crate::config::defs::{PipelineError, RunConfig, DUPLICATE_METRICS_DIRNAME};
use crate::utils::command::gatk::MarkDuplicatesConfig;
use crate::utils::command::{generate_cli, run_tool, Redirect};
use crate::utils::file::edit_file_path;


/// Marks (does not remove) duplicates with GATK.
///
/// # Returns
/// `<workdir>/<stem>-mark-duplicates.bam`
pub async fn gatk_mark_duplicates(config: &RunConfig, bam: &Path) -> Result<PathBuf, PipelineError> {
    let out_bam = edit_file_path(bam, ".bam", "-mark-duplicates.bam", &config.work_dir);

    let metrics_dir = config.out_dir.join(DUPLICATE_METRICS_DIRNAME);
    fs::create_dir_all(&metrics_dir)?;
    let metrics_txt = edit_file_path(bam, ".bam", "-duplicate-metrics.txt", &metrics_dir);

    let mark_duplicates = MarkDuplicatesConfig {
        input: bam.to_path_buf(),
        metrics: metrics_txt,
        output: out_bam.clone(),
    };
    let log = config.out_dir.join("gatk-MarkDuplicates.log");
    let call = generate_cli(config, &mark_duplicates).log_to(Redirect::Append(log));
    run_tool(config, &call).await?;
    Ok(out_bam)
}


pub async fn run_mark_duplicates(
    config: &RunConfig,
    treatment_bam: &Path,
    control_bam: Option<&Path>,
) -> Result<(PathBuf, Option<PathBuf>), PipelineError> {
    let treatment = gatk_mark_duplicates(config, treatment_bam).await?;
    let control = match control_bam {
        Some(bam) => Some(gatk_mark_duplicates(config, bam).await?),
        None => None,
    };
    Ok((treatment, control))
}
