use std::path::{Path, PathBuf};
use crate::config::defs::{PipelineError, RunConfig, ANNOTATED_SUFFIX};
use crate::utils::command::homer::AnnotatePeaksConfig;
use crate::utils::command::{generate_cli, run_tool, Redirect};
use crate::utils::file::{file_name_string, insert_name_tag, resolve_path};
use crate::utils::system::run_bounded;


/// `annotatePeaks.pl` for one peak file; stdout is the annotation table.
///
/// # Returns
/// `<prefix>-annotated.<ext>` next to the peak file.
pub async fn annotate_peaks(config: &RunConfig, peak_file: &Path) -> Result<PathBuf, PipelineError> {
    let annotated = insert_name_tag(peak_file, ANNOTATED_SUFFIX);
    let annotate = AnnotatePeaksConfig {
        peak_file: peak_file.to_path_buf(),
        genome: config.args.genome_version.clone(),
        gtf: config.args.gtf.as_ref().map(|g| resolve_path(g, &config.cwd)),
    };
    let log = config.out_dir.join(format!("annotatePeaks-[{}].log", file_name_string(peak_file)));
    let call = generate_cli(config, &annotate)
        .stdout(Redirect::Truncate(annotated.clone()))
        .stderr(Redirect::Truncate(log));
    run_tool(config, &call).await?;
    Ok(annotated)
}


pub async fn run_peak_annotation(config: &RunConfig, peak_files: &[PathBuf]) -> Result<Vec<PathBuf>, PipelineError> {
    run_bounded(config.job_semaphore.clone(), peak_files.to_vec(), |peak_file| async move {
        annotate_peaks(config, &peak_file).await
    })
    .await
}
