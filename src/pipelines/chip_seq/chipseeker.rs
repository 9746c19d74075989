use std::fs;
use std::path::{Path, PathBuf};
use log::{info, warn};
use tokio::task;
use crate::config::defs::{PipelineError, RunConfig, COVPLOT_WEIGHT_COL};
use crate::utils::command::rscript::RscriptConfig;
use crate::utils::command::{generate_cli, run_tool, Redirect};
use crate::utils::file::{extension_remover, file_stem_string};
use crate::utils::peaks::write_clean_bed;
use crate::utils::system::run_bounded;


/// R source for one ChIPseeker coverage plot.
pub fn covplot_script(clean_bed: &Path, pdf: &Path) -> String {
    format!(
        "library(ChIPseeker)\npeaks <- readPeakFile(\"{}\")\npdf(\"{}\")\ncovplot(peaks, weightCol=\"{}\")\n",
        clean_bed.display(),
        pdf.display(),
        COVPLOT_WEIGHT_COL
    )
}


/// Cleans a peak file off the async runtime.
async fn clean_peaks_async(peak_file: PathBuf, work_dir: PathBuf) -> Result<Option<PathBuf>, PipelineError> {
    task::spawn_blocking(move || write_clean_bed(&peak_file, &work_dir))
        .await
        .map_err(|e| PipelineError::Other(e.into()))?
}


/// Draws the genome-wide peak coverage plot for one peak file.
///
/// # Returns
/// `<peak path without extension>.pdf`, or None when no peak lies on a `chr*` chromosome.
pub async fn covplot(config: &RunConfig, peak_file: &Path) -> Result<Option<PathBuf>, PipelineError> {
    if config.dry_run() && !peak_file.exists() {
        info!("Dry run: {} not produced, no coverage plot", peak_file.display());
        return Ok(None);
    }

    let clean_bed = match clean_peaks_async(peak_file.to_path_buf(), config.work_dir.clone()).await? {
        Some(bed) => bed,
        None => {
            warn!("Skip empty peak file: {}", peak_file.display());
            return Ok(None);
        }
    };

    let stem = file_stem_string(peak_file);
    let pdf = PathBuf::from(format!("{}.pdf", extension_remover(peak_file).display()));
    let script = config.work_dir.join(format!("covplot-[{}].R", stem));
    fs::write(&script, covplot_script(&clean_bed, &pdf))?;

    let log = config.out_dir.join(format!("covplot-[{}].log", stem));
    let call = generate_cli(config, &RscriptConfig { script }).log_to(Redirect::Truncate(log));
    run_tool(config, &call).await?;
    Ok(Some(pdf))
}


pub async fn run_chipseeker(config: &RunConfig, peak_files: &[PathBuf]) -> Result<Vec<PathBuf>, PipelineError> {
    let plots = run_bounded(config.job_semaphore.clone(), peak_files.to_vec(), |peak_file| async move {
        covplot(config, &peak_file).await
    })
    .await?;
    Ok(plots.into_iter().flatten().collect())
}
