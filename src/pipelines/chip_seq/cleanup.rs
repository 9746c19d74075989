use std::fs;
use std::path::PathBuf;
use log::info;
use crate::config::defs::{PipelineError, RunConfig, LOG_DIRNAME};
use crate::utils::file::move_files_with_suffix;


/// Moves every `*.log` in the output directory into `<outdir>/log`.
pub fn collect_logs(config: &RunConfig) -> Result<Vec<PathBuf>, PipelineError> {
    if !config.out_dir.is_dir() {
        return Ok(Vec::new());
    }
    let log_dir = config.out_dir.join(LOG_DIRNAME);
    let moved = move_files_with_suffix(&config.out_dir, &[".log"], &log_dir)?;
    info!("Collected {} log files in {}", moved.len(), log_dir.display());
    Ok(moved)
}


/// Gathers logs and removes the working directory unless running with `--debug`.
pub fn run_cleanup(config: &RunConfig) -> Result<Vec<PathBuf>, PipelineError> {
    let logs = collect_logs(config)?;
    if config.debug() {
        info!("Debug mode: keeping working directory {}", config.work_dir.display());
    } else if config.work_dir.exists() {
        fs::remove_dir_all(&config.work_dir)?;
        info!("Removed working directory {}", config.work_dir.display());
    }
    Ok(logs)
}
