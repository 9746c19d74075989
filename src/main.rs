use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use env_logger::Builder;
use log::{debug, error, info};

use chipseq_pipeline::cli::{parse, Arguments};
use chipseq_pipeline::config::defs::{log_level, RunConfig, WORKDIR_PREFIX};
use chipseq_pipeline::pipelines::chip_seq;
use chipseq_pipeline::utils::file::{create_work_dir, resolve_path};
use chipseq_pipeline::utils::system::detect_cores_and_load;


#[tokio::main]
async fn main() -> Result<()> {
    let run_start = Instant::now();

    let args = parse();

    Builder::new()
        .filter_level(log_level(args.verbose))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();

    println!("\n-------------\n ChIP-seq pipeline\n-------------\n");

    let dir = env::current_dir()?;
    info!("The current directory is {:?}", dir);

    let (max_cores, cpu_load) = detect_cores_and_load(args.threads).await?;
    debug!("Using {} threads; CPU load {}%", max_cores, cpu_load);

    let out_dir = setup_output_dir(&args, &dir)?;
    let work_dir = create_work_dir(&dir, WORKDIR_PREFIX)?;
    info!("Output directory: {}", out_dir.display());
    info!("Working directory: {}", work_dir.display());

    let run_config = Arc::new(RunConfig::new(args, dir, work_dir, out_dir, max_cores));

    if let Err(e) = chip_seq::run(run_config).await {
        error!("Pipeline failed: {} at {} milliseconds.", e, run_start.elapsed().as_millis());
        std::process::exit(1);
    }

    println!("Run complete: {} milliseconds.", run_start.elapsed().as_millis());
    Ok(())
}


/// Sets up output directory
/// Relative paths are taken from the current directory.
/// Ensures the directory exists.
///
/// # Arguments
/// * `args` - The parsed command-line arguments.
/// * `cwd` - The current working directory.
/// # Returns
/// path to the output directory.
fn setup_output_dir(args: &Arguments, cwd: &Path) -> Result<PathBuf> {
    let out_dir = resolve_path(&args.out_dir, cwd);
    fs::create_dir_all(&out_dir)?;
    Ok(out_dir)
}
