use std::path::{Path, PathBuf};
use crate::config::defs::{PipelineError, RunConfig};
use crate::utils::command::homer::FindMotifsGenomeConfig;
use crate::utils::command::{generate_cli, run_tool, Redirect};
use crate::utils::file::file_name_string;
use crate::utils::system::run_bounded;


/// Output directory HOMER writes motifs for one peak file into.
pub fn motif_dir(peak_file: &Path) -> PathBuf {
    PathBuf::from(format!("{}-findMotifsGenome", peak_file.display()))
}


pub async fn find_motifs_genome(config: &RunConfig, peak_file: &Path) -> Result<PathBuf, PipelineError> {
    let output_dir = motif_dir(peak_file);
    let find_motifs = FindMotifsGenomeConfig {
        peak_file: peak_file.to_path_buf(),
        genome: config.args.genome_version.clone(),
        output_dir: output_dir.clone(),
        size: config.args.fragment_size,
    };
    let log = config.out_dir.join(format!("findMotifsGenome-[{}].log", file_name_string(peak_file)));
    run_tool(config, &generate_cli(config, &find_motifs).log_to(Redirect::Truncate(log))).await?;
    Ok(output_dir)
}


pub async fn run_motif_finding(config: &RunConfig, peak_files: &[PathBuf]) -> Result<Vec<PathBuf>, PipelineError> {
    run_bounded(config.job_semaphore.clone(), peak_files.to_vec(), |peak_file| async move {
        find_motifs_genome(config, &peak_file).await
    })
    .await
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Arguments;
    use tempfile::tempdir;

    #[test]
    fn test_motif_dir() {
        assert_eq!(
            motif_dir(Path::new("/out/homer/factor-peaks.txt")),
            PathBuf::from("/out/homer/factor-peaks.txt-findMotifsGenome")
        );
    }

    #[tokio::test]
    async fn test_find_motifs_args() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let mut args = Arguments::new("ref.fa", "t.fq", None);
        args.dry_run = true;
        args.fragment_size = 150;
        let config = RunConfig::new(args, dir.path().to_path_buf(), dir.path().join("work"), dir.path().join("out"), 1);

        let find_motifs = FindMotifsGenomeConfig {
            peak_file: PathBuf::from("p.narrowPeak"),
            genome: config.args.genome_version.clone(),
            output_dir: motif_dir(Path::new("p.narrowPeak")),
            size: config.args.fragment_size,
        };
        assert_eq!(
            generate_cli(&config, &find_motifs).args,
            vec!["p.narrowPeak", "hg38", "p.narrowPeak-findMotifsGenome", "-size", "150", "-mask"]
        );

        let dirs = run_motif_finding(&config, &[PathBuf::from("a.txt"), PathBuf::from("b.txt")]).await?;
        assert_eq!(dirs, vec![PathBuf::from("a.txt-findMotifsGenome"), PathBuf::from("b.txt-findMotifsGenome")]);
        Ok(())
    }
}
