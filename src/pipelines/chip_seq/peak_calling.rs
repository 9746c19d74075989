use std::fs;
use std::path::{Path, PathBuf};
use log::info;
use crate::cli::PeakCaller;
use crate::config::defs::{PipelineError, RunConfig, GENOME_SIZE_SHORTCUTS, HOMER_DIRNAME, MACS2_DIRNAME};
use crate::pipelines::chip_seq::{CONTROL, TREATMENT};
use crate::utils::command::homer::{FindPeaksConfig, MakeTagDirectoryConfig, PeakStyle};
use crate::utils::command::macs2::CallPeakConfig;
use crate::utils::command::{generate_cli, run_tool, Redirect};
use crate::utils::file::file_path_manipulator;


#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PeakFileFormat {
    NarrowPeak,
    BroadPeak,
    HomerPeaks,
}

/// A peak file produced by one of the callers.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakFile {
    pub path: PathBuf,
    pub caller: PeakCaller,
    pub format: PeakFileFormat,
}


/// `--effective-genome-size`: MACS2 gets the text as typed, HOMER gets a base count.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveGenomeSize {
    pub macs: String,
    pub bases: u64,
}

impl EffectiveGenomeSize {
    pub fn parse(value: &str) -> Result<Self, PipelineError> {
        let value = value.trim();
        if let Some((_, bases)) = GENOME_SIZE_SHORTCUTS.iter().find(|(name, _)| *name == value) {
            return Ok(EffectiveGenomeSize {
                macs: value.to_string(),
                bases: *bases,
            });
        }

        let bases = value
            .parse::<f64>()
            .ok()
            .filter(|b| b.is_finite() && *b >= 1.0)
            .ok_or_else(|| {
                PipelineError::InvalidConfig(format!(
                    "Effective genome size '{}' is neither hs, mm, ce, dm nor a positive number",
                    value
                ))
            })?;
        Ok(EffectiveGenomeSize {
            macs: value.to_string(),
            bases: bases.round() as u64,
        })
    }
}


/// `macs2 callpeak`, narrow or broad, into `<outdir>/macs2`.
pub async fn macs2_callpeak(
    config: &RunConfig,
    treatment_bam: &Path,
    control_bam: Option<&Path>,
    paired: bool,
    genome_size: &EffectiveGenomeSize,
    broad: bool,
) -> Result<PeakFile, PipelineError> {
    let output_dir = config.out_dir.join(MACS2_DIRNAME);
    fs::create_dir_all(&output_dir)?;

    let (name, path, format) = if broad {
        ("broad", output_dir.join("broad_peaks.broadPeak"), PeakFileFormat::BroadPeak)
    } else {
        ("narrow", output_dir.join("narrow_peaks.narrowPeak"), PeakFileFormat::NarrowPeak)
    };

    let call_peak = CallPeakConfig {
        treatment: treatment_bam.to_path_buf(),
        control: control_bam.map(Path::to_path_buf),
        paired,
        genome_size: genome_size.macs.clone(),
        qvalue: config.args.fdr,
        name: name.to_string(),
        output_dir,
        broad,
    };
    let log = config.out_dir.join(format!("macs2-callpeak-[{}].log", name));
    run_tool(config, &generate_cli(config, &call_peak).log_to(Redirect::Truncate(log))).await?;

    Ok(PeakFile {
        path,
        caller: PeakCaller::Macs2,
        format,
    })
}


/// `makeTagDirectory <workdir>/<name>-tag-directory <bam>`
pub async fn make_tag_directory(config: &RunConfig, bam: &Path, name: &str) -> Result<PathBuf, PipelineError> {
    let tag_dir = file_path_manipulator(Path::new(name), Some(&config.work_dir), None, Some("tag-directory"), "-");
    let make_tags = MakeTagDirectoryConfig {
        tag_dir: tag_dir.clone(),
        bam: bam.to_path_buf(),
    };
    let log = config.out_dir.join("makeTagDirectory.log");
    run_tool(config, &generate_cli(config, &make_tags).log_to(Redirect::Append(log))).await?;
    Ok(tag_dir)
}


/// `findPeaks` in factor or histone style into `<outdir>/homer`.
pub async fn homer_find_peaks(
    config: &RunConfig,
    tag_dir: &Path,
    control_tag_dir: Option<&Path>,
    style: PeakStyle,
    genome_size: &EffectiveGenomeSize,
) -> Result<PeakFile, PipelineError> {
    let output_dir = config.out_dir.join(HOMER_DIRNAME);
    fs::create_dir_all(&output_dir)?;
    let output = match style {
        PeakStyle::Factor => output_dir.join("factor-peaks.txt"),
        PeakStyle::Histone => output_dir.join("histone-regions.txt"),
    };

    let find_peaks = FindPeaksConfig {
        tag_dir: tag_dir.to_path_buf(),
        control_tag_dir: control_tag_dir.map(Path::to_path_buf),
        style,
        output: output.clone(),
        fdr: config.args.fdr,
        genome_size: genome_size.bases,
    };
    let log = config.out_dir.join(format!("findPeaks-[{}].log", style.as_str()));
    run_tool(config, &generate_cli(config, &find_peaks).log_to(Redirect::Truncate(log))).await?;

    Ok(PeakFile {
        path: output,
        caller: PeakCaller::Homer,
        format: PeakFileFormat::HomerPeaks,
    })
}


/// Calls peaks with every selected caller.
///
/// # Arguments
///
/// * `config` - RunConfig struct from main.
/// * `treatment_bam` - Final treatment alignments.
/// * `control_bam` - Final control alignments, if a control was sequenced.
/// * `paired` - Paired-end reads; MACS2 then reads fragments as BAMPE.
///
/// # Returns
/// Peak files in caller order: MACS2 narrow, MACS2 broad, HOMER factor, HOMER histone.
pub async fn run_peak_calling(
    config: &RunConfig,
    treatment_bam: &Path,
    control_bam: Option<&Path>,
    paired: bool,
) -> Result<Vec<PeakFile>, PipelineError> {
    let genome_size = EffectiveGenomeSize::parse(&config.args.effective_genome_size)?;
    let callers = &config.args.peak_callers;
    let mut peak_files = Vec::new();

    if callers.contains(&PeakCaller::Macs2) {
        for broad in [false, true] {
            peak_files.push(macs2_callpeak(config, treatment_bam, control_bam, paired, &genome_size, broad).await?);
        }
    }

    if callers.contains(&PeakCaller::Homer) {
        let tag_dir = make_tag_directory(config, treatment_bam, TREATMENT).await?;
        let control_tag_dir = match control_bam {
            Some(bam) => Some(make_tag_directory(config, bam, CONTROL).await?),
            None => None,
        };
        for style in [PeakStyle::Factor, PeakStyle::Histone] {
            peak_files.push(homer_find_peaks(config, &tag_dir, control_tag_dir.as_deref(), style, &genome_size).await?);
        }
    }

    info!("Called {} peak sets", peak_files.len());
    Ok(peak_files)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Arguments;
    use tempfile::tempdir;

    #[test]
    fn test_effective_genome_size() -> anyhow::Result<()> {
        let hs = EffectiveGenomeSize::parse("hs")?;
        assert_eq!(hs.macs, "hs");
        assert_eq!(hs.bases, 2_700_000_000);

        let custom = EffectiveGenomeSize::parse("5.1e7")?;
        assert_eq!(custom.macs, "5.1e7");
        assert_eq!(custom.bases, 51_000_000);

        assert_eq!(EffectiveGenomeSize::parse("1200000")?.bases, 1_200_000);
        assert!(EffectiveGenomeSize::parse("human").is_err());
        assert!(EffectiveGenomeSize::parse("-3").is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_run_peak_calling_both_callers() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let mut args = Arguments::new("ref.fa", "t.fq", None);
        args.dry_run = true;
        let config = RunConfig::new(args, dir.path().to_path_buf(), dir.path().join("work"), dir.path().join("out"), 2);

        let peaks = run_peak_calling(&config, Path::new("t.bam"), Some(Path::new("c.bam")), false).await?;
        let paths: Vec<PathBuf> = peaks.iter().map(|p| p.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                dir.path().join("out/macs2/narrow_peaks.narrowPeak"),
                dir.path().join("out/macs2/broad_peaks.broadPeak"),
                dir.path().join("out/homer/factor-peaks.txt"),
                dir.path().join("out/homer/histone-regions.txt"),
            ]
        );
        assert_eq!(peaks[1].format, PeakFileFormat::BroadPeak);
        assert_eq!(peaks[2].caller, PeakCaller::Homer);
        Ok(())
    }

    #[tokio::test]
    async fn test_run_peak_calling_macs2_only() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let mut args = Arguments::new("ref.fa", "t.fq", None);
        args.dry_run = true;
        args.peak_callers = vec![PeakCaller::Macs2];
        let config = RunConfig::new(args, dir.path().to_path_buf(), dir.path().join("work"), dir.path().join("out"), 2);

        let peaks = run_peak_calling(&config, Path::new("t.bam"), None, true).await?;
        assert_eq!(peaks.len(), 2);
        assert!(peaks.iter().all(|p| p.caller == PeakCaller::Macs2));
        assert!(!dir.path().join("out").join(HOMER_DIRNAME).exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_bad_genome_size_fails_before_tools() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let mut args = Arguments::new("ref.fa", "t.fq", None);
        args.effective_genome_size = "zebrafish".to_string();
        let config = RunConfig::new(args, dir.path().to_path_buf(), dir.path().to_path_buf(), dir.path().to_path_buf(), 1);

        let err = run_peak_calling(&config, Path::new("t.bam"), None, false).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
        Ok(())
    }
}
