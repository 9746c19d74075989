//! Functions and structs for building and running external tool command lines

use std::fmt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use anyhow::{anyhow, Result};
use futures::future::join_all;
use log::{debug, info};
use tokio::process::Command;
use crate::config::defs::{PipelineError, RunConfig, CMD_LINEBREAK, TOOL_VERSION_FLAGS};
use crate::utils::streams::read_child_outputs;


/// Where a child's output stream goes.
#[derive(Debug, Clone, PartialEq)]
pub enum Redirect {
    Truncate(PathBuf),
    Append(PathBuf),
}

impl Redirect {
    pub fn path(&self) -> &Path {
        match self {
            Redirect::Truncate(p) | Redirect::Append(p) => p,
        }
    }

    fn open(&self) -> std::io::Result<File> {
        match self {
            Redirect::Truncate(p) => File::create(p),
            Redirect::Append(p) => OpenOptions::new().create(true).append(true).open(p),
        }
    }

    fn operator(&self) -> &'static str {
        match self {
            Redirect::Truncate(_) => ">",
            Redirect::Append(_) => ">>",
        }
    }
}


/// One external tool invocation: program, arguments and output redirection.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub tool: String,
    pub args: Vec<String>,
    pub stdout: Option<Redirect>,
    pub stderr: Option<Redirect>,
}

impl ToolCall {
    pub fn new(tool: &str, args: Vec<String>) -> Self {
        ToolCall {
            tool: tool.to_string(),
            args,
            stdout: None,
            stderr: None,
        }
    }

    pub fn stdout(mut self, redirect: Redirect) -> Self {
        self.stdout = Some(redirect);
        self
    }

    pub fn stderr(mut self, redirect: Redirect) -> Self {
        self.stderr = Some(redirect);
        self
    }

    /// Sends both streams to the same log file.
    pub fn log_to(self, redirect: Redirect) -> Self {
        self.stdout(redirect.clone()).stderr(redirect)
    }

    fn open_redirects(&self) -> std::io::Result<(Stdio, Stdio)> {
        match (&self.stdout, &self.stderr) {
            (Some(out), Some(err)) if out.path() == err.path() => {
                let file = out.open()?;
                let clone = file.try_clone()?;
                Ok((Stdio::from(file), Stdio::from(clone)))
            }
            (out, err) => {
                let out = match out {
                    Some(r) => Stdio::from(r.open()?),
                    None => Stdio::inherit(),
                };
                let err = match err {
                    Some(r) => Stdio::from(r.open()?),
                    None => Stdio::inherit(),
                };
                Ok((out, err))
            }
        }
    }
}

impl fmt::Display for ToolCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = vec![self.tool.clone()];
        parts.extend(self.args.iter().map(|a| shell_quote(a)));
        if let Some(out) = &self.stdout {
            parts.push(format!("1{} {}", out.operator(), out.path().display()));
        }
        if let Some(err) = &self.stderr {
            parts.push(format!("2{} {}", err.operator(), err.path().display()));
        }
        write!(f, "{}", parts.join(CMD_LINEBREAK))
    }
}

fn shell_quote(arg: &str) -> String {
    if arg.is_empty() || arg.contains(char::is_whitespace) {
        format!("\"{}\"", arg)
    } else {
        arg.to_string()
    }
}


/// Builds the argument vector for one tool.
pub trait ArgGenerator {
    fn tool(&self) -> &'static str;
    fn arg_generator(&self, config: &RunConfig) -> Vec<String>;
}

pub fn generate_cli<G: ArgGenerator>(config: &RunConfig, generator: &G) -> ToolCall {
    ToolCall::new(generator.tool(), generator.arg_generator(config))
}


/// Runs a tool to completion. Any non-zero exit is fatal.
/// In dry-run mode the command is only logged.
///
/// # Arguments
///
/// * `config` - RunConfig struct from main.
/// * `call` - The command to run.
///
/// # Returns
/// Result<(), PipelineError>
pub async fn run_tool(config: &RunConfig, call: &ToolCall) -> Result<(), PipelineError> {
    info!("{}", call);
    if config.dry_run() {
        return Ok(());
    }

    let (stdout, stderr) = call.open_redirects().map_err(|e| PipelineError::ToolExecution {
        tool: call.tool.clone(),
        error: format!("cannot open log file: {}", e),
    })?;

    let status = Command::new(&call.tool)
        .args(&call.args)
        .current_dir(&config.cwd)
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr)
        .status()
        .await
        .map_err(|e| PipelineError::ToolExecution {
            tool: call.tool.clone(),
            error: format!("failed to spawn: {}", e),
        })?;

    if !status.success() {
        let log_hint = call
            .stderr
            .as_ref()
            .map(|r| format!(" (see {})", r.path().display()))
            .unwrap_or_default();
        return Err(PipelineError::ToolExecution {
            tool: call.tool.clone(),
            error: format!("exited with {}{}", status, log_hint),
        });
    }
    debug!("{} finished", call.tool);
    Ok(())
}


/// Spawns a tool with its version flag and returns the first line it prints.
pub async fn check_version(tool: &str) -> Result<String> {
    let flag = TOOL_VERSION_FLAGS.get(tool).copied().unwrap_or("--version");
    let mut command = Command::new(tool);
    if !flag.is_empty() {
        command.arg(flag);
    }
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| anyhow!("Failed to spawn {}: {}. Is it installed?", tool, e))?;

    let (stdout_lines, stderr_lines) = read_child_outputs(&mut child).await?;
    child.wait().await?;

    let version = stdout_lines
        .iter()
        .chain(stderr_lines.iter())
        .map(|l| l.trim())
        .find(|l| !l.is_empty())
        .unwrap_or("unknown version")
        .to_string();
    Ok(version)
}


/// Checks all tools concurrently; every tool that cannot be spawned is reported.
pub async fn check_versions(tools: Vec<&str>) -> Result<Vec<(String, String)>, PipelineError> {
    let results = join_all(tools.iter().map(|tool| check_version(tool))).await;

    let mut found = Vec::new();
    let mut missing = Vec::new();
    for (tool, result) in tools.iter().zip(results) {
        match result {
            Ok(version) => {
                debug!("{}: {}", tool, version);
                found.push((tool.to_string(), version));
            }
            Err(e) => {
                debug!("{}", e);
                missing.push(tool.to_string());
            }
        }
    }
    if !missing.is_empty() {
        return Err(PipelineError::MissingTools(missing));
    }
    Ok(found)
}


fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}


pub mod trim_galore {
    use std::path::PathBuf;
    use crate::config::defs::{RunConfig, CUTADAPT_TOTAL_CORES, TRIM_GALORE_MAX_N, TRIM_GALORE_TAG};
    use super::{path_arg, ArgGenerator};

    pub struct TrimGaloreConfig {
        pub fq1: PathBuf,
        pub fq2: Option<PathBuf>,
        pub quality: u32,
        pub min_length: u32,
        pub max_length: Option<u32>,
        pub output_dir: PathBuf,
    }

    impl ArgGenerator for TrimGaloreConfig {
        fn tool(&self) -> &'static str {
            TRIM_GALORE_TAG
        }

        fn arg_generator(&self, config: &RunConfig) -> Vec<String> {
            let mut args_vec: Vec<String> = Vec::new();
            if self.fq2.is_some() {
                args_vec.push("--paired".to_string());
            }
            args_vec.push("--quality".to_string());
            args_vec.push(self.quality.to_string());
            args_vec.push("--phred33".to_string());
            args_vec.push("--cores".to_string());
            args_vec.push(CUTADAPT_TOTAL_CORES.to_string());
            args_vec.push("--fastqc_args".to_string());
            args_vec.push(format!("--threads {}", config.threads));
            args_vec.push("--illumina".to_string());
            args_vec.push("--length".to_string());
            args_vec.push(self.min_length.to_string());
            if let Some(max_length) = self.max_length {
                args_vec.push("--max_length".to_string());
                args_vec.push(max_length.to_string());
            }
            args_vec.push("--max_n".to_string());
            args_vec.push(TRIM_GALORE_MAX_N.to_string());
            args_vec.push("--trim-n".to_string());
            args_vec.push("--gzip".to_string());
            args_vec.push("--output_dir".to_string());
            args_vec.push(path_arg(&self.output_dir));
            args_vec.push(path_arg(&self.fq1));
            if let Some(fq2) = &self.fq2 {
                args_vec.push(path_arg(fq2));
            }
            args_vec
        }
    }
}


pub mod bowtie2 {
    use std::path::PathBuf;
    use crate::cli::Bowtie2Mode;
    use crate::config::defs::{RunConfig, BOWTIE2_BUILD_TAG, BOWTIE2_TAG};
    use super::{path_arg, ArgGenerator};

    pub struct Bowtie2BuildConfig {
        pub ref_fa: PathBuf,
        pub index: PathBuf,
    }

    impl ArgGenerator for Bowtie2BuildConfig {
        fn tool(&self) -> &'static str {
            BOWTIE2_BUILD_TAG
        }

        fn arg_generator(&self, config: &RunConfig) -> Vec<String> {
            vec![
                "--threads".to_string(),
                config.threads.to_string(),
                path_arg(&self.ref_fa),
                path_arg(&self.index),
            ]
        }
    }

    pub struct Bowtie2Config {
        pub index: PathBuf,
        pub fq1: PathBuf,
        pub fq2: Option<PathBuf>,
        pub sam: PathBuf,
        pub mode: Bowtie2Mode,
    }

    impl ArgGenerator for Bowtie2Config {
        fn tool(&self) -> &'static str {
            BOWTIE2_TAG
        }

        fn arg_generator(&self, config: &RunConfig) -> Vec<String> {
            let mut args_vec: Vec<String> = Vec::new();
            args_vec.push("-x".to_string());
            args_vec.push(path_arg(&self.index));
            match &self.fq2 {
                Some(fq2) => {
                    args_vec.push("-1".to_string());
                    args_vec.push(path_arg(&self.fq1));
                    args_vec.push("-2".to_string());
                    args_vec.push(path_arg(fq2));
                }
                None => {
                    args_vec.push("-U".to_string());
                    args_vec.push(path_arg(&self.fq1));
                }
            }
            args_vec.push("-S".to_string());
            args_vec.push(path_arg(&self.sam));
            args_vec.push(self.mode.as_flag());
            args_vec.push("--no-unal".to_string());
            args_vec.push("--threads".to_string());
            args_vec.push(config.threads.to_string());
            args_vec
        }
    }
}


pub mod bwa {
    use std::path::PathBuf;
    use crate::config::defs::{RunConfig, BWA_TAG};
    use super::{path_arg, ArgGenerator};

    pub struct BwaIndexConfig {
        pub ref_fa: PathBuf,
        pub prefix: PathBuf,
    }

    impl ArgGenerator for BwaIndexConfig {
        fn tool(&self) -> &'static str {
            BWA_TAG
        }

        fn arg_generator(&self, _config: &RunConfig) -> Vec<String> {
            vec![
                "index".to_string(),
                "-p".to_string(),
                path_arg(&self.prefix),
                path_arg(&self.ref_fa),
            ]
        }
    }

    pub struct BwaMemConfig {
        pub index: PathBuf,
        pub fq1: PathBuf,
        pub fq2: Option<PathBuf>,
        pub sam: PathBuf,
    }

    impl ArgGenerator for BwaMemConfig {
        fn tool(&self) -> &'static str {
            BWA_TAG
        }

        fn arg_generator(&self, config: &RunConfig) -> Vec<String> {
            let mut args_vec = vec![
                "mem".to_string(),
                "-t".to_string(),
                config.threads.to_string(),
                "-o".to_string(),
                path_arg(&self.sam),
                path_arg(&self.index),
                path_arg(&self.fq1),
            ];
            if let Some(fq2) = &self.fq2 {
                args_vec.push(path_arg(fq2));
            }
            args_vec
        }
    }
}


pub mod samtools {
    use crate::config::defs::{RunConfig, SamtoolsSubcommand, SAMTOOLS_TAG};
    use super::ArgGenerator;

    /// Subcommand plus ordered `(flag, value)` fields; positional arguments use a `None` value.
    pub struct SamtoolsConfig {
        pub subcommand: SamtoolsSubcommand,
        pub subcommand_fields: Vec<(String, Option<String>)>,
    }

    impl ArgGenerator for SamtoolsConfig {
        fn tool(&self) -> &'static str {
            SAMTOOLS_TAG
        }

        fn arg_generator(&self, config: &RunConfig) -> Vec<String> {
            let mut args_vec = vec![self.subcommand.as_str().to_string()];
            match self.subcommand {
                SamtoolsSubcommand::View | SamtoolsSubcommand::Sort | SamtoolsSubcommand::Stats => {
                    args_vec.push("-@".to_string());
                    args_vec.push(config.threads.to_string());
                }
                SamtoolsSubcommand::Index => {}
            }
            for (key, value) in &self.subcommand_fields {
                args_vec.push(key.clone());
                if let Some(value) = value {
                    args_vec.push(value.clone());
                }
            }
            args_vec
        }
    }
}


pub mod gatk {
    use std::path::PathBuf;
    use crate::config::defs::{RunConfig, GATK_REMOVE_DUPLICATES, GATK_TAG};
    use super::{path_arg, ArgGenerator};

    pub struct MarkDuplicatesConfig {
        pub input: PathBuf,
        pub metrics: PathBuf,
        pub output: PathBuf,
    }

    impl ArgGenerator for MarkDuplicatesConfig {
        fn tool(&self) -> &'static str {
            GATK_TAG
        }

        fn arg_generator(&self, _config: &RunConfig) -> Vec<String> {
            vec![
                "MarkDuplicates".to_string(),
                "--INPUT".to_string(),
                path_arg(&self.input),
                "--METRICS_FILE".to_string(),
                path_arg(&self.metrics),
                "--OUTPUT".to_string(),
                path_arg(&self.output),
                "--REMOVE_DUPLICATES".to_string(),
                GATK_REMOVE_DUPLICATES.to_string(),
            ]
        }
    }
}


pub mod deeptools {
    use std::path::PathBuf;
    use crate::config::defs::{RunConfig, BAM_COVERAGE_BIN_SIZE, BAM_COVERAGE_TAG};
    use super::{path_arg, ArgGenerator};

    pub struct BamCoverageConfig {
        pub bam: PathBuf,
        pub bigwig: PathBuf,
    }

    impl ArgGenerator for BamCoverageConfig {
        fn tool(&self) -> &'static str {
            BAM_COVERAGE_TAG
        }

        fn arg_generator(&self, config: &RunConfig) -> Vec<String> {
            vec![
                "--bam".to_string(),
                path_arg(&self.bam),
                "--outFileName".to_string(),
                path_arg(&self.bigwig),
                "--numberOfProcessors".to_string(),
                config.threads.to_string(),
                "--binSize".to_string(),
                BAM_COVERAGE_BIN_SIZE.to_string(),
                "--outFileFormat".to_string(),
                "bigwig".to_string(),
                "--normalizeUsing".to_string(),
                "None".to_string(),
                "--ignoreDuplicates".to_string(),
                "--centerReads".to_string(),
            ]
        }
    }
}


pub mod macs2 {
    use std::path::PathBuf;
    use crate::config::defs::{RunConfig, MACS2_TAG};
    use super::{path_arg, ArgGenerator};

    pub struct CallPeakConfig {
        pub treatment: PathBuf,
        pub control: Option<PathBuf>,
        pub paired: bool,
        pub genome_size: String,
        pub qvalue: f64,
        pub name: String,
        pub output_dir: PathBuf,
        pub broad: bool,
    }

    impl ArgGenerator for CallPeakConfig {
        fn tool(&self) -> &'static str {
            MACS2_TAG
        }

        fn arg_generator(&self, _config: &RunConfig) -> Vec<String> {
            let mut args_vec = vec![
                "callpeak".to_string(),
                "--treatment".to_string(),
                path_arg(&self.treatment),
            ];
            if let Some(control) = &self.control {
                args_vec.push("--control".to_string());
                args_vec.push(path_arg(control));
            }
            args_vec.push("--format".to_string());
            args_vec.push(if self.paired { "BAMPE" } else { "BAM" }.to_string());
            args_vec.push("--gsize".to_string());
            args_vec.push(self.genome_size.clone());
            args_vec.push("--qvalue".to_string());
            args_vec.push(self.qvalue.to_string());
            args_vec.push("--keep-dup".to_string());
            args_vec.push("all".to_string());
            if self.broad {
                args_vec.push("--broad".to_string());
                args_vec.push("--broad-cutoff".to_string());
                args_vec.push(self.qvalue.to_string());
            }
            args_vec.push("--name".to_string());
            args_vec.push(self.name.clone());
            args_vec.push("--outdir".to_string());
            args_vec.push(path_arg(&self.output_dir));
            args_vec
        }
    }
}


pub mod homer {
    use std::path::PathBuf;
    use crate::config::defs::{
        RunConfig, ANNOTATE_PEAKS_TAG, FIND_MOTIFS_GENOME_TAG, FIND_PEAKS_TAG, MAKE_TAG_DIRECTORY_TAG,
    };
    use super::{path_arg, ArgGenerator};

    pub struct MakeTagDirectoryConfig {
        pub tag_dir: PathBuf,
        pub bam: PathBuf,
    }

    impl ArgGenerator for MakeTagDirectoryConfig {
        fn tool(&self) -> &'static str {
            MAKE_TAG_DIRECTORY_TAG
        }

        fn arg_generator(&self, _config: &RunConfig) -> Vec<String> {
            vec![path_arg(&self.tag_dir), path_arg(&self.bam)]
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    pub enum PeakStyle {
        Factor,
        Histone,
    }

    impl PeakStyle {
        pub fn as_str(&self) -> &'static str {
            match self {
                PeakStyle::Factor => "factor",
                PeakStyle::Histone => "histone",
            }
        }
    }

    pub struct FindPeaksConfig {
        pub tag_dir: PathBuf,
        pub control_tag_dir: Option<PathBuf>,
        pub style: PeakStyle,
        pub output: PathBuf,
        pub fdr: f64,
        pub genome_size: u64,
    }

    impl ArgGenerator for FindPeaksConfig {
        fn tool(&self) -> &'static str {
            FIND_PEAKS_TAG
        }

        fn arg_generator(&self, _config: &RunConfig) -> Vec<String> {
            let mut args_vec = vec![
                path_arg(&self.tag_dir),
                "-style".to_string(),
                self.style.as_str().to_string(),
                "-o".to_string(),
                path_arg(&self.output),
            ];
            if let Some(control) = &self.control_tag_dir {
                args_vec.push("-i".to_string());
                args_vec.push(path_arg(control));
            }
            args_vec.push("-fdr".to_string());
            args_vec.push(self.fdr.to_string());
            args_vec.push("-gsize".to_string());
            args_vec.push(self.genome_size.to_string());
            args_vec
        }
    }

    pub struct AnnotatePeaksConfig {
        pub peak_file: PathBuf,
        pub genome: String,
        pub gtf: Option<PathBuf>,
    }

    impl ArgGenerator for AnnotatePeaksConfig {
        fn tool(&self) -> &'static str {
            ANNOTATE_PEAKS_TAG
        }

        fn arg_generator(&self, _config: &RunConfig) -> Vec<String> {
            let mut args_vec = vec![path_arg(&self.peak_file), self.genome.clone()];
            if let Some(gtf) = &self.gtf {
                args_vec.push("-gtf".to_string());
                args_vec.push(path_arg(gtf));
            }
            args_vec
        }
    }

    pub struct FindMotifsGenomeConfig {
        pub peak_file: PathBuf,
        pub genome: String,
        pub output_dir: PathBuf,
        pub size: u32,
    }

    impl ArgGenerator for FindMotifsGenomeConfig {
        fn tool(&self) -> &'static str {
            FIND_MOTIFS_GENOME_TAG
        }

        fn arg_generator(&self, _config: &RunConfig) -> Vec<String> {
            vec![
                path_arg(&self.peak_file),
                self.genome.clone(),
                path_arg(&self.output_dir),
                "-size".to_string(),
                self.size.to_string(),
                "-mask".to_string(),
            ]
        }
    }
}


pub mod rscript {
    use std::path::PathBuf;
    use crate::config::defs::{RunConfig, RSCRIPT_TAG};
    use super::{path_arg, ArgGenerator};

    pub struct RscriptConfig {
        pub script: PathBuf,
    }

    impl ArgGenerator for RscriptConfig {
        fn tool(&self) -> &'static str {
            RSCRIPT_TAG
        }

        fn arg_generator(&self, _config: &RunConfig) -> Vec<String> {
            vec![path_arg(&self.script)]
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::bowtie2::Bowtie2Config;
    use super::bwa::BwaMemConfig;
    use super::macs2::CallPeakConfig;
    use super::trim_galore::TrimGaloreConfig;
    use crate::cli::{Arguments, Bowtie2Mode};
    use tempfile::tempdir;

    fn config() -> RunConfig {
        RunConfig::new(
            Arguments::new("ref.fa", "r1.fq", None),
            PathBuf::from("/"),
            PathBuf::from("/work"),
            PathBuf::from("/out"),
            8,
        )
    }

    fn local_config(args: Arguments, dir: &Path) -> RunConfig {
        RunConfig::new(args, dir.to_path_buf(), dir.to_path_buf(), dir.to_path_buf(), 1)
    }

    #[test]
    fn test_trim_galore_args() {
        let cfg = config();
        let trim = TrimGaloreConfig {
            fq1: PathBuf::from("/in/t_R1.fq.gz"),
            fq2: Some(PathBuf::from("/in/t_R2.fq.gz")),
            quality: 20,
            min_length: 20,
            max_length: None,
            output_dir: PathBuf::from("/work"),
        };
        let call = generate_cli(&cfg, &trim);
        assert_eq!(call.tool, "trim_galore");
        assert_eq!(call.args[0], "--paired");
        assert!(call.args.contains(&"--threads 8".to_string()));
        assert!(!call.args.contains(&"--max_length".to_string()));
        assert_eq!(&call.args[call.args.len() - 2..], &["/in/t_R1.fq.gz".to_string(), "/in/t_R2.fq.gz".to_string()]);

        let single = TrimGaloreConfig { fq2: None, max_length: Some(150), ..trim };
        let args = single.arg_generator(&cfg);
        assert!(!args.contains(&"--paired".to_string()));
        let pos = args.iter().position(|a| a == "--max_length").expect("max length flag");
        assert_eq!(args[pos + 1], "150");
    }

    #[test]
    fn test_bowtie2_single_and_paired() {
        let cfg = config();
        let single = Bowtie2Config {
            index: PathBuf::from("/work/bowtie2-index"),
            fq1: PathBuf::from("r1.fq"),
            fq2: None,
            sam: PathBuf::from("/work/treatment-mapped.sam"),
            mode: Bowtie2Mode::VerySensitive,
        };
        let args = single.arg_generator(&cfg);
        assert_eq!(&args[..4], &["-x", "/work/bowtie2-index", "-U", "r1.fq"]);
        assert!(args.contains(&"--very-sensitive".to_string()));
        assert!(args.contains(&"--no-unal".to_string()));

        let paired = Bowtie2Config { fq2: Some(PathBuf::from("r2.fq")), ..single };
        let args = paired.arg_generator(&cfg);
        assert_eq!(&args[2..6], &["-1", "r1.fq", "-2", "r2.fq"]);
    }

    #[test]
    fn test_bwa_mem_args() {
        let cfg = config();
        let mem = BwaMemConfig {
            index: PathBuf::from("/work/bwa-index"),
            fq1: PathBuf::from("r1.fq"),
            fq2: Some(PathBuf::from("r2.fq")),
            sam: PathBuf::from("/work/t.sam"),
        };
        assert_eq!(
            mem.arg_generator(&cfg),
            vec!["mem", "-t", "8", "-o", "/work/t.sam", "/work/bwa-index", "r1.fq", "r2.fq"]
        );
    }

    #[test]
    fn test_macs2_broad_with_control() {
        let cfg = config();
        let call_peak = CallPeakConfig {
            treatment: PathBuf::from("t.bam"),
            control: Some(PathBuf::from("c.bam")),
            paired: true,
            genome_size: "5.1e7".to_string(),
            qvalue: 0.05,
            name: "broad".to_string(),
            output_dir: PathBuf::from("/out/macs2"),
            broad: true,
        };
        let args = call_peak.arg_generator(&cfg);
        assert_eq!(&args[..5], &["callpeak", "--treatment", "t.bam", "--control", "c.bam"]);
        assert!(args.windows(2).any(|w| w == ["--format", "BAMPE"]));
        assert!(args.windows(2).any(|w| w == ["--broad-cutoff", "0.05"]));
        assert!(args.windows(2).any(|w| w == ["--gsize", "5.1e7"]));
    }

    #[test]
    fn test_tool_call_display() {
        let call = ToolCall::new("trim_galore", vec!["--fastqc_args".to_string(), "--threads 4".to_string()])
            .log_to(Redirect::Append(PathBuf::from("/out/trim_galore.log")));
        let rendered = call.to_string();
        assert_eq!(
            rendered,
            "trim_galore \\\n  --fastqc_args \\\n  \"--threads 4\" \\\n  1>> /out/trim_galore.log \\\n  2>> /out/trim_galore.log"
        );
    }

    #[tokio::test]
    async fn test_run_tool_redirects_to_shared_log() -> Result<()> {
        let dir = tempdir()?;
        let cfg = local_config(Arguments::new("ref.fa", "r1.fq", None), dir.path());
        let log = dir.path().join("tool.log");
        let call = ToolCall::new("sh", vec!["-c".to_string(), "echo out; echo err 1>&2".to_string()])
            .log_to(Redirect::Truncate(log.clone()));
        run_tool(&cfg, &call).await?;
        let contents = std::fs::read_to_string(&log)?;
        assert!(contents.contains("out"));
        assert!(contents.contains("err"));
        Ok(())
    }

    #[tokio::test]
    async fn test_run_tool_append() -> Result<()> {
        let dir = tempdir()?;
        let cfg = local_config(Arguments::new("ref.fa", "r1.fq", None), dir.path());
        let log = dir.path().join("append.log");
        for word in ["first", "second"] {
            let call = ToolCall::new("echo", vec![word.to_string()]).stdout(Redirect::Append(log.clone()));
            run_tool(&cfg, &call).await?;
        }
        assert_eq!(std::fs::read_to_string(&log)?, "first\nsecond\n");
        Ok(())
    }

    #[tokio::test]
    async fn test_run_tool_failure_is_fatal() -> Result<()> {
        let dir = tempdir()?;
        let cfg = local_config(Arguments::new("ref.fa", "r1.fq", None), dir.path());
        let err = run_tool(&cfg, &ToolCall::new("false", vec![])).await.unwrap_err();
        assert!(matches!(err, PipelineError::ToolExecution { ref tool, .. } if tool == "false"));

        let err = run_tool(&cfg, &ToolCall::new("definitely-not-a-real-tool-xyz", vec![])).await.unwrap_err();
        assert!(err.to_string().contains("failed to spawn"));
        Ok(())
    }

    #[tokio::test]
    async fn test_run_tool_dry_run_does_not_execute() -> Result<()> {
        let dir = tempdir()?;
        let mut args = Arguments::new("ref.fa", "r1.fq", None);
        args.dry_run = true;
        let cfg = local_config(args, dir.path());
        let log = dir.path().join("never.log");
        let call = ToolCall::new("false", vec![]).log_to(Redirect::Truncate(log.clone()));
        run_tool(&cfg, &call).await?;
        assert!(!log.exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_check_versions() -> Result<()> {
        let found = check_versions(vec!["sh"]).await;
        assert!(found.is_ok());

        let err = check_versions(vec!["sh", "no-such-tool-abc"]).await.unwrap_err();
        match err {
            PipelineError::MissingTools(tools) => assert_eq!(tools, vec!["no-such-tool-abc".to_string()]),
            other => panic!("unexpected error: {}", other),
        }
        Ok(())
    }
}
