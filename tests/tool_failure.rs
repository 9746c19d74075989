//! Real (non dry-run) controller run against shell stubs of every tool.
//! Kept in its own test binary: it rewrites PATH for the whole process.

use std::env;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tempfile::tempdir;

use chipseq_pipeline::config::defs::{PipelineError, RunConfig, TRIM_GALORE_TAG};
use chipseq_pipeline::pipelines::chip_seq::{self, required_tools};
use chipseq_pipeline::utils::file::create_work_dir;
use chipseq_pipeline::Arguments;

const FASTQ: &str = "@read1\nACGTACGTAC\n+\nIIIIIIIIII\n";

fn write_stub(dir: &Path, tool: &str, body: &str) -> Result<()> {
    let path = dir.join(tool);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body))?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[tokio::test]
async fn test_failing_tool_aborts_run() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("ref.fa"), ">chr1\nACGTACGTACGTTTGCAACGTA\n")?;
    fs::write(dir.path().join("t_R1.fq"), FASTQ)?;
    fs::write(dir.path().join("t_R2.fq"), FASTQ)?;

    let args = Arguments::new("ref.fa", "t_R1.fq", Some("t_R2.fq"));

    let bin_dir = dir.path().join("bin");
    fs::create_dir_all(&bin_dir)?;
    for tool in required_tools(&args) {
        write_stub(&bin_dir, tool, "echo stub 1.0\nexit 0")?;
    }
    write_stub(
        &bin_dir,
        TRIM_GALORE_TAG,
        "if [ \"$1\" = \"--version\" ]; then echo 'trim_galore 0.6.10'; exit 0; fi\necho boom 1>&2\nexit 3",
    )?;

    let path = env::var("PATH").unwrap_or_default();
    // Single test in this binary, so no other thread reads the environment.
    unsafe {
        env::set_var("PATH", format!("{}:{}", bin_dir.display(), path));
    }

    let out_dir = dir.path().join("out");
    fs::create_dir_all(&out_dir)?;
    let work_dir = create_work_dir(dir.path(), "chip_seq_workdir_")?;
    let config = Arc::new(RunConfig::new(args, dir.path().to_path_buf(), work_dir.clone(), out_dir.clone(), 2));

    match chip_seq::run(config).await {
        Err(PipelineError::ToolExecution { tool, error }) => {
            assert_eq!(tool, TRIM_GALORE_TAG);
            assert!(error.contains("trim_galore.log"));
        }
        other => panic!("expected trim_galore to fail, got {:?}", other.map(|_| ())),
    }

    assert_eq!(fs::read_to_string(out_dir.join("trim_galore.log"))?, "boom\n");
    assert!(!out_dir.join("bowtie2-build.log").exists());
    assert!(!out_dir.join("samtools.log").exists());
    assert!(work_dir.exists());
    Ok(())
}
