// src/utils/streams.rs
use anyhow::{anyhow, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::LinesStream;


/// Reads an async stream to the end, line by line, without line terminators.
pub async fn read_lines<R: AsyncRead + Unpin>(reader: R) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    let mut stream = LinesStream::new(BufReader::new(reader).lines());
    while let Some(line) = stream.next().await {
        lines.push(line?);
    }
    Ok(lines)
}


/// Drains a child's piped stdout and stderr concurrently, so a full pipe on
/// one stream never stalls the other.
///
/// # Arguments
///
/// * `child` - Spawned child with both streams piped.
///
/// # Returns
/// (stdout lines, stderr lines)
pub async fn read_child_outputs(child: &mut Child) -> Result<(Vec<String>, Vec<String>)> {
    let stdout = child.stdout.take().ok_or_else(|| anyhow!("Child stdout not piped"))?;
    let stderr = child.stderr.take().ok_or_else(|| anyhow!("Child stderr not piped"))?;
    tokio::try_join!(read_lines(stdout), read_lines(stderr))
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Stdio;
    use tokio::process::Command;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_read_child_outputs() -> Result<()> {
        let mut child = Command::new("sh")
            .args(["-c", "printf 'one\\ntwo\\n'; printf 'err\\n' 1>&2"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        let (out, err) = read_child_outputs(&mut child).await?;
        child.wait().await?;
        assert_eq!(out, vec!["one".to_string(), "two".to_string()]);
        assert_eq!(err, vec!["err".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_large_stderr_does_not_block() -> Result<()> {
        // ~120 KiB on stderr before anything reaches stdout.
        let mut child = Command::new("sh")
            .args(["-c", "yes usage | head -n 20000 1>&2; echo done"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        let (out, err) = timeout(Duration::from_secs(10), read_child_outputs(&mut child)).await??;
        child.wait().await?;
        assert_eq!(out, vec!["done".to_string()]);
        assert_eq!(err.len(), 20000);
        Ok(())
    }

    #[tokio::test]
    async fn test_read_child_outputs_not_piped() -> Result<()> {
        let mut child = Command::new("true").stdout(Stdio::null()).spawn()?;
        assert!(read_child_outputs(&mut child).await.is_err());
        child.wait().await?;
        Ok(())
    }
}
