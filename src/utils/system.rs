// src/utils/system.rs: System functions

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::future::try_join_all;
use log::debug;
use sysinfo::{CpuRefreshKind, RefreshKind, System};
use tokio::sync::Semaphore;
use tokio::time::sleep;

use crate::config::defs::PipelineError;


/// Determines number of cores that can be used for the external tools
///
/// # Arguments
///
/// * `args_threads` - Thread count requested on the command line.
///
/// # Returns
///
/// Result<(usize, f32)> maximum cores, current cpu usage
pub async fn detect_cores_and_load(args_threads: usize) -> Result<(usize, f32)> {
    let refresh_kind = RefreshKind::nothing().with_cpu(Default::default());
    let mut system = System::new_with_specifics(refresh_kind);
    system.refresh_cpu_all();
    let physical_cores = System::physical_core_count().unwrap_or(1);
    system.refresh_cpu_specifics(CpuRefreshKind::nothing().with_cpu_usage());
    sleep(Duration::from_millis(100)).await;
    let cpu_load = system.global_cpu_usage();
    let max_cores = cap_threads(args_threads, physical_cores);
    Ok((max_cores, cpu_load))
}


/// Requested threads capped at the physical core count, never below one.
pub fn cap_threads(args_threads: usize, physical_cores: usize) -> usize {
    args_threads.min(physical_cores.max(1)).max(1)
}


/// Runs `job` once per item, with at most as many jobs in flight as the
/// semaphore has permits. Results come back in item order; the first error
/// aborts the batch.
///
/// # Arguments
///
/// * `semaphore` - Bounds the number of concurrent jobs.
/// * `items` - Independent inputs, one job each.
/// * `job` - Async operation applied to every item.
///
/// # Returns
/// Result<Vec<T>, PipelineError>
pub async fn run_bounded<I, T, F, Fut>(
    semaphore: Arc<Semaphore>,
    items: Vec<I>,
    job: F,
) -> Result<Vec<T>, PipelineError>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T, PipelineError>>,
{
    let jobs = items.into_iter().map(|item| {
        let semaphore = semaphore.clone();
        let fut = job(item);
        async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| PipelineError::Other(e.into()))?;
            fut.await
        }
    });
    let results = try_join_all(jobs).await?;
    debug!("Finished {} pooled jobs", results.len());
    Ok(results)
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_cap_threads() {
        assert_eq!(cap_threads(4, 16), 4);
        assert_eq!(cap_threads(64, 8), 8);
        assert_eq!(cap_threads(0, 8), 1);
        assert_eq!(cap_threads(4, 0), 1);
    }

    #[tokio::test]
    async fn test_detect_cores_and_load() -> Result<()> {
        let (cores, _load) = detect_cores_and_load(2).await?;
        assert!(cores >= 1 && cores <= 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_run_bounded_respects_capacity() -> Result<()> {
        let semaphore = Arc::new(Semaphore::new(2));
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let results = run_bounded(semaphore, (0..8).collect(), |i: usize| {
            let running = running.clone();
            let peak = peak.clone();
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                sleep(Duration::from_millis(20)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok::<usize, PipelineError>(i * 10)
            }
        })
        .await?;

        assert_eq!(results, vec![0, 10, 20, 30, 40, 50, 60, 70]);
        assert!(peak.load(Ordering::SeqCst) <= 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_run_bounded_first_error_wins() {
        let semaphore = Arc::new(Semaphore::new(4));
        let result = run_bounded(semaphore, vec![1, 2, 3], |i: u32| async move {
            if i == 2 {
                Err(PipelineError::ToolExecution {
                    tool: "job".to_string(),
                    error: "boom".to_string(),
                })
            } else {
                Ok(i)
            }
        })
        .await;
        assert!(matches!(result, Err(PipelineError::ToolExecution { .. })));
    }
}
