//! # Bounded Worker Pool
//!
//! Dispatches a fixed list of jobs across up to `concurrency` concurrent
//! tasks, collecting every failure without losing any, via a
//! `tokio::sync::Semaphore` gating a `JoinSet`.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::errors::AggregateFailure;

/// Runs `worker(job)` for every job in `jobs`, with at most `concurrency`
/// invocations in flight at once. Every job runs exactly once; failures from
/// all jobs are collected into a single [`AggregateFailure`] in the order
/// workers happen to complete, not necessarily job order.
///
/// `worker` must be cheap to clone (an `Arc`-wrapped closure or function
/// pointer) since it is invoked from many concurrently spawned tasks.
pub async fn run_jobs<J, F, Fut>(jobs: Vec<J>, concurrency: usize, worker: F) -> AggregateFailure
where
    J: Send + 'static,
    F: Fn(J) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<(), crate::errors::FailureRecord>> + Send,
{
    let concurrency = concurrency.max(1);
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let worker = Arc::new(worker);
    let mut tasks = JoinSet::new();

    for job in jobs {
        let permit = semaphore.clone().acquire_owned().await.expect("semaphore never closed");
        let worker = worker.clone();
        tasks.spawn(async move {
            let result = worker(job).await;
            drop(permit);
            result
        });
    }

    let mut aggregate = AggregateFailure::new();
    while let Some(outcome) = tasks.join_next().await {
        match outcome {
            Ok(Err(record)) => aggregate.push(record),
            Ok(Ok(())) => {}
            Err(join_err) => {
                aggregate.push(crate::errors::FailureRecord::new(
                    "pool#panic",
                    format!("worker task panicked: {}", join_err),
                ));
            }
        }
    }
    aggregate
}
