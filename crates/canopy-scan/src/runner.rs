//! Bounded-concurrency execution of a batch of async operations.

use std::future::Future;

use futures::stream::{FuturesUnordered, StreamExt};
use thiserror::Error;

/// Why a bounded run stopped early.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RunError<E> {
    /// Cancellation was observed before every item was launched.
    #[error("cancelled")]
    Cancelled,
    /// An operation failed.
    #[error(transparent)]
    Failed(E),
}

/// Run `op` over `items` with at most `limit` operations in flight.
///
/// Results come back in item order. Cancellation is polled before each
/// launch; after cancellation or the first error no further items are
/// launched, in-flight operations are allowed to settle, and the first
/// failure is returned. A zero `limit` is treated as one.
pub async fn run_bounded<I, T, E, F, Fut, C>(
    items: impl IntoIterator<Item = I>,
    limit: usize,
    is_cancelled: C,
    mut op: F,
) -> Result<Vec<T>, RunError<E>>
where
    F: FnMut(I) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn() -> bool,
{
    let limit = limit.max(1);
    let mut pending = items.into_iter().enumerate();
    let mut in_flight = FuturesUnordered::new();
    let mut results: Vec<Option<T>> = Vec::new();
    let mut failure: Option<RunError<E>> = None;

    loop {
        while failure.is_none() && in_flight.len() < limit {
            let Some((index, item)) = pending.next() else {
                break;
            };
            if is_cancelled() {
                failure = Some(RunError::Cancelled);
                break;
            }
            results.push(None);
            let fut = op(item);
            in_flight.push(async move { (index, fut.await) });
        }

        let Some((index, outcome)) = in_flight.next().await else {
            break;
        };
        match outcome {
            Ok(value) => results[index] = Some(value),
            Err(err) => {
                if failure.is_none() {
                    failure = Some(RunError::Failed(err));
                }
            }
        }
    }

    if let Some(failure) = failure {
        return Err(failure);
    }
    // Every launched slot was filled; nothing was skipped without a failure.
    Ok(results.into_iter().flatten().collect())
}
