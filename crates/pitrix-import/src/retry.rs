//! Retry-on-conflict for compare-and-swap writes

use futures::future::BoxFuture;
use tracing::{debug, error, warn};

use pitrix_import_types::{ImportError, ImportResult, Resource};

/// Attempt budgets for the conflict-retrying writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    /// Application display-name patches
    pub rename: u32,
    /// Version status updates to `active`
    pub activate: u32,
    /// Payload-key patches on versions created without one
    pub publish: u32,
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self {
            rename: 10,
            activate: 5,
            publish: 5,
        }
    }
}

/// Drive a mutation onto the latest stored copy of a record.
///
/// `is_applied` is checked before the first attempt and after every re-fetch;
/// once it holds, the fetched copy is returned without writing. Each attempt
/// applies `mutate` to a fresh clone of the latest copy and hands it to
/// `submit`. A conflict triggers a re-fetch through `fetch`; any other error
/// is returned as is. After `max_attempts` rejected submissions the call
/// fails with [`ImportError::ExhaustedRetries`], having re-fetched exactly
/// `max_attempts` times.
pub async fn with_retry<R, A, F, M, S>(
    operation: &str,
    max_attempts: u32,
    record: R,
    is_applied: A,
    mut fetch: F,
    mut mutate: M,
    mut submit: S,
) -> ImportResult<R>
where
    R: Resource,
    A: Fn(&R) -> bool,
    F: FnMut(String) -> BoxFuture<'static, ImportResult<R>>,
    M: FnMut(&mut R),
    S: FnMut(R) -> BoxFuture<'static, ImportResult<R>>,
{
    let target = record.name().to_string();
    let mut current = record;

    if is_applied(&current) {
        debug!("{} of {} already applied", operation, target);
        return Ok(current);
    }

    for attempt in 1..=max_attempts {
        let mut candidate = current.clone();
        mutate(&mut candidate);

        match submit(candidate).await {
            Ok(updated) => {
                if attempt > 1 {
                    debug!("{} of {} succeeded after {} attempts", operation, target, attempt);
                }
                return Ok(updated);
            }
            Err(e) if e.is_conflict() => {
                warn!(
                    "{} of {} conflicted (attempt {}/{}): {}",
                    operation, target, attempt, max_attempts, e
                );
            }
            Err(e) => {
                error!("{} of {} failed: {}", operation, target, e);
                return Err(e);
            }
        }

        current = fetch(target.clone()).await?;
        if is_applied(&current) {
            debug!("{} of {} applied concurrently", operation, target);
            return Ok(current);
        }
    }

    error!(
        "{} of {} failed after {} attempts",
        operation, target, max_attempts
    );
    Err(ImportError::ExhaustedRetries {
        operation: operation.to_string(),
        target,
        attempts: max_attempts,
    })
}
