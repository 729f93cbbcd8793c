//! Bounded, time-limited store lookups.
//!
//! Every store call made while answering a query goes through [`bounded`]: at most
//! `concurrency` lookups are in flight, each gets `timeout`, and a lookup that fails or
//! times out is logged and dropped. The caller gets the successes in completion order.

use std::time::Duration;

use carto_index::StoreError;
use futures::stream::{self, StreamExt};
use tokio::time;
use tracing::warn;

/// Runs `lookups` with bounded parallelism and returns the ones that succeeded.
///
/// `what` names the kind of lookup in log events.
pub(crate) async fn bounded<T, F, I>(
    lookups: I,
    concurrency: usize,
    timeout: Duration,
    what: &'static str,
) -> Vec<T>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, StoreError>>,
{
    stream::iter(lookups)
        .map(|lookup| async move {
            time::timeout(timeout, lookup)
                .await
                .unwrap_or(Err(StoreError::Timeout(timeout)))
        })
        .buffer_unordered(concurrency.max(1))
        .filter_map(|result| async move {
            match result {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!(lookup = what, error = %err, "store lookup dropped");
                    None
                }
            }
        })
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use std::{
        pin::Pin,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    type Lookup = Pin<Box<dyn Future<Output = Result<u32, StoreError>> + Send>>;

    fn ready(value: u32) -> Lookup {
        Box::pin(async move { Ok(value) })
    }

    #[tokio::test]
    async fn collects_successes() {
        let mut values = bounded((1..=5).map(ready), 2, Duration::from_secs(1), "test").await;
        values.sort_unstable();
        assert_eq!(values, [1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn failures_are_dropped() {
        let lookups: Vec<Lookup> = vec![
            ready(1),
            Box::pin(async { Err(StoreError::Transient("busy".into())) }),
            ready(3),
        ];
        let mut values = bounded(lookups, 4, Duration::from_secs(1), "test").await;
        values.sort_unstable();
        assert_eq!(values, [1, 3]);
    }

    #[tokio::test]
    async fn slow_lookups_time_out() {
        let lookups: Vec<Lookup> = vec![
            ready(1),
            Box::pin(async {
                time::sleep(Duration::from_secs(5)).await;
                Ok(2)
            }),
        ];
        let values = bounded(lookups, 2, Duration::from_millis(20), "test").await;
        assert_eq!(values, [1]);
    }

    #[tokio::test]
    async fn parallelism_is_bounded() {
        let running = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let lookups = (0..8).map(|i| {
            let running = &running;
            let peak = &peak;
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                time::sleep(Duration::from_millis(5)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, StoreError>(i)
            }
        });
        let values = bounded(lookups, 3, Duration::from_secs(1), "test").await;
        assert_eq!(values.len(), 8);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn zero_concurrency_still_runs() {
        let values = bounded([ready(7)], 0, Duration::from_secs(1), "test").await;
        assert_eq!(values, [7]);
    }
}
