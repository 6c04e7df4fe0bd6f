use std::collections::BTreeSet;
use std::future::Future;

use futures::stream::{self, StreamExt};

/// Outcome of a fan-out over seed items: the deduplicated union of every
/// successful fetch, plus the seeds that failed and why. A failed seed
/// contributes nothing and never aborts its siblings.
pub struct AggregateReport<S, T, E> {
    pub values: BTreeSet<T>,
    pub succeeded: usize,
    pub failures: Vec<(S, E)>,
}

/// Run `fetch` for every seed with at most `concurrency` fetches in flight
/// at once, merging the results into a single deduplicated set.
///
/// Completion order is unspecified and does not affect the merged set.
pub async fn aggregate<S, T, E, F, Fut>(
    seeds: Vec<S>,
    concurrency: usize,
    fetch: F,
) -> AggregateReport<S, T, E>
where
    S: Clone,
    T: Ord,
    F: Fn(S) -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
{
    let fetch = &fetch;
    let outcomes: Vec<(S, Result<Vec<T>, E>)> = stream::iter(seeds)
        .map(|seed| async move {
            let outcome = fetch(seed.clone()).await;
            (seed, outcome)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut report = AggregateReport {
        values: BTreeSet::new(),
        succeeded: 0,
        failures: Vec::new(),
    };
    for (seed, outcome) in outcomes {
        match outcome {
            Ok(items) => {
                report.succeeded += 1;
                report.values.extend(items);
            }
            Err(err) => report.failures.push((seed, err)),
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn merges_overlapping_values_into_deduplicated_set() {
        let report = aggregate(vec!["a", "b"], 4, |seed| async move {
            match seed {
                "a" => Ok::<_, String>(vec!["bug".to_string(), "docs".to_string()]),
                _ => Ok(vec!["bug".to_string(), "feature".to_string()]),
            }
        })
        .await;

        assert_eq!(report.succeeded, 2);
        assert!(report.failures.is_empty());
        let merged: Vec<&str> = report.values.iter().map(String::as_str).collect();
        assert_eq!(merged, vec!["bug", "docs", "feature"]);
    }

    #[tokio::test]
    async fn failed_seed_is_reported_and_contributes_nothing() {
        let report = aggregate(vec!["a", "b", "c"], 4, |seed| async move {
            match seed {
                "b" => Err(format!("fetch for {seed} blew up")),
                _ => Ok(vec![format!("{seed}-label")]),
            }
        })
        .await;

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "b");
        let merged: Vec<&str> = report.values.iter().map(String::as_str).collect();
        assert_eq!(merged, vec!["a-label", "c-label"]);
    }

    #[tokio::test]
    async fn never_exceeds_the_concurrency_bound() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let seeds: Vec<u32> = (0..32).collect();
        let report = aggregate(seeds, 4, |seed| {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, String>(vec![seed])
            }
        })
        .await;

        assert_eq!(report.succeeded, 32);
        assert_eq!(report.values.len(), 32);
        assert!(peak.load(Ordering::SeqCst) <= 4);
    }

    #[tokio::test]
    async fn zero_concurrency_is_clamped_rather_than_deadlocking() {
        let report = aggregate(vec![1, 2], 0, |seed| async move {
            Ok::<_, String>(vec![seed])
        })
        .await;
        assert_eq!(report.succeeded, 2);
    }
}
