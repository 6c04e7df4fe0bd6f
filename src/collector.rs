use std::future::Future;

use thiserror::Error;

/// The GitHub API caps `per_page` at 100; asking for the maximum keeps the
/// number of round trips down.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Failure of a single HTTP fetch. No retries are attempted; one failed
/// request is a final failure for that request.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The server answered with a non-2xx, non-404 status.
    #[error("{path} returned HTTP {status}: {body}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },

    /// The request never produced a usable response (connection failure,
    /// malformed body, ...).
    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Fetch successive pages of a collection until the remote signals
/// exhaustion by returning an empty page.
///
/// `fetch(page, page_size)` performs one page request; pages are numbered
/// from 1 and requested strictly in order. Items are accumulated in page
/// arrival order. An error on any page aborts the whole collection; the
/// caller decides whether that is fatal or just skips the resource.
pub async fn collect_pages<T, F, Fut>(page_size: u32, mut fetch: F) -> Result<Vec<T>, FetchError>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>, FetchError>>,
{
    let mut items = Vec::new();
    let mut page = 1;
    loop {
        let batch = fetch(page, page_size).await?;
        if batch.is_empty() {
            break;
        }
        items.extend(batch);
        page += 1;
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn page_of(page: u32, len: usize) -> Vec<String> {
        (0..len).map(|i| format!("item-{page}-{i}")).collect()
    }

    #[tokio::test]
    async fn accumulates_until_first_empty_page() {
        let calls = AtomicU32::new(0);
        let sizes = [100usize, 100, 37, 0];
        let items = collect_pages(100, |page, per_page| {
            calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(per_page, 100);
            let len = sizes[(page - 1) as usize];
            async move { Ok(page_of(page, len)) }
        })
        .await
        .unwrap();

        assert_eq!(items.len(), 237);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // Insertion order is page arrival order.
        assert_eq!(items[0], "item-1-0");
        assert_eq!(items[236], "item-3-36");
    }

    #[tokio::test]
    async fn empty_first_page_yields_empty_result_after_one_call() {
        let calls = AtomicU32::new(0);
        let items: Vec<String> = collect_pages(100, |_, _| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(Vec::new()) }
        })
        .await
        .unwrap();

        assert!(items.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn error_on_later_page_aborts_collection() {
        let successful = AtomicU32::new(0);
        let result: Result<Vec<String>, _> = collect_pages(100, |page, _| {
            if page == 1 {
                successful.fetch_add(1, Ordering::SeqCst);
            }
            async move {
                if page == 1 {
                    Ok(page_of(page, 100))
                } else {
                    Err(FetchError::Status {
                        path: "/orgs/acme/repos".into(),
                        status: 500,
                        body: "server error".into(),
                    })
                }
            }
        })
        .await;

        assert_eq!(successful.load(Ordering::SeqCst), 1);
        match result {
            Err(FetchError::Status { status, .. }) => assert_eq!(status, 500),
            other => panic!("expected a status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn pages_are_requested_sequentially() {
        let last_seen = AtomicU32::new(0);
        let items: Vec<u32> = collect_pages(10, |page, _| {
            let previous = last_seen.swap(page, Ordering::SeqCst);
            assert_eq!(previous + 1, page);
            async move { if page <= 3 { Ok(vec![page]) } else { Ok(vec![]) } }
        })
        .await
        .unwrap();

        assert_eq!(items, vec![1, 2, 3]);
    }
}
