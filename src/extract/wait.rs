//! Waiting for a price-bearing location to materialize on a dynamically
//! rendered page.
//!
//! The one asynchronous operation outside the core pipeline. It races an
//! immediate check of the current snapshot against a subscription to
//! content-tree mutation notifications; a timeout guarantees termination
//! and tears the subscription down.

use async_trait::async_trait;
use scraper::Html;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

use crate::extract::locator;

pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum WaitError {
    #[error("no price location appeared within {0:?}")]
    Timeout(Duration),
}

/// Subscription to content-tree mutation notifications. Each notification
/// delivers a re-materialized snapshot of the page.
#[async_trait]
pub trait MutationFeed: Send {
    /// The next snapshot, or `None` once the feed closes for good.
    async fn next_snapshot(&mut self) -> Option<String>;
}

/// Feed backed by a `tokio::sync::watch` channel; the hosting environment
/// pushes a fresh snapshot on every observed mutation.
pub struct WatchFeed {
    rx: watch::Receiver<String>,
}

impl WatchFeed {
    pub fn new(rx: watch::Receiver<String>) -> Self {
        Self { rx }
    }
}

#[async_trait]
impl MutationFeed for WatchFeed {
    async fn next_snapshot(&mut self) -> Option<String> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

/// Wait until one of `selectors` holds price-shaped text, resolving with
/// the snapshot that contains it. The current snapshot is checked first, so
/// an already-present location resolves without touching the feed. The feed
/// is released on both the success and the timeout path. No retries happen
/// at this layer.
pub async fn wait_for_price_location<F>(
    initial_snapshot: &str,
    selectors: &[String],
    mut feed: F,
    timeout: Duration,
) -> Result<String, WaitError>
where
    F: MutationFeed,
{
    let result = tokio::time::timeout(timeout, async {
        let mut snapshot = initial_snapshot.to_string();
        loop {
            if contains_candidate(&snapshot, selectors) {
                return snapshot;
            }
            match feed.next_snapshot().await {
                Some(next) => snapshot = next,
                // Closed feed: nothing further can materialize; let the
                // timeout fire.
                None => std::future::pending::<()>().await,
            }
        }
    })
    .await;

    drop(feed);

    match result {
        Ok(snapshot) => Ok(snapshot),
        Err(_) => {
            debug!("Gave up waiting for a price location after {:?}", timeout);
            Err(WaitError::Timeout(timeout))
        }
    }
}

fn contains_candidate(snapshot: &str, selectors: &[String]) -> bool {
    let document = Html::parse_document(snapshot);
    locator::has_price_candidate(&document, selectors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selectors() -> Vec<String> {
        vec!["div.price".to_string()]
    }

    const EMPTY_PAGE: &str = "<html><body><div class='price'></div></body></html>";
    const PRICED_PAGE: &str = "<html><body><div class='price'>€27,99</div></body></html>";

    #[test]
    fn resolves_immediately_when_already_present() {
        let (_tx, rx) = watch::channel(String::new());
        let found = tokio_test::block_on(wait_for_price_location(
            PRICED_PAGE,
            &selectors(),
            WatchFeed::new(rx),
            DEFAULT_WAIT_TIMEOUT,
        ))
        .unwrap();
        assert!(found.contains("27,99"));
    }

    #[tokio::test]
    async fn resolves_on_mutation() {
        let (tx, rx) = watch::channel(String::new());
        tx.send(PRICED_PAGE.to_string()).unwrap();

        let found = wait_for_price_location(
            EMPTY_PAGE,
            &selectors(),
            WatchFeed::new(rx),
            DEFAULT_WAIT_TIMEOUT,
        )
        .await
        .unwrap();
        assert!(found.contains("27,99"));
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_when_nothing_materializes() {
        let (tx, rx) = watch::channel(String::new());
        drop(tx);

        let result = wait_for_price_location(
            EMPTY_PAGE,
            &selectors(),
            WatchFeed::new(rx),
            Duration::from_secs(10),
        )
        .await;
        assert!(matches!(result, Err(WaitError::Timeout(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn irrelevant_mutations_do_not_resolve() {
        let (tx, rx) = watch::channel(String::new());
        tx.send("<html><body><div class='price'>loading…</div></body></html>".to_string())
            .unwrap();

        let result = wait_for_price_location(
            EMPTY_PAGE,
            &selectors(),
            WatchFeed::new(rx),
            Duration::from_millis(200),
        )
        .await;
        assert!(matches!(result, Err(WaitError::Timeout(_))));
    }
}
