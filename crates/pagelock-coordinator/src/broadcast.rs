//! Best-effort fan-out to the tabs of a window

use crate::directory::DeliveryError;
use futures::future::join_all;
use pagelock_core::TabId;
use std::future::Future;

/// Outcome counts of one broadcast, for logging only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastSummary {
    pub delivered: usize,
    pub skipped: usize,
}

/// Run `action` against every target concurrently.
///
/// There is no ordering between targets, no retry and no cancellation.
/// Failures are logged at debug level and otherwise dropped.
pub async fn broadcast<I, F, Fut>(targets: I, action: F) -> BroadcastSummary
where
    I: IntoIterator<Item = TabId>,
    F: Fn(TabId) -> Fut,
    Fut: Future<Output = Result<(), DeliveryError>>,
{
    let results = join_all(targets.into_iter().map(action)).await;

    let mut summary = BroadcastSummary::default();
    for result in results {
        match result {
            Ok(()) => summary.delivered += 1,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping tab");
                summary.skipped += 1;
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[tokio::test]
    async fn test_failures_are_absorbed() {
        let seen = RefCell::new(Vec::new());

        let summary = broadcast([TabId(1), TabId(2), TabId(3)], |tab| {
            seen.borrow_mut().push(tab);
            async move {
                if tab == TabId(2) {
                    Err(DeliveryError::NoLiveTarget(tab))
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert_eq!(
            summary,
            BroadcastSummary {
                delivered: 2,
                skipped: 1
            }
        );
        assert_eq!(seen.borrow().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_target_set() {
        let summary = broadcast(Vec::new(), |_| async { Ok(()) }).await;
        assert_eq!(summary, BroadcastSummary::default());
    }
}
