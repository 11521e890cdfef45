use domain::{build_tree, ReportId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::bus::{EventBus, Subscription};
use crate::traits::CommentStore;

/// Comment count for a report, kept fresh by refetching whenever another
/// view announces a comment change on the same report.
///
/// Must be attached from inside a tokio runtime; refetches are spawned so
/// publishers never wait on them.
pub struct CommentCountBadge {
    count: watch::Receiver<usize>,
    _subscription: Subscription,
}

impl CommentCountBadge {
    pub fn attach<S>(bus: &EventBus, store: Arc<S>, report_id: ReportId) -> Self
    where
        S: CommentStore + 'static,
    {
        let (tx, rx) = watch::channel(0usize);
        let tx = Arc::new(tx);
        let started = Arc::new(AtomicU64::new(0));
        let applied = Arc::new(AtomicU64::new(0));

        let refetch = {
            let report_id = report_id.clone();
            move || {
                let generation = started.fetch_add(1, Ordering::SeqCst) + 1;
                let (tx, applied) = (tx.clone(), applied.clone());
                let store = store.clone();
                let report_id = report_id.clone();
                tokio::spawn(async move {
                    match store.list_comments(&report_id).await {
                        Ok(records) => {
                            // a slower, older refetch must not overwrite a newer count
                            if applied.fetch_max(generation, Ordering::SeqCst) > generation {
                                return;
                            }
                            let n = build_tree(&records).len();
                            debug!("Comment badge for {} now {}", report_id, n);
                            tx.send_replace(n);
                        }
                        Err(e) => warn!("Comment badge refetch for {} failed: {}", report_id, e),
                    }
                });
            }
        };

        refetch();
        let subscription = bus.subscribe(&report_id, move |event| {
            if event.is_comment_event() {
                refetch();
            }
        });

        Self {
            count: rx,
            _subscription: subscription,
        }
    }

    pub fn count(&self) -> usize {
        *self.count.borrow()
    }

    /// Receiver that wakes on every count update.
    pub fn watch(&self) -> watch::Receiver<usize> {
        self.count.clone()
    }
}
