//! Same-process notifications between views of the same report.

use domain::{ReportEvent, ReportId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tracing::trace;

type Handler = Arc<dyn Fn(&ReportEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    subscribers: HashMap<ReportId, Vec<(u64, Handler)>>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(|e| e.into_inner())
}

/// Report-scoped publish/subscribe. Publishing for one report never reaches
/// subscribers of another.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<Registry>>,
}

/// Keeps a handler registered; dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    report_id: ReportId,
    id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, report_id: &ReportId, handler: F) -> Subscription
    where
        F: Fn(&ReportEvent) + Send + Sync + 'static,
    {
        let mut reg = lock(&self.inner);
        let id = reg.next_id;
        reg.next_id += 1;
        reg.subscribers
            .entry(report_id.clone())
            .or_default()
            .push((id, Arc::new(handler)));
        Subscription {
            registry: Arc::downgrade(&self.inner),
            report_id: report_id.clone(),
            id,
        }
    }

    /// Calls this report's handlers in registration order, synchronously.
    /// Returns how many were called.
    pub fn publish(&self, event: &ReportEvent) -> usize {
        // Handlers run unlocked so they may subscribe or publish themselves.
        let handlers: Vec<Handler> = lock(&self.inner)
            .subscribers
            .get(event.report_id())
            .map(|list| list.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default();
        trace!(
            "Publishing {} for report {} to {} subscriber(s)",
            event.name(),
            event.report_id(),
            handlers.len()
        );
        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    pub fn subscriber_count(&self, report_id: &ReportId) -> usize {
        lock(&self.inner)
            .subscribers
            .get(report_id)
            .map_or(0, Vec::len)
    }
}

impl Subscription {
    pub fn report_id(&self) -> &ReportId {
        &self.report_id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut reg = lock(&registry);
        if let Some(list) = reg.subscribers.get_mut(&self.report_id) {
            list.retain(|(id, _)| *id != self.id);
            if list.is_empty() {
                reg.subscribers.remove(&self.report_id);
            }
        }
    }
}
