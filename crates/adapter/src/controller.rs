//! Optimistic comment threads. Mutations land in the local tree first and
//! are undone when the store refuses them or does not answer in time.

use chrono::Utc;
use domain::{
    build_tree, comment_text, Comment, CommentId, CommentNode, CommentTree, NewComment, ReportEvent,
    ReportId, Session,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::bus::EventBus;
use crate::config::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::traits::CommentStore;
use crate::{ClientError, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerOptions {
    /// A request still pending after this long is rolled back like a failure.
    pub request_timeout: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

pub(crate) async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .unwrap_or(Err(StoreError::Timeout))
}

/// Edits of one node that have not resolved yet.
struct EditLog {
    /// Last record the store accepted, and the edit that produced it (0: none).
    confirmed: Comment,
    confirmed_version: u64,
    in_flight: Vec<(u64, String)>,
}

#[derive(Default)]
struct ThreadState {
    tree: CommentTree,
    edits: HashMap<CommentId, EditLog>,
    clock: u64,
    deletes_in_flight: usize,
    /// Creates resolved while a delete was pending, replayed if that delete
    /// rolls back to its snapshot. `None` means the create failed.
    resolved_creates: Vec<(CommentId, Option<Comment>)>,
}

impl ThreadState {
    fn start_edit(&mut self, id: &CommentId, text: &str) -> Option<u64> {
        let current = self.tree.find(id)?.comment.clone();
        self.clock += 1;
        let version = self.clock;
        self.tree.modify(id, |node| node.comment.text = text.to_string());
        self.edits
            .entry(id.clone())
            .or_insert_with(|| EditLog {
                confirmed: current,
                confirmed_version: 0,
                in_flight: Vec::new(),
            })
            .in_flight
            .push((version, text.to_string()));
        Some(version)
    }

    /// Shows the newest edit that can still win, else the last accepted record.
    fn settle_edit(&mut self, id: &CommentId, version: u64, accepted: Option<Comment>) {
        let Some(log) = self.edits.get_mut(id) else {
            // refreshed meanwhile
            if let Some(c) = accepted {
                self.tree.replace(id, c);
            }
            return;
        };
        log.in_flight.retain(|(v, _)| *v != version);
        if let Some(c) = accepted {
            if version > log.confirmed_version {
                log.confirmed = c;
                log.confirmed_version = version;
            }
        }
        let floor = log.confirmed_version;
        match log.in_flight.iter().rev().find(|(v, _)| *v > floor) {
            Some((_, text)) => {
                let text = text.clone();
                self.tree.modify(id, |node| node.comment.text = text);
            }
            None => {
                self.tree.replace(id, log.confirmed.clone());
            }
        }
        if log.in_flight.is_empty() {
            self.edits.remove(id);
        }
    }

    fn resolve_create(&mut self, tentative: &CommentId, confirmed: Option<Comment>) -> bool {
        let placed = match &confirmed {
            Some(c) => self.tree.replace(tentative, c.clone()),
            None => self.tree.remove(tentative).is_some(),
        };
        if self.deletes_in_flight > 0 {
            self.resolved_creates.push((tentative.clone(), confirmed));
        }
        placed
    }

    fn finish_delete(&mut self) {
        self.deletes_in_flight = self.deletes_in_flight.saturating_sub(1);
        if self.deletes_in_flight == 0 {
            self.resolved_creates.clear();
        }
    }

    fn restore(&mut self, snapshot: CommentTree) {
        self.tree = snapshot;
        for (tentative, outcome) in &self.resolved_creates {
            match outcome {
                Some(c) => {
                    self.tree.replace(tentative, c.clone());
                }
                None => {
                    self.tree.remove(tentative);
                }
            }
        }
    }
}

pub struct CommentController<S> {
    report_id: ReportId,
    session: Session,
    store: Arc<S>,
    bus: EventBus,
    options: ControllerOptions,
    state: Mutex<ThreadState>,
}

impl<S: CommentStore> CommentController<S> {
    pub fn new(report_id: ReportId, session: Session, store: Arc<S>, bus: EventBus) -> Self {
        Self::with_options(report_id, session, store, bus, ControllerOptions::default())
    }

    pub fn with_options(
        report_id: ReportId,
        session: Session,
        store: Arc<S>,
        bus: EventBus,
        options: ControllerOptions,
    ) -> Self {
        Self {
            report_id,
            session,
            store,
            bus,
            options,
            state: Mutex::new(ThreadState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ThreadState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn report_id(&self) -> &ReportId {
        &self.report_id
    }

    pub fn tree(&self) -> CommentTree {
        self.state().tree.clone()
    }

    pub fn comment_count(&self) -> usize {
        self.state().tree.len()
    }

    pub async fn refresh(&self) -> Result<usize, ClientError> {
        let records = with_timeout(
            self.options.request_timeout,
            self.store.list_comments(&self.report_id),
        )
        .await?;
        let tree = build_tree(&records);
        let count = tree.len();
        let mut state = self.state();
        state.tree = tree;
        state.edits.clear();
        drop(state);
        debug!("Loaded {} comment(s) for report {}", count, self.report_id);
        Ok(count)
    }

    fn check_confirmed(id: &CommentId) -> Result<(), ClientError> {
        if id.is_tentative() {
            return Err(ClientError::PendingComment(id.clone()));
        }
        Ok(())
    }

    pub async fn create(&self, text: &str, parent_id: Option<&CommentId>) -> Result<Comment, ClientError> {
        if let Some(parent) = parent_id {
            Self::check_confirmed(parent)?;
        }
        let new = NewComment::new(
            self.report_id.clone(),
            text,
            parent_id.cloned(),
            self.session.display_name(),
        )?;

        let tentative_id = CommentId::tentative();
        let tentative = Comment {
            id: tentative_id.clone(),
            report_id: new.report_id.clone(),
            parent_id: new.parent_id.clone(),
            author_name: new.author_name.clone(),
            text: new.text.clone(),
            created_at: Utc::now(),
            updated_at: None,
        };
        {
            let mut state = self.state();
            if state
                .tree
                .insert_first(parent_id, CommentNode::leaf(tentative))
                .is_err()
            {
                // parent_id is Some here: root inserts can't fail
                return Err(ClientError::UnknownComment(
                    parent_id.cloned().unwrap_or_else(|| tentative_id.clone()),
                ));
            }
        }

        let result = with_timeout(self.options.request_timeout, self.store.create_comment(&new)).await;

        match result {
            Ok(confirmed) => {
                let placed = self
                    .state()
                    .resolve_create(&tentative_id, Some(confirmed.clone()));
                if !placed {
                    debug!(
                        "Tentative comment {} vanished before {} was confirmed",
                        tentative_id, confirmed.id
                    );
                }
                info!("Comment {} created on report {}", confirmed.id, self.report_id);
                self.bus.publish(&ReportEvent::CommentCreated {
                    report_id: self.report_id.clone(),
                    comment: confirmed.clone(),
                });
                Ok(confirmed)
            }
            Err(e) => {
                self.state().resolve_create(&tentative_id, None);
                warn!("Creating comment on report {} failed: {}", self.report_id, e);
                Err(e.into())
            }
        }
    }

    pub async fn edit(&self, id: &CommentId, text: &str) -> Result<Comment, ClientError> {
        Self::check_confirmed(id)?;
        let text = comment_text(text)?;

        let version = self
            .state()
            .start_edit(id, &text)
            .ok_or_else(|| ClientError::UnknownComment(id.clone()))?;

        let result = with_timeout(self.options.request_timeout, self.store.edit_comment(id, &text)).await;

        self.state()
            .settle_edit(id, version, result.as_ref().ok().cloned());
        match result {
            Ok(confirmed) => {
                self.bus.publish(&ReportEvent::CommentUpdated {
                    report_id: self.report_id.clone(),
                    comment: confirmed.clone(),
                });
                Ok(confirmed)
            }
            Err(e) => {
                warn!("Editing comment {} failed: {}", id, e);
                Err(e.into())
            }
        }
    }

    /// Removes the comment (and, locally, its replies) from the tree.
    pub async fn delete(&self, id: &CommentId) -> Result<(), ClientError> {
        Self::check_confirmed(id)?;

        let snapshot = {
            let mut state = self.state();
            let snapshot = state.tree.clone();
            if state.tree.remove(id).is_none() {
                return Err(ClientError::UnknownComment(id.clone()));
            }
            state.deletes_in_flight += 1;
            snapshot
        };

        let result = with_timeout(self.options.request_timeout, self.store.delete_comment(id)).await;

        match result {
            Ok(()) => {
                {
                    let mut state = self.state();
                    state.finish_delete();
                    let ThreadState { tree, edits, .. } = &mut *state;
                    edits.retain(|node, _| tree.contains(node));
                }
                info!("Comment {} deleted from report {}", id, self.report_id);
                self.bus.publish(&ReportEvent::CommentDeleted {
                    report_id: self.report_id.clone(),
                    comment_id: id.clone(),
                });
                Ok(())
            }
            Err(e) => {
                {
                    let mut state = self.state();
                    state.restore(snapshot);
                    state.finish_delete();
                }
                warn!("Deleting comment {} failed, tree restored: {}", id, e);
                Err(e.into())
            }
        }
    }
}
