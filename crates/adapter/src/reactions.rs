use domain::{ReactionDetail, ReactionKind, ReactionSummary, ReportEvent, ReportId, Session};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::bus::EventBus;
use crate::controller::{with_timeout, ControllerOptions};
use crate::traits::ReactionStore;
use crate::ClientError;

#[derive(Default)]
struct ReactionState {
    summary: ReactionSummary,
    /// Sequence of the latest react; older responses are ignored.
    seq: u64,
}

/// One actor's single-choice reaction on one report, with provisional counts.
pub struct ReactionAggregator<S> {
    report_id: ReportId,
    session: Session,
    store: Arc<S>,
    bus: EventBus,
    options: ControllerOptions,
    state: Mutex<ReactionState>,
}

impl<S: ReactionStore> ReactionAggregator<S> {
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
            state: Mutex::new(ReactionState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ReactionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn summary(&self) -> ReactionSummary {
        self.state().summary.clone()
    }

    pub fn user_reaction(&self) -> Option<ReactionKind> {
        self.state().summary.user_reaction
    }

    /// Replaces local counts with the store's aggregate.
    pub async fn refresh(&self) -> Result<ReactionSummary, ClientError> {
        let seq = self.state().seq;
        let summary = self.fetch().await?;
        let mut state = self.state();
        if state.seq == seq {
            state.summary = summary.clone();
        }
        Ok(summary)
    }

    async fn fetch(&self) -> Result<ReactionSummary, ClientError> {
        let actor = self.session.actor_id();
        Ok(with_timeout(
            self.options.request_timeout,
            self.store.reaction_summary(&self.report_id, &actor),
        )
        .await?)
    }

    /// Toggles `kind` for this actor. `None`, or the kind already held,
    /// clears the reaction.
    pub async fn react(&self, kind: Option<ReactionKind>) -> Result<ReactionSummary, ClientError> {
        let (snapshot, seq) = {
            let mut state = self.state();
            let snapshot = state.summary.clone();
            state.summary = snapshot.toggled(kind);
            state.seq += 1;
            (snapshot, state.seq)
        };

        let actor = self.session.actor_id();
        let result = with_timeout(
            self.options.request_timeout,
            self.store.toggle_reaction(&self.report_id, &actor, kind),
        )
        .await;

        match result {
            Ok(confirmed) => {
                {
                    let mut state = self.state();
                    if state.seq == seq {
                        state.summary = confirmed.clone();
                    } else {
                        debug!("Dropping superseded reaction response for {}", self.report_id);
                    }
                }
                self.bus.publish(&ReportEvent::ReactionsChanged {
                    report_id: self.report_id.clone(),
                    counts: confirmed.counts.clone(),
                    total: confirmed.total,
                });
                Ok(confirmed)
            }
            Err(e) => {
                warn!("Reacting on report {} failed: {}", self.report_id, e);
                let authoritative = self.fetch().await;
                let mut state = self.state();
                if state.seq == seq {
                    state.summary = match authoritative {
                        Ok(fresh) => fresh,
                        Err(_) => snapshot,
                    };
                }
                Err(e.into())
            }
        }
    }

    /// Who reacted with what.
    pub async fn detail(&self) -> Result<ReactionDetail, ClientError> {
        Ok(with_timeout(
            self.options.request_timeout,
            self.store.reaction_detail(&self.report_id),
        )
        .await?)
    }
}
