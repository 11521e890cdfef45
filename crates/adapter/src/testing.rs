//! Scriptable in-memory store for controller tests.

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use domain::{
    ActorId, Comment, CommentId, NewComment, ReactionDetail, ReactionKind, ReactionSummary, ReportId,
};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::traits::{CommentStore, ReactionStore};
use crate::StoreError;

pub fn comment(id: &str, parent: Option<&str>) -> Comment {
    Comment {
        id: CommentId::new_unchecked(id),
        report_id: ReportId::new_unchecked("r1"),
        parent_id: parent.map(CommentId::new_unchecked),
        author_name: "Anonymous".into(),
        text: format!("text of {id}"),
        created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        updated_at: None,
    }
}

/// Holds one store call until released.
#[derive(Clone, Default)]
pub struct Gate(Arc<Notify>);

impl Gate {
    pub fn release(&self) {
        self.0.notify_one();
    }

    async fn wait(&self) {
        self.0.notified().await;
    }
}

#[derive(Default)]
struct Script {
    failures: VecDeque<StoreError>,
    holds: VecDeque<Gate>,
}

impl Script {
    fn take(&mut self) -> (Option<StoreError>, Option<Gate>) {
        (self.failures.pop_front(), self.holds.pop_front())
    }
}

#[derive(Default)]
pub struct ScriptedStore {
    comments: Mutex<Vec<Comment>>,
    reactions: Mutex<BTreeMap<(ReportId, ActorId), ReactionKind>>,
    next_ids: Mutex<VecDeque<String>>,
    minted: AtomicUsize,
    calls: AtomicUsize,
    edit_unsupported: AtomicBool,
    create: Mutex<Script>,
    edit: Mutex<Script>,
    delete: Mutex<Script>,
    toggle: Mutex<Script>,
    summary: Mutex<Script>,
    create_started: Notify,
    edit_started: Notify,
    delete_started: Notify,
    toggle_started: Notify,
}

impl ScriptedStore {
    pub fn with_comments(comments: Vec<Comment>) -> Self {
        Self {
            comments: Mutex::new(comments),
            ..Self::default()
        }
    }

    /// Mutating calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn next_id(&self, id: &str) {
        self.next_ids.lock().unwrap().push_back(id.to_string());
    }

    pub fn disable_edit(&self) {
        self.edit_unsupported.store(true, Ordering::SeqCst);
    }

    pub fn seed_reaction(&self, report: &ReportId, actor: &str, kind: ReactionKind) {
        self.reactions
            .lock()
            .unwrap()
            .insert((report.clone(), ActorId::new_unchecked(actor)), kind);
    }

    pub fn fail_next_create(&self, e: StoreError) {
        self.create.lock().unwrap().failures.push_back(e);
    }

    pub fn fail_next_edit(&self, e: StoreError) {
        self.edit.lock().unwrap().failures.push_back(e);
    }

    pub fn fail_next_delete(&self, e: StoreError) {
        self.delete.lock().unwrap().failures.push_back(e);
    }

    pub fn fail_next_toggle(&self, e: StoreError) {
        self.toggle.lock().unwrap().failures.push_back(e);
    }

    pub fn fail_next_summary(&self, e: StoreError) {
        self.summary.lock().unwrap().failures.push_back(e);
    }

    fn hold(script: &Mutex<Script>) -> Gate {
        let gate = Gate::default();
        script.lock().unwrap().holds.push_back(gate.clone());
        gate
    }

    pub fn hold_next_create(&self) -> Gate {
        Self::hold(&self.create)
    }

    pub fn hold_next_edit(&self) -> Gate {
        Self::hold(&self.edit)
    }

    pub fn hold_next_delete(&self) -> Gate {
        Self::hold(&self.delete)
    }

    pub fn hold_next_toggle(&self) -> Gate {
        Self::hold(&self.toggle)
    }

    pub async fn wait_for_create(&self) {
        self.create_started.notified().await;
    }

    pub async fn wait_for_edit(&self) {
        self.edit_started.notified().await;
    }

    pub async fn wait_for_delete(&self) {
        self.delete_started.notified().await;
    }

    pub async fn wait_for_toggle(&self) {
        self.toggle_started.notified().await;
    }

    /// Pops this call's scripted failure and hold, signals the start, then
    /// waits on the hold if there is one.
    async fn enter(&self, script: &Mutex<Script>, started: &Notify) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (failure, hold) = script.lock().unwrap().take();
        started.notify_one();
        if let Some(gate) = hold {
            gate.wait().await;
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn summary_for(&self, report: &ReportId, actor: &ActorId) -> ReactionSummary {
        let reactions = self.reactions.lock().unwrap();
        let mut counts = BTreeMap::new();
        for ((r, _), kind) in reactions.iter() {
            if r == report {
                *counts.entry(*kind).or_insert(0) += 1;
            }
        }
        let mine = reactions.get(&(report.clone(), actor.clone())).copied();
        ReactionSummary::from_counts(counts, mine)
    }
}

#[async_trait]
impl CommentStore for ScriptedStore {
    async fn list_comments(&self, report_id: &ReportId) -> Result<Vec<Comment>, StoreError> {
        Ok(self
            .comments
            .lock()
            .unwrap()
            .iter()
            .filter(|c| &c.report_id == report_id)
            .cloned()
            .collect())
    }

    async fn create_comment(&self, new: &NewComment) -> Result<Comment, StoreError> {
        self.enter(&self.create, &self.create_started).await?;
        let n = self.minted.fetch_add(1, Ordering::SeqCst);
        let id = self
            .next_ids
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| format!("srv-auto-{n}"));
        let created = Comment {
            id: CommentId::new_unchecked(id),
            report_id: new.report_id.clone(),
            parent_id: new.parent_id.clone(),
            author_name: new.author_name.clone(),
            text: new.text.clone(),
            created_at: Utc::now(),
            updated_at: None,
        };
        self.comments.lock().unwrap().insert(0, created.clone());
        Ok(created)
    }

    async fn edit_comment(&self, id: &CommentId, text: &str) -> Result<Comment, StoreError> {
        self.enter(&self.edit, &self.edit_started).await?;
        if self.edit_unsupported.load(Ordering::SeqCst) {
            return Err(StoreError::Unsupported);
        }
        let mut comments = self.comments.lock().unwrap();
        let c = comments
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or(StoreError::NotFound)?;
        c.text = text.trim().to_string();
        c.updated_at = Some(c.created_at + Duration::seconds(60));
        Ok(c.clone())
    }

    async fn delete_comment(&self, id: &CommentId) -> Result<(), StoreError> {
        self.enter(&self.delete, &self.delete_started).await?;
        let mut comments = self.comments.lock().unwrap();
        let before = comments.len();
        comments.retain(|c| &c.id != id);
        if comments.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl ReactionStore for ScriptedStore {
    async fn reaction_summary(
        &self,
        report_id: &ReportId,
        actor_id: &ActorId,
    ) -> Result<ReactionSummary, StoreError> {
        if let Some(e) = self.summary.lock().unwrap().failures.pop_front() {
            return Err(e);
        }
        Ok(self.summary_for(report_id, actor_id))
    }

    async fn toggle_reaction(
        &self,
        report_id: &ReportId,
        actor_id: &ActorId,
        kind: Option<ReactionKind>,
    ) -> Result<ReactionSummary, StoreError> {
        self.enter(&self.toggle, &self.toggle_started).await?;
        {
            let mut reactions = self.reactions.lock().unwrap();
            let key = (report_id.clone(), actor_id.clone());
            match ReactionKind::resolve(reactions.get(&key).copied(), kind) {
                Some(k) => {
                    reactions.insert(key, k);
                }
                None => {
                    reactions.remove(&key);
                }
            }
        }
        Ok(self.summary_for(report_id, actor_id))
    }

    async fn reaction_detail(&self, report_id: &ReportId) -> Result<ReactionDetail, StoreError> {
        let mut out = ReactionDetail::new();
        for ((r, actor), kind) in self.reactions.lock().unwrap().iter() {
            if r == report_id {
                out.entry(*kind).or_default().push(actor.clone());
            }
        }
        Ok(out)
    }
}
