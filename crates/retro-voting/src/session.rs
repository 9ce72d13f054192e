//! Voting sessions: one quota tracker per retrospective with voting open.
//!
//! The in-memory tracker is the source of truth while a session is open.
//! Every accepted change is queued for a single background writer that
//! applies upserts to the [`VoteStore`] in the order the changes were made.
//! The caller never waits on that write, and a failed write is logged and
//! left alone. Starting voting again drains the queue and reloads the
//! session from the store.

use std::collections::HashMap;
use std::sync::Arc;

use retro_common::models::{retrospective::VoteLimits, vote::VoteTarget};
use serde::Serialize;
use tokio::sync::{RwLock, mpsc, oneshot};
use uuid::Uuid;

use crate::{
    error::VoteError,
    quota::{VoteChange, VoteControls, VoteQuotaTracker, badge_text},
    store::VoteStore,
};

/// Aggregate count on one target, shown to every participant.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeView {
    #[serde(flatten)]
    pub target: VoteTarget,
    pub count: u32,
    pub text: String,
}

/// The viewing user's own count on one target.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserVoteView {
    #[serde(flatten)]
    pub target: VoteTarget,
    pub count: u32,
    #[serde(flatten)]
    pub controls: VoteControls,
}

/// What one user sees of a retrospective's voting state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub retrospective_id: Uuid,
    pub active: bool,
    pub limits: Option<VoteLimits>,
    pub badges: Vec<BadgeView>,
    pub votes: Vec<UserVoteView>,
    pub total_votes: u32,
    pub remaining_votes: u32,
}

impl SessionView {
    fn inactive(retrospective_id: Uuid) -> Self {
        Self {
            retrospective_id,
            active: false,
            limits: None,
            badges: Vec::new(),
            votes: Vec::new(),
            total_votes: 0,
            remaining_votes: 0,
        }
    }

    fn of(tracker: &VoteQuotaTracker, user_id: Uuid) -> Self {
        let badges = tracker
            .badges()
            .into_iter()
            .map(|(target, count)| BadgeView {
                target,
                count,
                text: badge_text(count),
            })
            .collect();
        let votes = tracker
            .user_votes(user_id)
            .into_iter()
            .map(|(target, count)| UserVoteView {
                target,
                count,
                controls: tracker.controls(user_id, &target),
            })
            .collect();

        Self {
            retrospective_id: tracker.retrospective_id(),
            active: true,
            limits: Some(tracker.limits()),
            badges,
            votes,
            total_votes: tracker.user_total(user_id),
            remaining_votes: tracker.remaining(user_id),
        }
    }
}

enum PendingWrite {
    Upsert {
        user_id: Uuid,
        retrospective_id: Uuid,
        target: VoteTarget,
        count: u32,
    },
    Flush(oneshot::Sender<()>),
}

/// Applies queued writes one at a time. Absolute counts only stay correct
/// if they land in the order they were produced.
async fn run_writer<S: VoteStore>(store: Arc<S>, mut rx: mpsc::UnboundedReceiver<PendingWrite>) {
    while let Some(write) = rx.recv().await {
        match write {
            PendingWrite::Upsert {
                user_id,
                retrospective_id,
                target,
                count,
            } => {
                if let Err(e) = store
                    .upsert_vote(user_id, retrospective_id, target, count)
                    .await
                {
                    tracing::warn!(
                        retrospective_id = %retrospective_id,
                        user_id = %user_id,
                        target_id = %target.target_id,
                        count,
                        "Failed to persist vote: {e:#}"
                    );
                }
            }
            PendingWrite::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

/// Open voting sessions, keyed by retrospective id.
pub struct VotingSessionManager<S> {
    store: Arc<S>,
    sessions: Arc<RwLock<HashMap<Uuid, VoteQuotaTracker>>>,
    writes: mpsc::UnboundedSender<PendingWrite>,
}

impl<S> Clone for VotingSessionManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            sessions: Arc::clone(&self.sessions),
            writes: self.writes.clone(),
        }
    }
}

impl<S: VoteStore> VotingSessionManager<S> {
    /// Create a manager and spawn its writer task. Must be called inside a
    /// Tokio runtime.
    pub fn new(store: Arc<S>) -> Self {
        let (writes, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(Arc::clone(&store), rx));
        Self {
            store,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            writes,
        }
    }

    /// Wait until every write queued so far has been attempted.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.writes.send(PendingWrite::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    /// Open voting for a retrospective, loading every persisted vote.
    /// If voting is already open the session is rebuilt from the store.
    pub async fn start_voting(&self, retrospective_id: Uuid) -> Result<VoteLimits, VoteError> {
        self.flush().await;

        let limits = self
            .store
            .vote_limits(retrospective_id)
            .await?
            .ok_or(VoteError::RetrospectiveNotFound)?;
        let records = self.store.load_votes(retrospective_id).await?;
        let tracker = VoteQuotaTracker::from_records(retrospective_id, limits, &records);

        let reloaded = self
            .sessions
            .write()
            .await
            .insert(retrospective_id, tracker)
            .is_some();

        tracing::info!(
            retrospective_id = %retrospective_id,
            records = records.len(),
            max_per_item = limits.max_per_item,
            max_total = limits.max_total,
            reloaded,
            "Voting started"
        );
        Ok(limits)
    }

    /// Close voting. Persisted votes are kept. Returns false if voting was
    /// not open.
    pub async fn stop_voting(&self, retrospective_id: Uuid) -> bool {
        let closed = self
            .sessions
            .write()
            .await
            .remove(&retrospective_id)
            .is_some();
        if closed {
            tracing::info!(retrospective_id = %retrospective_id, "Voting stopped");
        }
        closed
    }

    pub async fn is_active(&self, retrospective_id: Uuid) -> bool {
        self.sessions.read().await.contains_key(&retrospective_id)
    }

    pub async fn increase_vote(
        &self,
        retrospective_id: Uuid,
        user_id: Uuid,
        target: VoteTarget,
    ) -> Result<VoteChange, VoteError> {
        self.ensure_known(retrospective_id, target).await?;

        let change = {
            let mut sessions = self.sessions.write().await;
            let tracker = sessions
                .get_mut(&retrospective_id)
                .ok_or(VoteError::VotingClosed)?;
            let change = tracker.increase_vote(user_id, target)?;
            // Queued under the lock so the writer sees changes in order.
            self.persist(retrospective_id, &change);
            change
        };

        Ok(change)
    }

    pub async fn decrease_vote(
        &self,
        retrospective_id: Uuid,
        user_id: Uuid,
        target: VoteTarget,
    ) -> Result<VoteChange, VoteError> {
        self.ensure_known(retrospective_id, target).await?;

        let change = {
            let mut sessions = self.sessions.write().await;
            let tracker = sessions
                .get_mut(&retrospective_id)
                .ok_or(VoteError::VotingClosed)?;
            let change = tracker.decrease_vote(user_id, target)?;
            // Queued under the lock so the writer sees changes in order.
            self.persist(retrospective_id, &change);
            change
        };

        Ok(change)
    }

    /// In-memory count for one user on one target. Zero when voting is closed.
    pub async fn vote_count(
        &self,
        retrospective_id: Uuid,
        user_id: Uuid,
        target: VoteTarget,
    ) -> u32 {
        self.sessions
            .read()
            .await
            .get(&retrospective_id)
            .map(|t| t.vote_count(user_id, &target))
            .unwrap_or(0)
    }

    /// Voting state as `user_id` sees it.
    pub async fn view(&self, retrospective_id: Uuid, user_id: Uuid) -> SessionView {
        match self.sessions.read().await.get(&retrospective_id) {
            Some(tracker) => SessionView::of(tracker, user_id),
            None => SessionView::inactive(retrospective_id),
        }
    }

    /// Make sure the target is part of the open session, asking the store
    /// about targets created after voting started.
    async fn ensure_known(
        &self,
        retrospective_id: Uuid,
        target: VoteTarget,
    ) -> Result<(), VoteError> {
        {
            let sessions = self.sessions.read().await;
            let tracker = sessions
                .get(&retrospective_id)
                .ok_or(VoteError::VotingClosed)?;
            if tracker.knows(&target) {
                return Ok(());
            }
        }

        if !self.store.target_exists(retrospective_id, target).await? {
            return Err(VoteError::TargetNotFound);
        }

        if let Some(tracker) = self.sessions.write().await.get_mut(&retrospective_id) {
            tracker.register_target(target);
        }
        Ok(())
    }

    fn persist(&self, retrospective_id: Uuid, change: &VoteChange) {
        if !change.changed {
            return;
        }

        let write = PendingWrite::Upsert {
            user_id: change.user_id,
            retrospective_id,
            target: change.target,
            count: change.count,
        };
        if self.writes.send(write).is_err() {
            tracing::warn!(
                retrospective_id = %retrospective_id,
                user_id = %change.user_id,
                "Vote writer is gone, change not persisted"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::Cap, store::MemoryVoteStore};

    struct Fixture {
        store: Arc<MemoryVoteStore>,
        manager: VotingSessionManager<MemoryVoteStore>,
        retro: Uuid,
        a: VoteTarget,
        b: VoteTarget,
    }

    async fn fixture(max_per_item: u32, max_total: u32) -> Fixture {
        let store = Arc::new(MemoryVoteStore::new());
        let retro = Uuid::now_v7();
        let a = VoteTarget::item(Uuid::now_v7());
        let b = VoteTarget::group(Uuid::now_v7());
        store
            .insert_retrospective(
                retro,
                VoteLimits {
                    max_per_item,
                    max_total,
                },
            )
            .await;
        store.insert_target(retro, a).await;
        store.insert_target(retro, b).await;
        let manager = VotingSessionManager::new(Arc::clone(&store));
        Fixture {
            store,
            manager,
            retro,
            a,
            b,
        }
    }

    #[tokio::test]
    async fn voting_requires_open_session() {
        let f = fixture(3, 5).await;
        let user = Uuid::now_v7();

        let err = f.manager.increase_vote(f.retro, user, f.a).await.unwrap_err();
        assert!(matches!(err, VoteError::VotingClosed));
        assert!(!f.manager.is_active(f.retro).await);
    }

    #[tokio::test]
    async fn start_unknown_retrospective_fails() {
        let f = fixture(3, 5).await;
        let err = f.manager.start_voting(Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, VoteError::RetrospectiveNotFound));
    }

    #[tokio::test]
    async fn increase_persists_absolute_count() {
        let f = fixture(3, 5).await;
        let user = Uuid::now_v7();
        f.manager.start_voting(f.retro).await.unwrap();

        f.manager.increase_vote(f.retro, user, f.a).await.unwrap();
        let change = f.manager.increase_vote(f.retro, user, f.a).await.unwrap();
        assert_eq!(change.count, 2);
        f.manager.flush().await;

        assert_eq!(f.store.stored_count(user, f.retro, f.a).await, Some(2));
        assert_eq!(f.manager.vote_count(f.retro, user, f.a).await, 2);
    }

    #[tokio::test]
    async fn caps_surface_as_quota_errors() {
        let f = fixture(2, 3).await;
        let user = Uuid::now_v7();
        f.manager.start_voting(f.retro).await.unwrap();

        f.manager.increase_vote(f.retro, user, f.a).await.unwrap();
        f.manager.increase_vote(f.retro, user, f.a).await.unwrap();
        let err = f.manager.increase_vote(f.retro, user, f.a).await.unwrap_err();
        assert!(matches!(
            err,
            VoteError::QuotaExceeded(Cap::PerItem { limit: 2 })
        ));

        f.manager.increase_vote(f.retro, user, f.b).await.unwrap();
        let err = f.manager.increase_vote(f.retro, user, f.b).await.unwrap_err();
        assert!(matches!(
            err,
            VoteError::QuotaExceeded(Cap::Total { limit: 3 })
        ));
    }

    #[tokio::test]
    async fn decrease_at_zero_writes_nothing() {
        let f = fixture(3, 5).await;
        let user = Uuid::now_v7();
        f.manager.start_voting(f.retro).await.unwrap();

        let change = f.manager.decrease_vote(f.retro, user, f.a).await.unwrap();
        assert_eq!(change.count, 0);
        assert!(!change.changed);
        f.manager.flush().await;

        assert_eq!(f.store.stored_count(user, f.retro, f.a).await, None);
    }

    #[tokio::test]
    async fn decrease_to_zero_keeps_record() {
        let f = fixture(3, 5).await;
        let user = Uuid::now_v7();
        f.manager.start_voting(f.retro).await.unwrap();

        f.manager.increase_vote(f.retro, user, f.a).await.unwrap();
        f.manager.decrease_vote(f.retro, user, f.a).await.unwrap();
        f.manager.flush().await;

        assert_eq!(f.store.stored_count(user, f.retro, f.a).await, Some(0));
    }

    #[tokio::test]
    async fn unknown_target_is_rejected() {
        let f = fixture(3, 5).await;
        let user = Uuid::now_v7();
        f.manager.start_voting(f.retro).await.unwrap();

        let stranger = VoteTarget::item(Uuid::now_v7());
        let err = f
            .manager
            .increase_vote(f.retro, user, stranger)
            .await
            .unwrap_err();
        assert!(matches!(err, VoteError::TargetNotFound));
        assert_eq!(f.manager.vote_count(f.retro, user, stranger).await, 0);
    }

    #[tokio::test]
    async fn target_created_after_start_is_votable() {
        let f = fixture(3, 5).await;
        let user = Uuid::now_v7();
        f.manager.start_voting(f.retro).await.unwrap();

        let late = VoteTarget::item(Uuid::now_v7());
        f.store.insert_target(f.retro, late).await;

        let change = f.manager.increase_vote(f.retro, user, late).await.unwrap();
        assert_eq!(change.count, 1);
    }

    #[tokio::test]
    async fn restart_reloads_persisted_votes() {
        let f = fixture(3, 5).await;
        let alice = Uuid::now_v7();
        let bob = Uuid::now_v7();
        f.manager.start_voting(f.retro).await.unwrap();

        f.manager.increase_vote(f.retro, alice, f.a).await.unwrap();
        f.manager.increase_vote(f.retro, alice, f.a).await.unwrap();
        f.manager.increase_vote(f.retro, bob, f.a).await.unwrap();
        f.manager.flush().await;

        assert!(f.manager.stop_voting(f.retro).await);
        assert!(!f.manager.stop_voting(f.retro).await);

        // A fresh manager stands in for a process restart.
        let fresh = VotingSessionManager::new(Arc::clone(&f.store));
        fresh.start_voting(f.retro).await.unwrap();

        assert_eq!(fresh.vote_count(f.retro, alice, f.a).await, 2);
        let view = fresh.view(f.retro, alice).await;
        assert!(view.active);
        assert_eq!(view.total_votes, 2);
        assert_eq!(view.remaining_votes, 3);
        assert_eq!(view.badges.len(), 1);
        assert_eq!(view.badges[0].count, 3);
        assert_eq!(view.badges[0].text, "3 votes");
    }

    #[tokio::test]
    async fn failed_write_keeps_memory_state() {
        let f = fixture(3, 5).await;
        let user = Uuid::now_v7();
        f.manager.start_voting(f.retro).await.unwrap();
        f.store.set_fail_writes(true);

        let change = f.manager.increase_vote(f.retro, user, f.a).await.unwrap();
        assert_eq!(change.count, 1);
        f.manager.flush().await;

        assert_eq!(f.manager.vote_count(f.retro, user, f.a).await, 1);
        assert_eq!(f.store.stored_count(user, f.retro, f.a).await, None);

        // Reopening voting reconciles memory with what was actually stored.
        f.store.set_fail_writes(false);
        f.manager.start_voting(f.retro).await.unwrap();
        assert_eq!(f.manager.vote_count(f.retro, user, f.a).await, 0);
    }

    #[tokio::test]
    async fn view_reports_controls_per_target() {
        let f = fixture(1, 5).await;
        let user = Uuid::now_v7();
        f.manager.start_voting(f.retro).await.unwrap();
        f.manager.increase_vote(f.retro, user, f.a).await.unwrap();

        let view = f.manager.view(f.retro, user).await;
        assert_eq!(view.votes.len(), 1);
        assert_eq!(view.votes[0].count, 1);
        assert!(!view.votes[0].controls.can_increase);
        assert!(view.votes[0].controls.can_decrease);
        assert_eq!(view.badges[0].text, "1 vote");

        let closed = f.manager.view(Uuid::now_v7(), user).await;
        assert!(!closed.active);
        assert!(closed.limits.is_none());
    }

    /// Memory store whose first upsert stalls, so a later write would
    /// overtake it if writes ran concurrently.
    #[derive(Default)]
    struct SlowFirstWrite {
        inner: MemoryVoteStore,
        stalled: std::sync::atomic::AtomicBool,
    }

    impl VoteStore for SlowFirstWrite {
        async fn vote_limits(&self, retrospective_id: Uuid) -> anyhow::Result<Option<VoteLimits>> {
            self.inner.vote_limits(retrospective_id).await
        }

        async fn load_votes(
            &self,
            retrospective_id: Uuid,
        ) -> anyhow::Result<Vec<retro_common::models::vote::VoteRecord>> {
            self.inner.load_votes(retrospective_id).await
        }

        async fn target_exists(
            &self,
            retrospective_id: Uuid,
            target: VoteTarget,
        ) -> anyhow::Result<bool> {
            self.inner.target_exists(retrospective_id, target).await
        }

        async fn upsert_vote(
            &self,
            user_id: Uuid,
            retrospective_id: Uuid,
            target: VoteTarget,
            count: u32,
        ) -> anyhow::Result<()> {
            if !self.stalled.swap(true, std::sync::atomic::Ordering::SeqCst) {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            }
            self.inner
                .upsert_vote(user_id, retrospective_id, target, count)
                .await
        }
    }

    #[tokio::test]
    async fn writes_land_in_order_of_changes() {
        let store = Arc::new(SlowFirstWrite::default());
        let retro = Uuid::now_v7();
        let target = VoteTarget::item(Uuid::now_v7());
        store
            .inner
            .insert_retrospective(
                retro,
                VoteLimits {
                    max_per_item: 3,
                    max_total: 5,
                },
            )
            .await;
        store.inner.insert_target(retro, target).await;

        let manager = VotingSessionManager::new(Arc::clone(&store));
        let user = Uuid::now_v7();
        manager.start_voting(retro).await.unwrap();

        // Two quick clicks: the write of count 1 is slow, count 2 follows it.
        manager.increase_vote(retro, user, target).await.unwrap();
        manager.increase_vote(retro, user, target).await.unwrap();

        // Close and reopen straight away; the reload must see both votes.
        assert!(manager.stop_voting(retro).await);
        manager.start_voting(retro).await.unwrap();

        assert_eq!(store.inner.stored_count(user, retro, target).await, Some(2));
        assert_eq!(manager.vote_count(retro, user, target).await, 2);
    }
}
