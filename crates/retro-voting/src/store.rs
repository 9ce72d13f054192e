//! Vote persistence seam.
//!
//! The session manager only needs four things from storage: the caps of a
//! retrospective, every persisted vote of it, whether a target exists, and
//! an idempotent upsert of one absolute count.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use chrono::Utc;
use retro_common::models::{
    retrospective::VoteLimits,
    vote::{VoteRecord, VoteTarget},
};
use retro_db::{
    Database,
    repository::{items, retrospectives, votes},
};
use tokio::sync::RwLock;
use uuid::Uuid;

pub trait VoteStore: Send + Sync + 'static {
    /// Caps for a retrospective, `None` if it does not exist.
    fn vote_limits(
        &self,
        retrospective_id: Uuid,
    ) -> impl Future<Output = Result<Option<VoteLimits>>> + Send;

    fn load_votes(
        &self,
        retrospective_id: Uuid,
    ) -> impl Future<Output = Result<Vec<VoteRecord>>> + Send;

    fn target_exists(
        &self,
        retrospective_id: Uuid,
        target: VoteTarget,
    ) -> impl Future<Output = Result<bool>> + Send;

    fn upsert_vote(
        &self,
        user_id: Uuid,
        retrospective_id: Uuid,
        target: VoteTarget,
        count: u32,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgVoteStore {
    db: Database,
}

impl PgVoteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl VoteStore for PgVoteStore {
    async fn vote_limits(&self, retrospective_id: Uuid) -> Result<Option<VoteLimits>> {
        let retro = retrospectives::find_by_id(&self.db.pool, retrospective_id).await?;
        Ok(retro.as_ref().map(VoteLimits::from))
    }

    async fn load_votes(&self, retrospective_id: Uuid) -> Result<Vec<VoteRecord>> {
        Ok(votes::list_for_retrospective(&self.db.pool, retrospective_id).await?)
    }

    async fn target_exists(&self, retrospective_id: Uuid, target: VoteTarget) -> Result<bool> {
        Ok(items::target_exists(&self.db.pool, retrospective_id, target).await?)
    }

    async fn upsert_vote(
        &self,
        user_id: Uuid,
        retrospective_id: Uuid,
        target: VoteTarget,
        count: u32,
    ) -> Result<()> {
        let count = i32::try_from(count)?;
        votes::upsert_vote(&self.db.pool, user_id, retrospective_id, target, count).await?;
        Ok(())
    }
}

/// In-memory store for tests and local runs without a database.
#[derive(Default)]
pub struct MemoryVoteStore {
    limits: RwLock<HashMap<Uuid, VoteLimits>>,
    targets: RwLock<HashSet<(Uuid, VoteTarget)>>,
    votes: RwLock<HashMap<(Uuid, Uuid, VoteTarget), u32>>,
    fail_writes: AtomicBool,
}

impl MemoryVoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_retrospective(&self, retrospective_id: Uuid, limits: VoteLimits) {
        self.limits.write().await.insert(retrospective_id, limits);
    }

    pub async fn insert_target(&self, retrospective_id: Uuid, target: VoteTarget) {
        self.targets.write().await.insert((retrospective_id, target));
    }

    /// Persisted count for one (user, target), as a fresh reload would see it.
    pub async fn stored_count(
        &self,
        user_id: Uuid,
        retrospective_id: Uuid,
        target: VoteTarget,
    ) -> Option<u32> {
        self.votes
            .read()
            .await
            .get(&(user_id, retrospective_id, target))
            .copied()
    }

    /// Make every subsequent upsert fail, to simulate an unavailable store.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl VoteStore for MemoryVoteStore {
    async fn vote_limits(&self, retrospective_id: Uuid) -> Result<Option<VoteLimits>> {
        Ok(self.limits.read().await.get(&retrospective_id).copied())
    }

    async fn load_votes(&self, retrospective_id: Uuid) -> Result<Vec<VoteRecord>> {
        let now = Utc::now();
        let mut records: Vec<VoteRecord> = self
            .votes
            .read()
            .await
            .iter()
            .filter(|((_, retro, _), _)| *retro == retrospective_id)
            .map(|((user_id, retro, target), count)| VoteRecord {
                user_id: *user_id,
                retrospective_id: *retro,
                target_type: target.target_type,
                target_id: target.target_id,
                count: *count as i32,
                updated_at: now,
            })
            .collect();
        records.sort_by_key(|r| (r.user_id, r.target()));
        Ok(records)
    }

    async fn target_exists(&self, retrospective_id: Uuid, target: VoteTarget) -> Result<bool> {
        Ok(self.targets.read().await.contains(&(retrospective_id, target)))
    }

    async fn upsert_vote(
        &self,
        user_id: Uuid,
        retrospective_id: Uuid,
        target: VoteTarget,
        count: u32,
    ) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("vote store unavailable");
        }
        self.votes
            .write()
            .await
            .insert((user_id, retrospective_id, target), count);
        Ok(())
    }
}
