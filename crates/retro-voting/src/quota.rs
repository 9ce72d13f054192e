//! Vote quota evaluator for one retrospective.
//!
//! Holds the authoritative in-memory state of an open voting session:
//! - `votes`: user → target → count
//! - `totals`: user → running sum of that user's counts
//! - `badges`: target → sum over all users (what everyone sees)
//!
//! Invariants kept by every mutation:
//! `0 <= votes[u][t] <= max_per_item` for counts created here,
//! `totals[u] == sum(votes[u][*]) <= max_total`,
//! `badges[t] == sum over u of votes[u][t]`.
//!
//! No I/O happens here. The session layer decides when to persist.

use std::collections::{BTreeMap, HashMap, HashSet};

use retro_common::models::{
    retrospective::VoteLimits,
    vote::{VoteRecord, VoteTarget},
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Cap, VoteError};

/// Which controls the presentation layer should enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteControls {
    pub can_increase: bool,
    pub can_decrease: bool,
}

/// Result of one accepted increase/decrease.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteChange {
    pub user_id: Uuid,
    pub target: VoteTarget,
    /// The user's count on this target after the action.
    pub count: u32,
    /// The user's total across the retrospective after the action.
    pub user_total: u32,
    /// Everyone's votes on this target after the action.
    pub badge_count: u32,
    pub controls: VoteControls,
    /// False when the action was a no-op (decrease at zero). Nothing to persist.
    pub changed: bool,
}

/// Badge label for an aggregate count.
pub fn badge_text(count: u32) -> String {
    if count == 1 {
        "1 vote".to_string()
    } else {
        format!("{count} votes")
    }
}

#[derive(Debug, Clone)]
pub struct VoteQuotaTracker {
    retrospective_id: Uuid,
    limits: VoteLimits,
    votes: HashMap<Uuid, HashMap<VoteTarget, u32>>,
    totals: HashMap<Uuid, u32>,
    badges: HashMap<VoteTarget, u32>,
    known_targets: HashSet<VoteTarget>,
}

impl VoteQuotaTracker {
    pub fn new(retrospective_id: Uuid, limits: VoteLimits) -> Self {
        Self {
            retrospective_id,
            limits,
            votes: HashMap::new(),
            totals: HashMap::new(),
            badges: HashMap::new(),
            known_targets: HashSet::new(),
        }
    }

    /// Rebuild state from persisted records. Badges start at the sum of the
    /// persisted counts, not at zero.
    pub fn from_records(
        retrospective_id: Uuid,
        limits: VoteLimits,
        records: &[VoteRecord],
    ) -> Self {
        let mut tracker = Self::new(retrospective_id, limits);
        for record in records
            .iter()
            .filter(|r| r.retrospective_id == retrospective_id)
        {
            let target = record.target();
            let count = record.count.max(0) as u32;
            tracker.known_targets.insert(target);
            if count == 0 {
                continue;
            }
            *tracker
                .votes
                .entry(record.user_id)
                .or_default()
                .entry(target)
                .or_insert(0) += count;
            *tracker.totals.entry(record.user_id).or_insert(0) += count;
            *tracker.badges.entry(target).or_insert(0) += count;
        }
        tracker
    }

    pub fn retrospective_id(&self) -> Uuid {
        self.retrospective_id
    }

    pub fn limits(&self) -> VoteLimits {
        self.limits
    }

    /// Mark a target as existing in this retrospective.
    pub fn register_target(&mut self, target: VoteTarget) {
        self.known_targets.insert(target);
    }

    pub fn knows(&self, target: &VoteTarget) -> bool {
        self.known_targets.contains(target)
    }

    pub fn vote_count(&self, user_id: Uuid, target: &VoteTarget) -> u32 {
        self.votes
            .get(&user_id)
            .and_then(|t| t.get(target))
            .copied()
            .unwrap_or(0)
    }

    pub fn user_total(&self, user_id: Uuid) -> u32 {
        self.totals.get(&user_id).copied().unwrap_or(0)
    }

    /// Votes the user can still cast anywhere.
    pub fn remaining(&self, user_id: Uuid) -> u32 {
        self.limits.max_total.saturating_sub(self.user_total(user_id))
    }

    pub fn badge_count(&self, target: &VoteTarget) -> u32 {
        self.badges.get(target).copied().unwrap_or(0)
    }

    /// Aggregate counts for every target that has at least one vote, in a
    /// stable order.
    pub fn badges(&self) -> BTreeMap<VoteTarget, u32> {
        self.badges
            .iter()
            .filter(|&(_, &n)| n > 0)
            .map(|(t, n)| (*t, *n))
            .collect()
    }

    /// One user's non-zero counts, in a stable order.
    pub fn user_votes(&self, user_id: Uuid) -> BTreeMap<VoteTarget, u32> {
        self.votes
            .get(&user_id)
            .map(|targets| {
                targets
                    .iter()
                    .filter(|&(_, &n)| n > 0)
                    .map(|(t, n)| (*t, *n))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn controls(&self, user_id: Uuid, target: &VoteTarget) -> VoteControls {
        let count = self.vote_count(user_id, target);
        VoteControls {
            can_increase: self.check_quota(count, self.user_total(user_id)).is_ok(),
            can_decrease: count > 0,
        }
    }

    fn check_quota(&self, count: u32, total: u32) -> Result<(), Cap> {
        if count >= self.limits.max_per_item {
            return Err(Cap::PerItem {
                limit: self.limits.max_per_item,
            });
        }
        if total >= self.limits.max_total {
            return Err(Cap::Total {
                limit: self.limits.max_total,
            });
        }
        Ok(())
    }

    /// Add one vote from `user_id` on `target`.
    pub fn increase_vote(
        &mut self,
        user_id: Uuid,
        target: VoteTarget,
    ) -> Result<VoteChange, VoteError> {
        if !self.knows(&target) {
            return Err(VoteError::TargetNotFound);
        }

        let current = self.vote_count(user_id, &target);
        self.check_quota(current, self.user_total(user_id))
            .map_err(VoteError::QuotaExceeded)?;

        self.votes
            .entry(user_id)
            .or_default()
            .insert(target, current + 1);
        *self.totals.entry(user_id).or_insert(0) += 1;
        *self.badges.entry(target).or_insert(0) += 1;

        Ok(self.change(user_id, target, true))
    }

    /// Remove one vote from `user_id` on `target`. At zero this is a no-op.
    pub fn decrease_vote(
        &mut self,
        user_id: Uuid,
        target: VoteTarget,
    ) -> Result<VoteChange, VoteError> {
        if !self.knows(&target) {
            return Err(VoteError::TargetNotFound);
        }

        let current = self.vote_count(user_id, &target);
        if current == 0 {
            return Ok(self.change(user_id, target, false));
        }

        // The record stays at 0 rather than disappearing.
        self.votes
            .entry(user_id)
            .or_default()
            .insert(target, current - 1);
        if let Some(total) = self.totals.get_mut(&user_id) {
            *total = total.saturating_sub(1);
        }
        if let Some(badge) = self.badges.get_mut(&target) {
            *badge = badge.saturating_sub(1);
        }

        Ok(self.change(user_id, target, true))
    }

    fn change(&self, user_id: Uuid, target: VoteTarget, changed: bool) -> VoteChange {
        VoteChange {
            user_id,
            target,
            count: self.vote_count(user_id, &target),
            user_total: self.user_total(user_id),
            badge_count: self.badge_count(&target),
            controls: self.controls(user_id, &target),
            changed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn tracker(max_per_item: u32, max_total: u32, targets: &[VoteTarget]) -> VoteQuotaTracker {
        let mut t = VoteQuotaTracker::new(
            Uuid::now_v7(),
            VoteLimits {
                max_per_item,
                max_total,
            },
        );
        for target in targets {
            t.register_target(*target);
        }
        t
    }

    fn item() -> VoteTarget {
        VoteTarget::item(Uuid::now_v7())
    }

    #[test]
    fn increase_adds_exactly_one() {
        let a = item();
        let mut t = tracker(3, 5, &[a]);
        let user = Uuid::now_v7();

        let change = t.increase_vote(user, a).unwrap();
        assert_eq!(change.count, 1);
        assert_eq!(change.user_total, 1);
        assert_eq!(change.badge_count, 1);
        assert!(change.changed);
        assert_eq!(t.vote_count(user, &a), 1);
    }

    #[test]
    fn per_item_cap_blocks_sixth_vote() {
        let a = item();
        let mut t = tracker(5, 10, &[a]);
        let user = Uuid::now_v7();

        for _ in 0..5 {
            t.increase_vote(user, a).unwrap();
        }
        let err = t.increase_vote(user, a).unwrap_err();
        assert!(matches!(err, VoteError::QuotaExceeded(Cap::PerItem { limit: 5 })));
        assert_eq!(t.vote_count(user, &a), 5);
        assert_eq!(t.user_total(user), 5);
    }

    #[test]
    fn total_cap_blocks_even_untouched_targets() {
        let targets: Vec<VoteTarget> = (0..6).map(|_| item()).collect();
        let mut t = tracker(5, 5, &targets);
        let user = Uuid::now_v7();

        for target in &targets[..5] {
            t.increase_vote(user, *target).unwrap();
        }
        let err = t.increase_vote(user, targets[5]).unwrap_err();
        assert!(matches!(err, VoteError::QuotaExceeded(Cap::Total { limit: 5 })));
        assert_eq!(t.vote_count(user, &targets[5]), 0);
        assert_eq!(t.remaining(user), 0);
    }

    #[test]
    fn three_five_scenario() {
        let (a, b, c) = (item(), item(), item());
        let mut t = tracker(3, 5, &[a, b, c]);
        let user = Uuid::now_v7();

        for _ in 0..3 {
            t.increase_vote(user, a).unwrap();
        }
        for _ in 0..2 {
            t.increase_vote(user, b).unwrap();
        }
        assert_eq!(t.user_total(user), 5);

        let err = t.increase_vote(user, c).unwrap_err();
        assert!(matches!(err, VoteError::QuotaExceeded(Cap::Total { .. })));
        assert_eq!(t.vote_count(user, &a), 3);
        assert_eq!(t.vote_count(user, &b), 2);
        assert_eq!(t.vote_count(user, &c), 0);
    }

    #[test]
    fn decrease_floors_at_zero() {
        let a = item();
        let mut t = tracker(3, 5, &[a]);
        let user = Uuid::now_v7();

        for _ in 0..3 {
            let change = t.decrease_vote(user, a).unwrap();
            assert_eq!(change.count, 0);
            assert!(!change.changed);
        }
        assert_eq!(t.user_total(user), 0);
        assert_eq!(t.badge_count(&a), 0);
    }

    #[test]
    fn decrease_frees_quota() {
        let (a, b) = (item(), item());
        let mut t = tracker(2, 2, &[a, b]);
        let user = Uuid::now_v7();

        t.increase_vote(user, a).unwrap();
        t.increase_vote(user, a).unwrap();
        assert!(t.increase_vote(user, b).is_err());

        let change = t.decrease_vote(user, a).unwrap();
        assert_eq!(change.count, 1);
        assert_eq!(change.user_total, 1);
        assert!(change.controls.can_decrease);

        t.increase_vote(user, b).unwrap();
        assert_eq!(t.user_total(user), 2);
    }

    #[test]
    fn controls_follow_caps() {
        let a = item();
        let mut t = tracker(1, 5, &[a]);
        let user = Uuid::now_v7();

        assert_eq!(
            t.controls(user, &a),
            VoteControls {
                can_increase: true,
                can_decrease: false
            }
        );
        let change = t.increase_vote(user, a).unwrap();
        assert_eq!(
            change.controls,
            VoteControls {
                can_increase: false,
                can_decrease: true
            }
        );
    }

    #[test]
    fn unknown_target_is_rejected_without_mutation() {
        let mut t = tracker(3, 5, &[]);
        let user = Uuid::now_v7();
        let ghost = item();

        assert!(matches!(t.increase_vote(user, ghost), Err(VoteError::TargetNotFound)));
        assert!(matches!(t.decrease_vote(user, ghost), Err(VoteError::TargetNotFound)));
        assert_eq!(t.user_total(user), 0);
        assert!(t.badges().is_empty());
    }

    #[test]
    fn items_and_groups_are_distinct_targets() {
        let id = Uuid::now_v7();
        let (as_item, as_group) = (VoteTarget::item(id), VoteTarget::group(id));
        let mut t = tracker(1, 5, &[as_item, as_group]);
        let user = Uuid::now_v7();

        t.increase_vote(user, as_item).unwrap();
        t.increase_vote(user, as_group).unwrap();
        assert_eq!(t.vote_count(user, &as_item), 1);
        assert_eq!(t.vote_count(user, &as_group), 1);
    }

    #[test]
    fn badges_aggregate_across_users() {
        let a = item();
        let mut t = tracker(3, 5, &[a]);
        let (u1, u2) = (Uuid::now_v7(), Uuid::now_v7());

        t.increase_vote(u1, a).unwrap();
        t.increase_vote(u1, a).unwrap();
        let change = t.increase_vote(u2, a).unwrap();
        assert_eq!(change.badge_count, 3);
        assert_eq!(change.count, 1);
        assert_eq!(badge_text(t.badge_count(&a)), "3 votes");
    }

    #[test]
    fn badge_text_pluralizes() {
        assert_eq!(badge_text(0), "0 votes");
        assert_eq!(badge_text(1), "1 vote");
        assert_eq!(badge_text(2), "2 votes");
    }

    #[test]
    fn reload_reproduces_counts_totals_and_badges() {
        let retro = Uuid::now_v7();
        let (a, b) = (item(), item());
        let (u1, u2) = (Uuid::now_v7(), Uuid::now_v7());
        let record = |user, target: VoteTarget, count| VoteRecord {
            user_id: user,
            retrospective_id: retro,
            target_type: target.target_type,
            target_id: target.target_id,
            count,
            updated_at: Utc::now(),
        };
        let records = vec![
            record(u1, a, 2),
            record(u1, b, 0),
            record(u2, a, 1),
            // Belongs to another retrospective, must be ignored.
            VoteRecord {
                retrospective_id: Uuid::now_v7(),
                ..record(u2, b, 4)
            },
        ];

        let limits = VoteLimits {
            max_per_item: 3,
            max_total: 5,
        };
        let t = VoteQuotaTracker::from_records(retro, limits, &records);
        assert_eq!(t.vote_count(u1, &a), 2);
        assert_eq!(t.user_total(u1), 2);
        assert_eq!(t.user_total(u2), 1);
        assert_eq!(t.badge_count(&a), 3);
        assert_eq!(t.badge_count(&b), 0);
        assert!(t.knows(&b));
    }
}
