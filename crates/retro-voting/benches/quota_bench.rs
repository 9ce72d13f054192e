//! Criterion microbenchmarks for the voting and role-evaluation hot paths.
//!
//! Run with:
//!   cargo bench -p retro-voting
//!
//! HTML reports are written to `target/criterion/`.

use chrono::Utc;
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use retro_common::{
    models::{
        retrospective::VoteLimits,
        vote::{VoteRecord, VoteTarget},
    },
    rbac::{self, Action, Resource, Role, RoleSnapshot},
};
use retro_voting::VoteQuotaTracker;
use uuid::Uuid;

// ── Quota evaluation ──────────────────────────────────────────────────────────

fn limits() -> VoteLimits {
    VoteLimits {
        max_per_item: 3,
        max_total: 5,
    }
}

/// One increase followed by one decrease, so the tracker never hits a cap.
fn bench_increase_decrease(c: &mut Criterion) {
    let retro = Uuid::now_v7();
    let user = Uuid::now_v7();
    let target = VoteTarget::item(Uuid::now_v7());
    let mut tracker = VoteQuotaTracker::new(retro, limits());
    tracker.register_target(target);

    c.bench_function("quota/increase_decrease", |b| {
        b.iter(|| {
            tracker.increase_vote(black_box(user), black_box(target)).unwrap();
            tracker.decrease_vote(black_box(user), black_box(target)).unwrap();
        })
    });
}

/// Increase against a full per-item cap: the rejection path.
fn bench_rejected_increase(c: &mut Criterion) {
    let retro = Uuid::now_v7();
    let user = Uuid::now_v7();
    let target = VoteTarget::item(Uuid::now_v7());
    let mut tracker = VoteQuotaTracker::new(retro, limits());
    tracker.register_target(target);
    for _ in 0..3 {
        tracker.increase_vote(user, target).unwrap();
    }

    c.bench_function("quota/rejected_increase", |b| {
        b.iter(|| tracker.increase_vote(black_box(user), black_box(target)).is_err())
    });
}

/// Rebuilding a session from persisted records at several sizes.
fn bench_reload(c: &mut Criterion) {
    let retro = Uuid::now_v7();
    let now = Utc::now();
    let mut group = c.benchmark_group("quota/reload");

    for participants in [10usize, 100, 1_000] {
        let targets: Vec<VoteTarget> = (0..20).map(|_| VoteTarget::item(Uuid::now_v7())).collect();
        let records: Vec<VoteRecord> = (0..participants)
            .flat_map(|_| {
                let user_id = Uuid::now_v7();
                targets.iter().take(5).map(move |t| VoteRecord {
                    user_id,
                    retrospective_id: retro,
                    target_type: t.target_type,
                    target_id: t.target_id,
                    count: 1,
                    updated_at: now,
                })
            })
            .collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(participants),
            &records,
            |b, records| {
                b.iter(|| VoteQuotaTracker::from_records(retro, limits(), black_box(records)))
            },
        );
    }
    group.finish();
}

// ── Role evaluation ───────────────────────────────────────────────────────────

fn bench_effective_level(c: &mut Criterion) {
    let codes = ["ROLE_MEMBER", "ROLE_UNKNOWN", "ROLE_SUPERVISOR", "ROLE_FACILITATOR"];
    c.bench_function("rbac/effective_level", |b| {
        b.iter(|| rbac::effective_level(black_box(codes.iter())))
    });
}

fn bench_authorize(c: &mut Criterion) {
    let snapshot = RoleSnapshot::new(
        Uuid::now_v7(),
        [Role::Member, Role::Facilitator].map(|r| r.code().to_string()),
    );
    c.bench_function("rbac/authorize", |b| {
        b.iter(|| {
            snapshot
                .authorize(black_box(Resource::Retrospective), black_box(Action::Manage))
                .is_ok()
        })
    });
}

criterion_group!(
    quota,
    bench_increase_decrease,
    bench_rejected_increase,
    bench_reload
);

criterion_group!(roles, bench_effective_level, bench_authorize);

criterion_main!(quota, roles);
