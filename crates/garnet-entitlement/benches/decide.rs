//! Decision engine benchmarks.
//!
//! Measures the per-request cost of `decide` over a realistic policy mix,
//! since it sits on the hot path of every query.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use garnet_entitlement::{EntitlementContext, MissingPermissions, decide};
use garnet_policy::{AccessAction, Condition, MaskKind, Policy, PolicyRule, RowFilter};
use garnet_types::{FilterOperator, TenantId, UserId};

fn policy_mix(count: usize) -> Vec<Policy> {
    (0..count)
        .map(|index| match index % 4 {
            0 => Policy::new(
                format!("cls-{index}"),
                PolicyRule::Columns {
                    action: AccessAction::Deny,
                    columns: [format!("secret_{index}")].into_iter().collect(),
                },
            ),
            1 => Policy::new(
                format!("rls-{index}"),
                PolicyRule::RowFilter(RowFilter::new(
                    "assignee",
                    FilterOperator::Equals,
                    "${user.id}",
                )),
            )
            .with_condition(Condition::parse("user.role != 'ADMIN'")),
            2 => Policy::new(
                format!("mask-{index}"),
                PolicyRule::MaskColumn {
                    column: "email".to_string(),
                    mask: MaskKind::Hash,
                },
            ),
            _ => Policy::new(
                format!("deny-{index}"),
                PolicyRule::TableAccess {
                    action: AccessAction::Deny,
                },
            )
            .with_condition(Condition::parse("user.role == 'CONTRACTOR'")),
        })
        .collect()
}

fn bench_decide(c: &mut Criterion) {
    let mut group = c.benchmark_group("decide");

    let context = EntitlementContext::new(TenantId::new("tenant1"), "issues")
        .with_user(UserId::new("john_doe"))
        .with_role("USER")
        .with_requested_columns(["id", "title", "email", "assignee", "state"]);
    let requested: Vec<String> = ["id", "title", "email", "assignee", "state"]
        .into_iter()
        .map(str::to_string)
        .collect();

    for count in [4, 16, 64] {
        let policies = policy_mix(count);
        group.bench_with_input(
            BenchmarkId::from_parameter(count),
            &policies,
            |b, policies| {
                b.iter(|| {
                    let decision = decide(
                        black_box(policies),
                        black_box(&context),
                        "github",
                        "issues",
                        &requested,
                        MissingPermissions::AllowRequested,
                    );
                    black_box(decision);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_decide);
criterion_main!(benches);
