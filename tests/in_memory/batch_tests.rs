//! In-memory integration tests for batch reconciliation runs.

use std::time::Duration;

use cmdsync::command_registry::{
    adapters::memory::{InMemoryCommandTransport, TransportCall},
    domain::{BatchMode, ErrorPolicy, RemoteCommandEntry, Scope, StrategyKind, SyncStrategy},
    ports::TransportError,
    services::{ScopeStatus, SyncConfig},
};
use rstest::rstest;

use super::helpers::{Harness, chat, grouped, harness};

fn overwrites(harness: &Harness) -> Vec<TransportCall> {
    let mut calls: Vec<TransportCall> = harness
        .transport
        .calls()
        .expect("calls readable")
        .into_iter()
        .filter(|call| matches!(call, TransportCall::BulkOverwrite { .. }))
        .collect();
    calls.sort_by_key(TransportCall::scope);
    calls
}

fn declare_three_scopes(harness: &Harness) {
    harness
        .engine()
        .register_local([chat("alpha"), grouped("bravo", &[7]), grouped("charlie", &[42])])
        .expect("registration should succeed");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn declared_scopes_are_each_overwritten_once(harness: Harness) {
    harness
        .engine()
        .register_local([chat("ping"), grouped("kick", &[42])])
        .expect("registration should succeed");

    let report = harness
        .batch
        .sync_all_declared(
            SyncStrategy::Overwrite,
            BatchMode::OnlyDeclaredScopes,
            ErrorPolicy::ContinueOnError,
        )
        .await
        .expect("continue-on-error never aborts");

    assert!(report.is_complete());
    assert_eq!(
        overwrites(&harness),
        vec![
            TransportCall::BulkOverwrite {
                scope: Scope::Global,
                names: vec!["ping".to_owned()],
            },
            TransportCall::BulkOverwrite {
                scope: Scope::group(42),
                names: vec!["kick".to_owned()],
            },
        ]
    );
    assert_eq!(report.entries().count(), 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn clearing_mode_wipes_undeclared_remote_scopes(harness: Harness) {
    harness.seed(Scope::group(7), &["stale"]);
    harness
        .engine()
        .register_local([chat("ping")])
        .expect("registration should succeed");

    let report = harness
        .batch
        .sync_all_declared(
            SyncStrategy::Overwrite,
            BatchMode::AlsoClearUndeclaredScopes,
            ErrorPolicy::ContinueOnError,
        )
        .await
        .expect("continue-on-error never aborts");

    assert_eq!(
        report.reconciled_scopes(),
        vec![Scope::Global, Scope::group(7), Scope::group(42)]
    );
    assert!(harness.remote_names(Scope::group(7)).is_empty());
    assert_eq!(harness.remote_names(Scope::Global), vec!["ping"]);
    let wiped: Vec<Scope> = report
        .succeeded()
        .iter()
        .filter(|success| success.strategy() == StrategyKind::Wipe)
        .map(|success| success.scope())
        .collect();
    assert!(wiped.contains(&Scope::group(7)));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn continue_on_error_reports_the_failed_scope_and_applies_the_rest(harness: Harness) {
    declare_three_scopes(&harness);
    harness
        .transport
        .fail_scope(Scope::group(7), TransportError::Rejected("bad payload".to_owned()))
        .expect("failure injection should succeed");

    let report = harness
        .batch
        .sync_all_declared(
            SyncStrategy::Overwrite,
            BatchMode::OnlyDeclaredScopes,
            ErrorPolicy::ContinueOnError,
        )
        .await
        .expect("continue-on-error never aborts");

    assert_eq!(report.failed_scopes(), vec![Scope::group(7)]);
    assert_eq!(report.reconciled_scopes(), vec![Scope::Global, Scope::group(42)]);
    assert!(report.skipped().is_empty());
    assert_eq!(harness.remote_names(Scope::Global), vec!["alpha"]);
    assert_eq!(harness.remote_names(Scope::group(42)), vec!["charlie"]);
    let failure = report
        .failure_for(Scope::group(7))
        .expect("group 7 should have failed");
    assert_eq!(failure.strategy(), StrategyKind::Overwrite);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn fail_fast_stops_and_reports_partial_progress() {
    let harness = Harness::new(InMemoryCommandTransport::new(), [7, 42], SyncConfig::serial());
    declare_three_scopes(&harness);
    harness
        .transport
        .fail_scope(Scope::group(7), TransportError::Unauthorized)
        .expect("failure injection should succeed");

    let aborted = harness
        .batch
        .sync_all_declared(
            SyncStrategy::Overwrite,
            BatchMode::OnlyDeclaredScopes,
            ErrorPolicy::FailFast,
        )
        .await
        .expect_err("fail-fast should abort on group 7");

    assert_eq!(aborted.cause().scope(), Scope::group(7));
    assert_eq!(aborted.partial().reconciled_scopes(), vec![Scope::Global]);
    assert_eq!(aborted.partial().skipped(), &[Scope::group(42)]);
    assert_eq!(harness.remote_names(Scope::Global), vec!["alpha"]);
    assert!(harness.remote_names(Scope::group(42)).is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn statuses_cover_every_planned_scope_in_order() {
    let harness = Harness::new(InMemoryCommandTransport::new(), [7, 42], SyncConfig::serial());
    declare_three_scopes(&harness);
    harness
        .transport
        .fail_scope(Scope::group(7), TransportError::Unauthorized)
        .expect("failure injection should succeed");

    let partial = harness
        .batch
        .sync_all_declared(
            SyncStrategy::Overwrite,
            BatchMode::OnlyDeclaredScopes,
            ErrorPolicy::FailFast,
        )
        .await
        .expect_err("fail-fast should abort on group 7")
        .into_partial();

    let statuses = partial.statuses();
    assert!(matches!(
        statuses.as_slice(),
        [
            ScopeStatus::Reconciled(_),
            ScopeStatus::Failed(_),
            ScopeStatus::Skipped(_)
        ]
    ));
    assert!(partial.finished_at() >= partial.started_at());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrency_never_exceeds_the_configured_limit() {
    let transport = InMemoryCommandTransport::new().with_latency(Duration::from_millis(20));
    let groups: Vec<u64> = (1..=8).collect();
    let harness = Harness::new(
        transport,
        groups.clone(),
        SyncConfig::default().with_max_concurrent_scopes(2),
    );
    harness
        .engine()
        .register_local(groups.iter().map(|group| grouped("ping", &[*group])).collect::<Vec<_>>())
        .expect("registration should succeed");

    let report = harness
        .batch
        .sync_all_declared(
            SyncStrategy::Overwrite,
            BatchMode::OnlyDeclaredScopes,
            ErrorPolicy::ContinueOnError,
        )
        .await
        .expect("continue-on-error never aborts");

    assert_eq!(report.succeeded().len(), 8);
    let peak = harness.transport.peak_in_flight();
    assert!(peak <= 2, "observed {peak} concurrent calls");
    assert!(peak >= 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cancelled_runs_skip_every_scope(harness: Harness) {
    declare_three_scopes(&harness);
    harness.batch.cancellation_token().cancel();

    let report = harness
        .batch
        .sync_all_declared(
            SyncStrategy::Overwrite,
            BatchMode::OnlyDeclaredScopes,
            ErrorPolicy::ContinueOnError,
        )
        .await
        .expect("continue-on-error never aborts");

    assert!(report.succeeded().is_empty());
    assert_eq!(report.skipped().len(), 3);
    assert!(harness.transport.calls().expect("calls readable").is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unsync_given_removes_only_the_named_commands(harness: Harness) {
    harness.seed(Scope::group(7), &["legacy", "warn"]);
    harness.seed(Scope::group(42), &["warn"]);

    let report = harness
        .batch
        .unsync_given(&[grouped("warn", &[7, 42])], ErrorPolicy::FailFast)
        .await
        .expect("removal should succeed");

    assert_eq!(report.reconciled_scopes(), vec![Scope::group(7), Scope::group(42)]);
    assert_eq!(harness.remote_names(Scope::group(7)), vec!["legacy"]);
    assert!(harness.remote_names(Scope::group(42)).is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sync_given_overwrites_touched_scopes_with_their_declared_set(harness: Harness) {
    harness
        .engine()
        .register_local([chat("ping"), chat("echo"), grouped("kick", &[42])])
        .expect("registration should succeed");

    let report = harness
        .batch
        .sync_given(&[chat("ping")], SyncStrategy::Overwrite, ErrorPolicy::FailFast)
        .await
        .expect("overwrite should succeed");

    assert_eq!(report.reconciled_scopes(), vec![Scope::Global]);
    assert_eq!(harness.remote_names(Scope::Global), vec!["echo", "ping"]);
    assert!(harness.remote_names(Scope::group(42)).is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn individual_sync_upserts_without_deleting(harness: Harness) {
    harness.seed(Scope::group(42), &["legacy"]);

    harness
        .batch
        .sync_individually(&[grouped("kick", &[42]), chat("ping")], ErrorPolicy::FailFast)
        .await
        .expect("upserts should succeed");

    assert_eq!(harness.remote_names(Scope::group(42)), vec!["kick", "legacy"]);
    assert_eq!(harness.remote_names(Scope::Global), vec!["ping"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn operated_upsert_skips_scopes_without_declarations(harness: Harness) {
    harness.seed(Scope::group(7), &["legacy"]);
    harness
        .engine()
        .register_local([grouped("kick", &[42])])
        .expect("registration should succeed");

    let report = harness
        .batch
        .sync_all_operated(SyncStrategy::Upsert, ErrorPolicy::FailFast)
        .await
        .expect("upsert should succeed");

    assert_eq!(report.reconciled_scopes(), vec![Scope::group(42)]);
    assert_eq!(harness.remote_names(Scope::group(7)), vec!["legacy"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn clear_undeclared_leaves_declared_scopes_alone(harness: Harness) {
    harness.seed(Scope::Global, &["ping"]);
    harness.seed(Scope::group(7), &["stale"]);
    harness
        .engine()
        .register_local([chat("ping")])
        .expect("registration should succeed");

    harness
        .batch
        .clear_undeclared(ErrorPolicy::FailFast)
        .await
        .expect("wipes should succeed");

    assert_eq!(harness.remote_names(Scope::Global), vec!["ping"]);
    assert!(harness.remote_names(Scope::group(7)).is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn refresh_all_populates_the_cache_for_operated_scopes(harness: Harness) {
    harness.seed(Scope::Global, &["ping"]);
    harness.seed(Scope::group(42), &["kick"]);
    harness.seed(Scope::group(99), &["unrelated"]);

    let report = harness
        .batch
        .refresh_all(ErrorPolicy::ContinueOnError)
        .await
        .expect("continue-on-error never aborts");

    assert_eq!(
        report.reconciled_scopes(),
        vec![Scope::Global, Scope::group(7), Scope::group(42)]
    );
    assert_eq!(harness.cached_names(Scope::group(42)), vec!["kick"]);
    assert!(harness.cached_names(Scope::group(99)).is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn leaving_a_group_removes_it_from_operated_runs(harness: Harness) {
    harness
        .directory
        .leave(cmdsync::command_registry::domain::GroupId::new(7));

    let report = harness
        .batch
        .refresh_all(ErrorPolicy::FailFast)
        .await
        .expect("refresh should succeed");

    assert_eq!(report.reconciled_scopes(), vec![Scope::Global, Scope::group(42)]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn refused_upsert_leaves_siblings_applied_and_reported(harness: Harness) {
    harness
        .transport
        .refuse_upserts_of(
            "beta",
            TransportError::Rejected("invalid option".to_owned()),
        )
        .expect("refusal should be recorded");

    let report = harness
        .batch
        .sync_individually(
            &[chat("alpha"), chat("beta"), chat("gamma")],
            ErrorPolicy::ContinueOnError,
        )
        .await
        .expect("continue-on-error never aborts");

    let upserted: Vec<String> = harness
        .transport
        .calls()
        .expect("calls readable")
        .into_iter()
        .filter_map(|call| match call {
            TransportCall::Upsert { name, .. } => Some(name),
            _ => None,
        })
        .collect();
    assert_eq!(upserted, vec!["alpha", "beta", "gamma"]);
    assert_eq!(harness.remote_names(Scope::Global), vec!["alpha", "gamma"]);
    assert_eq!(report.failed_scopes(), vec![Scope::Global]);
    let mut reported: Vec<&str> = report.entries().map(RemoteCommandEntry::name).collect();
    reported.sort_unstable();
    assert_eq!(reported, vec!["alpha", "gamma"]);
    let failure = report
        .failure_for(Scope::Global)
        .expect("global scope should have failed");
    assert_eq!(failure.applied().len(), 2);
}
