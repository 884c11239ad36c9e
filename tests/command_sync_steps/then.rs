//! Then steps for command synchronisation BDD scenarios.

use super::world::CommandSyncWorld;
use cmdsync::command_registry::{domain::Scope, services::SyncReport};
use rstest_bdd_macros::then;

fn completed_report(world: &CommandSyncWorld) -> Result<&SyncReport, eyre::Report> {
    match world.outcome.as_ref() {
        Some(Ok(report)) => Ok(report),
        Some(Err(aborted)) => Err(eyre::eyre!("run was aborted: {aborted}")),
        None => Err(eyre::eyre!("no run recorded in scenario world")),
    }
}

fn expect_names(
    world: &CommandSyncWorld,
    scope: Scope,
    expected: &[&str],
) -> Result<(), eyre::Report> {
    let names = world.remote_names(scope)?;
    eyre::ensure!(
        names == expected,
        "expected {scope} to hold {expected:?}, found {names:?}"
    );
    Ok(())
}

#[then(r#"the global scope holds exactly "{name}""#)]
fn global_holds_exactly(world: &CommandSyncWorld, name: String) -> Result<(), eyre::Report> {
    expect_names(world, Scope::Global, &[name.as_str()])
}

#[then(r#"group {group:u64} holds exactly "{name}""#)]
fn group_holds_exactly(
    world: &CommandSyncWorld,
    group: u64,
    name: String,
) -> Result<(), eyre::Report> {
    expect_names(world, Scope::group(group), &[name.as_str()])
}

#[then("group {group:u64} holds nothing")]
fn group_holds_nothing(world: &CommandSyncWorld, group: u64) -> Result<(), eyre::Report> {
    expect_names(world, Scope::group(group), &[])
}

#[then("the run reports no failures")]
fn run_reports_no_failures(world: &CommandSyncWorld) -> Result<(), eyre::Report> {
    let report = completed_report(world)?;
    eyre::ensure!(
        report.is_complete(),
        "expected a complete run, failed: {:?}, skipped: {:?}",
        report.failed_scopes(),
        report.skipped()
    );
    Ok(())
}

#[then("the run reports a failure for group {group:u64} only")]
fn run_reports_single_failure(world: &CommandSyncWorld, group: u64) -> Result<(), eyre::Report> {
    let report = completed_report(world)?;
    let failed = report.failed_scopes();
    eyre::ensure!(
        failed == [Scope::group(group)],
        "expected only group {group} to fail, found {failed:?}"
    );
    Ok(())
}

#[then("the run is aborted by group {group:u64} with group {skipped:u64} skipped")]
fn run_is_aborted_by(
    world: &CommandSyncWorld,
    group: u64,
    skipped: u64,
) -> Result<(), eyre::Report> {
    let aborted = match world.outcome.as_ref() {
        Some(Err(aborted)) => aborted,
        Some(Ok(_)) => return Err(eyre::eyre!("expected the run to abort")),
        None => return Err(eyre::eyre!("no run recorded in scenario world")),
    };
    eyre::ensure!(
        aborted.cause().scope() == Scope::group(group),
        "run aborted by {} instead of group {group}",
        aborted.cause().scope()
    );
    eyre::ensure!(
        aborted.partial().skipped() == [Scope::group(skipped)],
        "expected group {skipped} to be skipped, found {:?}",
        aborted.partial().skipped()
    );
    Ok(())
}
