//! Then steps for execution run BDD scenarios.

use super::world::{RunWorld, run_async};
use eyre::eyre;
use gropius::execution::domain::{ExecutionRun, RunStatus, Subtask, SubtaskId, SubtaskStatus};
use gropius::execution::ports::ExecutionStore;
use gropius::execution::services::{RunOutcome, StopOutcome};
use rstest_bdd_macros::then;

fn latest_run(world: &RunWorld) -> Result<ExecutionRun, eyre::Report> {
    run_async(world.execution.status(world.task.id))
        .map_err(|err| eyre!("status lookup failed: {err}"))?
        .ok_or_else(|| eyre!("no run on record"))
}

fn stored_subtask(world: &RunWorld, id: SubtaskId) -> Result<Subtask, eyre::Report> {
    run_async(world.store.find_subtask(id))
        .map_err(|err| eyre!("subtask lookup failed: {err}"))?
        .ok_or_else(|| eyre!("subtask vanished from the store"))
}

#[then("the run completes")]
fn run_completes(world: &RunWorld) -> Result<(), eyre::Report> {
    if world.last_outcome != Some(RunOutcome::Completed) {
        return Err(eyre!(
            "expected a completed run, got {:?}",
            world.last_outcome
        ));
    }
    let run = latest_run(world)?;
    if run.status != RunStatus::Completed {
        return Err(eyre!("expected a completed run record, got {:?}", run.status));
    }
    Ok(())
}

#[then("all {count:usize} subtasks are completed")]
fn all_subtasks_completed(world: &RunWorld, count: usize) -> Result<(), eyre::Report> {
    if world.subtasks.len() != count {
        return Err(eyre!(
            "expected {count} seeded subtasks, found {}",
            world.subtasks.len()
        ));
    }
    for seeded in &world.subtasks {
        let stored = stored_subtask(world, seeded.id)?;
        if stored.status != SubtaskStatus::Completed {
            return Err(eyre!(
                "subtask {} is {:?}, not completed",
                stored.title,
                stored.status
            ));
        }
    }
    Ok(())
}

#[then("each subtask was delivered to the backend once")]
fn each_subtask_delivered_once(world: &RunWorld) -> Result<(), eyre::Report> {
    let delivered = world.client.delivered_messages();
    if delivered != world.subtasks.len() {
        return Err(eyre!(
            "expected {} deliveries, saw {delivered}",
            world.subtasks.len()
        ));
    }
    Ok(())
}

#[then(r#"the run fails with "{message}""#)]
fn run_fails_with(world: &RunWorld, message: String) -> Result<(), eyre::Report> {
    if world.last_outcome != Some(RunOutcome::Failed) {
        return Err(eyre!("expected a failed run, got {:?}", world.last_outcome));
    }
    let run = latest_run(world)?;
    if run.status != RunStatus::Error {
        return Err(eyre!("expected an errored run record, got {:?}", run.status));
    }
    if run.error.as_deref() != Some(message.as_str()) {
        return Err(eyre!("expected error {message:?}, got {:?}", run.error));
    }
    Ok(())
}

#[then("the failed subtask records the same error")]
fn failed_subtask_records_error(world: &RunWorld) -> Result<(), eyre::Report> {
    let run = latest_run(world)?;
    let mut failed = Vec::new();
    for seeded in &world.subtasks {
        let stored = stored_subtask(world, seeded.id)?;
        if stored.status == SubtaskStatus::Failed {
            failed.push(stored);
        }
    }
    let [subtask] = failed.as_slice() else {
        return Err(eyre!(
            "expected exactly one failed subtask, found {}",
            failed.len()
        ));
    };
    if subtask.error != run.error {
        return Err(eyre!(
            "subtask error {:?} differs from run error {:?}",
            subtask.error,
            run.error
        ));
    }
    Ok(())
}

#[then("the third subtask is still queued")]
fn third_subtask_still_queued(world: &RunWorld) -> Result<(), eyre::Report> {
    let seeded = world
        .subtasks
        .get(2)
        .ok_or_else(|| eyre!("fewer than three subtasks seeded"))?;
    let stored = stored_subtask(world, seeded.id)?;
    if stored.status != SubtaskStatus::Waiting {
        return Err(eyre!("expected a waiting subtask, got {:?}", stored.status));
    }
    Ok(())
}

#[then("the run stops without an error")]
fn run_stops_cleanly(world: &RunWorld) -> Result<(), eyre::Report> {
    if world.last_outcome != Some(RunOutcome::Stopped) {
        return Err(eyre!("expected a stopped run, got {:?}", world.last_outcome));
    }
    let run = latest_run(world)?;
    if run.status != RunStatus::Stopped {
        return Err(eyre!("expected a stopped run record, got {:?}", run.status));
    }
    if let Some(error) = &run.error {
        return Err(eyre!("stopped run unexpectedly records error {error:?}"));
    }
    Ok(())
}

#[then("only the first subtask is completed")]
fn only_first_completed(world: &RunWorld) -> Result<(), eyre::Report> {
    let first = world
        .subtasks
        .first()
        .ok_or_else(|| eyre!("no subtasks seeded"))?;
    let stored = stored_subtask(world, first.id)?;
    if stored.status != SubtaskStatus::Completed {
        return Err(eyre!(
            "expected the first subtask completed, got {:?}",
            stored.status
        ));
    }
    Ok(())
}

#[then("the second and third subtasks are still queued")]
fn second_and_third_still_queued(world: &RunWorld) -> Result<(), eyre::Report> {
    for seeded in world.subtasks.iter().skip(1) {
        let stored = stored_subtask(world, seeded.id)?;
        if stored.status != SubtaskStatus::Waiting {
            return Err(eyre!(
                "expected {} to stay queued, got {:?}",
                stored.title,
                stored.status
            ));
        }
    }
    Ok(())
}

#[then("the stop request is ignored")]
fn stop_request_ignored(world: &RunWorld) -> Result<(), eyre::Report> {
    if world.last_stop != Some(StopOutcome::Ignored) {
        return Err(eyre!("expected an ignored stop, got {:?}", world.last_stop));
    }
    Ok(())
}

#[then("no subtask was started")]
fn no_subtask_started(world: &RunWorld) -> Result<(), eyre::Report> {
    if world.client.delivered_messages() != 0 {
        return Err(eyre!("the backend unexpectedly received prompts"));
    }
    for seeded in &world.subtasks {
        let stored = stored_subtask(world, seeded.id)?;
        if stored.status != SubtaskStatus::Waiting {
            return Err(eyre!(
                "expected {} to stay queued, got {:?}",
                stored.title,
                stored.status
            ));
        }
    }
    Ok(())
}
