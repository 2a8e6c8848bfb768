//! When steps for execution run BDD scenarios.

use super::world::{RunWorld, run_async};
use eyre::WrapErr;
use gropius::execution::services::StartRunRequest;
use rstest_bdd_macros::when;

#[when("the task is run unattended")]
fn run_unattended(world: &mut RunWorld) -> Result<(), eyre::Report> {
    let request = StartRunRequest::new(world.task.id, world.service_name.clone());
    let outcome = run_async(world.execution.run_all(request)).wrap_err("drive the run")?;
    world.last_outcome = Some(outcome);
    Ok(())
}

#[when("a stop is requested before any run starts")]
fn stop_before_any_run(world: &mut RunWorld) -> Result<(), eyre::Report> {
    let outcome = run_async(world.execution.stop(world.task.id)).wrap_err("request the stop")?;
    world.last_stop = Some(outcome);
    Ok(())
}
