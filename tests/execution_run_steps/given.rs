//! Given steps for execution run BDD scenarios.

use super::world::RunWorld;
use eyre::WrapErr;
use gropius::execution::domain::Subtask;
use rstest_bdd_macros::given;

#[given("a task with {count:u32} queued subtasks")]
fn a_task_with_queued_subtasks(world: &mut RunWorld, count: u32) -> Result<(), eyre::Report> {
    world
        .store
        .seed_project(world.project.clone())
        .wrap_err("seed project")?;
    world
        .store
        .seed_task(world.task.clone())
        .wrap_err("seed task")?;
    for position in 1..=count {
        let subtask = Subtask::new(world.task.id, format!("Subtask {position}"), position);
        world
            .store
            .seed_subtask(subtask.clone())
            .wrap_err("seed subtask")?;
        world.subtasks.push(subtask);
    }
    Ok(())
}

#[given(r#"the backend will reject the second prompt with "{message}""#)]
fn backend_rejects_second_prompt(
    world: &mut RunWorld,
    message: String,
) -> Result<(), eyre::Report> {
    world
        .client
        .script_reply("done")
        .wrap_err("script first reply")?;
    world
        .client
        .script_failure(message)
        .wrap_err("script failure")?;
    Ok(())
}

#[given("a stop request that lands once the first subtask completes")]
fn stop_lands_after_first_completion(world: &mut RunWorld) {
    world.stop_gate.arm();
}
