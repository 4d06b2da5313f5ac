use std::sync::Arc;
use taskflow_core::{
    BoardProps, Capability, CapabilitySet, EntityKind, ErrorKind, Flow, FlowProps, FlowStep, Id,
    MemorySource, OperatorError, Operators, SourceError, Task,
};

fn setup(capabilities: CapabilitySet) -> (Arc<MemorySource>, Operators) {
    let source = Arc::new(MemorySource::with_capabilities(capabilities));
    let operators = Operators::new(source.clone());
    (source, operators)
}

async fn saved_flow_with(ops: &Operators, steps: &[&FlowStep]) -> Flow {
    let collection = ops
        .entity()
        .to_collection(steps.iter().map(|step| (*step).clone()))
        .expect("saved steps");
    ops.flow()
        .create(FlowProps {
            steps: collection,
            default_step_id: None,
        })
        .await
        .expect("create flow")
}

fn step_id(step: &FlowStep) -> Id {
    step.id.clone().expect("saved step")
}

#[tokio::test]
async fn add_step_without_unique_flow_leaves_other_flows_alone() {
    let (_source, ops) = setup(CapabilitySet::full().with(Capability::StepUniqueFlow, false));
    let step = ops.flow_step().create().await.expect("create step");
    let first = saved_flow_with(&ops, &[&step]).await;
    let second = saved_flow_with(&ops, &[]).await;

    let updated = ops
        .flow()
        .add_step(&step, &second)
        .await
        .expect("add step");
    assert!(updated.steps.contains_key(&step_id(&step)));
    assert_eq!(updated.id, second.id);

    let first_stored = ops.flow().refresh_or_fail(&first).await.expect("first flow");
    assert!(first_stored.steps.contains_key(&step_id(&step)));
    let second_stored = ops
        .flow()
        .refresh_or_fail(&second)
        .await
        .expect("second flow");
    assert!(second_stored.steps.is_empty(), "add_step returns an unsaved flow");
}

#[tokio::test]
async fn add_step_moves_step_between_flows_with_unique_flow() {
    let (_source, ops) = setup(CapabilitySet::full());
    let step = ops.flow_step().create().await.expect("create step");
    let first = saved_flow_with(&ops, &[&step]).await;
    let second = saved_flow_with(&ops, &[]).await;

    let updated = ops
        .flow()
        .add_step(step_id(&step), second.id.clone().expect("saved flow"))
        .await
        .expect("move step");
    assert_eq!(updated.steps.get(&step_id(&step)), Some(&step));

    let first_stored = ops.flow().refresh_or_fail(&first).await.expect("first flow");
    assert!(
        first_stored.steps.is_empty(),
        "previous parent is persisted without the step"
    );

    let saved = ops.flow().save(&updated).await.expect("save target");
    let parent = ops
        .flow_step()
        .get_flow(&step)
        .await
        .expect("step has a flow");
    assert_eq!(parent.id, saved.id);
}

#[tokio::test]
async fn add_step_with_unique_flow_requires_step_tasks() {
    let (_source, ops) = setup(CapabilitySet::full().with(Capability::StepTasks, false));
    let step = ops.flow_step().create().await.expect("create step");
    let first = saved_flow_with(&ops, &[&step]).await;
    let second = saved_flow_with(&ops, &[]).await;

    let err = ops
        .flow()
        .add_step(&step, &second)
        .await
        .expect_err("R2 without ST1 is not supported");
    assert_eq!(err.kind(), ErrorKind::NotImplemented);

    let first_stored = ops.flow().refresh_or_fail(&first).await.expect("first flow");
    assert_eq!(first_stored, first);
}

#[tokio::test]
async fn add_step_fails_for_step_in_no_flow_under_unique_flow() {
    let (_source, ops) = setup(CapabilitySet::full());
    let orphan = ops.flow_step().create().await.expect("create step");
    let target = saved_flow_with(&ops, &[]).await;

    let err = ops
        .flow()
        .add_step(&orphan, &target)
        .await
        .expect_err("step lookup is found-or-error");
    assert_eq!(
        err,
        OperatorError::Source(SourceError::MissingAssociation {
            kind: EntityKind::FlowStep,
            id: step_id(&orphan),
        })
    );
}

#[tokio::test]
async fn add_step_rejects_unsaved_steps_before_any_write() {
    let (source, ops) = setup(CapabilitySet::full());
    let target = saved_flow_with(&ops, &[]).await;
    let before = source.len();

    let err = ops
        .flow()
        .add_step(&FlowStep::new(), &target)
        .await
        .expect_err("unsaved step has no id");
    assert!(matches!(
        err,
        OperatorError::SavingRequired {
            kind: EntityKind::FlowStep
        }
    ));
    assert_eq!(source.len(), before);
}

#[tokio::test]
async fn remove_step_in_use_fails_and_keeps_steps() {
    let (_source, ops) = setup(CapabilitySet::full());
    let step = ops.flow_step().create().await.expect("create step");
    let flow = saved_flow_with(&ops, &[&step]).await;
    let flow = ops
        .flow()
        .save(&Flow {
            default_step_id: Some(step_id(&step)),
            ..flow
        })
        .await
        .expect("set default step");
    let task = ops.task().create().await.expect("create task");
    let board = ops
        .board()
        .create(BoardProps::new(flow.clone()))
        .await
        .expect("create board");
    let board = ops.board().add_task(&task, &board).await.expect("add task");
    ops.board().save(&board).await.expect("save board");

    let err = ops
        .flow()
        .remove_step(&step, &flow)
        .await
        .expect_err("a task uses the step");
    assert_eq!(
        err,
        OperatorError::FlowStepInUse {
            step: step_id(&step),
            tasks: 1,
        }
    );
    let stored = ops.flow().refresh_or_fail(&flow).await.expect("flow");
    assert_eq!(stored.steps, flow.steps);
}

#[tokio::test]
async fn remove_step_returns_unsaved_flow_without_step() {
    let (_source, ops) = setup(CapabilitySet::full());
    let kept = ops.flow_step().create().await.expect("create step");
    let removed = ops.flow_step().create().await.expect("create step");
    let flow = saved_flow_with(&ops, &[&kept, &removed]).await;

    let updated = ops
        .flow()
        .remove_step(&removed, &flow)
        .await
        .expect("step is unused");
    assert_eq!(
        updated.steps.keys().cloned().collect::<Vec<_>>(),
        vec![step_id(&kept)]
    );
    let stored = ops.flow().refresh_or_fail(&flow).await.expect("flow");
    assert_eq!(stored.steps.len(), 2);
}

#[tokio::test]
async fn remove_step_requires_step_tasks() {
    let (_source, ops) = setup(CapabilitySet::full().with(Capability::StepTasks, false));
    let step = ops.flow_step().create().await.expect("create step");
    let flow = saved_flow_with(&ops, &[&step]).await;

    let err = ops
        .flow()
        .remove_step(&step, &flow)
        .await
        .expect_err("ST1 is missing");
    assert_eq!(err.kind(), ErrorKind::NotImplemented);
}

#[tokio::test]
async fn step_tasks_lookup_reports_boards_mapping_unstored_tasks() {
    let (_source, ops) = setup(CapabilitySet::full());
    let step = ops.flow_step().create().await.expect("create step");
    let flow = saved_flow_with(&ops, &[&step]).await;
    let board = ops
        .board()
        .create(BoardProps::new(flow))
        .await
        .expect("create board");
    let ghost = Task::with_id("ghost");
    let board = ops
        .board()
        .set_task_step(&step, &ghost, &board)
        .await
        .expect("assignment is not validated");
    ops.board().save(&board).await.expect("save board");

    let err = ops
        .flow_step()
        .get_tasks(&step)
        .await
        .expect_err("task is mapped but not stored");
    assert!(matches!(
        err,
        OperatorError::Source(SourceError::Corrupted(_))
    ));
}

async fn board_using(ops: &Operators, step: &FlowStep) -> taskflow_core::Board {
    let flow = saved_flow_with(ops, &[step]).await;
    let flow = ops
        .flow()
        .save(&Flow {
            default_step_id: Some(step_id(step)),
            ..flow
        })
        .await
        .expect("set default step");
    let task = ops.task().create().await.expect("create task");
    let board = ops
        .board()
        .create(BoardProps::new(flow))
        .await
        .expect("create board");
    let board = ops.board().add_task(&task, &board).await.expect("add task");
    ops.board().save(&board).await.expect("save board")
}

#[tokio::test]
async fn delete_refuses_step_still_assigned_to_tasks() {
    let (source, ops) = setup(CapabilitySet::full());
    let step = ops.flow_step().create().await.expect("create step");
    let board = board_using(&ops, &step).await;
    let before = source.len();

    let err = ops
        .flow_step()
        .delete(&step)
        .await
        .expect_err("a task uses the step");
    assert_eq!(
        err,
        OperatorError::FlowStepInUse {
            step: step_id(&step),
            tasks: 1,
        }
    );
    assert_eq!(source.len(), before);

    let task_id = board.tasks.keys().next().cloned().expect("board has a task");
    let assigned = ops
        .board()
        .get_task_step(task_id, &board)
        .await
        .expect("step still resolves");
    assert_eq!(assigned, step);
}

#[tokio::test]
async fn delete_removes_unused_step() {
    let (source, ops) = setup(CapabilitySet::full());
    let step = ops.flow_step().create().await.expect("create step");

    let deleted = ops.flow_step().delete(&step).await.expect("step is unused");
    assert_eq!(deleted, step);
    assert_eq!(source.len_of(EntityKind::FlowStep), 0);
}

#[tokio::test]
async fn delete_without_step_tasks_skips_usage_check() {
    let (source, ops) = setup(CapabilitySet::full());
    let step = ops.flow_step().create().await.expect("create step");
    board_using(&ops, &step).await;
    source.set_capability(Capability::StepTasks, false);

    ops.flow_step()
        .delete(&step)
        .await
        .expect("usage cannot be checked without ST1");
    assert!(ops
        .flow_step()
        .get(&step)
        .await
        .expect("get should not fail")
        .is_none());
}

#[tokio::test]
async fn step_lookups_require_their_capabilities() {
    let (source, ops) = setup(CapabilitySet::full());
    let step = ops.flow_step().create().await.expect("create step");
    saved_flow_with(&ops, &[&step]).await;

    source.set_capability(Capability::StepUniqueFlow, false);
    let err = ops
        .flow_step()
        .get_flow(&step)
        .await
        .expect_err("R2 is missing");
    assert!(matches!(err, OperatorError::NotImplemented { .. }));

    source.set_capability(Capability::StepTasks, false);
    let err = ops
        .flow_step()
        .get_tasks(&step)
        .await
        .expect_err("ST1 is missing");
    assert_eq!(err.kind(), ErrorKind::NotImplemented);

    source.set_capability(Capability::StepUniqueFlow, true);
    source.set_capability(Capability::StepTasks, true);
    ops.flow_step()
        .get_flow(&step)
        .await
        .expect("R2 is back");
    assert!(ops
        .flow_step()
        .get_tasks(&step)
        .await
        .expect("ST1 is back")
        .is_empty());
}
