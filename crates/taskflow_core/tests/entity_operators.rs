use std::collections::BTreeSet;
use std::sync::Arc;
use taskflow_core::{
    Entity, EntityKind, EntityOperators, ErrorKind, Flow, FlowProps, FlowStep, FlowUpdate, Id,
    Identified, MemorySource, OperatorError, Operators, Task,
};

fn operators() -> (Arc<MemorySource>, Operators) {
    let source = Arc::new(MemorySource::new());
    let operators = Operators::new(source.clone());
    (source, operators)
}

#[tokio::test]
async fn saving_unsaved_tasks_assigns_distinct_ids() {
    let (source, ops) = operators();
    let mut ids = BTreeSet::new();
    for _ in 0..5 {
        let task = ops.task().save(&Task::new()).await.expect("save task");
        ids.insert(task.id.expect("saved task has an id"));
    }
    assert_eq!(ids.len(), 5);
    assert_eq!(source.len_of(EntityKind::Task), 5);

    let missing = ops
        .task()
        .get(Id::from("unknown"))
        .await
        .expect("get should not fail");
    assert!(missing.is_none());
}

#[tokio::test]
async fn generic_get_or_fail_reports_kind_and_id() {
    let source = MemorySource::new();
    let ops = EntityOperators::new(&source);
    let err = ops
        .get_or_fail(EntityKind::Board, &Id::from(42))
        .await
        .expect_err("nothing is stored");
    assert_eq!(
        err,
        OperatorError::EntityNotFound {
            kind: EntityKind::Board,
            id: Id::from(42),
        }
    );
    assert!(err.to_string().contains("Board"));
    assert!(err.to_string().contains("42"));
}

#[tokio::test]
async fn create_update_and_delete_flow() {
    let (source, ops) = operators();
    let step = ops.flow_step().create().await.expect("create step");
    let step_id = step.id.clone().expect("saved step");

    let flow = ops
        .flow()
        .create(FlowProps::default())
        .await
        .expect("create flow");
    assert!(flow.is_saved());

    let mut steps = ops.flow().get_steps(&flow);
    steps.insert(step_id.clone(), step);
    let updated = ops.flow().update(
        FlowUpdate {
            steps: Some(steps),
            default_step_id: Some(Some(step_id.clone())),
        },
        &flow,
    );
    let stored = ops
        .flow()
        .refresh_or_fail(&flow)
        .await
        .expect("flow is stored");
    assert!(stored.steps.is_empty(), "update must not persist");

    let saved = ops.flow().save(&updated).await.expect("save flow");
    let stored = ops
        .flow()
        .refresh_or_fail(&saved)
        .await
        .expect("flow is stored");
    assert_eq!(stored.default_step_id, Some(step_id));
    assert_eq!(stored.steps.len(), 1);

    let deleted = ops.flow().delete(&stored).await.expect("delete flow");
    assert_eq!(deleted, stored);
    assert!(ops
        .flow()
        .refresh(&deleted)
        .await
        .expect("refresh should not fail")
        .is_none());
    assert_eq!(source.len_of(EntityKind::Flow), 0);

    let err = ops
        .flow()
        .refresh_or_fail(&deleted)
        .await
        .expect_err("deleted flow is gone");
    assert_eq!(
        err,
        OperatorError::EntityNotFound {
            kind: EntityKind::Flow,
            id: deleted.id.clone().expect("saved flow"),
        }
    );
}

#[tokio::test]
async fn clones_are_independent_of_their_origin() {
    let (_source, ops) = operators();
    let mut flow = Flow::new();
    flow.steps.insert(Id::from(1), FlowStep::with_id(1));

    let mut copy = ops.flow().clone(&flow);
    assert_eq!(copy, flow);
    copy.steps.insert(Id::from(2), FlowStep::with_id(2));
    assert_eq!(flow.steps.len(), 1);

    let mut steps = ops.flow().get_steps(&flow);
    steps.clear();
    assert_eq!(flow.steps.len(), 1);
}

#[tokio::test]
async fn unsaved_entities_require_saving_before_delete_and_refresh() {
    let (_source, ops) = operators();
    let err = ops
        .task()
        .delete(&Task::new())
        .await
        .expect_err("unsaved task cannot be deleted");
    assert_eq!(err.kind(), ErrorKind::SavingRequired);

    let err = ops
        .entity()
        .refresh(&Entity::bare(EntityKind::Board))
        .await
        .expect_err("unsaved board cannot be refreshed");
    assert!(matches!(
        err,
        OperatorError::SavingRequired {
            kind: EntityKind::Board
        }
    ));

    let marker = ops
        .entity()
        .require_saved(&Task::with_id("t-1"), |id| id.to_string())
        .expect("saved task");
    assert_eq!(marker, "t-1");
}

#[tokio::test]
async fn generic_create_stores_bare_entities() {
    let (source, ops) = operators();
    for kind in EntityKind::all() {
        let entity = ops.entity().create(kind).await.expect("create entity");
        assert_eq!(entity.kind(), kind);
        assert!(entity.is_saved());
    }
    assert_eq!(source.len(), 4);

    let tasks = ops.entity().list(EntityKind::Task).await.expect("list tasks");
    assert_eq!(tasks.len(), 1);
}
