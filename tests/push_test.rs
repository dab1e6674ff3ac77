#[path = "common/mod.rs"]
mod common;

use common::Workspace;
use common::mock_data::{MockRemote, TicketBuilder, task};
use ticketsync::error::SyncError;
use ticketsync::state::StateStore;
use ticketsync::store::{TicketStore, YamlTicketFile};
use ticketsync::sync::{PullOptions, PushOptions, Reconciler, Strategy, TicketSyncStatus, status};
use ticketsync::types::{Task, Ticket};

fn push_options(ws: &Workspace) -> PushOptions {
    PushOptions {
        path: ws.tickets_path(),
        project_key: "APP".to_string(),
    }
}

fn load(ws: &Workspace) -> Vec<Ticket> {
    YamlTicketFile.get_tickets(&ws.tickets_path()).unwrap()
}

#[tokio::test]
async fn test_push_creates_tickets_and_tasks() {
    let ws = Workspace::new();
    let mut child = Task::new("Write migration");
    child
        .custom_fields
        .insert("Component".to_string(), "DB".to_string());
    YamlTicketFile
        .save_tickets(
            &ws.tickets_path(),
            &[TicketBuilder::new("Audit log")
                .field("Component", "API")
                .field("Priority", "High")
                .task(child)
                .build()],
        )
        .unwrap();
    let remote = MockRemote::new();

    let mut state = StateStore::new(ws.state_path());
    let result = Reconciler::new(&remote, &YamlTicketFile, &mut state)
        .push(&push_options(&ws), None)
        .await
        .unwrap();

    assert_eq!(result.created, vec!["APP-100"]);
    assert!(result.failed.is_empty());

    let tickets = load(&ws);
    assert_eq!(tickets[0].jira_id, "APP-100");
    assert_eq!(tickets[0].tasks[0].jira_id, "APP-101");
    // Task keeps only its own fields locally.
    assert_eq!(tickets[0].tasks[0].custom_fields.len(), 1);

    let created = remote.get("APP-100").unwrap();
    let remote_task = &created.tasks[0];
    assert_eq!(remote_task.custom_fields["Component"], "DB");
    assert_eq!(remote_task.custom_fields["Priority"], "High");

    let entries = status(&state, &tickets);
    assert_eq!(entries[0].status, TicketSyncStatus::Clean);
}

#[tokio::test]
async fn test_push_skips_unchanged_tickets() {
    let ws = Workspace::new();
    let remote = MockRemote::with_tickets([
        TicketBuilder::new("Stable").id("APP-1").build(),
        TicketBuilder::new("Edited").id("APP-2").build(),
    ]);
    let mut state = StateStore::new(ws.state_path());
    Reconciler::new(&remote, &YamlTicketFile, &mut state)
        .pull(
            &PullOptions {
                path: ws.tickets_path(),
                project_key: "APP".to_string(),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();

    let mut tickets = load(&ws);
    tickets[1].description = "Clarified scope".to_string();
    tickets[1].tasks.push(task("APP-3", "Existing subtask"));
    YamlTicketFile
        .save_tickets(&ws.tickets_path(), &tickets)
        .unwrap();
    remote.edit("APP-2", |t| t.tasks.push(task("APP-3", "Existing subtask")));
    remote.clear_calls();

    let result = Reconciler::new(&remote, &YamlTicketFile, &mut state)
        .push(&push_options(&ws), None)
        .await
        .unwrap();

    assert_eq!(result.unchanged, 1);
    assert_eq!(result.updated, vec!["APP-2"]);
    assert_eq!(remote.calls(), vec!["update:APP-2", "update_task:APP-3"]);
    assert_eq!(remote.get("APP-2").unwrap().description, "Clarified scope");
}

#[tokio::test]
async fn test_push_sends_merge_result() {
    let ws = Workspace::new();
    let remote = MockRemote::with_tickets([TicketBuilder::new("Reports").id("APP-1").build()]);
    let pull = PullOptions {
        path: ws.tickets_path(),
        project_key: "APP".to_string(),
        strategy: Some(Strategy::ThreeWay),
        ..Default::default()
    };
    let mut state = StateStore::new(ws.state_path());
    Reconciler::new(&remote, &YamlTicketFile, &mut state)
        .pull(&pull, None)
        .await
        .unwrap();

    YamlTicketFile
        .save_tickets(
            &ws.tickets_path(),
            &[TicketBuilder::new("Reports")
                .id("APP-1")
                .criterion("Exports CSV")
                .build()],
        )
        .unwrap();
    remote.edit("APP-1", |t| t.description = "Monthly numbers".to_string());

    Reconciler::new(&remote, &YamlTicketFile, &mut state)
        .pull(&pull, None)
        .await
        .unwrap();

    let result = Reconciler::new(&remote, &YamlTicketFile, &mut state)
        .push(&push_options(&ws), None)
        .await
        .unwrap();

    assert_eq!(result.updated, vec!["APP-1"]);
    let pushed = remote.get("APP-1").unwrap();
    assert_eq!(pushed.description, "Monthly numbers");
    assert_eq!(pushed.acceptance_criteria, vec!["Exports CSV"]);
}

#[tokio::test]
async fn test_push_failure_does_not_stop_others() {
    let ws = Workspace::new();
    YamlTicketFile
        .save_tickets(
            &ws.tickets_path(),
            &[
                TicketBuilder::new("Rejected").build(),
                TicketBuilder::new("Accepted").build(),
            ],
        )
        .unwrap();
    let remote = MockRemote::new();
    remote.fail_creates_for("Rejected");

    let mut state = StateStore::new(ws.state_path());
    let err = Reconciler::new(&remote, &YamlTicketFile, &mut state)
        .push(&push_options(&ws), None)
        .await
        .unwrap_err();

    assert!(matches!(err.cause, SyncError::PushFailed(1)));
    assert_eq!(err.partial.failed, vec!["Rejected"]);
    assert!(err.partial.errors["Rejected"].contains("cannot create"));
    assert_eq!(err.partial.created, vec!["APP-100"]);

    let tickets = load(&ws);
    assert!(tickets[0].jira_id.is_empty());
    assert_eq!(tickets[1].jira_id, "APP-100");
}

#[tokio::test]
async fn test_push_keeps_ticket_key_when_task_fails() {
    let ws = Workspace::new();
    YamlTicketFile
        .save_tickets(
            &ws.tickets_path(),
            &[TicketBuilder::new("Parent")
                .task(task("APP-77", "Task deleted remotely"))
                .build()],
        )
        .unwrap();
    let remote = MockRemote::new();

    let mut state = StateStore::new(ws.state_path());
    let err = Reconciler::new(&remote, &YamlTicketFile, &mut state)
        .push(&push_options(&ws), None)
        .await
        .unwrap_err();

    assert_eq!(err.partial.failed, vec!["APP-100"]);
    assert_eq!(load(&ws)[0].jira_id, "APP-100");
    assert!(state.get_stored_state("APP-100").is_none());
}
