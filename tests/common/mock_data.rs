//! In-memory remote client and ticket builders for engine tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use ticketsync::error::{Result, SyncError};
use ticketsync::remote::{Capability, RemoteClient};
use ticketsync::types::{Task, Ticket};

/// Builder for test tickets
pub struct TicketBuilder {
    ticket: Ticket,
}

impl TicketBuilder {
    pub fn new(title: &str) -> Self {
        Self {
            ticket: Ticket::new(title),
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.ticket.jira_id = id.to_string();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.ticket.description = description.to_string();
        self
    }

    pub fn field(mut self, key: &str, value: &str) -> Self {
        self.ticket
            .custom_fields
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn criterion(mut self, criterion: &str) -> Self {
        self.ticket.acceptance_criteria.push(criterion.to_string());
        self
    }

    pub fn task(mut self, task: Task) -> Self {
        self.ticket.tasks.push(task);
        self
    }

    pub fn build(self) -> Ticket {
        self.ticket
    }
}

pub fn task(id: &str, title: &str) -> Task {
    let mut task = Task::new(title);
    task.jira_id = id.to_string();
    task
}

/// When an update for a ticket should fail.
#[derive(Debug, Clone, Copy)]
enum FailOn {
    Always,
    /// Only the nth update attempt (1-based)
    Attempt(usize),
}

#[derive(Default)]
struct MockState {
    tickets: BTreeMap<String, Ticket>,
    failing_updates: HashMap<String, FailOn>,
    failing_creates: Vec<String>,
    failing_search: bool,
    update_attempts: HashMap<String, usize>,
    calls: Vec<String>,
    next_key: usize,
}

/// Remote client backed by a map of tickets, recording every call.
pub struct MockRemote {
    state: Mutex<MockState>,
    supports_delete: bool,
}

impl MockRemote {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                next_key: 100,
                ..Default::default()
            }),
            supports_delete: false,
        }
    }

    pub fn with_tickets(tickets: impl IntoIterator<Item = Ticket>) -> Self {
        let remote = Self::new();
        for ticket in tickets {
            remote.insert(ticket);
        }
        remote
    }

    pub fn with_delete(mut self) -> Self {
        self.supports_delete = true;
        self
    }

    pub fn insert(&self, ticket: Ticket) {
        let mut state = self.state.lock().unwrap();
        state.tickets.insert(ticket.jira_id.clone(), ticket);
    }

    pub fn get(&self, id: &str) -> Option<Ticket> {
        self.state.lock().unwrap().tickets.get(id).cloned()
    }

    /// Edit a ticket in place, as another user would.
    pub fn edit(&self, id: &str, edit: impl FnOnce(&mut Ticket)) {
        let mut state = self.state.lock().unwrap();
        let ticket = state.tickets.get_mut(id).expect("ticket exists in mock");
        edit(ticket);
    }

    pub fn fail_updates_for(&self, id: &str) {
        let mut state = self.state.lock().unwrap();
        state.failing_updates.insert(id.to_string(), FailOn::Always);
    }

    /// Let the first update succeed and fail the rollback that follows.
    pub fn fail_second_update_for(&self, id: &str) {
        let mut state = self.state.lock().unwrap();
        state.failing_updates.insert(id.to_string(), FailOn::Attempt(2));
    }

    pub fn fail_creates_for(&self, title: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_creates
            .push(title.to_string());
    }

    pub fn fail_search(&self) {
        self.state.lock().unwrap().failing_search = true;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn update_calls(&self, id: &str) -> usize {
        let marker = format!("update:{id}");
        self.calls().iter().filter(|call| **call == marker).count()
    }
}

fn exact_key(query: &str) -> Option<&str> {
    query.strip_prefix("key = \"")?.strip_suffix('"')
}

impl RemoteClient for MockRemote {
    async fn authenticate(&self) -> Result<()> {
        Ok(())
    }

    async fn search_tickets(&self, _project_key: &str, query: &str) -> Result<Vec<Ticket>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("search:{query}"));
        if state.failing_search {
            return Err(SyncError::Api("search unavailable".to_string()));
        }
        let tickets = match exact_key(query) {
            Some(id) => state.tickets.get(id).cloned().into_iter().collect(),
            None => state.tickets.values().cloned().collect(),
        };
        Ok(tickets)
    }

    async fn create_ticket(&self, project_key: &str, ticket: &Ticket) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("create:{}", ticket.title));
        if state.failing_creates.contains(&ticket.title) {
            return Err(SyncError::Api(format!("cannot create '{}'", ticket.title)));
        }
        let key = format!("{project_key}-{}", state.next_key);
        state.next_key += 1;
        let mut stored = ticket.clone();
        stored.jira_id = key.clone();
        stored.tasks.clear();
        stored.source_line = 0;
        state.tickets.insert(key.clone(), stored);
        Ok(key)
    }

    async fn update_ticket(&self, ticket: &Ticket) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let id = ticket.jira_id.clone();
        state.calls.push(format!("update:{id}"));
        let attempt = {
            let count = state.update_attempts.entry(id.clone()).or_insert(0);
            *count += 1;
            *count
        };
        match state.failing_updates.get(&id) {
            Some(FailOn::Always) => {
                return Err(SyncError::Api(format!("update rejected for {id}")));
            }
            Some(FailOn::Attempt(n)) if *n == attempt => {
                return Err(SyncError::Api(format!("update rejected for {id}")));
            }
            _ => {}
        }
        let Some(existing) = state.tickets.get_mut(&id) else {
            return Err(SyncError::RemoteTicketNotFound(id));
        };
        let tasks = std::mem::take(&mut existing.tasks);
        *existing = ticket.clone();
        existing.tasks = tasks;
        existing.source_line = 0;
        Ok(())
    }

    async fn create_task(&self, project_key: &str, parent_id: &str, task: &Task) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("create_task:{parent_id}:{}", task.title));
        let key = format!("{project_key}-{}", state.next_key);
        state.next_key += 1;
        let Some(parent) = state.tickets.get_mut(parent_id) else {
            return Err(SyncError::RemoteTicketNotFound(parent_id.to_string()));
        };
        let mut stored = task.clone();
        stored.jira_id = key.clone();
        stored.source_line = 0;
        parent.tasks.push(stored);
        Ok(key)
    }

    async fn update_task(&self, task: &Task) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("update_task:{}", task.jira_id));
        for ticket in state.tickets.values_mut() {
            if let Some(existing) = ticket.tasks.iter_mut().find(|t| t.jira_id == task.jira_id) {
                *existing = task.clone();
                existing.source_line = 0;
                return Ok(());
            }
        }
        Err(SyncError::RemoteTicketNotFound(task.jira_id.clone()))
    }

    fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Delete => self.supports_delete,
        }
    }

    async fn delete_ticket(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("delete:{id}"));
        match state.tickets.remove(id) {
            Some(_) => Ok(()),
            None => Err(SyncError::RemoteTicketNotFound(id.to_string())),
        }
    }
}
