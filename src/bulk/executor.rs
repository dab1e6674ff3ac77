use std::collections::HashMap;

use tracing::Instrument;

use crate::error::{Incomplete, Outcome, Result, SyncError};
use crate::remote::{Capability, RemoteClient, query};
use crate::types::{PARENT_FIELD, Ticket};

use super::{
    BulkOperation, BulkOperationResult, CancelFlag, DELETE_UNSUPPORTED, Mutation,
    ValidatedOperation,
};

/// Per-ticket callback: `(ticket_id, success, error)`.
pub type BulkProgress<'p> = &'p mut (dyn FnMut(&str, bool, Option<&SyncError>) + Send);

/// Applies bulk operations one ticket at a time, in request order.
pub struct BulkExecutor<'a, R> {
    remote: &'a R,
    project_key: String,
}

impl<'a, R: RemoteClient> BulkExecutor<'a, R> {
    pub fn new(remote: &'a R, project_key: impl Into<String>) -> Self {
        Self {
            remote,
            project_key: project_key.into(),
        }
    }

    /// Validate `operation`, then execute it.
    ///
    /// A validation failure is returned before any remote call, paired with
    /// an empty result.
    pub async fn run(
        &self,
        operation: &BulkOperation,
        cancel: &CancelFlag,
        progress: Option<BulkProgress<'_>>,
    ) -> Outcome<BulkOperationResult> {
        let validated = operation.validate()?;
        self.execute(&validated, cancel, progress).await
    }

    /// Execute an already validated operation.
    ///
    /// Each ticket succeeds or fails on its own. When some succeed and some
    /// fail, update and move restore the successful tickets from their
    /// snapshots before reporting [`SyncError::PartialFailure`]. Cancellation
    /// is checked before each ticket and never triggers a rollback.
    pub async fn execute(
        &self,
        operation: &ValidatedOperation,
        cancel: &CancelFlag,
        progress: Option<BulkProgress<'_>>,
    ) -> Outcome<BulkOperationResult> {
        let span = tracing::info_span!(
            "bulk",
            action = %operation.action(),
            tickets = operation.ticket_ids().len()
        );
        async {
            match operation.mutation() {
                Mutation::Delete => self.delete_all(operation, cancel, progress).await,
                _ => self.modify_all(operation, cancel, progress).await,
            }
        }
        .instrument(span)
        .await
    }

    async fn modify_all(
        &self,
        operation: &ValidatedOperation,
        cancel: &CancelFlag,
        mut progress: Option<BulkProgress<'_>>,
    ) -> Outcome<BulkOperationResult> {
        let mut result = BulkOperationResult::default();
        let mut snapshots: HashMap<String, Ticket> = HashMap::new();

        for id in operation.ticket_ids() {
            if cancel.is_cancelled() {
                tracing::info!("cancelled after {} tickets", result.processed());
                return Err(Incomplete::new(result, SyncError::Cancelled));
            }

            match self.modify_one(id, operation.mutation(), &mut snapshots).await {
                Ok(()) => {
                    tracing::debug!("{id}: {} applied", operation.action());
                    result.record_success(id);
                    notify(&mut progress, id, None);
                }
                Err(e) => {
                    tracing::warn!("{id}: {e}");
                    result.record_failure(id, e.to_string());
                    notify(&mut progress, id, Some(&e));
                }
            }
        }

        if result.success_count > 0 && result.failure_count > 0 {
            self.rollback(&mut result, &snapshots).await;
        }
        finish(result)
    }

    async fn modify_one(
        &self,
        id: &str,
        mutation: &Mutation,
        snapshots: &mut HashMap<String, Ticket>,
    ) -> Result<()> {
        let mut ticket = self.fetch(id).await?;
        snapshots
            .entry(id.to_string())
            .or_insert_with(|| ticket.clone());

        match mutation {
            Mutation::Fields(fields) => {
                for (field, value) in fields {
                    ticket.custom_fields.insert(field.clone(), value.clone());
                }
            }
            Mutation::Reparent(parent) => {
                ticket
                    .custom_fields
                    .insert(PARENT_FIELD.to_string(), parent.clone());
            }
            Mutation::Delete => return Err(SyncError::Unsupported("delete")),
        }

        self.remote.update_ticket(&ticket).await
    }

    async fn fetch(&self, id: &str) -> Result<Ticket> {
        let tickets = self
            .remote
            .search_tickets(&self.project_key, &query::exact_key(id))
            .await?;
        tickets
            .into_iter()
            .find(|ticket| ticket.jira_id == id)
            .ok_or_else(|| SyncError::RemoteTicketNotFound(id.to_string()))
    }

    /// Best effort: restore every successful ticket from its snapshot.
    async fn rollback(&self, result: &mut BulkOperationResult, snapshots: &HashMap<String, Ticket>) {
        tracing::info!("rolling back {} tickets", result.success_count);
        let mut rolled_back = Vec::new();
        for id in &result.successful_tickets {
            let Some(snapshot) = snapshots.get(id) else {
                continue;
            };
            match self.remote.update_ticket(snapshot).await {
                Ok(()) => rolled_back.push(id.clone()),
                Err(e) => tracing::warn!("{id}: rollback failed: {e}"),
            }
        }
        result.rolled_back = rolled_back;
    }

    async fn delete_all(
        &self,
        operation: &ValidatedOperation,
        cancel: &CancelFlag,
        mut progress: Option<BulkProgress<'_>>,
    ) -> Outcome<BulkOperationResult> {
        let mut result = BulkOperationResult::default();

        if !self.remote.supports(Capability::Delete) {
            let cause = SyncError::Unsupported("delete");
            for id in operation.ticket_ids() {
                result.record_failure(id, DELETE_UNSUPPORTED);
                notify(&mut progress, id, Some(&cause));
            }
            return Err(Incomplete::new(result, cause));
        }

        for id in operation.ticket_ids() {
            if cancel.is_cancelled() {
                tracing::info!("cancelled after {} tickets", result.processed());
                return Err(Incomplete::new(result, SyncError::Cancelled));
            }

            match self.remote.delete_ticket(id).await {
                Ok(()) => {
                    tracing::debug!("{id}: deleted");
                    result.record_success(id);
                    notify(&mut progress, id, None);
                }
                Err(e) => {
                    tracing::warn!("{id}: {e}");
                    result.record_failure(id, e.to_string());
                    notify(&mut progress, id, Some(&e));
                }
            }
        }

        finish(result)
    }
}

fn notify(progress: &mut Option<BulkProgress<'_>>, id: &str, error: Option<&SyncError>) {
    if let Some(callback) = progress.as_deref_mut() {
        callback(id, error.is_none(), error);
    }
}

fn finish(result: BulkOperationResult) -> Outcome<BulkOperationResult> {
    match (result.success_count, result.failure_count) {
        (_, 0) => Ok(result),
        (0, failed) => Err(Incomplete::new(result, SyncError::AllFailed(failed))),
        (succeeded, failed) => Err(Incomplete::new(
            result,
            SyncError::PartialFailure { succeeded, failed },
        )),
    }
}
