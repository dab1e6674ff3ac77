use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use tracing::Instrument;

use crate::error::{Incomplete, Outcome, Result, SyncError};
use crate::remote::RemoteClient;
use crate::store::{TicketStore, get_tickets_or_empty};
use crate::types::Ticket;

use super::status::ticket_status;
use super::{Progress, Reconciler, report};

/// Parameters for one push run.
#[derive(Debug, Clone, Default)]
pub struct PushOptions {
    /// Local ticket file to push
    pub path: PathBuf,
    /// Project new tickets are created in
    pub project_key: String,
}

/// What a push did, per ticket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PushResult {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub unchanged: usize,
    pub failed: Vec<String>,
    /// Ticket key (or title, for tickets never created) -> error message
    pub errors: BTreeMap<String, String>,
}

impl<R: RemoteClient, S: TicketStore> Reconciler<'_, R, S> {
    /// Send local edits to the remote system.
    ///
    /// Tickets without a key are created; linked tickets are updated only
    /// when they differ from the last recorded sync point. One ticket
    /// failing never stops the others. Newly assigned keys are written back
    /// to the local file even when some tickets fail.
    pub async fn push(
        &mut self,
        options: &PushOptions,
        progress: Option<Progress<'_>>,
    ) -> Outcome<PushResult> {
        let span = tracing::info_span!("push", project = %options.project_key);
        self.run_push(options, progress).instrument(span).await
    }

    async fn run_push(
        &mut self,
        options: &PushOptions,
        mut progress: Option<Progress<'_>>,
    ) -> Outcome<PushResult> {
        self.state.load()?;
        let mut tickets = get_tickets_or_empty(self.local, &options.path)?;
        let mut result = PushResult::default();

        let total = tickets.len();
        for (index, ticket) in tickets.iter_mut().enumerate() {
            report(
                &mut progress,
                index + 1,
                total,
                &format!("Pushing {}", ticket.label()),
            );

            if !ticket_status(self.state, ticket).needs_push() {
                result.unchanged += 1;
                continue;
            }

            let created = !ticket.is_linked();
            match self.push_ticket(&options.project_key, ticket).await {
                Ok(()) => {
                    self.state.update_hash(ticket);
                    if created {
                        tracing::info!("created {} for '{}'", ticket.jira_id, ticket.title);
                        result.created.push(ticket.jira_id.clone());
                    } else {
                        tracing::debug!("updated {}", ticket.jira_id);
                        result.updated.push(ticket.jira_id.clone());
                    }
                }
                Err(e) => {
                    let label = ticket.label().to_string();
                    tracing::warn!("push failed for {label}: {e}");
                    result.errors.insert(label.clone(), e.to_string());
                    result.failed.push(label);
                }
            }
        }

        if let Err(e) = self.local.save_tickets(&options.path, &tickets) {
            return Err(Incomplete::new(result, e));
        }
        if let Err(e) = self.state.save() {
            return Err(Incomplete::new(result, e));
        }

        if result.failed.is_empty() {
            Ok(result)
        } else {
            let failed = result.failed.len();
            Err(Incomplete::new(result, SyncError::PushFailed(failed)))
        }
    }

    /// Create or update one ticket and its tasks.
    ///
    /// Keys assigned along the way are stored on `ticket` immediately, so a
    /// failure part-way through never causes duplicates on the next push.
    async fn push_ticket(&self, project_key: &str, ticket: &mut Ticket) -> Result<()> {
        if ticket.is_linked() {
            self.remote.update_ticket(ticket).await?;
        } else {
            ticket.jira_id = self.remote.create_ticket(project_key, ticket).await?;
        }

        for index in 0..ticket.tasks.len() {
            let mut outgoing = ticket.tasks[index].clone();
            outgoing.custom_fields = outgoing.effective_fields(ticket);

            if outgoing.jira_id.is_empty() {
                let key = self
                    .remote
                    .create_task(project_key, &ticket.jira_id, &outgoing)
                    .await?;
                tracing::debug!("created task {key} under {}", ticket.jira_id);
                ticket.tasks[index].jira_id = key;
            } else {
                self.remote.update_task(&outgoing).await?;
            }
        }

        Ok(())
    }
}
