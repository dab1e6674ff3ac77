use std::collections::HashMap;
use std::path::PathBuf;

use serde::Serialize;
use tracing::Instrument;

use crate::error::{Incomplete, Outcome, SyncError};
use crate::remote::{RemoteClient, query};
use crate::state::{TicketState, calculate_hash};
use crate::store::{TicketStore, get_tickets_or_empty};
use crate::types::Ticket;

use super::{Progress, Reconciler, Strategy, report};

/// Parameters for one pull run.
#[derive(Debug, Clone, Default)]
pub struct PullOptions {
    /// Local ticket file to reconcile
    pub path: PathBuf,
    pub project_key: String,
    /// Extra query clause ANDed onto the project filter
    pub filter: Option<String>,
    /// Restrict to children of this parent/epic
    pub parent: Option<String>,
    /// Take remote content for tickets changed on both sides
    pub force: bool,
    /// Resolve both-sides conflicts with this policy instead of keeping local
    pub strategy: Option<Strategy>,
}

/// Aggregate counts for a pull.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PullResult {
    /// Remote tickets with no local counterpart
    pub pulled: usize,
    /// Local tickets overwritten or merged with remote content
    pub updated: usize,
    /// Local tickets left as they were
    pub skipped: usize,
    /// Local tickets not present in the remote result set
    pub local_only: usize,
    /// Tickets changed on both sides since the last sync
    pub conflicts: Vec<String>,
}

enum Classification {
    Unchanged,
    LocalChanged,
    RemoteChanged,
    BothChanged,
}

fn classify(stored: &TicketState, local_hash: &str, remote_hash: &str) -> Classification {
    let local_changed = local_hash != stored.local_hash;
    let remote_changed = remote_hash != stored.remote_hash;
    match (local_changed, remote_changed) {
        (true, true) => Classification::BothChanged,
        (false, true) => Classification::RemoteChanged,
        (true, false) => Classification::LocalChanged,
        (false, false) => Classification::Unchanged,
    }
}

impl<R: RemoteClient, S: TicketStore> Reconciler<'_, R, S> {
    /// Merge the remote result set into the local ticket file.
    ///
    /// Conflicting tickets keep their local content unless `force` is set,
    /// and are reported through [`SyncError::ConflictsDetected`] together
    /// with the counts. With a strategy selected, conflicts go through the
    /// policy first and only unresolvable ones are reported.
    pub async fn pull(
        &mut self,
        options: &PullOptions,
        progress: Option<Progress<'_>>,
    ) -> Outcome<PullResult> {
        let span = tracing::info_span!("pull", project = %options.project_key);
        self.run_pull(options, progress).instrument(span).await
    }

    async fn run_pull(
        &mut self,
        options: &PullOptions,
        mut progress: Option<Progress<'_>>,
    ) -> Outcome<PullResult> {
        self.state.load()?;

        let jql = query::pull_query(
            &options.project_key,
            options.filter.as_deref(),
            options.parent.as_deref(),
        );
        report(&mut progress, 0, 0, "Querying remote tickets");
        tracing::debug!("pull query: {jql}");
        let remote_tickets = self
            .remote
            .search_tickets(&options.project_key, &jql)
            .await?;

        let local_tickets = get_tickets_or_empty(self.local, &options.path)?;

        let mut result = PullResult::default();
        let mut merged: Vec<Ticket> = Vec::with_capacity(remote_tickets.len() + local_tickets.len());
        let mut unresolved: Vec<SyncError> = Vec::new();

        // Slots keep file order for whatever the remote side never claims.
        let mut slots: Vec<Option<Ticket>> = local_tickets.into_iter().map(Some).collect();
        let mut local_by_id: HashMap<String, usize> = HashMap::new();
        for (index, slot) in slots.iter().enumerate() {
            if let Some(ticket) = slot
                && ticket.is_linked()
            {
                local_by_id.entry(ticket.jira_id.clone()).or_insert(index);
            }
        }

        let total = remote_tickets.len();
        for (index, remote) in remote_tickets.into_iter().enumerate() {
            report(
                &mut progress,
                index + 1,
                total,
                &format!("Processing {}", remote.jira_id),
            );
            let remote_hash = calculate_hash(&remote);

            let counterpart = local_by_id
                .remove(&remote.jira_id)
                .and_then(|index| slots[index].take());
            let Some(local) = counterpart else {
                tracing::debug!("{}: new remote ticket", remote.jira_id);
                self.state.update_hash(&remote);
                merged.push(remote);
                result.pulled += 1;
                continue;
            };

            let local_hash = calculate_hash(&local);
            let Some(stored) = self.state.get_stored_state(&remote.jira_id).cloned() else {
                tracing::debug!("{}: first sync, taking remote", remote.jira_id);
                self.state.update_hash(&remote);
                merged.push(remote);
                result.updated += 1;
                continue;
            };

            match classify(&stored, &local_hash, &remote_hash) {
                Classification::BothChanged => {
                    tracing::info!("{}: changed on both sides", remote.jira_id);
                    if options.force {
                        result.conflicts.push(remote.jira_id.clone());
                        self.state.update_hash(&remote);
                        merged.push(remote);
                        result.updated += 1;
                        continue;
                    }

                    let Some(strategy) = options.strategy else {
                        result.conflicts.push(remote.jira_id.clone());
                        merged.push(local);
                        result.skipped += 1;
                        continue;
                    };

                    match strategy.resolver().resolve_conflict(&local, &remote) {
                        Ok(resolved) => {
                            let resolved_hash = calculate_hash(&resolved);
                            // The remote side is recorded as seen; a resolution
                            // that differs from it is left for the next push.
                            self.state.set_stored_state(
                                remote.jira_id.clone(),
                                TicketState::new(resolved_hash.clone(), remote_hash),
                            );
                            if resolved_hash == local_hash {
                                result.skipped += 1;
                            } else {
                                result.updated += 1;
                            }
                            tracing::debug!("{}: resolved with {}", remote.jira_id, strategy);
                            merged.push(resolved);
                        }
                        Err(e) => {
                            tracing::warn!("{}: {}", remote.jira_id, e);
                            result.conflicts.push(remote.jira_id.clone());
                            unresolved.push(e);
                            merged.push(local);
                            result.skipped += 1;
                        }
                    }
                }
                Classification::RemoteChanged => {
                    self.state.set_stored_state(
                        remote.jira_id.clone(),
                        TicketState::new(remote_hash.clone(), remote_hash),
                    );
                    merged.push(remote);
                    result.updated += 1;
                }
                Classification::LocalChanged => {
                    self.state.update_local_hash(&local);
                    merged.push(local);
                    result.skipped += 1;
                }
                Classification::Unchanged => {
                    merged.push(local);
                    result.skipped += 1;
                }
            }
        }

        // Local tickets the remote query did not return, in file order.
        let leftovers: Vec<Ticket> = slots.into_iter().flatten().collect();
        result.local_only = leftovers.len();
        merged.extend(leftovers);

        if let Err(e) = self.local.save_tickets(&options.path, &merged) {
            return Err(Incomplete::new(result, e));
        }
        if let Err(e) = self.state.save() {
            return Err(Incomplete::new(result, e));
        }

        tracing::info!(
            "pull finished: {} pulled, {} updated, {} skipped, {} conflicts",
            result.pulled,
            result.updated,
            result.skipped,
            result.conflicts.len()
        );

        if options.force || result.conflicts.is_empty() {
            return Ok(result);
        }

        let cause = if unresolved.len() == 1 && result.conflicts.len() == 1 {
            unresolved.remove(0)
        } else {
            SyncError::ConflictsDetected(result.conflicts.clone())
        };
        Err(Incomplete::new(result, cause))
    }
}
