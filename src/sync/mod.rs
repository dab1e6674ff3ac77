//! Reconciliation between the local ticket file and the remote system.

pub mod conflict;
pub mod pull;
pub mod push;
pub mod status;

pub use conflict::{ConflictResolver, FieldMerge, LocalWins, RemoteWins, Strategy};
pub use pull::{PullOptions, PullResult};
pub use push::{PushOptions, PushResult};
pub use status::{StatusEntry, TicketSyncStatus, status, ticket_status};

use crate::remote::RemoteClient;
use crate::state::StateStore;
use crate::store::TicketStore;

/// Progress callback: `(current, total, message)`.
pub type Progress<'p> = &'p mut (dyn FnMut(usize, usize, &str) + Send);

/// Runs pulls and pushes for one workspace.
///
/// The state store is borrowed for the lifetime of the reconciler; each run
/// loads it once at the start and saves it once at the end.
pub struct Reconciler<'a, R, S> {
    remote: &'a R,
    local: &'a S,
    state: &'a mut StateStore,
}

impl<'a, R: RemoteClient, S: TicketStore> Reconciler<'a, R, S> {
    pub fn new(remote: &'a R, local: &'a S, state: &'a mut StateStore) -> Self {
        Self {
            remote,
            local,
            state,
        }
    }

    pub fn state(&self) -> &StateStore {
        self.state
    }
}

fn report(progress: &mut Option<Progress<'_>>, current: usize, total: usize, message: &str) {
    if let Some(callback) = progress.as_deref_mut() {
        callback(current, total, message);
    }
}
