pub mod bulk;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod paths;
pub mod remote;
pub mod state;
pub mod store;
pub mod sync;
pub mod types;
pub mod utils;

pub use bulk::{
    BulkAction, BulkExecutor, BulkOperation, BulkOperationResult, CancelFlag, FieldValue,
    ValidatedOperation,
};
pub use config::Config;
pub use error::{Incomplete, Outcome, Result, SyncError};
pub use remote::{Capability, JiraClient, RemoteClient};
pub use state::{StateStore, TicketState, calculate_hash};
pub use store::{TicketStore, YamlTicketFile};
pub use sync::{
    ConflictResolver, PullOptions, PullResult, PushOptions, PushResult, Reconciler, Strategy,
};
pub use types::{Task, Ticket, is_valid_ticket_id, validate_ticket_id};
