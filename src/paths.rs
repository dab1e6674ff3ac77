use std::path::PathBuf;

use crate::types::SYNC_DIR;

/// Returns the root sync directory path.
///
/// Resolution order:
/// 1. `TICKETSYNC_ROOT` environment variable (if set)
/// 2. Current working directory + `.ticketsync`
pub fn sync_root() -> PathBuf {
    if let Ok(root) = std::env::var("TICKETSYNC_ROOT") {
        PathBuf::from(root)
    } else {
        PathBuf::from(SYNC_DIR)
    }
}

/// Returns the path to the configuration file.
pub fn config_path() -> PathBuf {
    sync_root().join("config.yaml")
}

/// Returns the default path of the persisted sync state table.
pub fn state_path() -> PathBuf {
    sync_root().join("state.json")
}
