//! Mapping of Jira HTTP failures onto [`SyncError`].

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::SyncError;

/// Error payload returned by the Jira REST API.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraErrorBody {
    #[serde(default)]
    pub error_messages: Vec<String>,
    #[serde(default)]
    pub errors: BTreeMap<String, String>,
}

impl JiraErrorBody {
    /// Flatten the payload into one human-readable line.
    pub fn message(&self) -> Option<String> {
        let mut parts: Vec<String> = self.error_messages.clone();
        parts.extend(
            self.errors
                .iter()
                .map(|(field, message)| format!("{field}: {message}")),
        );
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("; "))
        }
    }
}

/// Build the error for a failed Jira response.
///
/// `key` names the ticket the request targeted, if any, so a 404 becomes
/// [`SyncError::RemoteTicketNotFound`].
pub fn error_from_response(status: reqwest::StatusCode, body: &str, key: Option<&str>) -> SyncError {
    let detail = serde_json::from_str::<JiraErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.message())
        .unwrap_or_else(|| body.trim().chars().take(200).collect());

    match (status.as_u16(), key) {
        (401 | 403, _) => SyncError::Auth(format!(
            "Jira rejected the credentials ({}): {}",
            status.as_u16(),
            detail
        )),
        (404, Some(key)) => SyncError::RemoteTicketNotFound(key.to_string()),
        _ => {
            let status_text = status.canonical_reason().unwrap_or("Unknown");
            SyncError::Api(format!(
                "Jira API error ({} {}): {}",
                status.as_u16(),
                status_text,
                detail
            ))
        }
    }
}
