//! Jira REST (v2) client.
//!
//! # Security Note - Logging
//!
//! The API token is held in a [`SecretBox`] and only exposed when building
//! the basic-auth header. Do not enable `RUST_LOG=reqwest=debug` in
//! production; request logging may still include other request details.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretBox};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use url::Url;

use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::types::{PARENT_FIELD, Task, Ticket};

use super::error::error_from_response;
use super::{RemoteClient, query};

const PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    start_at: usize,
    #[serde(default)]
    total: usize,
    #[serde(default)]
    issues: Vec<JiraIssue>,
}

#[derive(Debug, Deserialize)]
struct JiraIssue {
    key: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl JiraIssue {
    fn is_subtask(&self) -> bool {
        self.fields
            .get("issuetype")
            .and_then(|t| t.get("subtask"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

#[derive(Debug, Deserialize)]
struct CreatedIssue {
    key: String,
}

/// Jira Cloud / Server client
pub struct JiraClient {
    client: Client,
    base_url: Url,
    email: String,
    api_token: SecretBox<String>,
    issue_type: String,
    subtask_type: String,
    acceptance_criteria_field: Option<String>,
    /// Local custom field name -> Jira field ID
    field_ids: HashMap<String, String>,
}

impl JiraClient {
    /// Create a new Jira client from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let url = config.jira.url.as_deref().ok_or_else(|| {
            SyncError::Config("Jira URL not configured. Set `jira.url` in .ticketsync/config.yaml".to_string())
        })?;
        let email = config.jira.email.clone().ok_or_else(|| {
            SyncError::Config("Jira email not configured. Set `jira.email` in .ticketsync/config.yaml".to_string())
        })?;
        let api_token = config.jira_api_token().ok_or_else(|| {
            SyncError::Auth(
                "Jira API token not configured. Set JIRA_API_TOKEN environment variable or `jira.api_token` in config".to_string(),
            )
        })?;

        let base_url = Url::parse(url)
            .map_err(|e| SyncError::Config(format!("invalid Jira URL '{url}': {e}")))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.remote_timeout.max(1)))
            .connect_timeout(Duration::from_secs(config.remote_timeout.clamp(1, 30)))
            .build()?;

        Ok(Self {
            client,
            base_url,
            email,
            api_token: SecretBox::new(Box::new(api_token)),
            issue_type: config.jira.issue_type.clone(),
            subtask_type: config.jira.subtask_type.clone(),
            acceptance_criteria_field: config.jira.acceptance_criteria_field.clone(),
            field_ids: config.jira.fields.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| SyncError::Config(format!("invalid Jira endpoint '{path}': {e}")))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .basic_auth(&self.email, Some(self.api_token.expose_secret()))
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn send(&self, request: RequestBuilder, key: Option<&str>) -> Result<reqwest::Response> {
        let response = self.authorized(request).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(error_from_response(status, &body, key))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        key: Option<&str>,
    ) -> Result<T> {
        let response = self.send(request, key).await?;
        Ok(response.json().await?)
    }

    async fn search_all(&self, jql: &str) -> Result<Vec<JiraIssue>> {
        let url = self.endpoint("rest/api/2/search")?;
        let mut issues = Vec::new();

        loop {
            let request = self.client.get(url.clone()).query(&[
                ("jql", jql.to_string()),
                ("startAt", issues.len().to_string()),
                ("maxResults", PAGE_SIZE.to_string()),
                ("fields", "*all".to_string()),
            ]);
            let page: SearchResponse = self.send_json(request, None).await?;
            let fetched = page.issues.len();
            tracing::debug!(
                "jira search page at {} returned {} of {} issues",
                page.start_at,
                fetched,
                page.total
            );
            issues.extend(page.issues);

            if fetched == 0 || issues.len() >= page.total {
                break;
            }
        }

        Ok(issues)
    }

    /// Convert a raw field value into the flat string used locally.
    fn value_to_string(value: &Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Array(items) => {
                let parts: Vec<String> = items.iter().filter_map(Self::value_to_string).collect();
                Some(parts.join(", "))
            }
            Value::Object(obj) => ["value", "name", "key", "displayName"]
                .iter()
                .find_map(|k| obj.get(*k).and_then(Value::as_str))
                .map(str::to_string)
                .or_else(|| Some(value.to_string())),
        }
    }

    fn text_field(fields: &Map<String, Value>, name: &str) -> String {
        fields
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    fn read_common(&self, fields: &Map<String, Value>) -> (String, String, Vec<String>, HashMap<String, String>) {
        let title = Self::text_field(fields, "summary");
        let description = Self::text_field(fields, "description");

        let acceptance_criteria = self
            .acceptance_criteria_field
            .as_ref()
            .and_then(|id| fields.get(id))
            .and_then(Self::value_to_string)
            .map(|text| {
                text.lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(|line| line.trim_start_matches(['-', '*']).trim().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let mut custom_fields = HashMap::new();
        for (name, id) in &self.field_ids {
            if let Some(value) = fields.get(id).and_then(Self::value_to_string) {
                custom_fields.insert(name.clone(), value);
            }
        }
        if let Some(parent) = fields
            .get("parent")
            .and_then(|p| p.get("key"))
            .and_then(Value::as_str)
        {
            custom_fields.insert(PARENT_FIELD.to_string(), parent.to_string());
        }

        (title, description, acceptance_criteria, custom_fields)
    }

    fn issue_to_task(&self, issue: &JiraIssue) -> Task {
        let (title, description, acceptance_criteria, mut custom_fields) =
            self.read_common(&issue.fields);
        // The parent link is implied by ownership.
        custom_fields.remove(PARENT_FIELD);
        Task {
            title,
            description,
            custom_fields,
            acceptance_criteria,
            jira_id: issue.key.clone(),
            source_line: 0,
        }
    }

    fn issue_to_ticket(&self, issue: &JiraIssue, tasks: Vec<Task>) -> Ticket {
        let (title, description, acceptance_criteria, custom_fields) =
            self.read_common(&issue.fields);
        Ticket {
            title,
            description,
            custom_fields,
            acceptance_criteria,
            jira_id: issue.key.clone(),
            tasks,
            source_line: 0,
        }
    }

    /// Build the `fields` payload for create/update requests.
    ///
    /// Every custom field needs a configured Jira field ID, otherwise the
    /// request fails with [`SyncError::UnmappedField`]. With `clear_absent`,
    /// mapped fields (and the parent link) missing from `custom_fields` are
    /// sent as `null` so an update removes them remotely.
    fn build_fields(
        &self,
        title: &str,
        description: &str,
        acceptance_criteria: &[String],
        custom_fields: &HashMap<String, String>,
        clear_absent: bool,
    ) -> Result<Map<String, Value>> {
        let mut fields = Map::new();
        fields.insert("summary".to_string(), json!(title));
        fields.insert("description".to_string(), json!(description));

        if let Some(id) = &self.acceptance_criteria_field {
            fields.insert(id.clone(), json!(acceptance_criteria.join("\n")));
        }

        for (name, value) in custom_fields {
            if name == PARENT_FIELD {
                if !value.is_empty() {
                    fields.insert("parent".to_string(), json!({ "key": value }));
                }
                continue;
            }
            let id = self
                .field_ids
                .get(name)
                .ok_or_else(|| SyncError::UnmappedField(name.clone()))?;
            fields.insert(id.clone(), json!(value));
        }

        if clear_absent {
            for (name, id) in &self.field_ids {
                if !custom_fields.contains_key(name) {
                    fields.insert(id.clone(), Value::Null);
                }
            }
            if custom_fields.get(PARENT_FIELD).is_none_or(|p| p.is_empty()) {
                fields.insert("parent".to_string(), Value::Null);
            }
        }

        Ok(fields)
    }

    async fn update_issue(&self, key: &str, fields: Map<String, Value>) -> Result<()> {
        let url = self.endpoint(&format!("rest/api/2/issue/{key}"))?;
        let request = self.client.put(url).json(&json!({ "fields": fields }));
        self.send(request, Some(key)).await?;
        Ok(())
    }

    async fn create_issue(&self, fields: Map<String, Value>) -> Result<String> {
        let url = self.endpoint("rest/api/2/issue")?;
        let request = self.client.post(url).json(&json!({ "fields": fields }));
        let created: CreatedIssue = self.send_json(request, None).await?;
        Ok(created.key)
    }
}

impl RemoteClient for JiraClient {
    async fn authenticate(&self) -> Result<()> {
        let url = self.endpoint("rest/api/2/myself")?;
        self.send(self.client.get(url), None).await?;
        tracing::debug!("authenticated against {}", self.base_url);
        Ok(())
    }

    async fn search_tickets(&self, project_key: &str, jql: &str) -> Result<Vec<Ticket>> {
        let jql = if jql.trim().is_empty() {
            query::pull_query(project_key, None, None)
        } else {
            jql.to_string()
        };

        let issues = self.search_all(&jql).await?;
        let mut tickets = Vec::with_capacity(issues.len());
        // Sub-tasks are returned under their parent only.
        for issue in issues.iter().filter(|issue| !issue.is_subtask()) {
            let has_subtasks = issue
                .fields
                .get("subtasks")
                .and_then(Value::as_array)
                .is_some_and(|subtasks| !subtasks.is_empty());

            let tasks = if has_subtasks {
                self.search_all(&query::children_of(&issue.key))
                    .await?
                    .iter()
                    .map(|sub| self.issue_to_task(sub))
                    .collect()
            } else {
                Vec::new()
            };
            tickets.push(self.issue_to_ticket(issue, tasks));
        }

        Ok(tickets)
    }

    async fn create_ticket(&self, project_key: &str, ticket: &Ticket) -> Result<String> {
        let mut fields = self.build_fields(
            &ticket.title,
            &ticket.description,
            &ticket.acceptance_criteria,
            &ticket.custom_fields,
            false,
        )?;
        fields.insert("project".to_string(), json!({ "key": project_key }));
        fields.insert("issuetype".to_string(), json!({ "name": self.issue_type }));
        self.create_issue(fields).await
    }

    async fn update_ticket(&self, ticket: &Ticket) -> Result<()> {
        let fields = self.build_fields(
            &ticket.title,
            &ticket.description,
            &ticket.acceptance_criteria,
            &ticket.custom_fields,
            true,
        )?;
        self.update_issue(&ticket.jira_id, fields).await
    }

    async fn create_task(&self, project_key: &str, parent_id: &str, task: &Task) -> Result<String> {
        let mut fields = self.build_fields(
            &task.title,
            &task.description,
            &task.acceptance_criteria,
            &task.custom_fields,
            false,
        )?;
        fields.insert("project".to_string(), json!({ "key": project_key }));
        fields.insert("issuetype".to_string(), json!({ "name": self.subtask_type }));
        fields.insert("parent".to_string(), json!({ "key": parent_id }));
        self.create_issue(fields).await
    }

    async fn update_task(&self, task: &Task) -> Result<()> {
        let mut fields = self.build_fields(
            &task.title,
            &task.description,
            &task.acceptance_criteria,
            &task.custom_fields,
            true,
        )?;
        // Sub-tasks cannot be re-parented through a field update.
        fields.remove("parent");
        self.update_issue(&task.jira_id, fields).await
    }
}
