//! JQL construction.
//!
//! Values are always quoted; ticket keys reaching these helpers have
//! already passed [`crate::types::validate_ticket_id`] where they come from
//! user input.

/// Quote a value as a JQL string literal.
pub fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Query matching exactly one ticket by key.
pub fn exact_key(id: &str) -> String {
    format!("key = {}", quote(id))
}

/// Query matching the direct children of `parent_id`.
pub fn children_of(parent_id: &str) -> String {
    format!("parent = {}", quote(parent_id))
}

/// Build the query used to fetch tickets for a pull.
///
/// Each part is optional; present parts are joined with `AND`. A free-form
/// filter is wrapped in parentheses so its own `OR`s stay scoped.
pub fn pull_query(project_key: &str, filter: Option<&str>, parent: Option<&str>) -> String {
    let mut clauses = Vec::new();

    if !project_key.is_empty() {
        clauses.push(format!("project = {}", quote(project_key)));
    }
    if let Some(filter) = filter.map(str::trim).filter(|f| !f.is_empty()) {
        clauses.push(format!("({filter})"));
    }
    if let Some(parent) = parent.map(str::trim).filter(|p| !p.is_empty()) {
        clauses.push(children_of(parent));
    }

    clauses.join(" AND ")
}
