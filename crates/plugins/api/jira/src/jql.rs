//! JQL synthesis from structured search criteria.
//!
//! Every filter contributes one condition; conditions are AND-joined and
//! followed by an `ORDER BY` clause. Free status, priority and issue type
//! text is expanded through fixed synonym tables so that "urgent" finds
//! tickets whether the instance calls it Highest, Critical or Urgent.

use tracklens_core::SearchCriteria;

/// Condition used when no filter is set, keeping the query bounded.
const DEFAULT_CONDITION: &str = "updated >= -7d";

/// Build the JQL string for the given criteria.
///
/// The result limit is not part of the query; callers pass
/// [`SearchCriteria::effective_limit`] as `maxResults`.
pub fn build_jql(criteria: &SearchCriteria) -> String {
    let mut conditions: Vec<String> = Vec::new();

    if let Some(project) = non_blank(&criteria.project) {
        conditions.push(project_condition(project));
    }
    if let Some(assignee) = non_blank(&criteria.assignee) {
        conditions.push(user_condition("assignee", assignee));
    }
    if let Some(reporter) = non_blank(&criteria.reporter) {
        conditions.push(user_condition("reporter", reporter));
    }
    if let Some(category) = criteria.status_category {
        conditions.push(format!(
            "statusCategory = \"{}\"",
            category.as_query_value()
        ));
    }
    if let Some(status) = non_blank(&criteria.status) {
        conditions.push(synonym_condition("status", status, status_synonyms));
    }
    if let Some(priority) = non_blank(&criteria.priority) {
        conditions.push(synonym_condition("priority", priority, priority_synonyms));
    }
    if let Some(issue_type) = non_blank(&criteria.issue_type) {
        conditions.push(synonym_condition("issuetype", issue_type, issue_type_synonyms));
    }
    if let Some(labels) = labels_condition(&criteria.labels, criteria.labels_match_all) {
        conditions.push(labels);
    }

    match criteria.recent_days {
        Some(days) => conditions.push(format!("updated >= -{}d", days)),
        None => {
            if let Some(since) = non_blank(&criteria.updated_since) {
                conditions.push(format!("updated >= {}", date_literal(since)));
            }
            if let Some(before) = non_blank(&criteria.updated_before) {
                conditions.push(format!("updated <= {}", date_literal(before)));
            }
        }
    }
    if let Some(since) = non_blank(&criteria.created_since) {
        conditions.push(format!("created >= {}", date_literal(since)));
    }
    if let Some(before) = non_blank(&criteria.created_before) {
        conditions.push(format!("created <= {}", date_literal(before)));
    }

    if let Some(text) = non_blank(&criteria.text) {
        conditions.push(text_condition(text));
    }

    if conditions.is_empty() {
        conditions.push(DEFAULT_CONDITION.to_string());
    }

    format!(
        "{} ORDER BY {}",
        conditions.join(" AND "),
        criteria.effective_order_by()
    )
}

/// Whether a project token is treated as a fuzzy name/key rather than an
/// exact key.
///
/// Short tokens and tokens with whitespace are fuzzy. The rule is kept for
/// compatibility with existing callers and is a candidate for revisiting.
pub fn is_fuzzy_project(token: &str) -> bool {
    let token = token.trim();
    token.chars().count() < 3 || token.chars().any(char::is_whitespace)
}

/// Escape a value for use inside a double-quoted JQL string.
pub fn escape_jql_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn quoted(value: &str) -> String {
    format!("\"{}\"", escape_jql_string(value))
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn project_condition(project: &str) -> String {
    if !is_fuzzy_project(project) {
        return format!("project = {}", quoted(project));
    }

    let upper = project.to_uppercase();
    if upper == project {
        format!("project = {}", quoted(project))
    } else {
        format!(
            "(project = {} OR project = {})",
            quoted(project),
            quoted(&upper)
        )
    }
}

fn user_condition(field: &str, value: &str) -> String {
    if value.contains('@') {
        return format!("{} = {}", field, quoted(value));
    }

    match value.to_lowercase().as_str() {
        "me" | "currentuser" | "currentuser()" => format!("{} = currentUser()", field),
        "unassigned" | "none" => format!("{} is EMPTY", field),
        _ => format!(
            "({field} in ({value}) OR {field} ~ {value})",
            field = field,
            value = quoted(value)
        ),
    }
}

fn synonym_condition(
    field: &str,
    value: &str,
    table: fn(&str) -> Option<&'static [&'static str]>,
) -> String {
    match table(&value.to_lowercase()) {
        Some(synonyms) => {
            let alternatives: Vec<String> = synonyms
                .iter()
                .map(|s| format!("{} = {}", field, quoted(s)))
                .collect();
            format!("({})", alternatives.join(" OR "))
        }
        None => format!("{} = {}", field, quoted(value)),
    }
}

fn labels_condition(labels: &[String], match_all: bool) -> Option<String> {
    let parts: Vec<String> = labels
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(|l| format!("labels = {}", quoted(l)))
        .collect();
    if parts.is_empty() {
        return None;
    }

    let joiner = if match_all { " AND " } else { " OR " };
    Some(format!("({})", parts.join(joiner)))
}

fn text_condition(text: &str) -> String {
    let groups: Vec<String> = text
        .split_whitespace()
        .map(|token| {
            let token = quoted(token);
            format!(
                "(summary ~ {token} OR description ~ {token} OR comment ~ {token})",
                token = token
            )
        })
        .collect();

    if groups.len() == 1 {
        groups.concat()
    } else {
        format!("({})", groups.join(" AND "))
    }
}

/// Relative offsets such as `-14d` stay bare; anything else is quoted.
fn date_literal(value: &str) -> String {
    if is_relative_offset(value) {
        value.to_string()
    } else {
        quoted(value)
    }
}

fn is_relative_offset(value: &str) -> bool {
    let body = value.strip_prefix(|c: char| c == '-' || c == '+').unwrap_or(value);
    match body.char_indices().last() {
        Some((idx, unit)) if matches!(unit, 'm' | 'h' | 'd' | 'w') && idx > 0 => {
            body[..idx].chars().all(|c| c.is_ascii_digit())
        }
        _ => false,
    }
}

// =============================================================================
// Synonym tables
// =============================================================================

fn priority_synonyms(value: &str) -> Option<&'static [&'static str]> {
    match value {
        "urgent" => Some(&["High", "Highest", "Critical", "Urgent"]),
        "critical" => Some(&["Highest", "Critical", "Blocker"]),
        "high" => Some(&["High", "Highest"]),
        "medium" | "normal" => Some(&["Medium", "Normal"]),
        "low" => Some(&["Low", "Lowest", "Minor"]),
        "trivial" => Some(&["Lowest", "Trivial"]),
        _ => None,
    }
}

fn status_synonyms(value: &str) -> Option<&'static [&'static str]> {
    match value {
        "open" => Some(&["Open", "To Do", "New", "Backlog"]),
        "in progress" | "in_progress" | "wip" => {
            Some(&["In Progress", "In Development", "In Review"])
        }
        "done" | "closed" => Some(&["Done", "Closed", "Resolved"]),
        "review" => Some(&["In Review", "Code Review", "Review"]),
        "blocked" => Some(&["Blocked", "On Hold"]),
        _ => None,
    }
}

fn issue_type_synonyms(value: &str) -> Option<&'static [&'static str]> {
    match value {
        "bug" | "defect" => Some(&["Bug", "Defect"]),
        "story" => Some(&["Story", "User Story"]),
        "task" => Some(&["Task", "Sub-task"]),
        "epic" => Some(&["Epic"]),
        _ => None,
    }
}
