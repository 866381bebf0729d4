//! Common types used across providers.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Default cap on search results.
pub const DEFAULT_SEARCH_LIMIT: u32 = 50;

/// Default ordering for searches.
pub const DEFAULT_ORDER_BY: &str = "updated DESC";

// =============================================================================
// Users
// =============================================================================

/// Represents a user from GitLab or Jira.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

impl User {
    /// Best human-readable label for the user.
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.username)
    }
}

// =============================================================================
// Field catalog
// =============================================================================

/// Value schema kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    String,
    Number,
    Option,
    User,
    Array,
    Date,
    DateTime,
    Sprint,
    EpicLink,
    Other,
}

impl FieldKind {
    /// Classify from Jira's `schema.type` and `schema.custom`.
    pub fn from_schema(schema_type: Option<&str>, custom: Option<&str>) -> Self {
        if let Some(custom) = custom {
            if custom.ends_with(":gh-sprint") {
                return FieldKind::Sprint;
            }
            if custom.ends_with(":gh-epic-link") {
                return FieldKind::EpicLink;
            }
        }
        match schema_type {
            Some("string") => FieldKind::String,
            Some("number") => FieldKind::Number,
            Some("option") => FieldKind::Option,
            Some("user") => FieldKind::User,
            Some("array") => FieldKind::Array,
            Some("date") => FieldKind::Date,
            Some("datetime") => FieldKind::DateTime,
            _ => FieldKind::Other,
        }
    }
}

/// Value schema of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<String>,
}

/// Entry of a field catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field identifier (e.g. "priority", "customfield_10016")
    pub id: String,
    /// Display name (not unique)
    pub name: String,
    pub custom: bool,
    pub schema: FieldSchema,
}

/// One legal value of an option-typed field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllowedValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub value: String,
}

/// Result of a field update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldUpdate {
    pub issue_key: String,
    pub field_id: String,
    pub field_name: String,
    /// Value that was actually written (after resolution)
    pub value: String,
}

// =============================================================================
// Open-ended field values
// =============================================================================

/// Value of a ticket field whose shape is not known up front.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Null,
    Text(String),
    Number(f64),
    Bool(bool),
    List(Vec<String>),
    User {
        account_id: Option<String>,
        display_name: Option<String>,
        email: Option<String>,
    },
    Record(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    /// Convert a raw JSON field payload.
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(*b),
            Value::Number(n) => n.as_f64().map_or(FieldValue::Null, FieldValue::Number),
            Value::String(s) => FieldValue::Text(s.clone()),
            Value::Array(items) => FieldValue::List(items.iter().map(json_label).collect()),
            Value::Object(obj) => {
                if obj.contains_key("accountId") || obj.contains_key("emailAddress") {
                    let text = |key: &str| obj.get(key).and_then(|v| v.as_str()).map(String::from);
                    return FieldValue::User {
                        account_id: text("accountId").or_else(|| text("name")),
                        display_name: text("displayName"),
                        email: text("emailAddress"),
                    };
                }
                if let Some(option) = obj.get("value").and_then(|v| v.as_str()) {
                    return FieldValue::Text(option.to_string());
                }
                FieldValue::Record(
                    obj.iter()
                        .map(|(k, v)| (k.clone(), FieldValue::from_json(v)))
                        .collect(),
                )
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Number(n) if n.fract() == 0.0 => write!(f, "{}", *n as i64),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::List(items) => write!(f, "{}", items.join(", ")),
            FieldValue::User {
                account_id,
                display_name,
                email,
            } => write!(
                f,
                "{}",
                display_name
                    .as_deref()
                    .or(email.as_deref())
                    .or(account_id.as_deref())
                    .unwrap_or("unknown user")
            ),
            FieldValue::Record(map) => {
                let parts: Vec<String> = map
                    .iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(k, v)| format!("{}: {}", k, v))
                    .collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
        }
    }
}

/// Short label for an array element: plain strings, or the first of
/// `name` / `value` / `displayName` / `key` on objects.
fn json_label(value: &serde_json::Value) -> String {
    if let Some(s) = value.as_str() {
        return s.to_string();
    }
    ["name", "value", "displayName", "key"]
        .iter()
        .find_map(|key| value.get(key).and_then(|v| v.as_str()))
        .map(String::from)
        .unwrap_or_else(|| value.to_string())
}

// =============================================================================
// Tickets
// =============================================================================

/// A Jira issue with its well-known fields lifted out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    /// Issue key (e.g. "PROJ-123")
    pub key: String,
    pub summary: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub status_category: Option<String>,
    pub priority: Option<String>,
    pub issue_type: Option<String>,
    pub project_key: Option<String>,
    pub assignee: Option<User>,
    pub reporter: Option<User>,
    pub labels: Vec<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub url: Option<String>,
    /// Remaining non-null fields keyed by field id
    #[serde(default)]
    pub custom_fields: BTreeMap<String, FieldValue>,
}

/// Status category of a Jira status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCategory {
    #[serde(alias = "todo", alias = "to do", alias = "to_do", alias = "new", alias = "open")]
    ToDo,
    #[serde(
        alias = "in progress",
        alias = "in_progress",
        alias = "in-progress",
        alias = "indeterminate"
    )]
    InProgress,
    #[serde(alias = "done", alias = "closed", alias = "resolved")]
    Done,
}

impl StatusCategory {
    /// Category name as used in queries.
    pub fn as_query_value(self) -> &'static str {
        match self {
            StatusCategory::ToDo => "To Do",
            StatusCategory::InProgress => "In Progress",
            StatusCategory::Done => "Done",
        }
    }
}

/// Search request over tickets. Every filter is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchCriteria {
    /// Project key, or a (partial) project name
    pub project: Option<String>,
    pub assignee: Option<String>,
    pub reporter: Option<String>,
    pub status_category: Option<StatusCategory>,
    /// Free status text ("open", "in review", ...)
    pub status: Option<String>,
    /// Free priority text ("urgent", "High", ...)
    pub priority: Option<String>,
    /// Free issue type text ("bug", "Story", ...)
    pub issue_type: Option<String>,
    pub labels: Vec<String>,
    /// Require every label instead of any
    pub labels_match_all: bool,
    /// Shortcut for "updated in the last N days"; overrides updated bounds
    pub recent_days: Option<u32>,
    pub updated_since: Option<String>,
    pub updated_before: Option<String>,
    pub created_since: Option<String>,
    pub created_before: Option<String>,
    /// Free text matched against summary, description and comments
    pub text: Option<String>,
    pub limit: Option<u32>,
    pub order_by: Option<String>,
}

impl SearchCriteria {
    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_SEARCH_LIMIT)
    }

    pub fn effective_order_by(&self) -> &str {
        self.order_by
            .as_deref()
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .unwrap_or(DEFAULT_ORDER_BY)
    }
}

// =============================================================================
// Boards and sprints
// =============================================================================

/// Agile board type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardType {
    Scrum,
    Kanban,
    #[serde(other)]
    Other,
}

impl BoardType {
    pub fn as_str(self) -> &'static str {
        match self {
            BoardType::Scrum => "scrum",
            BoardType::Kanban => "kanban",
            BoardType::Other => "other",
        }
    }
}

impl FromStr for BoardType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "scrum" => Ok(BoardType::Scrum),
            "kanban" => Ok(BoardType::Kanban),
            other => Err(Error::InvalidData(format!(
                "Unknown board type '{}'. Expected scrum or kanban",
                other
            ))),
        }
    }
}

/// Agile board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: u64,
    pub name: String,
    pub board_type: BoardType,
    /// Project the board is located in, when the server reports it
    pub project_key: Option<String>,
}

/// Board lookup request; all parts optional and combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardQuery {
    pub project_key: Option<String>,
    pub board_name: Option<String>,
    pub board_id: Option<u64>,
    /// Parsed case-insensitively; unknown types are rejected
    #[serde(deserialize_with = "requested_board_type")]
    pub board_type: Option<BoardType>,
}

/// Caller-supplied board type. Unlike upstream payloads there is no `Other`
/// fallback, so a typo fails instead of filtering out every board.
fn requested_board_type<'de, D>(deserializer: D) -> Result<Option<BoardType>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    raw.parse().map(Some).map_err(|e| match e {
        Error::InvalidData(message) => serde::de::Error::custom(message),
        other => serde::de::Error::custom(other),
    })
}

/// Sprint lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SprintState {
    Future,
    Active,
    Closed,
}

impl SprintState {
    pub fn as_str(self) -> &'static str {
        match self {
            SprintState::Future => "future",
            SprintState::Active => "active",
            SprintState::Closed => "closed",
        }
    }

    /// Sort rank: active first, then future, then closed.
    pub fn rank(self) -> u8 {
        match self {
            SprintState::Active => 0,
            SprintState::Future => 1,
            SprintState::Closed => 2,
        }
    }
}

impl fmt::Display for SprintState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SprintState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "future" => Ok(SprintState::Future),
            "active" => Ok(SprintState::Active),
            "closed" => Ok(SprintState::Closed),
            other => Err(Error::InvalidData(format!(
                "Unknown sprint state '{}'. Expected future, active or closed",
                other
            ))),
        }
    }
}

/// Sprint of a scrum board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sprint {
    pub id: u64,
    pub name: String,
    pub state: SprintState,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub goal: Option<String>,
}

/// Sprint addressed either by id or by (approximate) name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SprintRef {
    Id(u64),
    Name(String),
}

impl SprintRef {
    /// All-digit input is an id, anything else a name.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<u64>() {
            Ok(id) => SprintRef::Id(id),
            Err(_) => SprintRef::Name(trimmed.to_string()),
        }
    }
}

/// Parse a sprint id that must be numeric.
pub fn parse_sprint_id(raw: &str) -> crate::Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| Error::InvalidSprintId(raw.to_string()))
}

// =============================================================================
// Merge requests and diffs
// =============================================================================

/// Represents a merge request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeRequest {
    /// Key in `mr#<iid>` form
    pub key: String,
    pub iid: u64,
    pub title: String,
    pub description: Option<String>,
    /// opened, closed, merged or draft
    pub state: String,
    pub source_branch: String,
    pub target_branch: String,
    pub author: Option<User>,
    pub assignees: Vec<User>,
    pub reviewers: Vec<User>,
    pub labels: Vec<String>,
    pub draft: bool,
    pub url: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Filter for listing merge requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeRequestFilter {
    /// opened, closed, merged or all
    pub state: Option<String>,
    /// Author username
    pub author: Option<String>,
    pub labels: Vec<String>,
    pub limit: Option<u32>,
}

/// Classification of a diff line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Add,
    Remove,
    Context,
}

/// One line of a hunk with its derived line numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffLine {
    pub kind: LineKind,
    pub old_line: Option<u32>,
    pub new_line: Option<u32>,
    /// Line content without the leading `+`, `-` or space
    pub text: String,
}

/// Contiguous block of a unified diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffHunk {
    /// The full `@@ ... @@` header line
    pub header: String,
    pub old_start: u32,
    pub old_count: u32,
    pub new_start: u32,
    pub new_count: u32,
    pub lines: Vec<DiffLine>,
}

/// Changes to one file in a merge request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDiff {
    pub file_path: String,
    /// Previous path, set only for renames
    pub old_path: Option<String>,
    pub new_file: bool,
    pub deleted_file: bool,
    pub renamed_file: bool,
    pub hunks: Vec<DiffHunk>,
    pub additions: usize,
    pub deletions: usize,
}

/// Side of the diff a line position refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineSide {
    Old,
    New,
}

/// Position of an inline comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodePosition {
    pub file_path: String,
    pub line: u32,
    pub side: LineSide,
}

/// Represents a comment on a merge request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub body: String,
    pub author: Option<User>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub position: Option<CodePosition>,
}

/// Input for adding a merge request comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCommentInput {
    pub body: String,
    /// Inline position; `None` adds a general comment
    #[serde(default)]
    pub position: Option<CodePosition>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_kind_from_schema() {
        assert_eq!(
            FieldKind::from_schema(
                Some("array"),
                Some("com.pyxis.greenhopper.jira:gh-sprint")
            ),
            FieldKind::Sprint
        );
        assert_eq!(
            FieldKind::from_schema(Some("any"), Some("com.pyxis.greenhopper.jira:gh-epic-link")),
            FieldKind::EpicLink
        );
        assert_eq!(FieldKind::from_schema(Some("number"), None), FieldKind::Number);
        assert_eq!(FieldKind::from_schema(Some("priority"), None), FieldKind::Other);
        assert_eq!(FieldKind::from_schema(None, None), FieldKind::Other);
    }

    #[test]
    fn test_field_value_from_json() {
        assert_eq!(FieldValue::from_json(&json!(null)), FieldValue::Null);
        assert_eq!(FieldValue::from_json(&json!(5.0)), FieldValue::Number(5.0));
        assert_eq!(
            FieldValue::from_json(&json!({"self": "x", "id": "1", "value": "Yes"})),
            FieldValue::Text("Yes".to_string())
        );
        assert_eq!(
            FieldValue::from_json(&json!([{"id": 1, "name": "Sprint 1"}, "raw"])),
            FieldValue::List(vec!["Sprint 1".to_string(), "raw".to_string()])
        );
        match FieldValue::from_json(&json!({"accountId": "abc", "displayName": "Ann"})) {
            FieldValue::User {
                account_id,
                display_name,
                ..
            } => {
                assert_eq!(account_id.as_deref(), Some("abc"));
                assert_eq!(display_name.as_deref(), Some("Ann"));
            }
            other => panic!("expected user, got {:?}", other),
        }
        match FieldValue::from_json(&json!({"a": 1, "b": "two"})) {
            FieldValue::Record(map) => assert_eq!(map.len(), 2),
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_field_value_display() {
        assert_eq!(FieldValue::Number(3.0).to_string(), "3");
        assert_eq!(FieldValue::Number(2.5).to_string(), "2.5");
        assert_eq!(
            FieldValue::List(vec!["a".into(), "b".into()]).to_string(),
            "a, b"
        );
    }

    #[test]
    fn test_search_criteria_defaults() {
        let criteria = SearchCriteria::default();
        assert_eq!(criteria.effective_limit(), 50);
        assert_eq!(criteria.effective_order_by(), "updated DESC");

        let criteria = SearchCriteria {
            limit: Some(5),
            order_by: Some("created ASC".to_string()),
            ..Default::default()
        };
        assert_eq!(criteria.effective_limit(), 5);
        assert_eq!(criteria.effective_order_by(), "created ASC");
    }

    #[test]
    fn test_search_criteria_deserialize_status_category_aliases() {
        let criteria: SearchCriteria =
            serde_json::from_value(json!({"status_category": "in progress"})).unwrap();
        assert_eq!(criteria.status_category, Some(StatusCategory::InProgress));

        let criteria: SearchCriteria =
            serde_json::from_value(json!({"status_category": "todo", "labels": ["a"]})).unwrap();
        assert_eq!(criteria.status_category, Some(StatusCategory::ToDo));
        assert_eq!(criteria.labels, vec!["a"]);
        assert!(!criteria.labels_match_all);
    }

    #[test]
    fn test_sprint_state_rank_and_parse() {
        assert!(SprintState::Active.rank() < SprintState::Future.rank());
        assert!(SprintState::Future.rank() < SprintState::Closed.rank());
        assert_eq!("Active".parse::<SprintState>().unwrap(), SprintState::Active);
        assert!("later".parse::<SprintState>().is_err());
    }

    #[test]
    fn test_board_type_deserialize_unknown() {
        let t: BoardType = serde_json::from_value(json!("simple")).unwrap();
        assert_eq!(t, BoardType::Other);
        let t: BoardType = serde_json::from_value(json!("scrum")).unwrap();
        assert_eq!(t, BoardType::Scrum);
    }

    #[test]
    fn test_board_query_type_is_case_insensitive() {
        let query: BoardQuery = serde_json::from_value(json!({"board_type": "Scrum"})).unwrap();
        assert_eq!(query.board_type, Some(BoardType::Scrum));
        let query: BoardQuery = serde_json::from_value(json!({"board_type": "KANBAN"})).unwrap();
        assert_eq!(query.board_type, Some(BoardType::Kanban));
        let query: BoardQuery = serde_json::from_value(json!({"board_type": null})).unwrap();
        assert_eq!(query.board_type, None);
        let query: BoardQuery = serde_json::from_value(json!({})).unwrap();
        assert_eq!(query.board_type, None);

        let err = serde_json::from_value::<BoardQuery>(json!({"board_type": "simple"}))
            .unwrap_err()
            .to_string();
        assert!(err.contains("Unknown board type 'simple'"), "{}", err);
    }

    #[test]
    fn test_parse_sprint_id() {
        assert_eq!(parse_sprint_id(" 42 ").unwrap(), 42);
        assert!(matches!(
            parse_sprint_id("Sprint 4"),
            Err(Error::InvalidSprintId(raw)) if raw == "Sprint 4"
        ));
    }

    #[test]
    fn test_sprint_ref_parse() {
        assert_eq!(SprintRef::parse("17"), SprintRef::Id(17));
        assert_eq!(
            SprintRef::parse(" Sprint 17 "),
            SprintRef::Name("Sprint 17".to_string())
        );
    }

    #[test]
    fn test_user_label() {
        let user = User {
            username: "jdoe".to_string(),
            ..Default::default()
        };
        assert_eq!(user.label(), "jdoe");
    }
}
