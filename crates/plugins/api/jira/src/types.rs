//! Jira API response types.
//!
//! These types represent the raw JSON responses from Jira API v2/v3 and the
//! Agile 1.0 API. They are deserialized and then mapped to unified types.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracklens_core::BoardType;

// =============================================================================
// User
// =============================================================================

/// Jira user representation.
#[derive(Debug, Clone, Deserialize)]
pub struct JiraUser {
    /// Account ID (Cloud only)
    #[serde(default, rename = "accountId")]
    pub account_id: Option<String>,
    /// Username (Self-Hosted only)
    #[serde(default)]
    pub name: Option<String>,
    /// Display name
    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,
    /// Email address
    #[serde(default, rename = "emailAddress")]
    pub email_address: Option<String>,
}

// =============================================================================
// Issue
// =============================================================================

/// Jira issue representation.
#[derive(Debug, Clone, Deserialize)]
pub struct JiraIssue {
    /// Issue ID
    #[serde(default)]
    pub id: Option<String>,
    /// Issue key (e.g., "PROJ-123")
    pub key: String,
    /// Issue fields
    #[serde(default)]
    pub fields: JiraIssueFields,
}

/// Jira issue fields. Anything not listed lands in `extra`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JiraIssueFields {
    #[serde(default)]
    pub summary: Option<String>,
    /// Description: plain text (v2) or ADF document (v3)
    #[serde(default)]
    pub description: Option<serde_json::Value>,
    #[serde(default)]
    pub status: Option<JiraStatus>,
    #[serde(default)]
    pub priority: Option<JiraNamed>,
    #[serde(default)]
    pub issuetype: Option<JiraNamed>,
    #[serde(default)]
    pub project: Option<JiraProjectRef>,
    #[serde(default)]
    pub assignee: Option<JiraUser>,
    #[serde(default)]
    pub reporter: Option<JiraUser>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
    /// Custom and other system fields keyed by field id
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Jira issue status.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraStatus {
    pub name: String,
    #[serde(default)]
    pub status_category: Option<JiraStatusCategory>,
}

/// Jira status category.
#[derive(Debug, Clone, Deserialize)]
pub struct JiraStatusCategory {
    /// Category key: "new", "indeterminate", "done"
    pub key: String,
    /// Display name: "To Do", "In Progress", "Done"
    #[serde(default)]
    pub name: Option<String>,
}

/// Any `{ "name": ... }` reference (priority, issue type).
#[derive(Debug, Clone, Deserialize)]
pub struct JiraNamed {
    pub name: String,
}

/// Project reference embedded in an issue.
#[derive(Debug, Clone, Deserialize)]
pub struct JiraProjectRef {
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
}

// =============================================================================
// Search Response
// =============================================================================

/// Search response from Self-Hosted Jira (API v2, GET /search).
#[derive(Debug, Clone, Deserialize)]
pub struct JiraSearchResponse {
    pub issues: Vec<JiraIssue>,
    #[serde(default, rename = "startAt")]
    pub start_at: Option<u32>,
    #[serde(default, rename = "maxResults")]
    pub max_results: Option<u32>,
    #[serde(default)]
    pub total: Option<u32>,
}

/// Search response from Jira Cloud (API v3, GET /search/jql).
#[derive(Debug, Clone, Deserialize)]
pub struct JiraCloudSearchResponse {
    pub issues: Vec<JiraIssue>,
    /// Token for next page
    #[serde(default, rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

// =============================================================================
// Fields and edit metadata
// =============================================================================

/// Entry of GET /field.
#[derive(Debug, Clone, Deserialize)]
pub struct JiraField {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub custom: bool,
    #[serde(default)]
    pub schema: Option<JiraFieldSchema>,
}

/// Field schema as reported by Jira.
#[derive(Debug, Clone, Deserialize)]
pub struct JiraFieldSchema {
    #[serde(default, rename = "type")]
    pub schema_type: Option<String>,
    #[serde(default)]
    pub items: Option<String>,
    #[serde(default)]
    pub custom: Option<String>,
}

/// Response from GET /issue/{key}/editmeta.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JiraEditMeta {
    #[serde(default)]
    pub fields: HashMap<String, JiraEditMetaField>,
}

/// Editable field as seen by editmeta.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraEditMetaField {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub schema: Option<JiraFieldSchema>,
    /// Raw allowed values; labels live in `value` or `name`
    #[serde(default)]
    pub allowed_values: Option<Vec<serde_json::Value>>,
}

// =============================================================================
// Projects
// =============================================================================

/// Entry of GET /project.
#[derive(Debug, Clone, Deserialize)]
pub struct JiraProject {
    #[serde(default)]
    pub id: Option<String>,
    pub key: String,
    pub name: String,
}

// =============================================================================
// Agile
// =============================================================================

/// Paged envelope of the Agile API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgilePage<T> {
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,
    #[serde(default)]
    pub start_at: Option<u64>,
    #[serde(default)]
    pub max_results: Option<u64>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub is_last: Option<bool>,
}

/// Agile board.
#[derive(Debug, Clone, Deserialize)]
pub struct JiraBoard {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub board_type: BoardType,
    #[serde(default)]
    pub location: Option<JiraBoardLocation>,
}

/// Where a board lives.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraBoardLocation {
    #[serde(default)]
    pub project_key: Option<String>,
    #[serde(default)]
    pub project_name: Option<String>,
}

/// Agile sprint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraSprint {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub goal: Option<String>,
}

/// Request body for POST /sprint/{id}/issue.
#[derive(Debug, Clone, Serialize)]
pub struct MoveIssuesPayload {
    pub issues: Vec<String>,
}
