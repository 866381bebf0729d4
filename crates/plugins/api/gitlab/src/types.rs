//! GitLab API response and request types.
//!
//! Raw JSON shapes of the GitLab REST API v4 merge request endpoints,
//! mapped to unified types by the client.

use serde::{Deserialize, Serialize};

/// GitLab user representation.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabUser {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub public_email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

// =============================================================================
// Merge Request
// =============================================================================

/// GitLab merge request representation.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabMergeRequest {
    pub iid: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub state: String,
    pub source_branch: String,
    pub target_branch: String,
    #[serde(default)]
    pub author: Option<GitLabUser>,
    #[serde(default)]
    pub assignees: Vec<GitLabUser>,
    #[serde(default)]
    pub reviewers: Vec<GitLabUser>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub draft: bool,
    /// Pre-16.0 name of `draft`
    #[serde(default)]
    pub work_in_progress: bool,
    #[serde(default)]
    pub merged_at: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(default)]
    pub diff_refs: Option<GitLabDiffRefs>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// SHA references needed to anchor inline comments.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabDiffRefs {
    pub base_sha: String,
    pub head_sha: String,
    pub start_sha: String,
}

/// One file of GET /merge_requests/{iid}/changes.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabChange {
    pub old_path: String,
    pub new_path: String,
    #[serde(default)]
    pub new_file: bool,
    #[serde(default)]
    pub renamed_file: bool,
    #[serde(default)]
    pub deleted_file: bool,
    #[serde(default)]
    pub diff: String,
}

/// Response of GET /merge_requests/{iid}/changes: the merge request plus
/// its file changes.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabMergeRequestChanges {
    #[serde(default)]
    pub diff_refs: Option<GitLabDiffRefs>,
    #[serde(default)]
    pub changes: Vec<GitLabChange>,
}

// =============================================================================
// Notes and Discussions
// =============================================================================

/// GitLab note (comment).
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabNote {
    pub id: u64,
    pub body: String,
    #[serde(default)]
    pub author: Option<GitLabUser>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub position: Option<GitLabNotePosition>,
}

/// Thread of notes; inline comments are created as discussions.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabDiscussion {
    pub id: String,
    #[serde(default)]
    pub notes: Vec<GitLabNote>,
}

/// Position of an inline note.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabNotePosition {
    #[serde(default)]
    pub new_path: Option<String>,
    #[serde(default)]
    pub old_path: Option<String>,
    #[serde(default)]
    pub new_line: Option<u32>,
    #[serde(default)]
    pub old_line: Option<u32>,
}

// =============================================================================
// Request types
// =============================================================================

/// Request body for POST /notes.
#[derive(Debug, Clone, Serialize)]
pub struct CreateNoteRequest {
    pub body: String,
}

/// Request body for POST /discussions.
#[derive(Debug, Clone, Serialize)]
pub struct CreateDiscussionRequest {
    pub body: String,
    pub position: DiscussionPosition,
}

/// Text position of a new inline discussion.
#[derive(Debug, Clone, Serialize)]
pub struct DiscussionPosition {
    pub position_type: &'static str,
    pub base_sha: String,
    pub start_sha: String,
    pub head_sha: String,
    pub old_path: String,
    pub new_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_line: Option<u32>,
}
