//! GitLab API client implementation.

use async_trait::async_trait;
use tracing::{debug, warn};
use tracklens_core::{
    CodePosition, Comment, CreateCommentInput, DiffHunk, DiffLine, Error, FileDiff, LineKind,
    LineSide, MergeRequest, MergeRequestFilter, MergeRequestProvider, Result, User,
};

use crate::diff::{count_changes, parse_unified_diff};
use crate::types::{
    CreateDiscussionRequest, CreateNoteRequest, DiscussionPosition, GitLabChange,
    GitLabDiscussion, GitLabMergeRequest, GitLabMergeRequestChanges, GitLabNote,
    GitLabNotePosition, GitLabUser,
};
use crate::DEFAULT_GITLAB_URL;

/// Merge requests returned when the filter sets no limit.
const DEFAULT_MR_LIMIT: u32 = 20;

/// GitLab caps `per_page` at this value.
const MAX_PER_PAGE: u32 = 100;

/// GitLab API client scoped to one project.
pub struct GitLabClient {
    base_url: String,
    project_id: String,
    token: String,
    client: reqwest::Client,
}

impl GitLabClient {
    /// Create a new GitLab client for gitlab.com.
    pub fn new(project_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_GITLAB_URL, project_id, token)
    }

    /// Create a new GitLab client with a custom base URL.
    pub fn with_base_url(
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            token: token.into(),
            client: reqwest::Client::builder()
                .user_agent("tracklens")
                .build()
                .unwrap_or_default(),
        }
    }

    /// Build request with common headers.
    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("PRIVATE-TOKEN", &self.token)
    }

    /// Get the project API URL for a given endpoint.
    fn project_url(&self, endpoint: &str) -> String {
        format!(
            "{}/api/v4/projects/{}{}",
            self.base_url,
            encode_project_id(&self.project_id),
            endpoint
        )
    }

    /// Make an authenticated GET request with query parameters.
    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        debug!(url = url, params = ?params, "GitLab GET request");

        let response = self
            .request(reqwest::Method::GET, url)
            .query(params)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        self.handle_response(response).await
    }

    /// Make an authenticated POST request.
    async fn post<T: serde::de::DeserializeOwned, B: serde::Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        debug!(url = url, "GitLab POST request");

        let response = self
            .request(reqwest::Method::POST, url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        self.handle_response(response).await
    }

    /// Handle response and map errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let status_code = status.as_u16();
            let message = response.text().await.unwrap_or_default();
            warn!(
                status = status_code,
                message = message,
                "GitLab API error response"
            );
            return Err(Error::from_status(status_code, message));
        }

        response
            .json()
            .await
            .map_err(|e| Error::InvalidData(format!("Failed to parse response: {}", e)))
    }

    async fn get_changes(&self, iid: u64) -> Result<GitLabMergeRequestChanges> {
        let url = self.project_url(&format!("/merge_requests/{}/changes", iid));
        self.get(&url, &[]).await
    }

    /// Create an inline discussion after checking the line is part of the diff.
    async fn add_inline_comment(
        &self,
        iid: u64,
        body: &str,
        position: &CodePosition,
    ) -> Result<Comment> {
        let changes = self.get_changes(iid).await?;
        let diff_refs = changes.diff_refs.clone().ok_or_else(|| {
            Error::InvalidData(format!(
                "Merge request !{} has no diff_refs, cannot create inline comment",
                iid
            ))
        })?;

        let change = find_change(&changes.changes, &position.file_path).ok_or_else(|| {
            Error::InvalidData(format!(
                "File '{}' is not changed in merge request !{}",
                position.file_path, iid
            ))
        })?;
        let line = find_line(&parse_unified_diff(&change.diff), position).ok_or_else(|| {
            Error::InvalidData(format!(
                "Line {} ({} side) of '{}' is not part of the diff",
                position.line,
                side_name(position.side),
                position.file_path
            ))
        })?;

        let request = CreateDiscussionRequest {
            body: body.to_string(),
            position: DiscussionPosition {
                position_type: "text",
                base_sha: diff_refs.base_sha,
                start_sha: diff_refs.start_sha,
                head_sha: diff_refs.head_sha,
                old_path: change.old_path.clone(),
                new_path: change.new_path.clone(),
                new_line: line.new_line,
                old_line: line.old_line,
            },
        };

        let url = self.project_url(&format!("/merge_requests/{}/discussions", iid));
        let discussion: GitLabDiscussion = self.post(&url, &request).await?;
        let note = discussion
            .notes
            .first()
            .ok_or_else(|| Error::InvalidData("Discussion created with no notes".to_string()))?;

        let mut comment = map_note(note);
        if comment.position.is_none() {
            comment.position = Some(position.clone());
        }
        Ok(comment)
    }
}

// =============================================================================
// Mapping functions: GitLab types -> Unified types
// =============================================================================

fn map_user(gl_user: &GitLabUser) -> User {
    User {
        id: gl_user.id.to_string(),
        username: gl_user.username.clone(),
        name: gl_user.name.clone(),
        email: gl_user.public_email.clone().filter(|e| !e.is_empty()),
        avatar_url: gl_user.avatar_url.clone(),
    }
}

/// Unified state: merged, closed, draft or opened.
fn merge_request_state(gl_mr: &GitLabMergeRequest) -> String {
    if gl_mr.merged_at.is_some() || gl_mr.state == "merged" {
        "merged".to_string()
    } else if gl_mr.state == "closed" {
        "closed".to_string()
    } else if gl_mr.draft || gl_mr.work_in_progress {
        "draft".to_string()
    } else {
        gl_mr.state.clone()
    }
}

fn map_merge_request(gl_mr: &GitLabMergeRequest) -> MergeRequest {
    MergeRequest {
        key: format!("mr#{}", gl_mr.iid),
        iid: gl_mr.iid,
        title: gl_mr.title.clone(),
        description: gl_mr.description.clone(),
        state: merge_request_state(gl_mr),
        source_branch: gl_mr.source_branch.clone(),
        target_branch: gl_mr.target_branch.clone(),
        author: gl_mr.author.as_ref().map(map_user),
        assignees: gl_mr.assignees.iter().map(map_user).collect(),
        reviewers: gl_mr.reviewers.iter().map(map_user).collect(),
        labels: gl_mr.labels.clone(),
        draft: gl_mr.draft || gl_mr.work_in_progress,
        url: gl_mr.web_url.clone(),
        created_at: gl_mr.created_at.clone(),
        updated_at: gl_mr.updated_at.clone(),
    }
}

fn map_position(gl_position: &GitLabNotePosition) -> Option<CodePosition> {
    if let Some(line) = gl_position.new_line {
        let file_path = gl_position
            .new_path
            .clone()
            .or_else(|| gl_position.old_path.clone())?;
        return Some(CodePosition {
            file_path,
            line,
            side: LineSide::New,
        });
    }

    let line = gl_position.old_line?;
    let file_path = gl_position
        .old_path
        .clone()
        .or_else(|| gl_position.new_path.clone())?;
    Some(CodePosition {
        file_path,
        line,
        side: LineSide::Old,
    })
}

fn map_note(gl_note: &GitLabNote) -> Comment {
    Comment {
        id: gl_note.id.to_string(),
        body: gl_note.body.clone(),
        author: gl_note.author.as_ref().map(map_user),
        created_at: gl_note.created_at.clone(),
        updated_at: gl_note.updated_at.clone(),
        position: gl_note.position.as_ref().and_then(map_position),
    }
}

fn map_change(change: &GitLabChange) -> FileDiff {
    let hunks = parse_unified_diff(&change.diff);
    let (additions, deletions) = count_changes(&hunks);
    FileDiff {
        file_path: change.new_path.clone(),
        old_path: change.renamed_file.then(|| change.old_path.clone()),
        new_file: change.new_file,
        deleted_file: change.deleted_file,
        renamed_file: change.renamed_file,
        hunks,
        additions,
        deletions,
    }
}

// =============================================================================
// Helper functions
// =============================================================================

/// Numeric ids pass through; `group/project` paths are URL-encoded.
fn encode_project_id(project_id: &str) -> String {
    project_id.replace('/', "%2F")
}

/// GitLab `state` query value for a filter state.
fn state_param(state: &str) -> &'static str {
    match state.trim().to_lowercase().as_str() {
        "closed" => "closed",
        "merged" => "merged",
        "all" => "all",
        _ => "opened",
    }
}

fn find_change<'a>(changes: &'a [GitLabChange], file_path: &str) -> Option<&'a GitLabChange> {
    changes
        .iter()
        .find(|c| c.new_path == file_path)
        .or_else(|| changes.iter().find(|c| c.old_path == file_path))
}

/// Diff line addressed by a comment position.
///
/// New-side positions match added and context lines, old-side positions
/// match removed and context lines.
fn find_line(hunks: &[DiffHunk], position: &CodePosition) -> Option<DiffLine> {
    hunks
        .iter()
        .flat_map(|h| &h.lines)
        .find(|l| match position.side {
            LineSide::New => l.kind != LineKind::Remove && l.new_line == Some(position.line),
            LineSide::Old => l.kind != LineKind::Add && l.old_line == Some(position.line),
        })
        .cloned()
}

fn side_name(side: LineSide) -> &'static str {
    match side {
        LineSide::New => "new",
        LineSide::Old => "old",
    }
}

// =============================================================================
// Trait implementation
// =============================================================================

#[async_trait]
impl MergeRequestProvider for GitLabClient {
    fn provider_name(&self) -> &'static str {
        "gitlab"
    }

    async fn get_merge_requests(&self, filter: &MergeRequestFilter) -> Result<Vec<MergeRequest>> {
        let url = self.project_url("/merge_requests");
        let limit = filter.limit.unwrap_or(DEFAULT_MR_LIMIT);
        if limit == 0 {
            return Ok(vec![]);
        }

        let mut params = vec![
            (
                "state",
                state_param(filter.state.as_deref().unwrap_or("opened")).to_string(),
            ),
            ("per_page", limit.min(MAX_PER_PAGE).to_string()),
            ("order_by", "updated_at".to_string()),
            ("sort", "desc".to_string()),
        ];
        if let Some(author) = filter.author.as_deref().filter(|a| !a.trim().is_empty()) {
            params.push(("author_username", author.trim().to_string()));
        }
        if !filter.labels.is_empty() {
            params.push(("labels", filter.labels.join(",")));
        }

        let gl_mrs: Vec<GitLabMergeRequest> = self.get(&url, &params).await?;
        Ok(gl_mrs
            .iter()
            .take(limit as usize)
            .map(map_merge_request)
            .collect())
    }

    async fn get_merge_request(&self, iid: u64) -> Result<MergeRequest> {
        let url = self.project_url(&format!("/merge_requests/{}", iid));
        let gl_mr: GitLabMergeRequest = self.get(&url, &[]).await?;
        Ok(map_merge_request(&gl_mr))
    }

    async fn get_diffs(&self, iid: u64) -> Result<Vec<FileDiff>> {
        let changes = self.get_changes(iid).await?;
        Ok(changes.changes.iter().map(map_change).collect())
    }

    async fn add_comment(&self, iid: u64, input: &CreateCommentInput) -> Result<Comment> {
        if input.body.trim().is_empty() {
            return Err(Error::InvalidData("Comment body is empty".to_string()));
        }

        if let Some(position) = &input.position {
            return self.add_inline_comment(iid, &input.body, position).await;
        }

        let url = self.project_url(&format!("/merge_requests/{}/notes", iid));
        let request = CreateNoteRequest {
            body: input.body.clone(),
        };
        let gl_note: GitLabNote = self.post(&url, &request).await?;
        Ok(map_note(&gl_note))
    }
}
