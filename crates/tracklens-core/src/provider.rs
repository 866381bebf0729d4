//! Provider traits for issue trackers and code hosts.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    Board, BoardQuery, Comment, CreateCommentInput, FieldUpdate, FileDiff, MergeRequest,
    MergeRequestFilter, SearchCriteria, Sprint, SprintRef, SprintState, Ticket,
};

/// Trait for issue trackers with agile boards (Jira).
#[async_trait]
pub trait TicketProvider: Send + Sync {
    /// Get the provider name (e.g., "jira")
    fn provider_name(&self) -> &'static str;

    /// Search tickets; the result is capped at the criteria's effective limit
    async fn search_tickets(&self, criteria: &SearchCriteria) -> Result<Vec<Ticket>>;

    /// Get a single ticket by key
    async fn get_ticket(&self, key: &str) -> Result<Ticket>;

    /// Update a field addressed by display name (or id) with a fuzzy value
    async fn update_field(&self, key: &str, field: &str, value: &str) -> Result<FieldUpdate>;

    /// Set the story points estimate
    async fn set_story_points(&self, key: &str, points: f64) -> Result<FieldUpdate>;

    /// Find agile boards
    async fn find_boards(&self, query: &BoardQuery) -> Result<Vec<Board>>;

    /// List sprints of a board
    async fn list_sprints(&self, board_id: u64, state: Option<SprintState>)
        -> Result<Vec<Sprint>>;

    /// All sprints reachable from the ticket's project boards
    async fn sprints_for_ticket(&self, key: &str) -> Result<Vec<Sprint>>;

    /// Move a ticket into a sprint given by id or (fuzzy) name
    async fn move_to_sprint(&self, key: &str, sprint: &SprintRef) -> Result<Sprint>;
}

/// Trait for code hosts with merge requests (GitLab).
#[async_trait]
pub trait MergeRequestProvider: Send + Sync {
    /// Get the provider name (e.g., "gitlab")
    fn provider_name(&self) -> &'static str;

    /// Get merge requests
    async fn get_merge_requests(&self, filter: &MergeRequestFilter) -> Result<Vec<MergeRequest>>;

    /// Get a single merge request by IID
    async fn get_merge_request(&self, iid: u64) -> Result<MergeRequest>;

    /// Get file diffs of a merge request
    async fn get_diffs(&self, iid: u64) -> Result<Vec<FileDiff>>;

    /// Add a general or inline comment
    async fn add_comment(&self, iid: u64, input: &CreateCommentInput) -> Result<Comment>;
}
