//! Tool handlers for MCP server.
//!
//! Each tool call deserializes its arguments, calls the backing provider and
//! renders the outcome as Markdown. Provider errors become error results
//! whose text is the error's display string, so fuzzy-resolution failures
//! reach the agent together with the values it may retry with.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracklens_core::{
    parse_sprint_id, BoardQuery, CodePosition, CreateCommentInput, Error, LineSide,
    MergeRequestFilter, MergeRequestProvider, Result, SearchCriteria, SprintRef, SprintState,
    TicketProvider,
};

use crate::format;
use crate::protocol::{ToolCallResult, ToolDefinition};
use crate::tools;

/// Tool handler that executes tools using providers.
#[derive(Default)]
pub struct ToolHandler {
    tickets: Option<Arc<dyn TicketProvider>>,
    merge_requests: Option<Arc<dyn MergeRequestProvider>>,
}

impl ToolHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the issue tracker.
    pub fn with_tickets(mut self, provider: Arc<dyn TicketProvider>) -> Self {
        self.tickets = Some(provider);
        self
    }

    /// Register the code host.
    pub fn with_merge_requests(mut self, provider: Arc<dyn MergeRequestProvider>) -> Self {
        self.merge_requests = Some(provider);
        self
    }

    pub fn has_providers(&self) -> bool {
        self.tickets.is_some() || self.merge_requests.is_some()
    }

    /// Tool definitions for the configured providers.
    pub fn available_tools(&self) -> Vec<ToolDefinition> {
        let mut tools = Vec::new();
        if self.tickets.is_some() {
            tools.extend(tools::ticket_tools());
        }
        if self.merge_requests.is_some() {
            tools.extend(tools::merge_request_tools());
        }
        tools
    }

    /// Execute a tool by name with arguments.
    pub async fn execute(&self, name: &str, arguments: Option<Value>) -> ToolCallResult {
        let outcome = match name {
            "search_issues" => self.search_issues(arguments).await,
            "get_issue" => self.get_issue(arguments).await,
            "update_issue_field" => self.update_issue_field(arguments).await,
            "set_story_points" => self.set_story_points(arguments).await,
            "list_boards" => self.list_boards(arguments).await,
            "list_sprints" => self.list_sprints(arguments).await,
            "get_issue_sprints" => self.get_issue_sprints(arguments).await,
            "move_issue_to_sprint" => self.move_issue_to_sprint(arguments).await,
            "get_merge_requests" => self.get_merge_requests(arguments).await,
            "get_merge_request" => self.get_merge_request(arguments).await,
            "get_merge_request_diffs" => self.get_merge_request_diffs(arguments).await,
            "add_merge_request_comment" => self.add_merge_request_comment(arguments).await,
            _ => return ToolCallResult::error(format!("Unknown tool: {}", name)),
        };

        match outcome {
            Ok(text) => ToolCallResult::text(text),
            Err(e) => {
                if e.is_resolution_failure() {
                    tracing::debug!(tool = name, error = %e, "Resolution failed");
                } else {
                    tracing::warn!(tool = name, error = %e, "Tool call failed");
                }
                ToolCallResult::error(e.to_string())
            }
        }
    }

    fn tickets(&self) -> Result<&dyn TicketProvider> {
        self.tickets
            .as_deref()
            .ok_or_else(|| Error::ProviderNotConfigured("jira".to_string()))
    }

    fn merge_requests(&self) -> Result<&dyn MergeRequestProvider> {
        self.merge_requests
            .as_deref()
            .ok_or_else(|| Error::ProviderNotConfigured("gitlab".to_string()))
    }

    // ========================================================================
    // Jira
    // ========================================================================

    async fn search_issues(&self, arguments: Option<Value>) -> Result<String> {
        let provider = self.tickets()?;
        let criteria: SearchCriteria = parse_args(arguments)?;
        let tickets = provider.search_tickets(&criteria).await?;
        tracing::debug!("Got {} issues from {}", tickets.len(), provider.provider_name());
        Ok(format::tickets_to_markdown(&tickets))
    }

    async fn get_issue(&self, arguments: Option<Value>) -> Result<String> {
        let provider = self.tickets()?;
        let params: KeyParams = parse_args(arguments)?;
        let ticket = provider.get_ticket(&params.key).await?;
        Ok(format::ticket_to_markdown(&ticket))
    }

    async fn update_issue_field(&self, arguments: Option<Value>) -> Result<String> {
        let provider = self.tickets()?;
        let params: UpdateFieldParams = parse_args(arguments)?;
        let value = scalar_text(&params.value)
            .ok_or_else(|| Error::InvalidData("'value' must not be null".to_string()))?;
        let update = provider
            .update_field(&params.key, &params.field, &value)
            .await?;
        Ok(format::field_update_to_markdown(&update))
    }

    async fn set_story_points(&self, arguments: Option<Value>) -> Result<String> {
        let provider = self.tickets()?;
        let params: StoryPointsParams = parse_args(arguments)?;
        if !params.points.is_finite() || params.points < 0.0 {
            return Err(Error::InvalidData(format!(
                "Story points must be a non-negative number, got {}",
                params.points
            )));
        }
        let update = provider.set_story_points(&params.key, params.points).await?;
        Ok(format::field_update_to_markdown(&update))
    }

    async fn list_boards(&self, arguments: Option<Value>) -> Result<String> {
        let provider = self.tickets()?;
        let query: BoardQuery = parse_args(arguments)?;
        let boards = provider.find_boards(&query).await?;
        Ok(format::boards_to_markdown(&boards))
    }

    async fn list_sprints(&self, arguments: Option<Value>) -> Result<String> {
        let provider = self.tickets()?;
        let params: ListSprintsParams = parse_args(arguments)?;
        let state = params
            .state
            .as_deref()
            .map(str::parse::<SprintState>)
            .transpose()?;
        let sprints = provider.list_sprints(params.board_id, state).await?;
        Ok(format::sprints_to_markdown(&sprints))
    }

    async fn get_issue_sprints(&self, arguments: Option<Value>) -> Result<String> {
        let provider = self.tickets()?;
        let params: KeyParams = parse_args(arguments)?;
        let sprints = provider.sprints_for_ticket(&params.key).await?;
        Ok(format::sprints_to_markdown(&sprints))
    }

    async fn move_issue_to_sprint(&self, arguments: Option<Value>) -> Result<String> {
        let provider = self.tickets()?;
        let params: MoveToSprintParams = parse_args(arguments)?;
        let sprint_ref = params.sprint_ref()?;
        let sprint = provider.move_to_sprint(&params.key, &sprint_ref).await?;
        Ok(format::sprint_move_to_markdown(&params.key, &sprint))
    }

    // ========================================================================
    // GitLab
    // ========================================================================

    async fn get_merge_requests(&self, arguments: Option<Value>) -> Result<String> {
        let provider = self.merge_requests()?;
        let filter: MergeRequestFilter = parse_args(arguments)?;
        let mrs = provider.get_merge_requests(&filter).await?;
        tracing::debug!(
            "Got {} merge requests from {}",
            mrs.len(),
            provider.provider_name()
        );
        Ok(format::merge_requests_to_markdown(&mrs))
    }

    async fn get_merge_request(&self, arguments: Option<Value>) -> Result<String> {
        let provider = self.merge_requests()?;
        let params: IidParams = parse_args(arguments)?;
        let mr = provider.get_merge_request(params.iid).await?;
        Ok(format::merge_request_to_markdown(&mr, None))
    }

    async fn get_merge_request_diffs(&self, arguments: Option<Value>) -> Result<String> {
        let provider = self.merge_requests()?;
        let params: IidParams = parse_args(arguments)?;
        let diffs = provider.get_diffs(params.iid).await?;
        Ok(format::diffs_to_markdown(&diffs))
    }

    async fn add_merge_request_comment(&self, arguments: Option<Value>) -> Result<String> {
        let provider = self.merge_requests()?;
        let params: CommentParams = parse_args(arguments)?;
        let (iid, input) = params.into_input()?;
        let comment = provider.add_comment(iid, &input).await?;
        Ok(format::comment_to_markdown(&comment))
    }
}

/// Deserialize tool arguments; absent arguments are an empty object.
fn parse_args<T: DeserializeOwned>(arguments: Option<Value>) -> Result<T> {
    let value = arguments.unwrap_or_else(|| Value::Object(Default::default()));
    serde_json::from_value(value).map_err(|e| Error::InvalidData(format!("Invalid arguments: {}", e)))
}

/// Text form of a scalar argument that may arrive as a JSON number or bool.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

// ============================================================================
// Parameter types
// ============================================================================

#[derive(Debug, Deserialize)]
struct KeyParams {
    key: String,
}

#[derive(Debug, Deserialize)]
struct UpdateFieldParams {
    key: String,
    field: String,
    value: Value,
}

#[derive(Debug, Deserialize)]
struct StoryPointsParams {
    key: String,
    points: f64,
}

#[derive(Debug, Deserialize)]
struct ListSprintsParams {
    board_id: u64,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MoveToSprintParams {
    key: String,
    #[serde(default)]
    sprint: Option<Value>,
    #[serde(default)]
    sprint_id: Option<Value>,
}

impl MoveToSprintParams {
    /// `sprint_id` must be numeric; `sprint` may be an id or a name.
    fn sprint_ref(&self) -> Result<SprintRef> {
        if let Some(id) = &self.sprint_id {
            let raw = scalar_text(id).unwrap_or_default();
            return parse_sprint_id(&raw).map(SprintRef::Id);
        }
        match &self.sprint {
            Some(Value::Number(n)) => n
                .as_u64()
                .map(SprintRef::Id)
                .ok_or_else(|| Error::InvalidSprintId(n.to_string())),
            Some(Value::String(s)) if !s.trim().is_empty() => Ok(SprintRef::parse(s)),
            _ => Err(Error::InvalidData(
                "Either 'sprint' (id or name) or 'sprint_id' is required".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IidParams {
    iid: u64,
}

#[derive(Debug, Deserialize)]
struct CommentParams {
    iid: u64,
    body: String,
    #[serde(default)]
    file_path: Option<String>,
    #[serde(default)]
    line: Option<u32>,
    #[serde(default)]
    side: Option<LineSide>,
}

impl CommentParams {
    fn into_input(self) -> Result<(u64, CreateCommentInput)> {
        let position = match (self.file_path, self.line) {
            (Some(file_path), Some(line)) => Some(CodePosition {
                file_path,
                line,
                side: self.side.unwrap_or(LineSide::New),
            }),
            (None, None) => None,
            _ => {
                return Err(Error::InvalidData(
                    "Inline comments need both 'file_path' and 'line'".to_string(),
                ))
            }
        };
        Ok((
            self.iid,
            CreateCommentInput {
                body: self.body,
                position,
            },
        ))
    }
}
