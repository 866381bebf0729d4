//! Jira Agile API: boards, sprints and sprint resolution.
//!
//! All endpoints live under `{instance}/rest/agile/1.0` and return the paged
//! `{values, startAt, maxResults, total, isLast}` envelope.

use std::collections::HashSet;
use std::future::Future;

use serde::Deserialize;
use tracing::{debug, warn};
use tracklens_core::matching::{match_within, MatchThreshold};
use tracklens_core::{
    Board, BoardQuery, BoardType, Error, Result, Sprint, SprintRef, SprintState,
};

use crate::client::JiraClient;
use crate::types::{AgilePage, JiraBoard, JiraProjectRef, JiraSprint, MoveIssuesPayload};

/// Board names listed in a `NoBoardsFound` error.
const MAX_LISTED_BOARDS: usize = 50;

/// Sprints listed in a rejected sprint-name match.
const MAX_LISTED_SPRINTS: usize = 10;

/// Server-side hints for `GET /board`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardFilter {
    pub board_type: Option<BoardType>,
    pub name: Option<String>,
    pub project_key: Option<String>,
}

/// Fetch every page of an agile listing.
///
/// Pages are requested one after another starting at offset 0. Stops when
/// the server reports `isLast`, once `total` items are collected, or on an
/// empty page.
pub async fn collect_pages<T, F, Fut>(page_size: u32, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(u64, u32) -> Fut,
    Fut: Future<Output = Result<AgilePage<T>>>,
{
    let mut items = Vec::new();
    let mut start_at: u64 = 0;

    loop {
        let page = fetch(start_at, page_size).await?;
        let is_last = page.is_last == Some(true);
        let total = page.total;
        if page.values.is_empty() {
            break;
        }
        items.extend(page.values);

        if is_last || total.is_some_and(|t| items.len() as u64 >= t) {
            break;
        }
        start_at += u64::from(page_size);
    }

    Ok(items)
}

/// Map an agile sprint, dropping unnamed sprints and unknown states.
fn map_sprint(sprint: JiraSprint) -> Option<Sprint> {
    let name = sprint.name.filter(|n| !n.trim().is_empty())?;
    let state = sprint.state.as_deref()?.parse::<SprintState>().ok()?;
    Some(Sprint {
        id: sprint.id,
        name,
        state,
        start_date: sprint.start_date,
        end_date: sprint.end_date,
        goal: sprint.goal,
    })
}

fn map_board(board: JiraBoard) -> Board {
    Board {
        id: board.id,
        name: board.name,
        board_type: board.board_type,
        project_key: board.location.and_then(|l| l.project_key),
    }
}

/// Whether a board belongs to a project: location key equality or the key
/// appearing in the board name, both case-insensitive.
fn board_in_project(board: &Board, project_key: &str) -> bool {
    let key = project_key.to_lowercase();
    board
        .project_key
        .as_deref()
        .is_some_and(|k| k.to_lowercase() == key)
        || board.name.to_lowercase().contains(&key)
}

fn board_matches(board: &Board, query: &BoardQuery) -> bool {
    if let Some(project_key) = query.project_key.as_deref() {
        if !board_in_project(board, project_key) {
            return false;
        }
    }
    if let Some(name) = query.board_name.as_deref() {
        if !board.name.to_lowercase().contains(&name.to_lowercase()) {
            return false;
        }
    }
    if query.board_id.is_some_and(|id| id != board.id) {
        return false;
    }
    if query.board_type.is_some_and(|t| t != board.board_type) {
        return false;
    }
    true
}

/// Deduplicate by id and sort active, future, closed; then by name.
fn dedupe_and_sort(sprints: Vec<Sprint>) -> Vec<Sprint> {
    let mut seen = HashSet::new();
    let mut unique: Vec<Sprint> = sprints.into_iter().filter(|s| seen.insert(s.id)).collect();
    unique.sort_by(|a, b| {
        a.state
            .rank()
            .cmp(&b.state.rank())
            .then_with(|| a.name.cmp(&b.name))
    });
    unique
}

/// Resolve a free-form sprint name against known sprints.
pub fn resolve_sprint_by_name<'a>(input: &str, sprints: &'a [Sprint]) -> Result<&'a Sprint> {
    match_within(
        input,
        sprints.iter().map(|s| (s.name.as_str(), s)),
        MatchThreshold::LenientFreeform,
    )
    .map(|m| m.payload)
    .ok_or_else(|| Error::NoCloseMatch {
        input: input.to_string(),
        candidates: sprints
            .iter()
            .take(MAX_LISTED_SPRINTS)
            .map(|s| format!("{} ({})", s.name, s.state))
            .collect(),
        omitted: sprints.len().saturating_sub(MAX_LISTED_SPRINTS),
    })
}

#[derive(Deserialize)]
struct IssueProjectOnly {
    fields: IssueProjectFields,
}

#[derive(Deserialize)]
struct IssueProjectFields {
    project: JiraProjectRef,
}

impl JiraClient {
    /// List all boards visible to the user, following pagination.
    pub async fn list_all_boards(&self, filter: &BoardFilter) -> Result<Vec<Board>> {
        let url = self.agile_url("/board");
        let boards: Vec<JiraBoard> = collect_pages(self.page_size, |start_at, max| {
            let mut params = vec![
                ("startAt", start_at.to_string()),
                ("maxResults", max.to_string()),
            ];
            if let Some(board_type) = filter.board_type {
                params.push(("type", board_type.as_str().to_string()));
            }
            if let Some(name) = &filter.name {
                params.push(("name", name.clone()));
            }
            if let Some(project_key) = &filter.project_key {
                params.push(("projectKeyOrId", project_key.clone()));
            }
            let url = url.clone();
            async move { self.get_with_query(&url, &params).await }
        })
        .await?;

        debug!(count = boards.len(), "Fetched Jira boards");
        Ok(boards.into_iter().map(map_board).collect())
    }

    /// List sprints of a board, optionally restricted to one state.
    pub async fn list_sprints_for_board(
        &self,
        board_id: u64,
        state: Option<SprintState>,
    ) -> Result<Vec<Sprint>> {
        let url = self.agile_url(&format!("/board/{}/sprint", board_id));
        let sprints: Vec<JiraSprint> = collect_pages(self.page_size, |start_at, max| {
            let mut params = vec![
                ("startAt", start_at.to_string()),
                ("maxResults", max.to_string()),
            ];
            if let Some(state) = state {
                params.push(("state", state.as_str().to_string()));
            }
            let url = url.clone();
            async move { self.get_with_query(&url, &params).await }
        })
        .await?;

        Ok(sprints.into_iter().filter_map(map_sprint).collect())
    }

    /// Get a single board.
    pub async fn get_board(&self, board_id: u64) -> Result<Board> {
        let board: JiraBoard = self
            .get(&self.agile_url(&format!("/board/{}", board_id)))
            .await?;
        Ok(map_board(board))
    }

    async fn get_sprint(&self, sprint_id: u64) -> Result<JiraSprint> {
        self.get(&self.agile_url(&format!("/sprint/{}", sprint_id)))
            .await
    }

    /// Project key of an issue.
    pub async fn issue_project_key(&self, key: &str) -> Result<String> {
        let issue: IssueProjectOnly = self
            .get_with_query(
                &self.api_url(&format!("/issue/{}", key)),
                &[("fields", "project".to_string())],
            )
            .await?;
        Ok(issue.fields.project.key)
    }

    /// Every sprint reachable from the boards of the ticket's project.
    ///
    /// A failing board does not abort the walk; its error is reported only
    /// when no board yields a sprint.
    pub async fn resolve_sprints_for_ticket(&self, key: &str) -> Result<Vec<Sprint>> {
        let project_key = self.issue_project_key(key).await?;
        let all_boards = self.list_all_boards(&BoardFilter::default()).await?;

        let boards: Vec<&Board> = all_boards
            .iter()
            .filter(|b| board_in_project(b, &project_key))
            .collect();

        if boards.is_empty() {
            return Err(Error::NoBoardsFound {
                project_key,
                boards: all_boards
                    .iter()
                    .take(MAX_LISTED_BOARDS)
                    .map(|b| b.name.clone())
                    .collect(),
            });
        }

        let mut sprints = Vec::new();
        let mut board_errors = Vec::new();
        for board in boards {
            match self.list_sprints_for_board(board.id, None).await {
                Ok(found) => sprints.extend(found),
                Err(e) => {
                    warn!(board_id = board.id, board = board.name, error = %e, "Failed to list board sprints");
                    board_errors.push(format!("{} ({}): {}", board.name, board.id, e));
                }
            }
        }

        let sprints = dedupe_and_sort(sprints);
        if sprints.is_empty() {
            return Err(Error::NoSprintsFound {
                project_key,
                board_errors,
            });
        }
        Ok(sprints)
    }

    /// Find boards matching a query.
    ///
    /// A board id is looked up directly first; when that fails the listing
    /// is filtered client-side instead.
    pub async fn search_boards(&self, query: &BoardQuery) -> Result<Vec<Board>> {
        if let Some(board_id) = query.board_id {
            match self.get_board(board_id).await {
                Ok(board) if board_matches(&board, query) => return Ok(vec![board]),
                Ok(_) => return Ok(vec![]),
                Err(e) => {
                    debug!(board_id = board_id, error = %e, "Direct board lookup failed, listing boards");
                }
            }
        }

        let filter = BoardFilter {
            board_type: query.board_type,
            name: query.board_name.clone(),
            project_key: query.project_key.clone(),
        };
        let boards = self.list_all_boards(&filter).await?;
        Ok(boards
            .into_iter()
            .filter(|b| board_matches(b, query))
            .collect())
    }

    /// Move an issue into a sprint given by id or approximate name.
    pub async fn move_issue_to_sprint(&self, key: &str, sprint: &SprintRef) -> Result<Sprint> {
        let target = match sprint {
            SprintRef::Id(id) => {
                let raw = self.get_sprint(*id).await?;
                Sprint {
                    id: raw.id,
                    name: raw
                        .name
                        .clone()
                        .filter(|n| !n.trim().is_empty())
                        .unwrap_or_else(|| format!("Sprint {}", raw.id)),
                    state: raw
                        .state
                        .as_deref()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(SprintState::Future),
                    start_date: raw.start_date,
                    end_date: raw.end_date,
                    goal: raw.goal,
                }
            }
            SprintRef::Name(name) => {
                let sprints = self.resolve_sprints_for_ticket(key).await?;
                resolve_sprint_by_name(name, &sprints)?.clone()
            }
        };

        let payload = MoveIssuesPayload {
            issues: vec![key.to_string()],
        };
        self.send_no_content(
            reqwest::Method::POST,
            &self.agile_url(&format!("/sprint/{}/issue", target.id)),
            &payload,
        )
        .await?;

        debug!(issue = key, sprint_id = target.id, "Moved issue to sprint");
        Ok(target)
    }
}
