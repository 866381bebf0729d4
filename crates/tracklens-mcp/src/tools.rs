//! MCP tool definitions.
//!
//! Tools are grouped by the provider that backs them; the handler only
//! advertises a group when that provider is configured.

use serde_json::json;

use crate::protocol::ToolDefinition;

fn tool(name: &str, description: &str, input_schema: serde_json::Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

/// Tools backed by the issue tracker.
pub fn ticket_tools() -> Vec<ToolDefinition> {
    vec![
        tool(
            "search_issues",
            "Search Jira issues. Status, priority and issue type accept approximate values; \
             the project may be a key or part of a project name",
            json!({
                "type": "object",
                "properties": {
                    "project": {
                        "type": "string",
                        "description": "Project key or (partial) project name"
                    },
                    "assignee": {
                        "type": "string",
                        "description": "Assignee account id, username or name; 'me' for the current user, 'unassigned' for none"
                    },
                    "reporter": {
                        "type": "string",
                        "description": "Reporter account id, username or name"
                    },
                    "status_category": {
                        "type": "string",
                        "enum": ["todo", "in_progress", "done"],
                        "description": "Status category"
                    },
                    "status": {
                        "type": "string",
                        "description": "Status text, e.g. 'open' or 'in review'"
                    },
                    "priority": {
                        "type": "string",
                        "description": "Priority text, e.g. 'urgent' or 'High'"
                    },
                    "issue_type": {
                        "type": "string",
                        "description": "Issue type text, e.g. 'bug' or 'Story'"
                    },
                    "labels": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Filter by label names"
                    },
                    "labels_match_all": {
                        "type": "boolean",
                        "description": "Require every label instead of any (default: false)"
                    },
                    "recent_days": {
                        "type": "integer",
                        "description": "Only issues updated within the last N days",
                        "minimum": 1
                    },
                    "updated_since": { "type": "string", "description": "Date (YYYY-MM-DD) or offset such as -7d" },
                    "updated_before": { "type": "string", "description": "Date (YYYY-MM-DD) or offset" },
                    "created_since": { "type": "string", "description": "Date (YYYY-MM-DD) or offset" },
                    "created_before": { "type": "string", "description": "Date (YYYY-MM-DD) or offset" },
                    "text": {
                        "type": "string",
                        "description": "Free text search over summary, description and comments"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results (default: 50)",
                        "minimum": 0
                    },
                    "order_by": {
                        "type": "string",
                        "description": "Ordering clause (default: updated DESC)"
                    }
                }
            }),
        ),
        tool(
            "get_issue",
            "Get a single Jira issue with all of its non-empty fields",
            json!({
                "type": "object",
                "properties": {
                    "key": { "type": "string", "description": "Issue key, e.g. PROJ-123" }
                },
                "required": ["key"]
            }),
        ),
        tool(
            "update_issue_field",
            "Update one field of a Jira issue. The field may be given by display name \
             and option values may be approximate; close matches are resolved automatically",
            json!({
                "type": "object",
                "properties": {
                    "key": { "type": "string", "description": "Issue key" },
                    "field": { "type": "string", "description": "Field display name or id" },
                    "value": { "type": "string", "description": "New value" }
                },
                "required": ["key", "field", "value"]
            }),
        ),
        tool(
            "set_story_points",
            "Set the story points estimate of a Jira issue",
            json!({
                "type": "object",
                "properties": {
                    "key": { "type": "string", "description": "Issue key" },
                    "points": { "type": "number", "description": "Story points", "minimum": 0 }
                },
                "required": ["key", "points"]
            }),
        ),
        tool(
            "list_boards",
            "List agile boards, optionally filtered by project, name, id or type",
            json!({
                "type": "object",
                "properties": {
                    "project_key": { "type": "string", "description": "Project key" },
                    "board_name": { "type": "string", "description": "Substring of the board name" },
                    "board_id": { "type": "integer", "description": "Board id" },
                    "board_type": {
                        "type": "string",
                        "enum": ["scrum", "kanban"],
                        "description": "Board type"
                    }
                }
            }),
        ),
        tool(
            "list_sprints",
            "List sprints of an agile board",
            json!({
                "type": "object",
                "properties": {
                    "board_id": { "type": "integer", "description": "Board id" },
                    "state": {
                        "type": "string",
                        "enum": ["future", "active", "closed"],
                        "description": "Only sprints in this state"
                    }
                },
                "required": ["board_id"]
            }),
        ),
        tool(
            "get_issue_sprints",
            "List every sprint reachable from the boards of an issue's project",
            json!({
                "type": "object",
                "properties": {
                    "key": { "type": "string", "description": "Issue key" }
                },
                "required": ["key"]
            }),
        ),
        tool(
            "move_issue_to_sprint",
            "Move a Jira issue into a sprint given by id or by approximate name",
            json!({
                "type": "object",
                "properties": {
                    "key": { "type": "string", "description": "Issue key" },
                    "sprint": {
                        "type": ["string", "integer"],
                        "description": "Sprint id or approximate sprint name"
                    },
                    "sprint_id": {
                        "type": ["string", "integer"],
                        "description": "Numeric sprint id"
                    }
                },
                "required": ["key"]
            }),
        ),
    ]
}

/// Tools backed by the code host.
pub fn merge_request_tools() -> Vec<ToolDefinition> {
    vec![
        tool(
            "get_merge_requests",
            "Get GitLab merge requests of the configured project",
            json!({
                "type": "object",
                "properties": {
                    "state": {
                        "type": "string",
                        "enum": ["opened", "closed", "merged", "all"],
                        "description": "Filter by merge request state (default: opened)"
                    },
                    "author": { "type": "string", "description": "Filter by author username" },
                    "labels": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Filter by label names"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results (default: 20)",
                        "minimum": 1,
                        "maximum": 100
                    }
                }
            }),
        ),
        tool(
            "get_merge_request",
            "Get a single GitLab merge request",
            json!({
                "type": "object",
                "properties": {
                    "iid": { "type": "integer", "description": "Merge request IID" }
                },
                "required": ["iid"]
            }),
        ),
        tool(
            "get_merge_request_diffs",
            "Get the file diffs of a merge request with old and new line numbers",
            json!({
                "type": "object",
                "properties": {
                    "iid": { "type": "integer", "description": "Merge request IID" }
                },
                "required": ["iid"]
            }),
        ),
        tool(
            "add_merge_request_comment",
            "Comment on a merge request. With file_path and line the comment is placed inline",
            json!({
                "type": "object",
                "properties": {
                    "iid": { "type": "integer", "description": "Merge request IID" },
                    "body": { "type": "string", "description": "Comment text (Markdown)" },
                    "file_path": { "type": "string", "description": "File for an inline comment" },
                    "line": { "type": "integer", "description": "Line number for an inline comment" },
                    "side": {
                        "type": "string",
                        "enum": ["new", "old"],
                        "description": "Which side of the diff the line refers to (default: new)"
                    }
                },
                "required": ["iid", "body"]
            }),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_names() {
        let names: Vec<String> = ticket_tools()
            .into_iter()
            .chain(merge_request_tools())
            .map(|t| t.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "search_issues",
                "get_issue",
                "update_issue_field",
                "set_story_points",
                "list_boards",
                "list_sprints",
                "get_issue_sprints",
                "move_issue_to_sprint",
                "get_merge_requests",
                "get_merge_request",
                "get_merge_request_diffs",
                "add_merge_request_comment",
            ]
        );
    }

    #[test]
    fn test_schemas_are_objects() {
        for tool in ticket_tools().into_iter().chain(merge_request_tools()) {
            assert_eq!(tool.input_schema["type"], "object", "{}", tool.name);
            assert!(tool.input_schema["properties"].is_object(), "{}", tool.name);
        }
    }
}
