//! Markdown rendering of tool results.
//!
//! Tool output goes to an LLM, so it is rendered as compact Markdown
//! rather than raw JSON.

use tracklens_core::{
    Board, Comment, DiffHunk, FieldUpdate, FileDiff, LineKind, LineSide, MergeRequest, Sprint,
    Ticket, User,
};

/// Description length kept in list views.
const MAX_DESCRIPTION_LEN: usize = 200;

// ============================================================================
// Tickets
// ============================================================================

/// Render search results.
pub fn tickets_to_markdown(tickets: &[Ticket]) -> String {
    if tickets.is_empty() {
        return "No issues found.".to_string();
    }

    let mut output = format!("# Issues ({})\n\n", tickets.len());
    for ticket in tickets {
        output.push_str(&ticket_summary(ticket));
        output.push('\n');
    }
    output
}

fn ticket_summary(ticket: &Ticket) -> String {
    let mut output = format!("## {} - {}\n\n", ticket.key, ticket.summary);

    let mut status_line = vec![format!(
        "**Status:** {}",
        ticket.status.as_deref().unwrap_or("unknown")
    )];
    if let Some(issue_type) = &ticket.issue_type {
        status_line.push(format!("**Type:** {}", issue_type));
    }
    if let Some(priority) = &ticket.priority {
        status_line.push(format!("**Priority:** {}", priority));
    }
    output.push_str(&status_line.join(" | "));
    output.push('\n');

    if let Some(assignee) = &ticket.assignee {
        output.push_str(&format!("**Assignee:** {}\n", assignee.label()));
    }
    if !ticket.labels.is_empty() {
        output.push_str(&format!("**Labels:** {}\n", ticket.labels.join(", ")));
    }
    if let Some(updated) = &ticket.updated {
        output.push_str(&format!("**Updated:** {}\n", updated));
    }
    if let Some(desc) = ticket.description.as_deref().filter(|d| !d.is_empty()) {
        output.push_str(&format!("\n{}\n", truncate_text(desc, MAX_DESCRIPTION_LEN)));
    }
    if let Some(url) = &ticket.url {
        output.push_str(&format!("\n🔗 {}\n", url));
    }

    output
}

/// Render a single ticket with every non-empty field.
pub fn ticket_to_markdown(ticket: &Ticket) -> String {
    let mut output = format!("# {} - {}\n\n", ticket.key, ticket.summary);

    let rows: [(&str, Option<&str>); 7] = [
        ("Status", ticket.status.as_deref()),
        ("Status category", ticket.status_category.as_deref()),
        ("Type", ticket.issue_type.as_deref()),
        ("Priority", ticket.priority.as_deref()),
        ("Project", ticket.project_key.as_deref()),
        ("Created", ticket.created.as_deref()),
        ("Updated", ticket.updated.as_deref()),
    ];
    for (label, value) in rows {
        if let Some(value) = value {
            output.push_str(&format!("**{}:** {}\n", label, value));
        }
    }
    if let Some(assignee) = &ticket.assignee {
        output.push_str(&format!("**Assignee:** {}\n", assignee.label()));
    }
    if let Some(reporter) = &ticket.reporter {
        output.push_str(&format!("**Reporter:** {}\n", reporter.label()));
    }
    if !ticket.labels.is_empty() {
        output.push_str(&format!("**Labels:** {}\n", ticket.labels.join(", ")));
    }

    if let Some(desc) = ticket.description.as_deref().filter(|d| !d.is_empty()) {
        output.push_str(&format!("\n## Description\n\n{}\n", desc));
    }

    let fields: Vec<_> = ticket
        .custom_fields
        .iter()
        .filter(|(_, v)| !v.is_null())
        .collect();
    if !fields.is_empty() {
        output.push_str("\n## Other Fields\n\n");
        for (id, value) in fields {
            output.push_str(&format!("- **{}:** {}\n", id, value));
        }
    }

    if let Some(url) = &ticket.url {
        output.push_str(&format!("\n🔗 {}\n", url));
    }

    output
}

pub fn field_update_to_markdown(update: &FieldUpdate) -> String {
    format!(
        "Updated **{}** (`{}`) on {} to: {}",
        update.field_name, update.field_id, update.issue_key, update.value
    )
}

// ============================================================================
// Boards and sprints
// ============================================================================

pub fn boards_to_markdown(boards: &[Board]) -> String {
    if boards.is_empty() {
        return "No boards found.".to_string();
    }

    let mut output = format!("# Boards ({})\n\n", boards.len());
    for board in boards {
        output.push_str(&format!(
            "- **{}** (id: {}, {})",
            board.name,
            board.id,
            board.board_type.as_str()
        ));
        if let Some(project) = &board.project_key {
            output.push_str(&format!(" | project {}", project));
        }
        output.push('\n');
    }
    output
}

pub fn sprints_to_markdown(sprints: &[Sprint]) -> String {
    if sprints.is_empty() {
        return "No sprints found.".to_string();
    }

    let mut output = format!("# Sprints ({})\n\n", sprints.len());
    for sprint in sprints {
        output.push_str(&sprint_line(sprint));
        output.push('\n');
    }
    output
}

fn sprint_line(sprint: &Sprint) -> String {
    let mut line = format!("- **{}** (id: {}, {})", sprint.name, sprint.id, sprint.state);
    match (&sprint.start_date, &sprint.end_date) {
        (Some(start), Some(end)) => {
            line.push_str(&format!(" {} → {}", date_part(start), date_part(end)));
        }
        (Some(start), None) => {
            line.push_str(&format!(" from {}", date_part(start)));
        }
        _ => {}
    }
    if let Some(goal) = sprint.goal.as_deref().filter(|g| !g.is_empty()) {
        line.push_str(&format!("\n  Goal: {}", goal));
    }
    line
}

pub fn sprint_move_to_markdown(key: &str, sprint: &Sprint) -> String {
    format!(
        "Moved {} to sprint **{}** (id: {}, {})",
        key, sprint.name, sprint.id, sprint.state
    )
}

/// Date portion of an ISO timestamp.
fn date_part(timestamp: &str) -> &str {
    timestamp.split('T').next().unwrap_or(timestamp)
}

// ============================================================================
// Merge Requests
// ============================================================================

pub fn merge_requests_to_markdown(mrs: &[MergeRequest]) -> String {
    if mrs.is_empty() {
        return "No merge requests found.".to_string();
    }

    let mut output = String::from("# Merge Requests\n\n");
    for mr in mrs {
        output.push_str(&merge_request_to_markdown(mr, Some(MAX_DESCRIPTION_LEN)));
        output.push('\n');
    }
    output
}

/// Render one merge request; `max_description` truncates the description.
pub fn merge_request_to_markdown(mr: &MergeRequest, max_description: Option<usize>) -> String {
    let draft_marker = if mr.draft { " [DRAFT]" } else { "" };
    let mut output = format!("## {}{} - {}\n\n", mr.key, draft_marker, mr.title);

    output.push_str(&format!("**Branch:** `{}` → `{}`\n", mr.source_branch, mr.target_branch));
    output.push_str(&format!("**State:** {}\n", mr.state));
    if !mr.labels.is_empty() {
        output.push_str(&format!("**Labels:** {}\n", mr.labels.join(", ")));
    }
    if let Some(author) = &mr.author {
        output.push_str(&format!("**Author:** @{}\n", author.username));
    }
    if !mr.assignees.is_empty() {
        output.push_str(&format!("**Assignees:** {}\n", mentions(&mr.assignees)));
    }
    if !mr.reviewers.is_empty() {
        output.push_str(&format!("**Reviewers:** {}\n", mentions(&mr.reviewers)));
    }

    if let Some(desc) = mr.description.as_deref().filter(|d| !d.is_empty()) {
        let desc = match max_description {
            Some(max) => truncate_text(desc, max),
            None => desc.to_string(),
        };
        output.push_str(&format!("\n{}\n", desc));
    }
    if let Some(url) = &mr.url {
        output.push_str(&format!("\n🔗 {}\n", url));
    }

    output
}

fn mentions(users: &[User]) -> String {
    users
        .iter()
        .map(|u| format!("@{}", u.username))
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// File Diffs
// ============================================================================

pub fn diffs_to_markdown(diffs: &[FileDiff]) -> String {
    if diffs.is_empty() {
        return "No file changes.".to_string();
    }

    let mut output = String::from("# Changed Files\n\n");
    for diff in diffs {
        output.push_str(&diff_to_markdown(diff));
        output.push('\n');
    }
    output
}

fn diff_to_markdown(diff: &FileDiff) -> String {
    let status = if diff.new_file {
        "➕"
    } else if diff.deleted_file {
        "➖"
    } else if diff.renamed_file {
        "📝"
    } else {
        "✏️"
    };

    let mut output = format!("## {} {}\n\n", status, diff.file_path);
    if diff.renamed_file {
        if let Some(old_path) = &diff.old_path {
            output.push_str(&format!("Renamed from: `{}`\n", old_path));
        }
    }
    output.push_str(&format!("+{} -{}\n\n", diff.additions, diff.deletions));

    if !diff.hunks.is_empty() {
        output.push_str("```diff\n");
        for hunk in &diff.hunks {
            output.push_str(&hunk_to_text(hunk));
        }
        output.push_str("```\n");
    }

    output
}

/// Hunk lines prefixed with `old new` line number columns.
fn hunk_to_text(hunk: &DiffHunk) -> String {
    let mut output = format!("{}\n", hunk.header);
    for line in &hunk.lines {
        let number = |n: Option<u32>| n.map(|n| n.to_string()).unwrap_or_default();
        let marker = match line.kind {
            LineKind::Add => '+',
            LineKind::Remove => '-',
            LineKind::Context => ' ',
        };
        output.push_str(&format!(
            "{:>5} {:>5} {}{}\n",
            number(line.old_line),
            number(line.new_line),
            marker,
            line.text
        ));
    }
    output
}

// ============================================================================
// Comments
// ============================================================================

pub fn comment_to_markdown(comment: &Comment) -> String {
    let author = comment
        .author
        .as_ref()
        .map(|a| format!("@{}", a.username))
        .unwrap_or_else(|| "unknown".to_string());

    let mut output = match &comment.position {
        Some(position) => {
            let side = match position.side {
                LineSide::New => "new",
                LineSide::Old => "old",
            };
            format!(
                "Added inline comment {} by {} on `{}` line {} ({} side)\n",
                comment.id, author, position.file_path, position.line, side
            )
        }
        None => format!("Added comment {} by {}\n", comment.id, author),
    };
    output.push_str(&format!("\n{}\n", comment.body));
    output
}

/// Truncate text to `max_len` characters, appending an ellipsis.
fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_len).collect();
    format!("{}...", truncated.trim_end())
}
