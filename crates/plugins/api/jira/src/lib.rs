//! Jira provider implementation for tracklens.
//!
//! Supports both Jira Cloud (API v3) and Jira Self-Hosted/Data Center (API v2),
//! plus the Agile 1.0 API for boards and sprints. Field names, option values,
//! sprint names and project tokens supplied by agents are resolved fuzzily
//! against what the instance actually offers.

mod adf;
mod agile;
mod client;
mod fields;
mod jql;
mod types;

pub use adf::{adf_to_text, text_to_adf};
pub use agile::{collect_pages, resolve_sprint_by_name, BoardFilter};
pub use client::{JiraClient, DEFAULT_PAGE_SIZE};
pub use fields::{find_story_points_field, resolve_field_id, select_allowed_value};
pub use jql::{build_jql, escape_jql_string, is_fuzzy_project};
pub use types::*;
