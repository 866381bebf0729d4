//! GitLab provider implementation for tracklens.
//!
//! Merge requests, their diffs (parsed into numbered hunks), and general or
//! inline review comments.

mod client;
mod diff;
mod types;

pub use client::GitLabClient;
pub use diff::{count_changes, parse_unified_diff};

/// Default GitLab API URL.
pub const DEFAULT_GITLAB_URL: &str = "https://gitlab.com";
