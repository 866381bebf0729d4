//! Core traits, types, and error handling for tracklens.
//!
//! This crate provides the foundational abstractions used across all tracklens
//! components, including the edit-distance matcher every fuzzy resolver is
//! built on.

pub mod cache;
pub mod config;
pub mod error;
pub mod matching;
pub mod provider;
pub mod types;

pub use cache::TtlCache;
pub use config::Config;
pub use error::{Error, Result};
pub use matching::{best_match, levenshtein, match_within, Match, MatchThreshold};
pub use provider::{MergeRequestProvider, TicketProvider};
pub use types::*;
