//! sortback - sort files into category folders, and undo it
//!
//! This library sorts the files of a directory into category subfolders
//! according to an extension-to-category mapping, resolves name collisions
//! under a configurable policy, and records every move in a commit ledger so
//! the last run can be reversed.

pub mod cli;
pub mod config;
pub mod duplicate;
pub mod file_category;
pub mod file_organizer;
pub mod ledger;
pub mod output;
pub mod run_log;
pub mod undo;

pub use config::{CategoryRule, Config, ConfigError, DuplicatePolicy, UnspecifiedExtensionPolicy};
pub use duplicate::{DecisionProvider, FixedDecision, MergeStrategy, PromptDecisionProvider};
pub use file_category::{CategoryMapper, classify};
pub use file_organizer::{OrganizeReport, Organizer, Plan, organize};
pub use ledger::{CommitLedger, CommitRecord};
pub use run_log::RunLog;
pub use undo::{ReverseReport, Reverser, reverse};
