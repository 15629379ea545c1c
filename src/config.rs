//! Category mapping configuration.
//!
//! The configuration is a JSON (or TOML) document describing which extensions
//! belong to which category, what to do on name collisions, what to do with
//! files no rule claims, and whether to bucket files by modification date.
//!
//! # Configuration File Format
//!
//! ```json
//! {
//!   "categories": [
//!     { "category": "Documents", "extensions": ["pdf", "docx", "txt"] },
//!     { "category": "Images", "extensions": ["png", "jpg"] }
//!   ],
//!   "duplicate_policy": "replace",
//!   "unspecified_extension_policy": "move_to_other",
//!   "date_bucketing": false
//! }
//! ```
//!
//! An optional `filters` table restricts which files a pass may touch:
//!
//! ```toml
//! [filters]
//! enable_hidden_files = false
//!
//! [filters.exclude]
//! filenames = [".DS_Store", "Thumbs.db"]
//! patterns = ["*.part"]
//! extensions = ["tmp"]
//! regex = []
//!
//! [filters.include]
//! patterns = []
//! ```

use crate::run_log::RunLog;
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while reading or validating a configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),
    #[error("Category rule #{index} has an empty category name")]
    EmptyCategoryName { index: usize },
    #[error("Invalid glob pattern '{0}'")]
    InvalidGlobPattern(String),
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },
    #[error("IO error reading configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// What to do when the destination path of a move is already occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    Merge,
    Replace,
    DoNothing,
}

impl DuplicatePolicy {
    /// Parses the textual form used by the config document and the prompt.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "merge" => Some(Self::Merge),
            "replace" => Some(Self::Replace),
            "do_nothing" => Some(Self::DoNothing),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Replace => "replace",
            Self::DoNothing => "do_nothing",
        }
    }
}

impl std::fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do with a file whose extension no rule lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnspecifiedExtensionPolicy {
    /// Leave the file where it is.
    #[default]
    DoNothing,
    /// Move the file into the `Other` category.
    MoveToOther,
}

/// A named category and the extensions it claims.
///
/// Extensions are stored lower-cased and without a leading dot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: String,
    pub extensions: HashSet<String>,
}

impl CategoryRule {
    /// Builds a rule, normalizing every extension.
    pub fn new<I, S>(category: impl Into<String>, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            category: category.into(),
            extensions: extensions
                .into_iter()
                .map(|ext| normalize_extension(ext.as_ref()))
                .collect(),
        }
    }

    pub fn matches(&self, extension: &str) -> bool {
        self.extensions.contains(extension)
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

/// Validated, immutable configuration for one run.
///
/// `Config::default()` is the empty configuration: no categories, no duplicate
/// policy, unmatched files left in place, no date buckets, no filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawConfig")]
pub struct Config {
    /// Ordered rules; the first rule listing an extension wins.
    pub categories: Vec<CategoryRule>,
    /// Run-level duplicate policy. `None` means ask the decision provider.
    pub duplicate_policy: Option<DuplicatePolicy>,
    pub unspecified_extension_policy: UnspecifiedExtensionPolicy,
    /// Insert a `YYYY-MM-DD` directory (file modification date) below the category.
    pub date_bucketing: bool,
    pub filters: FilterRules,
}

/// The document as written on disk, before validation.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    categories: Vec<RawCategoryRule>,
    #[serde(default)]
    duplicate_policy: Option<DuplicatePolicy>,
    #[serde(default)]
    strict_mode: Option<StrictMode>,
    #[serde(default, alias = "unspecified_extension_handling")]
    unspecified_extension_policy: UnspecifiedExtensionPolicy,
    #[serde(default, alias = "time_conscious")]
    date_bucketing: bool,
    #[serde(default)]
    filters: FilterRules,
}

#[derive(Debug, Deserialize)]
struct RawCategoryRule {
    category: String,
    #[serde(default)]
    extensions: Vec<String>,
}

/// Older documents nest the duplicate policy under `strict_mode`.
///
/// A non-empty `strict_mode` table without `duplicate_handling` means
/// `do_nothing`; an empty one leaves the policy unset.
#[derive(Debug, Deserialize)]
struct StrictMode {
    duplicate_handling: Option<DuplicatePolicy>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

impl StrictMode {
    fn policy(self) -> Option<DuplicatePolicy> {
        match self.duplicate_handling {
            Some(policy) => Some(policy),
            None if !self.other.is_empty() => Some(DuplicatePolicy::DoNothing),
            None => None,
        }
    }
}

impl TryFrom<RawConfig> for Config {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let categories = raw
            .categories
            .into_iter()
            .enumerate()
            .map(|(index, rule)| {
                if rule.category.trim().is_empty() {
                    return Err(ConfigError::EmptyCategoryName { index });
                }
                Ok(CategoryRule::new(rule.category, rule.extensions))
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Reject broken patterns at load time rather than mid-run.
        FileFilters::compile(&raw.filters)?;

        let duplicate_policy = raw
            .duplicate_policy
            .or_else(|| raw.strict_mode.and_then(StrictMode::policy));

        Ok(Self {
            categories,
            duplicate_policy,
            unspecified_extension_policy: raw.unspecified_extension_policy,
            date_bucketing: raw.date_bucketing,
            filters: raw.filters,
        })
    }
}

impl Config {
    /// Loads the configuration at `path`, degrading to the empty configuration.
    ///
    /// A missing file, an unreadable file, a malformed document, or a rule with an
    /// empty category name is logged as an error and yields `Config::default()`.
    /// This never fails outward: an unreadable config means nothing is categorized.
    pub fn load(path: &Path, log: &RunLog) -> Self {
        match Self::try_load(path) {
            Ok(config) => {
                log.info(format!(
                    "Loaded configuration from {} ({} categories)",
                    path.display(),
                    config.categories.len()
                ));
                config
            }
            Err(e) => {
                log.error(format!("Error loading config file: {}", e));
                Self::default()
            }
        }
    }

    /// Loads the configuration at `path`, surfacing the failure.
    ///
    /// Files ending in `.toml` are parsed as TOML, everything else as JSON.
    pub fn try_load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// Resolves which configuration file to use.
    ///
    /// Search order:
    /// 1. `explicit`, if given (even if it does not exist, so the miss is logged)
    /// 2. `sortback.json` in the current directory
    /// 3. `.sortbackrc.toml` in the current directory
    /// 4. `~/.config/sortback/config.toml`
    ///
    /// Returns `None` when nothing is found; callers fall back to the empty config.
    pub fn discover(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }

        for local in ["sortback.json", ".sortbackrc.toml"] {
            let candidate = PathBuf::from(local);
            if candidate.exists() {
                return Some(candidate);
            }
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("sortback")
                .join("config.toml");
            if home_config.exists() {
                return Some(home_config);
            }
        }

        None
    }

    /// Compiles the filter rules. Patterns were validated on load, so this only
    /// fails for configurations built in code.
    pub fn file_filters(&self) -> Result<FileFilters, ConfigError> {
        FileFilters::compile(&self.filters)
    }
}

/// Rules restricting which files a pass may touch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether files starting with "." are organized. Defaults to true.
    #[serde(default = "default_enable_hidden_files")]
    pub enable_hidden_files: bool,
    #[serde(default)]
    pub exclude: ExcludeRules,
    /// Include rules win over every exclusion.
    #[serde(default)]
    pub include: IncludeRules,
}

fn default_enable_hidden_files() -> bool {
    true
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            enable_hidden_files: default_enable_hidden_files(),
            exclude: ExcludeRules::default(),
            include: IncludeRules::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExcludeRules {
    #[serde(default)]
    pub filenames: Vec<String>,
    /// Glob patterns matched against the file name.
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub regex: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncludeRules {
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// Compiled form of [`FilterRules`].
#[derive(Debug, Clone)]
pub struct FileFilters {
    enable_hidden_files: bool,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

impl FileFilters {
    pub fn compile(rules: &FilterRules) -> Result<Self, ConfigError> {
        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            enable_hidden_files: rules.enable_hidden_files,
            exclude_filenames: rules.exclude.filenames.iter().cloned().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| normalize_extension(ext))
                .collect(),
            exclude_patterns: compile_globs(&rules.exclude.patterns)?,
            exclude_regexes,
            include_patterns: compile_globs(&rules.include.patterns)?,
        })
    }

    /// Decides whether the file called `file_name` takes part in the pass.
    ///
    /// Include patterns are checked first and short-circuit to true. After that
    /// hidden files, exact names, extensions, globs and regexes can each exclude.
    pub fn admits(&self, file_name: &str) -> bool {
        if self.include_patterns.iter().any(|p| p.matches(file_name)) {
            return true;
        }

        if !self.enable_hidden_files && file_name.starts_with('.') {
            return false;
        }

        if self.exclude_filenames.contains(file_name) {
            return false;
        }

        if let Some((_, ext)) = file_name.rsplit_once('.')
            && self.exclude_extensions.contains(&ext.to_lowercase())
        {
            return false;
        }

        !(self.exclude_patterns.iter().any(|p| p.matches(file_name))
            || self.exclude_regexes.iter().any(|r| r.is_match(file_name)))
    }
}

fn compile_globs(patterns: &[String]) -> Result<Vec<Pattern>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
        })
        .collect()
}
