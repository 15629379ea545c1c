//! Category mapping for individual files.
//!
//! This module turns a file name plus the configured rules into a destination
//! directory under the output root:
//! `<output_root>/<category>[/<YYYY-MM-DD>]/<file name>`.
//!
//! # Examples
//!
//! ```
//! use sortback::config::CategoryRule;
//! use sortback::file_category::classify;
//!
//! let rules = vec![
//!     CategoryRule::new("Documents", ["pdf", "txt"]),
//!     CategoryRule::new("Images", ["png"]),
//! ];
//! assert_eq!(classify("REPORT.PDF", &rules), Some("Documents"));
//! assert_eq!(classify("photo.png", &rules), Some("Images"));
//! assert_eq!(classify("song.mp3", &rules), None);
//! ```

use crate::config::{CategoryRule, Config, UnspecifiedExtensionPolicy};
use chrono::{DateTime, Local};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Category used for unmatched files under `move_to_other`.
pub const OTHER_CATEGORY: &str = "Other";

/// Returns the lower-cased extension of `file_name` without the dot.
///
/// Names without an extension, including dotfiles such as `.bashrc`, yield `""`.
pub fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Returns the category of the first rule that lists the extension of `file_name`.
///
/// A file without an extension only matches a rule that explicitly lists `""`.
pub fn classify<'a>(file_name: &str, rules: &'a [CategoryRule]) -> Option<&'a str> {
    let extension = extension_of(file_name);
    rules
        .iter()
        .find(|rule| rule.matches(&extension))
        .map(|rule| rule.category.as_str())
}

/// Formats the local modification date of `path` as `YYYY-MM-DD`.
pub fn date_bucket(path: &Path) -> io::Result<String> {
    let modified = fs::metadata(path)?.modified()?;
    let local: DateTime<Local> = modified.into();
    Ok(local.format("%Y-%m-%d").to_string())
}

/// Where a file should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// The category name, `Other` for unmatched files.
    pub category: String,
    /// Directory the file will live in, including the date bucket.
    pub directory: PathBuf,
    /// Full destination path.
    pub destination: PathBuf,
    /// True when no rule matched and the file is routed to `Other`.
    pub fallback: bool,
}

/// Resolves destinations for files according to one run's configuration.
#[derive(Debug, Clone)]
pub struct CategoryMapper<'a> {
    config: &'a Config,
    output_root: PathBuf,
}

impl<'a> CategoryMapper<'a> {
    pub fn new(config: &'a Config, output_root: impl Into<PathBuf>) -> Self {
        Self {
            config,
            output_root: output_root.into(),
        }
    }

    /// Computes the placement of `file_path`.
    ///
    /// Returns `Ok(None)` when no rule matches and the unspecified-extension
    /// policy is `do_nothing`; the file stays where it is. Nothing is created on
    /// disk; see [`ensure_directory`] for that.
    pub fn place(&self, file_path: &Path) -> io::Result<Option<Placement>> {
        let file_name = match file_path.file_name() {
            Some(name) => name,
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{} has no file name component", file_path.display()),
                ));
            }
        };
        let name = file_name.to_string_lossy();

        let (category, fallback) = match classify(&name, &self.config.categories) {
            Some(category) => (category.to_string(), false),
            None => match self.config.unspecified_extension_policy {
                UnspecifiedExtensionPolicy::MoveToOther => (OTHER_CATEGORY.to_string(), true),
                UnspecifiedExtensionPolicy::DoNothing => return Ok(None),
            },
        };

        let mut directory = self.output_root.join(&category);
        if self.config.date_bucketing {
            directory.push(date_bucket(file_path)?);
        }
        let destination = directory.join(file_name);

        Ok(Some(Placement {
            category,
            directory,
            destination,
            fallback,
        }))
    }
}

/// Creates `directory` and any missing parents. Existing directories are fine.
pub fn ensure_directory(directory: &Path) -> io::Result<()> {
    fs::create_dir_all(directory)
}
