use sortback::cli::{Command, run_cli};
use sortback::config::{CategoryRule, Config, DuplicatePolicy, UnspecifiedExtensionPolicy};
use sortback::duplicate::{FixedDecision, PromptDecisionProvider};
use sortback::file_category::date_bucket;
use sortback::file_organizer::Organizer;
use sortback::ledger::{CommitLedger, LEDGER_FILE_NAME, ledger_path};
use sortback::run_log::{LOG_FILE_NAME, RunLog};
use sortback::undo::reverse;
/// Integration tests for sortback
///
/// These tests drive complete organize / reverse cycles against real
/// temporary directories.
///
/// Test categories:
/// 1. Basic organization workflows
/// 2. Duplicate handling
/// 3. Reversal and the commit ledger
/// 4. Configuration and the CLI entry points
use std::collections::BTreeMap;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// A temporary workspace with an `input` and an `output` directory.
struct TestFixture {
    temp_dir: TempDir,
}

impl TestFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::create_dir(temp_dir.path().join("input")).expect("Failed to create input dir");
        TestFixture { temp_dir }
    }

    fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    fn input(&self) -> PathBuf {
        self.root().join("input")
    }

    fn output(&self) -> PathBuf {
        self.root().join("output")
    }

    fn create_input_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.input().join(name);
        fs::write(&path, content).expect("Failed to write input file");
        path
    }

    fn create_output_file(&self, rel_path: &str, content: &str) -> PathBuf {
        let path = self.output().join(rel_path);
        fs::create_dir_all(path.parent().unwrap()).expect("Failed to create output dirs");
        fs::write(&path, content).expect("Failed to write output file");
        path
    }

    fn write_config(&self, json: &str) -> PathBuf {
        let path = self.root().join("config.json");
        fs::write(&path, json).expect("Failed to write config");
        path
    }

    fn read(&self, path: &Path) -> String {
        fs::read_to_string(path).expect("Failed to read file")
    }

    /// Every regular file under the fixture root (ledger and log excluded)
    /// mapped to its content.
    fn snapshot(&self) -> BTreeMap<PathBuf, String> {
        let mut files = BTreeMap::new();
        Self::walk(self.root(), &mut files);
        files
    }

    fn walk(dir: &Path, files: &mut BTreeMap<PathBuf, String>) {
        if let Ok(entries) = fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    Self::walk(&path, files);
                } else {
                    let name = entry.file_name();
                    if name == LEDGER_FILE_NAME || name == LOG_FILE_NAME || name == "config.json" {
                        continue;
                    }
                    files.insert(path.clone(), fs::read_to_string(&path).unwrap_or_default());
                }
            }
        }
    }

    fn organize(&self, config: &Config) -> sortback::OrganizeReport {
        let log = RunLog::memory();
        Organizer::new(config, &log)
            .with_decision_provider(FixedDecision(DuplicatePolicy::DoNothing))
            .organize(&self.input(), &self.output())
            .expect("Organize failed")
    }

    fn reverse(&self) -> sortback::ReverseReport {
        let log = RunLog::memory();
        reverse(&self.output(), &log).expect("Reverse failed")
    }
}

fn standard_config() -> Config {
    Config {
        categories: vec![
            CategoryRule::new("Documents", ["pdf", "docx", "txt"]),
            CategoryRule::new("Images", ["png", "jpg", "gif"]),
            CategoryRule::new("Audio", ["mp3", "wav"]),
        ],
        ..Default::default()
    }
}

const STANDARD_CONFIG_JSON: &str = r#"{
    "categories": [
        { "category": "Documents", "extensions": ["pdf", "docx", "txt"] },
        { "category": "Images", "extensions": ["png", "jpg", "gif"] }
    ],
    "duplicate_policy": "do_nothing",
    "unspecified_extension_policy": "do_nothing",
    "date_bucketing": false
}"#;

// ============================================================================
// Test Suite 1: Basic Organization
// ============================================================================

#[test]
fn test_matched_files_land_in_their_category() {
    let fixture = TestFixture::new();
    let report_pdf = fixture.create_input_file("report.pdf", "pdf");
    let photo = fixture.create_input_file("photo.png", "png");
    let song = fixture.create_input_file("song.mp3", "mp3");

    let report = fixture.organize(&standard_config());

    assert_eq!(report.moved.len(), 3);
    assert!(!report_pdf.exists());
    assert!(!photo.exists());
    assert!(!song.exists());
    assert_eq!(fixture.read(&fixture.output().join("Documents/report.pdf")), "pdf");
    assert_eq!(fixture.read(&fixture.output().join("Images/photo.png")), "png");
    assert_eq!(fixture.read(&fixture.output().join("Audio/song.mp3")), "mp3");
}

#[test]
fn test_first_matching_rule_wins() {
    let fixture = TestFixture::new();
    fixture.create_input_file("scan.pdf", "scan");

    let mut config = standard_config();
    config.categories.push(CategoryRule::new("Scans", ["pdf"]));
    config.categories.insert(0, CategoryRule::new("Papers", ["PDF"]));

    fixture.organize(&config);

    assert!(fixture.output().join("Papers/scan.pdf").exists());
    assert!(!fixture.output().join("Documents").exists());
    assert!(!fixture.output().join("Scans").exists());
}

#[test]
fn test_extension_matching_ignores_case() {
    let fixture = TestFixture::new();
    fixture.create_input_file("REPORT.PDF", "upper");
    fixture.create_input_file("notes.Txt", "mixed");

    fixture.organize(&standard_config());

    assert!(fixture.output().join("Documents/REPORT.PDF").exists());
    assert!(fixture.output().join("Documents/notes.Txt").exists());
}

#[test]
fn test_unmatched_file_stays_by_default() {
    let fixture = TestFixture::new();
    let data = fixture.create_input_file("data.xyz", "???");

    let report = fixture.organize(&standard_config());

    assert!(data.exists());
    assert_eq!(report.unmatched, vec![data]);
    assert!(report.moved.is_empty());
    assert!(!fixture.output().join("Other").exists());
}

#[test]
fn test_unmatched_file_moves_to_other() {
    let fixture = TestFixture::new();
    fixture.create_input_file("data.xyz", "???");
    fixture.create_input_file("Makefile", "all:");

    let mut config = standard_config();
    config.unspecified_extension_policy = UnspecifiedExtensionPolicy::MoveToOther;
    fixture.organize(&config);

    assert!(fixture.output().join("Other/data.xyz").exists());
    assert!(fixture.output().join("Other/Makefile").exists());
}

#[test]
fn test_date_bucketing_uses_modification_date() {
    let fixture = TestFixture::new();
    let photo = fixture.create_input_file("photo.png", "png");
    let bucket = date_bucket(&photo).unwrap();

    let mut config = standard_config();
    config.date_bucketing = true;
    config.unspecified_extension_policy = UnspecifiedExtensionPolicy::MoveToOther;
    let data = fixture.create_input_file("data.xyz", "???");
    let data_bucket = date_bucket(&data).unwrap();
    fixture.organize(&config);

    assert!(fixture.output().join("Images").join(&bucket).join("photo.png").exists());
    assert!(fixture.output().join("Other").join(&data_bucket).join("data.xyz").exists());
}

#[test]
fn test_missing_input_directory_is_not_an_error() {
    let fixture = TestFixture::new();
    fs::remove_dir(fixture.input()).unwrap();

    let report = fixture.organize(&standard_config());

    assert_eq!(report.files_seen, 0);
    assert!(!ledger_path(&fixture.output()).exists());
}

#[test]
fn test_empty_input_directory_writes_no_ledger() {
    let fixture = TestFixture::new();
    let log = RunLog::memory();

    let report = Organizer::new(&standard_config(), &log)
        .organize(&fixture.input(), &fixture.output())
        .unwrap();

    assert!(!report.ledger_written);
    assert!(!ledger_path(&fixture.output()).exists());
    assert!(log.contains(log::Level::Info, "no files"));
}

// ============================================================================
// Test Suite 2: Duplicate Handling
// ============================================================================

#[test]
fn test_replace_policy_overwrites_destination() {
    let fixture = TestFixture::new();
    let source = fixture.create_input_file("report.pdf", "incoming");
    let existing = fixture.create_output_file("Documents/report.pdf", "existing");

    let mut config = standard_config();
    config.duplicate_policy = Some(DuplicatePolicy::Replace);
    let report = fixture.organize(&config);

    assert!(!source.exists());
    assert_eq!(fixture.read(&existing), "incoming");
    assert_eq!(report.moved.len(), 1);

    let ledger = CommitLedger::load(&ledger_path(&fixture.output()))
        .unwrap()
        .unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.records()[0].previous, source);
    assert_eq!(ledger.records()[0].current, existing);
}

#[test]
fn test_do_nothing_policy_leaves_both_files() {
    let fixture = TestFixture::new();
    let source = fixture.create_input_file("report.pdf", "incoming");
    let existing = fixture.create_output_file("Documents/report.pdf", "existing");
    fixture.create_input_file("photo.png", "png");

    let mut config = standard_config();
    config.duplicate_policy = Some(DuplicatePolicy::DoNothing);
    let report = fixture.organize(&config);

    assert_eq!(fixture.read(&source), "incoming");
    assert_eq!(fixture.read(&existing), "existing");
    assert_eq!(report.skipped, vec![source.clone()]);

    let ledger = CommitLedger::load(&ledger_path(&fixture.output()))
        .unwrap()
        .unwrap();
    assert_eq!(ledger.len(), 1);
    assert!(ledger.records().iter().all(|r| r.previous != source));
}

#[test]
fn test_interactive_decision_is_used_without_policy() {
    let fixture = TestFixture::new();
    let source = fixture.create_input_file("report.pdf", "incoming");
    let existing = fixture.create_output_file("Documents/report.pdf", "existing");

    let config = standard_config();
    let log = RunLog::memory();
    let prompt = PromptDecisionProvider::new(Cursor::new("keep\nreplace\n"), Vec::new());
    let report = Organizer::new(&config, &log)
        .with_decision_provider(prompt)
        .organize(&fixture.input(), &fixture.output())
        .unwrap();

    assert!(!source.exists());
    assert_eq!(fixture.read(&existing), "incoming");
    assert_eq!(report.moved.len(), 1);
}

#[test]
fn test_closed_prompt_fails_only_that_file() {
    let fixture = TestFixture::new();
    let source = fixture.create_input_file("report.pdf", "incoming");
    fixture.create_output_file("Documents/report.pdf", "existing");
    fixture.create_input_file("photo.png", "png");

    let config = standard_config();
    let log = RunLog::memory();
    let prompt = PromptDecisionProvider::new(Cursor::new(""), Vec::new());
    let report = Organizer::new(&config, &log)
        .with_decision_provider(prompt)
        .organize(&fixture.input(), &fixture.output())
        .unwrap();

    assert_eq!(report.failures.len(), 1);
    assert!(source.exists());
    assert!(fixture.output().join("Images/photo.png").exists());
}

// ============================================================================
// Test Suite 3: Reversal and the Ledger
// ============================================================================

#[test]
fn test_reverse_restores_original_paths() {
    let fixture = TestFixture::new();
    fixture.create_input_file("report.pdf", "pdf");
    fixture.create_input_file("photo.png", "png");
    fixture.create_input_file("data.xyz", "???");
    let before = fixture.snapshot();

    fixture.organize(&standard_config());
    assert_ne!(fixture.snapshot(), before);

    let report = fixture.reverse();

    assert_eq!(report.restored_files, 2);
    assert_eq!(fixture.snapshot(), before);
}

#[test]
fn test_reverse_twice_matches_reverse_once() {
    let fixture = TestFixture::new();
    fixture.create_input_file("report.pdf", "pdf");
    fixture.create_input_file("photo.png", "png");

    fixture.organize(&standard_config());
    fixture.reverse();
    let after_once = fixture.snapshot();

    let second = fixture.reverse();

    assert_eq!(second.restored_files, 0);
    assert_eq!(fixture.snapshot(), after_once);
}

#[test]
fn test_repeated_round_trips_leave_state_unchanged() {
    let fixture = TestFixture::new();
    fixture.create_input_file("report.pdf", "pdf");
    fixture.create_input_file("photo.png", "png");
    fixture.create_input_file("song.mp3", "mp3");
    let before = fixture.snapshot();

    for _ in 0..3 {
        fixture.organize(&standard_config());
        fixture.reverse();
        assert_eq!(fixture.snapshot(), before);
    }
}

#[test]
fn test_second_run_overwrites_ledger() {
    let fixture = TestFixture::new();
    let first = fixture.create_input_file("report.pdf", "pdf");
    fixture.organize(&standard_config());

    let second = fixture.create_input_file("photo.png", "png");
    fixture.organize(&standard_config());

    fixture.reverse();

    assert!(second.exists(), "second run's move should be reversed");
    assert!(!first.exists(), "first run's move is no longer recoverable");
    assert!(fixture.output().join("Documents/report.pdf").exists());
}

#[test]
fn test_reverse_without_ledger_succeeds() {
    let fixture = TestFixture::new();
    let report = fixture.reverse();

    assert!(!report.ledger_found);
    assert_eq!(report.restored_files, 0);
}

#[test]
fn test_reverse_keeps_ledger_file() {
    let fixture = TestFixture::new();
    fixture.create_input_file("report.pdf", "pdf");
    fixture.organize(&standard_config());

    fixture.reverse();

    let ledger = CommitLedger::load(&ledger_path(&fixture.output()))
        .unwrap()
        .unwrap();
    assert_eq!(ledger.len(), 1);
}

// ============================================================================
// Test Suite 4: Configuration and CLI
// ============================================================================

#[test]
fn test_cli_organize_and_reverse() {
    let fixture = TestFixture::new();
    let config_path = fixture.write_config(STANDARD_CONFIG_JSON);
    let report_pdf = fixture.create_input_file("report.pdf", "pdf");
    let before = fixture.snapshot();

    run_cli(Command::Organize {
        input: fixture.input(),
        output: fixture.output(),
        config: Some(config_path),
        on_duplicate: None,
        dry_run: false,
    })
    .expect("organize should succeed");

    assert!(!report_pdf.exists());
    assert!(fixture.output().join("Documents/report.pdf").exists());
    assert!(fixture.output().join(LOG_FILE_NAME).exists());
    assert!(ledger_path(&fixture.output()).exists());

    run_cli(Command::Reverse {
        output: fixture.output(),
    })
    .expect("reverse should succeed");

    assert_eq!(fixture.snapshot(), before);

    let log_text = fixture.read(&fixture.output().join(LOG_FILE_NAME));
    assert!(log_text.contains("File automation started."));
    assert!(log_text.contains("Reversal of changes completed."));
}

#[test]
fn test_cli_dry_run_changes_nothing() {
    let fixture = TestFixture::new();
    let config_path = fixture.write_config(STANDARD_CONFIG_JSON);
    fixture.create_input_file("report.pdf", "pdf");
    fixture.create_input_file("photo.png", "png");
    let before = fixture.snapshot();

    run_cli(Command::Organize {
        input: fixture.input(),
        output: fixture.output(),
        config: Some(config_path),
        on_duplicate: None,
        dry_run: true,
    })
    .expect("dry run should succeed");

    assert_eq!(fixture.snapshot(), before);
    assert!(!fixture.output().exists());
}

#[test]
fn test_cli_unreadable_config_categorizes_nothing() {
    let fixture = TestFixture::new();
    let config_path = fixture.write_config("{ this is not json");
    let report_pdf = fixture.create_input_file("report.pdf", "pdf");

    run_cli(Command::Organize {
        input: fixture.input(),
        output: fixture.output(),
        config: Some(config_path),
        on_duplicate: None,
        dry_run: false,
    })
    .expect("a bad config must not abort the run");

    assert!(report_pdf.exists());
    let log_text = fixture.read(&fixture.output().join(LOG_FILE_NAME));
    assert!(log_text.contains("Error loading config file"));
}

#[test]
fn test_cli_reports_per_file_failures() {
    let fixture = TestFixture::new();
    let config_path = fixture.write_config(STANDARD_CONFIG_JSON);
    let source = fixture.create_input_file("report.pdf", "incoming");
    fixture.create_output_file("Documents/report.pdf", "existing");
    fixture.create_input_file("photo.png", "png");

    let result = run_cli(Command::Organize {
        input: fixture.input(),
        output: fixture.output(),
        config: Some(config_path),
        on_duplicate: Some(DuplicatePolicy::Merge),
        dry_run: false,
    });

    assert!(result.is_err());
    assert!(source.exists());
    assert!(fixture.output().join("Images/photo.png").exists());

    let ledger = CommitLedger::load(&ledger_path(&fixture.output()))
        .unwrap()
        .unwrap();
    assert_eq!(ledger.len(), 1);
}

#[test]
fn test_filters_exclude_files_from_pass() {
    let fixture = TestFixture::new();
    let config = Config::from_json_str(
        r#"{
            "categories": [{ "category": "Documents", "extensions": ["txt", "pdf"] }],
            "filters": {
                "enable_hidden_files": false,
                "exclude": { "patterns": ["draft_*"] }
            }
        }"#,
    )
    .unwrap();
    let hidden = fixture.create_input_file(".secret.txt", "hidden");
    let draft = fixture.create_input_file("draft_plan.pdf", "draft");
    fixture.create_input_file("final.pdf", "final");

    let report = fixture.organize(&config);

    assert_eq!(report.files_seen, 1);
    assert!(hidden.exists());
    assert!(draft.exists());
    assert!(fixture.output().join("Documents/final.pdf").exists());
}
