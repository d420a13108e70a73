//! Integration tests for the SecretZero vault writer.
//!
//! These run against an in-memory `VaultApi` that behaves like the remote
//! service: folders and secrets are create-only and report conflicts.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use regex::Regex;

use secretzero::errors::SecretZeroError;
use secretzero::vault::writer::DUPLICATE_COMMENT_SUFFIX;
use secretzero::vault::{ApiOutcome, SecretRecord, VaultApi, VaultSecret, VaultWriter};

#[derive(Default)]
struct FakeVault {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    folders: HashSet<String>,
    /// (path, key) -> (value, comment)
    secrets: BTreeMap<(String, String), (String, String)>,
    calls: Vec<String>,
    fail_key: Option<String>,
    always_conflict: bool,
}

impl FakeVault {
    fn with_secret(self, path: &str, key: &str, value: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .secrets
            .insert((path.into(), key.into()), (value.into(), "original".into()));
        self
    }

    fn failing_on(self, key: &str) -> Self {
        self.state.lock().unwrap().fail_key = Some(key.into());
        self
    }

    fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn secret(&self, path: &str, key: &str) -> Option<(String, String)> {
        self.state
            .lock()
            .unwrap()
            .secrets
            .get(&(path.to_string(), key.to_string()))
            .cloned()
    }
}

impl VaultApi for FakeVault {
    fn create_folder(&self, parent: &str, name: &str) -> ApiOutcome {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("folder {parent}{name}"));
        if state.folders.insert(name.to_string()) {
            ApiOutcome::Created
        } else {
            ApiOutcome::Conflict
        }
    }

    fn create_secret(&self, secret: &VaultSecret) -> ApiOutcome {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("secret {}", secret.key));

        if state.fail_key.as_deref() == Some(secret.key.as_str()) {
            return ApiOutcome::Failed("HTTP 500: boom".into());
        }
        let id = (secret.path.clone(), secret.key.clone());
        if state.always_conflict || state.secrets.contains_key(&id) {
            return ApiOutcome::Conflict;
        }
        state
            .secrets
            .insert(id, (secret.value.as_str().to_string(), secret.comment.clone()));
        ApiOutcome::Created
    }
}

fn full_record() -> SecretRecord {
    SecretRecord::new("https://app.hubspot.com")
        .unwrap()
        .with_login("ops@acme.test")
        .with_password("hunter2")
        .with_api_token("pat-na1-123")
}

// ---------------------------------------------------------------------------
// Folders
// ---------------------------------------------------------------------------

#[test]
fn ensure_folder_creates_then_accepts_existing() {
    let vault = FakeVault::default();
    let writer = VaultWriter::new(&vault);

    writer.ensure_folder("/acme").unwrap();
    writer.ensure_folder("/acme").unwrap();

    assert_eq!(vault.calls(), vec!["folder /acme", "folder /acme"]);
}

#[test]
fn nested_paths_are_rejected_before_any_call() {
    let vault = FakeVault::default();
    let writer = VaultWriter::new(&vault);

    for path in ["/acme/team", "acme", "/", "", "//acme"] {
        let err = writer.ensure_folder(path).unwrap_err();
        assert!(matches!(err, SecretZeroError::InvalidPath(_)), "{path}: {err:?}");
    }
    let err = writer.create_secret("/a/b", "KEY", "v", "c").unwrap_err();
    assert!(matches!(err, SecretZeroError::InvalidPath(_)));

    assert!(vault.calls().is_empty());
}

// ---------------------------------------------------------------------------
// Collision handling
// ---------------------------------------------------------------------------

#[test]
fn new_secret_keeps_its_key() {
    let vault = FakeVault::default();
    let writer = VaultWriter::new(&vault);

    let key = writer.create_secret("/acme", "GITHUB_URL", "https://github.com/", "note").unwrap();
    assert_eq!(key, "GITHUB_URL");
    assert_eq!(vault.secret("/acme", "GITHUB_URL").unwrap().1, "note");
}

#[test]
fn conflicting_secret_gets_timestamp_suffix() {
    let vault = FakeVault::default().with_secret("/acme", "KEY", "old");
    let writer = VaultWriter::new(&vault);

    let key = writer.create_secret("/acme", "KEY", "new", "Deposited").unwrap();

    let pattern = Regex::new(r"^KEY_\d{8}_\d{6}$").unwrap();
    assert!(pattern.is_match(&key), "unexpected key {key}");

    let (value, comment) = vault.secret("/acme", &key).unwrap();
    assert_eq!(value, "new");
    assert_eq!(comment, format!("Deposited{DUPLICATE_COMMENT_SUFFIX}"));

    // The existing secret is untouched.
    assert_eq!(vault.secret("/acme", "KEY").unwrap().0, "old");
}

#[test]
fn second_conflict_is_an_error() {
    let vault = FakeVault::default();
    vault.state.lock().unwrap().always_conflict = true;
    let writer = VaultWriter::new(&vault);

    let err = writer.create_secret("/acme", "KEY", "v", "c").unwrap_err();
    assert!(matches!(err, SecretZeroError::VaultConflict(_)));
    assert_eq!(vault.calls().len(), 2, "exactly one retry");
}

#[test]
fn other_failures_are_not_retried() {
    let vault = FakeVault::default().failing_on("KEY");
    let writer = VaultWriter::new(&vault);

    let err = writer.create_secret("/acme", "KEY", "v", "c").unwrap_err();
    assert!(matches!(err, SecretZeroError::VaultRequest(_)));
    assert_eq!(vault.calls(), vec!["secret KEY"]);
}

// ---------------------------------------------------------------------------
// Deposits
// ---------------------------------------------------------------------------

#[test]
fn full_deposit_writes_four_keys_in_order() {
    let vault = FakeVault::default();
    let writer = VaultWriter::new(&vault);

    let result = writer.deposit_secrets("acme", "HUBSPOT", &full_record()).unwrap();

    assert_eq!(result.secrets_count, 4);
    assert_eq!(
        result.created_keys,
        vec!["HUBSPOT_URL", "HUBSPOT_LOGIN", "HUBSPOT_PASSWORD", "HUBSPOT_API_TOKEN"]
    );
    assert_eq!(vault.calls()[0], "folder /acme");
    assert_eq!(vault.secret("/acme", "HUBSPOT_PASSWORD").unwrap().0, "hunter2");
    assert_eq!(vault.secret("/acme", "HUBSPOT_URL").unwrap().0, "https://app.hubspot.com/");

    let comment = vault.secret("/acme", "HUBSPOT_API_TOKEN").unwrap().1;
    let pattern = Regex::new(r"^Deposited via SecretZero - \d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{3}Z$").unwrap();
    assert!(pattern.is_match(&comment), "unexpected comment {comment}");
}

#[test]
fn url_only_deposit_writes_one_key() {
    let vault = FakeVault::default();
    let writer = VaultWriter::new(&vault);
    let record = SecretRecord::new("https://github.com").unwrap().with_login("");

    let result = writer.deposit_secrets("acme", "GITHUB", &record).unwrap();

    assert_eq!(result.secrets_count, 1);
    assert_eq!(result.created_keys, vec!["GITHUB_URL"]);
}

#[test]
fn partial_deposit_reports_written_keys() {
    let vault = FakeVault::default().failing_on("HUBSPOT_LOGIN");
    let writer = VaultWriter::new(&vault);

    let err = writer.deposit_secrets("acme", "HUBSPOT", &full_record()).unwrap_err();

    match err {
        SecretZeroError::VaultWriteFailed { created_keys, reason } => {
            assert_eq!(created_keys, vec!["HUBSPOT_URL"]);
            assert!(reason.contains("HUBSPOT_LOGIN"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // Nothing after the failure was attempted.
    assert!(!vault.calls().iter().any(|c| c.contains("PASSWORD")));
}

#[test]
fn deposit_with_existing_keys_renames_only_the_conflicts() {
    let vault = FakeVault::default().with_secret("/acme", "HUBSPOT_URL", "old");
    let writer = VaultWriter::new(&vault);

    let result = writer.deposit_secrets("acme", "HUBSPOT", &full_record()).unwrap();

    assert_eq!(result.secrets_count, 4);
    assert!(Regex::new(r"^HUBSPOT_URL_\d{8}_\d{6}$").unwrap().is_match(&result.created_keys[0]));
    assert_eq!(&result.created_keys[1..], ["HUBSPOT_LOGIN", "HUBSPOT_PASSWORD", "HUBSPOT_API_TOKEN"]);
}

#[test]
fn bad_org_slug_fails_before_network() {
    let vault = FakeVault::default();
    let writer = VaultWriter::new(&vault);

    let err = writer.deposit_secrets("acme/other", "GITHUB", &full_record()).unwrap_err();

    match err {
        SecretZeroError::VaultWriteFailed { created_keys, .. } => assert!(created_keys.is_empty()),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(vault.calls().is_empty());
}
