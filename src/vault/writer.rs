//! Folder provisioning and collision-safe secret creation.
//!
//! The vault credential is write-only, so the writer never reads back
//! what exists.  It relies on the remote side to report conflicts and
//! reacts to them: an existing folder is fine, an existing secret gets
//! a timestamped sibling instead of being overwritten.

use chrono::{DateTime, Local, SecondsFormat, Utc};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::client::{ApiOutcome, VaultApi};
use super::secret::{DepositResult, SecretRecord, VaultSecret};
use crate::errors::{Result, SecretZeroError};

/// Appended to the comment of a secret renamed after a conflict.
pub const DUPLICATE_COMMENT_SUFFIX: &str = " (duplicate - previous secret exists)";

/// Writes one deposit's secrets through a `VaultApi`.
pub struct VaultWriter<A: VaultApi> {
    api: A,
}

impl<A: VaultApi> VaultWriter<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    /// Make sure the single-segment folder `path` exists.
    ///
    /// The path is checked before anything is sent; a folder that is
    /// already there counts as success.
    pub fn ensure_folder(&self, path: &str) -> Result<()> {
        let name = validate_folder_path(path)?;

        match self.api.create_folder("/", name) {
            ApiOutcome::Created => {
                debug!(folder = path, "vault folder created");
                Ok(())
            }
            ApiOutcome::Conflict => {
                debug!(folder = path, "vault folder already exists");
                Ok(())
            }
            ApiOutcome::Failed(detail) => Err(SecretZeroError::VaultRequest(format!(
                "create folder {path}: {detail}"
            ))),
        }
    }

    /// Create `key` at `path` and return the key actually written.
    ///
    /// On a conflict the write is retried once as `<key>_YYYYMMDD_HHMMSS`
    /// (local time) with a duplicate note on the comment.  Anything else,
    /// including a second conflict, is returned as-is.
    pub fn create_secret(&self, path: &str, key: &str, value: &str, comment: &str) -> Result<String> {
        validate_folder_path(path)?;

        let mut secret = VaultSecret {
            path: path.to_string(),
            key: key.to_string(),
            value: Zeroizing::new(value.to_string()),
            comment: comment.to_string(),
        };

        match self.api.create_secret(&secret) {
            ApiOutcome::Created => return Ok(secret.key),
            ApiOutcome::Conflict => {}
            ApiOutcome::Failed(detail) => {
                return Err(SecretZeroError::VaultRequest(format!("create secret {key}: {detail}")));
            }
        }

        secret.key = format!("{key}_{}", timestamp_suffix(Local::now()));
        secret.comment = format!("{comment}{DUPLICATE_COMMENT_SUFFIX}");
        warn!(key, renamed = %secret.key, "secret already exists, writing duplicate");

        match self.api.create_secret(&secret) {
            ApiOutcome::Created => Ok(secret.key),
            ApiOutcome::Conflict => Err(SecretZeroError::VaultConflict(secret.key.clone())),
            ApiOutcome::Failed(detail) => Err(SecretZeroError::VaultRequest(format!(
                "create secret {}: {detail}",
                secret.key
            ))),
        }
    }

    /// Write every present field of `record` under `/<org_slug>`.
    ///
    /// Not transactional: a failure part-way returns `VaultWriteFailed`
    /// with the keys that were already created.
    pub fn deposit_secrets(&self, org_slug: &str, app_prefix: &str, record: &SecretRecord) -> Result<DepositResult> {
        let folder = format!("/{org_slug}");
        let comment = deposit_comment(Utc::now());
        let mut created_keys = Vec::new();

        if let Err(e) = self.ensure_folder(&folder) {
            return Err(partial(created_keys, e));
        }

        for (suffix, value) in record.entries() {
            let key = format!("{app_prefix}_{suffix}");
            match self.create_secret(&folder, &key, value, &comment) {
                Ok(final_key) => created_keys.push(final_key),
                Err(e) => return Err(partial(created_keys, e)),
            }
        }

        info!(folder = %folder, count = created_keys.len(), "secrets written to vault");
        Ok(DepositResult::from_keys(created_keys))
    }
}

/// Check that `path` is `/` followed by one non-empty segment and return
/// the segment.
pub fn validate_folder_path(path: &str) -> Result<&str> {
    match path.strip_prefix('/') {
        Some(name) if !name.is_empty() && !name.contains('/') => Ok(name),
        _ => Err(SecretZeroError::InvalidPath(path.to_string())),
    }
}

/// `YYYYMMDD_HHMMSS` for a renamed duplicate.
pub fn timestamp_suffix(at: DateTime<Local>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

/// Comment stored with every deposited secret.
pub fn deposit_comment(at: DateTime<Utc>) -> String {
    format!(
        "Deposited via SecretZero - {}",
        at.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

fn partial(created_keys: Vec<String>, cause: SecretZeroError) -> SecretZeroError {
    if !created_keys.is_empty() {
        warn!(written = created_keys.len(), "vault deposit stopped part-way");
    }
    SecretZeroError::VaultWriteFailed {
        created_keys,
        reason: cause.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn folder_path_rules() {
        assert_eq!(validate_folder_path("/acme").unwrap(), "acme");
        assert!(validate_folder_path("acme").is_err());
        assert!(validate_folder_path("/").is_err());
        assert!(validate_folder_path("").is_err());
        assert!(validate_folder_path("/acme/nested").is_err());
        assert!(validate_folder_path("//acme").is_err());
        assert!(validate_folder_path("/acme/").is_err());
    }

    #[test]
    fn suffix_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(timestamp_suffix(at), "20240309_070501");
    }

    #[test]
    fn comment_uses_utc_millis() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            deposit_comment(at),
            "Deposited via SecretZero - 2024-01-02T03:04:05.000Z"
        );
    }

    #[test]
    fn partial_keeps_created_keys() {
        let err = partial(vec!["A_URL".into()], SecretZeroError::VaultRequest("boom".into()));
        match err {
            SecretZeroError::VaultWriteFailed { created_keys, reason } => {
                assert_eq!(created_keys, vec!["A_URL".to_string()]);
                assert!(reason.contains("boom"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
