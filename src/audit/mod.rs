//! Audit log: SQLite-based deposit history.
//!
//! Stores one row per successful deposit in a local SQLite database at
//! `<audit_dir>/audit.db`: organization, member id, app prefix and the
//! key names that were written.  Never secret values, never emails.
//!
//! A ledger that can't be opened or written to never fails a deposit;
//! the deposit goes through without an entry.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};
use tracing::warn;

use crate::errors::{Result, SecretZeroError};

/// A single ledger entry.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub organization: String,
    pub member_id: String,
    pub app_prefix: String,
    pub secrets_count: usize,
    pub created_keys: Vec<String>,
}

/// What gets recorded for a deposit.
#[derive(Debug, Clone, Copy)]
pub struct DepositRecord<'a> {
    pub organization: &'a str,
    pub member_id: &'a str,
    pub app_prefix: &'a str,
    pub created_keys: &'a [String],
}

/// SQLite-backed deposit ledger.
pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    /// Open (or create) the ledger at `<audit_dir>/audit.db`.
    ///
    /// `None` means no ledger for this run.
    pub fn open(audit_dir: &Path) -> Option<Self> {
        let db_path = Self::db_path(audit_dir);
        let conn = Connection::open(&db_path).ok()?;

        // Owner-only: the ledger names organizations and members.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&db_path, perms);
        }

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS deposits (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp     TEXT NOT NULL,
                organization  TEXT NOT NULL,
                member_id     TEXT NOT NULL,
                app_prefix    TEXT NOT NULL,
                secrets_count INTEGER NOT NULL,
                created_keys  TEXT NOT NULL
            );",
        )
        .ok()?;

        Some(Self { conn })
    }

    /// Open the ledger, creating `audit_dir` first if needed.
    pub fn open_or_create(audit_dir: &Path) -> Option<Self> {
        if let Err(e) = std::fs::create_dir_all(audit_dir) {
            warn!(error = %e, "cannot create audit directory");
            return None;
        }
        Self::open(audit_dir)
    }

    /// Record a deposit. Fire-and-forget: a failed insert is only logged.
    pub fn record(&self, deposit: &DepositRecord<'_>) {
        let count = i64::try_from(deposit.created_keys.len()).unwrap_or(i64::MAX);
        let result = self.conn.execute(
            "INSERT INTO deposits (timestamp, organization, member_id, app_prefix, secrets_count, created_keys)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                stamp(&Utc::now()),
                deposit.organization,
                deposit.member_id,
                deposit.app_prefix,
                count,
                deposit.created_keys.join(",")
            ],
        );
        if let Err(e) = result {
            warn!(error = %e, "failed to write audit entry");
        }
    }

    /// Most recent deposits first, at most `limit`, optionally only those
    /// at or after `since`.
    pub fn query(&self, limit: usize, since: Option<DateTime<Utc>>) -> Result<Vec<AuditEntry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let since = since.as_ref().map(stamp);

        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, timestamp, organization, member_id, app_prefix, secrets_count, created_keys
                 FROM deposits
                 WHERE ?1 IS NULL OR timestamp >= ?1
                 ORDER BY id DESC
                 LIMIT ?2",
            )
            .map_err(|e| SecretZeroError::AuditError(format!("query prepare: {e}")))?;

        let entries = stmt
            .query_map(params![since, limit], entry_from_row)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| SecretZeroError::AuditError(format!("query: {e}")))?;
        Ok(entries)
    }

    /// Location of the ledger file inside `audit_dir`.
    pub fn db_path(audit_dir: &Path) -> PathBuf {
        audit_dir.join("audit.db")
    }
}

/// Fixed-width UTC timestamps so text comparison orders them.
fn stamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<AuditEntry> {
    let timestamp: String = row.get(1)?;
    let count: i64 = row.get(5)?;
    let keys: String = row.get(6)?;

    Ok(AuditEntry {
        id: row.get(0)?,
        timestamp: DateTime::parse_from_rfc3339(&timestamp)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_default(),
        organization: row.get(2)?,
        member_id: row.get(3)?,
        app_prefix: row.get(4)?,
        secrets_count: usize::try_from(count).unwrap_or_default(),
        created_keys: keys.split(',').filter(|k| !k.is_empty()).map(str::to_string).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn record<'a>(org: &'a str, prefix: &'a str, created: &'a [String]) -> DepositRecord<'a> {
        DepositRecord {
            organization: org,
            member_id: "member-1",
            app_prefix: prefix,
            created_keys: created,
        }
    }

    #[test]
    fn fresh_ledger_is_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = AuditLog::open(dir.path()).expect("ledger opens");
        assert!(AuditLog::db_path(dir.path()).exists());
        assert!(ledger.query(50, None).unwrap().is_empty());
    }

    #[test]
    fn open_or_create_makes_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        assert!(AuditLog::open_or_create(&nested).is_some());
        assert!(nested.join("audit.db").exists());
    }

    #[test]
    fn record_and_query_roundtrip() {
        let dir = TempDir::new().unwrap();
        let audit = AuditLog::open(dir.path()).unwrap();

        let first = keys(&["GITHUB_URL", "GITHUB_PASSWORD"]);
        let second = keys(&["STRIPE_URL"]);
        audit.record(&record("acme", "GITHUB", &first));
        audit.record(&record("acme", "STRIPE", &second));

        let entries = audit.query(10, None).unwrap();
        assert_eq!(entries.len(), 2);

        // Most recent first.
        assert_eq!(entries[0].app_prefix, "STRIPE");
        assert_eq!(entries[1].app_prefix, "GITHUB");
        assert_eq!(entries[1].secrets_count, 2);
        assert_eq!(entries[1].created_keys, first);
        assert_eq!(entries[1].member_id, "member-1");
    }

    #[test]
    fn limit_keeps_the_newest() {
        let dir = TempDir::new().unwrap();
        let ledger = AuditLog::open(dir.path()).unwrap();
        let created = keys(&["APP_URL"]);

        for org in ["a", "b", "c", "d", "e"] {
            ledger.record(&record(org, "APP", &created));
        }

        let orgs: Vec<String> = ledger.query(2, None).unwrap().into_iter().map(|e| e.organization).collect();
        assert_eq!(orgs, ["e", "d"]);
    }

    #[test]
    fn empty_key_list_round_trips() {
        let dir = TempDir::new().unwrap();
        let ledger = AuditLog::open(dir.path()).unwrap();
        ledger.record(&record("acme", "APP", &[]));

        let entry = &ledger.query(1, None).unwrap()[0];
        assert_eq!(entry.secrets_count, 0);
        assert!(entry.created_keys.is_empty());
    }

    #[test]
    fn query_with_since_filter() {
        let dir = TempDir::new().unwrap();
        let audit = AuditLog::open(dir.path()).unwrap();
        let created = keys(&["APP_URL"]);

        audit.record(&record("acme", "APP", &created));

        let past = Utc::now() - chrono::Duration::hours(1);
        assert_eq!(audit.query(10, Some(past)).unwrap().len(), 1);

        let future = Utc::now() + chrono::Duration::hours(1);
        assert_eq!(audit.query(10, Some(future)).unwrap().len(), 0);
    }

    #[test]
    fn missing_directory_means_no_ledger() {
        assert!(AuditLog::open(Path::new("/nonexistent/secretzero/ledger")).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn audit_db_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let _ledger = AuditLog::open(dir.path()).unwrap();

        let mode = std::fs::metadata(AuditLog::db_path(dir.path())).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
