//! Verified member sessions.
//!
//! Session verification itself (JWTs, cookies) belongs to the identity
//! provider.  The orchestrator only needs the verified result, so it asks
//! a `SessionProvider` for it.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{Result, SecretZeroError};

/// An identity-provider-verified session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub email: String,
    pub organization_slug: String,
    pub member_id: String,
    pub organization_id: String,
}

/// Source of the current verified session.  Any error means "no session".
pub trait SessionProvider {
    fn current_session(&self) -> Result<Session>;
}

impl<F> SessionProvider for F
where
    F: Fn() -> Result<Session>,
{
    fn current_session(&self) -> Result<Session> {
        self()
    }
}

/// A session record the identity provider wrote to disk.
///
/// ```json
/// {"email": "...", "organizationSlug": "acme", "memberId": "...",
///  "organizationId": "...", "expiresAt": "2030-01-01T00:00:00Z"}
/// ```
pub struct SessionFile {
    path: PathBuf,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    #[serde(flatten)]
    session: Session,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

impl SessionFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl SessionProvider for SessionFile {
    fn current_session(&self) -> Result<Session> {
        let contents = std::fs::read_to_string(&self.path)?;
        let stored: StoredSession = serde_json::from_str(&contents).map_err(|e| {
            debug!(error = %e, "session file is not a valid session record");
            SecretZeroError::SessionExpired
        })?;

        if stored.expires_at.is_some_and(|at| at <= Utc::now()) {
            debug!("session has expired");
            return Err(SecretZeroError::SessionExpired);
        }
        if stored.session.organization_slug.is_empty() || stored.session.member_id.is_empty() {
            return Err(SecretZeroError::SessionExpired);
        }

        Ok(stored.session)
    }
}
