//! Deposit orchestration.
//!
//! One deposit walks a fixed sequence of stages:
//!
//! ```text
//! AwaitSession → Decrypting → Validating → NamingApp → WritingVault → Notifying → Done
//! ```
//!
//! Any stage before `Notifying` can stop the deposit with a
//! `DepositFailure`, whose message is safe to show to the member.  The
//! underlying error is logged and then dropped.  Notification runs after
//! success is decided and never changes the result.

pub mod session;

use std::fmt;

use chrono::{SecondsFormat, Utc};
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[cfg(feature = "audit-log")]
use crate::audit::{AuditLog, DepositRecord};
use crate::crypto::{decrypt_bytes, EncryptedPayload};
use crate::errors::SecretZeroError;
use crate::naming::{derive_app_prefix, extract_domain};
use crate::vault::{DepositResult, SecretRecord, SensitiveJson, VaultApi, VaultWriter};
use crate::webhook::{DepositNotifier, NotificationEvent};

pub use session::{Session, SessionFile, SessionProvider};

/// What a client submits: the encrypted record plus the target organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
    #[serde(flatten)]
    pub payload: EncryptedPayload,
    pub organization_slug: String,
}

/// Stages of a deposit, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DepositStage {
    AwaitSession,
    Decrypting,
    Validating,
    NamingApp,
    WritingVault,
    Notifying,
    Done,
}

impl fmt::Display for DepositStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DepositStage::AwaitSession => "await_session",
            DepositStage::Decrypting => "decrypting",
            DepositStage::Validating => "validating",
            DepositStage::NamingApp => "naming_app",
            DepositStage::WritingVault => "writing_vault",
            DepositStage::Notifying => "notifying",
            DepositStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Why a deposit stopped.  `Display` is the message shown to the member.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DepositFailure {
    #[error("Session expired. Please log in again.")]
    SessionExpired,

    #[error("No access to this organization.")]
    SessionMismatch,

    #[error("Server configuration error.")]
    ServerMisconfigured,

    #[error("Data decryption error.")]
    Decryption,

    #[error("Invalid form data.")]
    Validation,

    #[error("Invalid URL address.")]
    UrlParse,

    /// Keys written before the vault failed stay written.
    #[error("Vault save error.")]
    Vault { created_keys: Vec<String> },
}

impl DepositFailure {
    /// The stage the deposit was in when it failed.
    pub fn stage(&self) -> DepositStage {
        match self {
            DepositFailure::SessionExpired | DepositFailure::SessionMismatch => DepositStage::AwaitSession,
            DepositFailure::ServerMisconfigured | DepositFailure::Decryption => DepositStage::Decrypting,
            DepositFailure::Validation => DepositStage::Validating,
            DepositFailure::UrlParse => DepositStage::NamingApp,
            DepositFailure::Vault { .. } => DepositStage::WritingVault,
        }
    }
}

/// The JSON answer for a deposit, success or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secrets_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub created_keys: Vec<String>,
}

impl From<&Result<DepositResult, DepositFailure>> for DepositResponse {
    fn from(outcome: &Result<DepositResult, DepositFailure>) -> Self {
        match outcome {
            Ok(result) => Self {
                success: true,
                error: None,
                secrets_count: Some(result.secrets_count),
                created_keys: result.created_keys.clone(),
            },
            Err(failure) => Self {
                success: false,
                error: Some(failure.to_string()),
                secrets_count: None,
                created_keys: Vec::new(),
            },
        }
    }
}

/// Runs deposits against one vault and one notifier.
pub struct Depositor<A: VaultApi, N: DepositNotifier> {
    writer: VaultWriter<A>,
    notifier: N,
    private_key: Option<RsaPrivateKey>,
    #[cfg(feature = "audit-log")]
    ledger: Option<AuditLog>,
}

impl<A: VaultApi, N: DepositNotifier> Depositor<A, N> {
    pub fn new(vault: A, notifier: N) -> Self {
        Self {
            writer: VaultWriter::new(vault),
            notifier,
            private_key: None,
            #[cfg(feature = "audit-log")]
            ledger: None,
        }
    }

    /// Set the server's private key.  Without one every deposit fails as
    /// a server configuration error.
    pub fn with_private_key(mut self, key: Option<RsaPrivateKey>) -> Self {
        self.private_key = key;
        self
    }

    /// Record successful deposits in a local ledger.
    #[cfg(feature = "audit-log")]
    pub fn with_audit_log(mut self, ledger: Option<AuditLog>) -> Self {
        self.ledger = ledger;
        self
    }

    /// Run one deposit for whoever `sessions` says is logged in.
    pub fn run<S>(&self, request: &DepositRequest, sessions: &S) -> Result<DepositResult, DepositFailure>
    where
        S: SessionProvider + ?Sized,
    {
        let outcome = self.execute(request, sessions);
        if let Err(failure) = &outcome {
            warn!(stage = %failure.stage(), reason = %failure, "deposit failed");
        }
        outcome
    }

    fn execute<S>(&self, request: &DepositRequest, sessions: &S) -> Result<DepositResult, DepositFailure>
    where
        S: SessionProvider + ?Sized,
    {
        enter(DepositStage::AwaitSession);
        let session = sessions.current_session().map_err(|e| {
            debug!(error = %e, "no valid session");
            DepositFailure::SessionExpired
        })?;
        if session.organization_slug != request.organization_slug {
            warn!(member_id = %session.member_id, "deposit targets another organization");
            return Err(DepositFailure::SessionMismatch);
        }

        enter(DepositStage::Decrypting);
        let private_key = self.private_key.as_ref().ok_or_else(|| {
            error!("server private key is not configured");
            DepositFailure::ServerMisconfigured
        })?;
        let json = decrypt_bytes(&request.payload, private_key)
            .and_then(|plaintext| {
                serde_json::from_slice(&plaintext)
                    .map(SensitiveJson::new)
                    .map_err(|_| SecretZeroError::DecryptionFailed)
            })
            .map_err(|_| {
                error!("deposit payload could not be decrypted");
                DepositFailure::Decryption
            })?;

        enter(DepositStage::Validating);
        let record = SecretRecord::from_json(json.as_value()).map_err(|e| {
            error!(error = %e, "decrypted record is invalid");
            DepositFailure::Validation
        })?;
        drop(json);

        enter(DepositStage::NamingApp);
        let app_prefix = derive_app_prefix(&record.url).map_err(|_| {
            error!("could not derive an application name");
            DepositFailure::UrlParse
        })?;

        enter(DepositStage::WritingVault);
        let result = self
            .writer
            .deposit_secrets(&session.organization_slug, &app_prefix, &record)
            .map_err(|e| {
                error!(error = %e, "vault write failed");
                match e {
                    SecretZeroError::VaultWriteFailed { created_keys, .. } => DepositFailure::Vault { created_keys },
                    _ => DepositFailure::Vault {
                        created_keys: Vec::new(),
                    },
                }
            })?;

        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        info!(
            organization = %session.organization_slug,
            member = %session.member_id,
            app_prefix = %app_prefix,
            secrets_count = result.secrets_count,
            timestamp = %timestamp,
            "deposit succeeded"
        );

        #[cfg(feature = "audit-log")]
        if let Some(ledger) = &self.ledger {
            ledger.record(&DepositRecord {
                organization: &session.organization_slug,
                member_id: &session.member_id,
                app_prefix: &app_prefix,
                created_keys: &result.created_keys,
            });
        }

        let event = NotificationEvent {
            organization_slug: session.organization_slug.clone(),
            member_email: session.email.clone(),
            member_id: session.member_id.clone(),
            app_prefix,
            app_domain: extract_domain(&record.url),
            secrets_count: result.secrets_count,
            timestamp,
        };
        drop(record);

        enter(DepositStage::Notifying);
        if let Err(e) = self.notifier.notify(&event) {
            warn!(error = %e, "deposit notification failed");
        }

        enter(DepositStage::Done);
        Ok(result)
    }
}

fn enter(stage: DepositStage) {
    debug!(%stage, "deposit stage");
}
