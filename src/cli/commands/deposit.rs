//! `secretzero deposit`: run one deposit end to end.
//!
//! Reads a deposit request and a verified session record, writes the
//! secrets to the vault, notifies the admin webhook, and prints the
//! `{success, error?}` response as JSON on stdout.

use tracing::{debug, error};

use crate::cli::{load_config, output, read_input, Cli};
use crate::config::{EnvSecrets, Settings};
use crate::deposit::{DepositRequest, DepositResponse, Depositor, SessionFile};
use crate::errors::{Result, SecretZeroError};
use crate::vault::{ApiOutcome, VaultApi, VaultClient, VaultSecret};
use crate::webhook::WebhookNotifier;

/// The vault for this run.  A configuration problem is reported as a
/// failed write, after the session and payload have been checked.
enum ConfiguredVault {
    Ready(VaultClient),
    Unconfigured(String),
}

impl ConfiguredVault {
    fn from_settings(settings: &Settings, secrets: &EnvSecrets) -> Self {
        match settings.vault_config(secrets).and_then(VaultClient::new) {
            Ok(client) => Self::Ready(client),
            Err(e) => {
                error!(error = %e, "vault is not configured");
                Self::Unconfigured(e.to_string())
            }
        }
    }
}

impl VaultApi for ConfiguredVault {
    fn create_folder(&self, parent: &str, name: &str) -> ApiOutcome {
        match self {
            Self::Ready(client) => client.create_folder(parent, name),
            Self::Unconfigured(reason) => ApiOutcome::Failed(reason.clone()),
        }
    }

    fn create_secret(&self, secret: &VaultSecret) -> ApiOutcome {
        match self {
            Self::Ready(client) => client.create_secret(secret),
            Self::Unconfigured(reason) => ApiOutcome::Failed(reason.clone()),
        }
    }
}

/// Execute the `deposit` command.
pub fn execute(cli: &Cli, input: &str, session: &str) -> Result<()> {
    let (dir, settings, secrets) = load_config(cli)?;

    let raw = read_input(input)?;
    let request: DepositRequest = serde_json::from_slice(&raw)
        .map_err(|e| SecretZeroError::ValidationError(format!("deposit request: {e}")))?;

    let vault = ConfiguredVault::from_settings(&settings, &secrets);
    let notifier = WebhookNotifier::new(
        settings.admin_webhook_url.clone(),
        secrets.webhook_secret.clone(),
        settings.http_timeout(),
        settings.http_retries,
    );
    debug!(enabled = notifier.is_enabled(), "admin webhook");

    // A bad key is reported to the member as a server configuration error.
    let private_key = settings.private_key(&dir, &secrets).unwrap_or_else(|e| {
        error!(error = %e, "cannot load server private key");
        None
    });

    let depositor = Depositor::new(vault, notifier).with_private_key(private_key);
    #[cfg(feature = "audit-log")]
    let depositor = depositor.with_audit_log(crate::audit::AuditLog::open_or_create(&settings.audit_path(&dir)));

    let outcome = depositor.run(&request, &SessionFile::new(session));
    let response = DepositResponse::from(&outcome);
    let json =
        serde_json::to_string_pretty(&response).map_err(|e| SecretZeroError::SerializationError(e.to_string()))?;
    println!("{json}");

    match outcome {
        Ok(result) => {
            output::success(&format!("Deposited {} secret(s)", result.secrets_count));
            output::print_deposit_table(&result);
            Ok(())
        }
        Err(failure) => Err(SecretZeroError::CommandFailed(failure.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zeroize::Zeroizing;

    #[test]
    fn missing_credentials_fail_every_write() {
        let vault = ConfiguredVault::from_settings(&Settings::default(), &EnvSecrets::default());

        match vault.create_folder("/", "acme") {
            ApiOutcome::Failed(reason) => assert!(reason.contains(EnvSecrets::CLIENT_ID)),
            other => panic!("unexpected outcome: {other:?}"),
        }
        let secret = VaultSecret {
            path: "/acme".into(),
            key: "GITHUB_URL".into(),
            value: Zeroizing::new("https://github.com/".into()),
            comment: String::new(),
        };
        assert!(matches!(vault.create_secret(&secret), ApiOutcome::Failed(_)));
    }
}
