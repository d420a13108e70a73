//! `secretzero webhook`: sign, verify and receive webhooks locally.
//!
//! Useful for wiring up a receiver for deposit notifications, and for
//! replaying identity-provider events against the inbound handler.

use crate::cli::{output, read_input, Cli, WebhookAction};
use crate::config::EnvSecrets;
use crate::errors::{Result, SecretZeroError};
use crate::webhook::{handle_inbound, sign, verify};

/// Execute a `webhook` subcommand.
pub fn execute(_cli: &Cli, action: &WebhookAction) -> Result<()> {
    let secrets = EnvSecrets::from_env();

    match action {
        WebhookAction::Sign { file } => {
            let secret = outbound_secret(&secrets)?;
            let body = read_input(file)?;
            println!("{}", sign(&body, secret.as_bytes()));
            Ok(())
        }
        WebhookAction::Verify { file, signature } => {
            let secret = outbound_secret(&secrets)?;
            let body = read_input(file)?;
            if verify(&body, signature, secret.as_bytes()) {
                output::success("Signature is valid.");
                Ok(())
            } else {
                Err(SecretZeroError::CommandFailed("signature does not match".into()))
            }
        }
        WebhookAction::Receive { file, signature } => {
            let body = read_input(file)?;
            let secret = secrets.inbound_webhook_secret.as_deref().map(String::as_str);
            let response = handle_inbound(&body, signature.as_deref(), secret);
            println!("{}", response.body);
            if response.status == 200 {
                Ok(())
            } else {
                Err(SecretZeroError::CommandFailed(format!("handler answered HTTP {}", response.status)))
            }
        }
    }
}

fn outbound_secret(secrets: &EnvSecrets) -> Result<&str> {
    secrets
        .webhook_secret
        .as_deref()
        .map(String::as_str)
        .ok_or_else(|| SecretZeroError::ConfigError(format!("{} is not set", EnvSecrets::WEBHOOK_SECRET)))
}
