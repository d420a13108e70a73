//! `secretzero encrypt`: build a deposit request on the client side.
//!
//! Only the server's public key is needed.  The output JSON is what a
//! browser would submit: `{encryptedData, encryptedKey, iv, organizationSlug}`.

use std::fs;
use std::path::PathBuf;

use crate::cli::{load_config, output, prompt_secret, validate_org_slug, Cli};
use crate::crypto::{encrypt, load_public_key};
use crate::deposit::DepositRequest;
use crate::errors::{Result, SecretZeroError};
use crate::vault::SecretRecord;

/// Environment variable read instead of prompting for the password.
pub const PASSWORD_ENV: &str = "SECRETZERO_INPUT_PASSWORD";
/// Environment variable read instead of prompting for the API token.
pub const API_TOKEN_ENV: &str = "SECRETZERO_INPUT_API_TOKEN";

/// Arguments of the `encrypt` command.
pub struct EncryptArgs<'a> {
    pub public_key: Option<&'a str>,
    pub org: &'a str,
    pub url: &'a str,
    pub login: Option<&'a str>,
    pub password: bool,
    pub api_token: bool,
    pub output: Option<&'a str>,
}

/// Execute the `encrypt` command.
pub fn execute(cli: &Cli, args: &EncryptArgs<'_>) -> Result<()> {
    validate_org_slug(args.org)?;

    let (dir, settings, _) = load_config(cli)?;
    let key_path = match (args.public_key, &settings.public_key_path) {
        (Some(p), _) => PathBuf::from(p),
        (None, Some(p)) => dir.join(p),
        (None, None) => {
            return Err(SecretZeroError::ConfigError(
                "no public key: pass --public-key or set public_key_path".into(),
            ))
        }
    };
    let pem = fs::read_to_string(&key_path)
        .map_err(|e| SecretZeroError::CommandFailed(format!("cannot read {}: {e}", key_path.display())))?;
    let public_key = load_public_key(&pem)?;

    let mut record = SecretRecord::new(args.url)?;
    if let Some(login) = args.login {
        record = record.with_login(login);
    }
    if args.password {
        let password = prompt_secret("Password", PASSWORD_ENV)?;
        record = record.with_password(password.as_str());
    }
    if args.api_token {
        let token = prompt_secret("API token", API_TOKEN_ENV)?;
        record = record.with_api_token(token.as_str());
    }

    let request = DepositRequest {
        payload: encrypt(&record, &public_key)?,
        organization_slug: args.org.to_string(),
    };
    drop(record);

    let json = serde_json::to_string_pretty(&request)
        .map_err(|e| SecretZeroError::SerializationError(e.to_string()))?;

    match args.output {
        Some(dest) => {
            fs::write(dest, format!("{json}\n"))
                .map_err(|e| SecretZeroError::CommandFailed(format!("failed to write {dest}: {e}")))?;
            output::success(&format!("Encrypted deposit written to {dest}"));
        }
        None => println!("{json}"),
    }

    Ok(())
}
