//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::io::Read;
use std::path::PathBuf;

use clap::Parser;
use zeroize::Zeroizing;

use crate::config::{EnvSecrets, Settings};
use crate::errors::{Result, SecretZeroError};

/// SecretZero CLI: end-to-end encrypted credential deposits.
#[derive(Parser)]
#[command(
    name = "secretzero",
    about = "End-to-end encrypted credential deposits into a write-only vault",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding secretzero.toml (default: current directory)
    #[arg(long, default_value = ".", global = true)]
    pub config_dir: String,

    /// Enable debug logging (overridden by SECRETZERO_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Generate the server's RSA-2048 key pair
    Keygen {
        /// Where to write public.pem and private.pem (default: config dir)
        #[arg(long)]
        out_dir: Option<String>,

        /// Overwrite existing key files
        #[arg(short, long)]
        force: bool,
    },

    /// Encrypt a credential set into a deposit request (client side)
    Encrypt {
        /// Server public key PEM (default: public_key_path from config)
        #[arg(long)]
        public_key: Option<String>,

        /// Organization slug to deposit into
        #[arg(long)]
        org: String,

        /// Application URL (https)
        #[arg(long)]
        url: String,

        /// Login / username
        #[arg(long)]
        login: Option<String>,

        /// Prompt for a password (or read SECRETZERO_INPUT_PASSWORD)
        #[arg(long)]
        password: bool,

        /// Prompt for an API token (or read SECRETZERO_INPUT_API_TOKEN)
        #[arg(long)]
        api_token: bool,

        /// Output file (prints to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Decrypt a deposit request and write it to the vault
    Deposit {
        /// Deposit request JSON ("-" for stdin)
        #[arg(long)]
        input: String,

        /// Verified session record JSON
        #[arg(long)]
        session: String,
    },

    /// Print the secret key prefix derived from a URL
    Prefix {
        /// Application URL
        url: String,
    },

    /// Sign, verify or receive webhooks
    Webhook {
        #[command(subcommand)]
        action: WebhookAction,
    },

    /// View the local deposit ledger
    Audit {
        /// Number of entries to show (default: 50)
        #[arg(long, default_value = "50")]
        last: usize,
        /// Show entries since a duration ago (e.g. 7d, 24h, 30m)
        #[arg(long)]
        since: Option<String>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum, ignore_case = true)]
        shell: clap_complete::Shell,
    },
}

/// Webhook subcommands.
#[derive(clap::Subcommand)]
pub enum WebhookAction {
    /// Print the HMAC signature of a body (uses SECRETZERO_WEBHOOK_SECRET)
    Sign {
        /// Body file ("-" for stdin)
        file: String,
    },

    /// Check a signature against a body (uses SECRETZERO_WEBHOOK_SECRET)
    Verify {
        /// Body file ("-" for stdin)
        file: String,
        /// Hex signature to check
        #[arg(long)]
        signature: String,
    },

    /// Run the inbound identity-provider handler on a body
    /// (uses SECRETZERO_INBOUND_WEBHOOK_SECRET)
    Receive {
        /// Body file ("-" for stdin)
        file: String,
        /// Value of the X-Stytch-Signature header
        #[arg(long)]
        signature: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Resolve `--config-dir` against the working directory.
pub fn config_dir(cli: &Cli) -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(&cli.config_dir))
}

/// Load `secretzero.toml` and the environment credentials.
pub fn load_config(cli: &Cli) -> Result<(PathBuf, Settings, EnvSecrets)> {
    let dir = config_dir(cli)?;
    let settings = Settings::load(&dir)?;
    Ok((dir, settings, EnvSecrets::from_env()))
}

/// Read a file, or stdin when `path` is `-`.
pub fn read_input(path: &str) -> Result<Vec<u8>> {
    if path == "-" {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        return Ok(buf);
    }
    std::fs::read(path).map_err(|e| SecretZeroError::CommandFailed(format!("cannot read '{path}': {e}")))
}

/// Get a secret input value, trying in order:
/// 1. the environment variable `env_var` (scripted use)
/// 2. an interactive hidden prompt
///
/// Returns `Zeroizing<String>` so the value is wiped from memory on drop.
pub fn prompt_secret(prompt: &str, env_var: &str) -> Result<Zeroizing<String>> {
    if let Ok(value) = std::env::var(env_var) {
        if !value.is_empty() {
            return Ok(Zeroizing::new(value));
        }
    }

    let value = dialoguer::Password::new()
        .with_prompt(prompt)
        .allow_empty_password(true)
        .interact()
        .map_err(|e| SecretZeroError::CommandFailed(format!("{prompt} prompt: {e}")))?;
    Ok(Zeroizing::new(value))
}

/// Validate an organization slug before it becomes a vault folder name.
///
/// Allowed: ASCII letters, digits, hyphens and underscores, 1-64 chars.
pub fn validate_org_slug(slug: &str) -> Result<()> {
    if slug.is_empty() || slug.len() > 64 {
        return Err(SecretZeroError::ValidationError(
            "organization slug must be 1-64 characters".into(),
        ));
    }

    if !slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(SecretZeroError::ValidationError(format!(
            "organization slug '{slug}' is invalid: only letters, digits, '-' and '_' are allowed"
        )));
    }

    Ok(())
}
