use std::path::{Path, PathBuf};
use std::time::Duration;

use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::secrets::EnvSecrets;
use crate::crypto::load_private_key;
use crate::errors::{Result, SecretZeroError};
use crate::vault::VaultConfig;

/// Service configuration, loaded from `secretzero.toml`.
///
/// Every field has a default so SecretZero starts without a config
/// file.  Credentials never live here; see `EnvSecrets`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the Infisical-compatible vault.
    #[serde(default = "default_site_url")]
    pub site_url: String,

    /// Vault project (workspace) that receives deposits.
    #[serde(default)]
    pub project_id: String,

    /// Vault environment slug (e.g. "prod").
    #[serde(default = "default_environment")]
    pub environment: String,

    /// PEM file with the server's private key.  `SECRETZERO_PRIVATE_KEY`
    /// takes precedence.
    #[serde(default)]
    pub private_key_path: Option<PathBuf>,

    /// PEM file with the public key handed to clients.
    #[serde(default)]
    pub public_key_path: Option<PathBuf>,

    /// Where deposit notifications are POSTed.  Unset disables them.
    #[serde(default)]
    pub admin_webhook_url: Option<String>,

    /// Upper bound for every outbound HTTP exchange, in seconds.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Extra attempts for idempotent HTTP calls.
    #[serde(default = "default_http_retries")]
    pub http_retries: u32,

    /// Directory (relative to the config directory) for the audit ledger.
    #[serde(default = "default_audit_dir")]
    pub audit_dir: String,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_site_url() -> String {
    "https://app.infisical.com".to_string()
}

fn default_environment() -> String {
    "prod".to_string()
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_http_retries() -> u32 {
    1
}

fn default_audit_dir() -> String {
    ".secretzero".to_string()
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            site_url: default_site_url(),
            project_id: String::new(),
            environment: default_environment(),
            private_key_path: None,
            public_key_path: None,
            admin_webhook_url: None,
            http_timeout_secs: default_http_timeout_secs(),
            http_retries: default_http_retries(),
            audit_dir: default_audit_dir(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the config directory.
    pub const FILE_NAME: &'static str = "secretzero.toml";

    /// Load settings from `<config_dir>/secretzero.toml`.
    ///
    /// If the file does not exist, defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            SecretZeroError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        if settings.http_timeout_secs == 0 {
            return Err(SecretZeroError::ConfigError(
                "http_timeout_secs must be greater than zero".into(),
            ));
        }

        Ok(settings)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Ledger directory, e.g. `config_dir/.secretzero`.
    pub fn audit_path(&self, config_dir: &Path) -> PathBuf {
        config_dir.join(&self.audit_dir)
    }

    /// Connection parameters for the vault client.
    pub fn vault_config(&self, secrets: &EnvSecrets) -> Result<VaultConfig> {
        let missing = |name: &str| SecretZeroError::ConfigError(format!("{name} is not set"));

        Ok(VaultConfig {
            site_url: self.site_url.clone(),
            project_id: self.project_id.clone(),
            environment: self.environment.clone(),
            client_id: secrets.client_id.clone().ok_or_else(|| missing(EnvSecrets::CLIENT_ID))?,
            client_secret: secrets
                .client_secret
                .clone()
                .ok_or_else(|| missing(EnvSecrets::CLIENT_SECRET))?,
            timeout: self.http_timeout(),
            retries: self.http_retries,
        })
    }

    /// The server private key, if one is configured.
    ///
    /// The environment PEM wins over `private_key_path`; relative paths
    /// are resolved against `config_dir`.
    pub fn private_key(&self, config_dir: &Path, secrets: &EnvSecrets) -> Result<Option<RsaPrivateKey>> {
        if let Some(pem) = secrets.private_key.as_ref() {
            return load_private_key(pem).map(Some);
        }

        match &self.private_key_path {
            Some(path) => {
                let pem = Zeroizing::new(std::fs::read_to_string(config_dir.join(path))?);
                load_private_key(&pem).map(Some)
            }
            None => Ok(None),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert_eq!(s.site_url, "https://app.infisical.com");
        assert_eq!(s.environment, "prod");
        assert_eq!(s.http_timeout_secs, 10);
        assert_eq!(s.http_retries, 1);
        assert_eq!(s.audit_dir, ".secretzero");
        assert!(s.admin_webhook_url.is_none());
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.environment, "prod");
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
site_url = "https://vault.acme.test"
project_id = "proj-42"
environment = "staging"
admin_webhook_url = "https://hooks.acme.test/deposits"
http_timeout_secs = 3
http_retries = 0
audit_dir = "ledger"
"#;
        fs::write(tmp.path().join("secretzero.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.site_url, "https://vault.acme.test");
        assert_eq!(settings.project_id, "proj-42");
        assert_eq!(settings.environment, "staging");
        assert_eq!(settings.http_timeout(), Duration::from_secs(3));
        assert_eq!(settings.http_retries, 0);
        assert_eq!(settings.audit_path(tmp.path()), tmp.path().join("ledger"));
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("secretzero.toml"), "project_id = \"p\"\n").unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.project_id, "p");
        assert_eq!(settings.site_url, "https://app.infisical.com");
        assert_eq!(settings.http_timeout_secs, 10);
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("secretzero.toml"), "not valid {{toml").unwrap();
        assert!(Settings::load(tmp.path()).is_err());
    }

    #[test]
    fn load_rejects_zero_timeout() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("secretzero.toml"), "http_timeout_secs = 0\n").unwrap();
        assert!(Settings::load(tmp.path()).is_err());
    }

    #[test]
    fn vault_config_requires_credentials() {
        let settings = Settings {
            project_id: "p".into(),
            ..Settings::default()
        };
        let secrets = EnvSecrets::from_lookup(|_| None);
        let err = settings.vault_config(&secrets).err().unwrap();
        assert!(err.to_string().contains("SECRETZERO_CLIENT_ID"));

        let secrets = EnvSecrets::from_lookup(|name| match name {
            "SECRETZERO_CLIENT_ID" => Some("id".into()),
            "SECRETZERO_CLIENT_SECRET" => Some("secret".into()),
            _ => None,
        });
        let config = settings.vault_config(&secrets).unwrap();
        assert_eq!(config.project_id, "p");
        assert_eq!(config.client_id.as_str(), "id");
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn private_key_absent_is_none() {
        let tmp = TempDir::new().unwrap();
        let secrets = EnvSecrets::from_lookup(|_| None);
        assert!(Settings::default().private_key(tmp.path(), &secrets).unwrap().is_none());
    }

    #[test]
    fn private_key_from_missing_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings {
            private_key_path: Some(PathBuf::from("missing.pem")),
            ..Settings::default()
        };
        let secrets = EnvSecrets::from_lookup(|_| None);
        assert!(settings.private_key(tmp.path(), &secrets).is_err());
    }
}
