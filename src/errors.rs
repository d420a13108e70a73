use thiserror::Error;

/// All errors that can occur in SecretZero.
#[derive(Debug, Error)]
pub enum SecretZeroError {
    // --- Config errors ---
    #[error("Config error: {0}")]
    ConfigError(String),

    // --- Session errors ---
    #[error("Session expired or missing")]
    SessionExpired,

    #[error("Session belongs to organization '{session}', not '{requested}'")]
    SessionMismatch { session: String, requested: String },

    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Deliberately carries no detail: every decryption failure looks the same.
    #[error("Decryption failed")]
    DecryptionFailed,

    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    // --- Input errors ---
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Cannot derive application name from URL: {0}")]
    UrlParse(String),

    // --- Vault errors ---
    #[error("Invalid vault path '{0}': expected \"/<single-segment>\"")]
    InvalidPath(String),

    #[error("Vault authentication failed: {0}")]
    VaultAuth(String),

    #[error("Secret '{0}' already exists in the vault")]
    VaultConflict(String),

    #[error("Vault request failed: {0}")]
    VaultRequest(String),

    #[error("Vault write failed after {} secret(s) were stored: {reason}", created_keys.len())]
    VaultWriteFailed {
        created_keys: Vec<String>,
        reason: String,
    },

    // --- Notification errors ---
    #[error("Notification failed: {0}")]
    NotificationFailed(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Audit error: {0}")]
    AuditError(String),
}

/// Convenience type alias for SecretZero results.
pub type Result<T> = std::result::Result<T, SecretZeroError>;
