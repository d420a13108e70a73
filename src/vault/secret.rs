//! Types that carry credentials through a deposit.
//!
//! Everything that can hold a plaintext credential (`SecretRecord`,
//! `SensitiveJson`, `VaultSecret`) wipes its memory on drop, so nothing
//! outlives the request that produced it.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::errors::{Result, SecretZeroError};

/// The credential set a member deposits for one application.
///
/// `url` is the only mandatory field.  Empty optional fields are treated
/// as absent so they are never written to the vault.
#[derive(Clone, Serialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct SecretRecord {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

impl SecretRecord {
    /// Create a record with only the (validated, normalized) URL.
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self {
            url: normalize_url(url)?,
            login: None,
            password: None,
            api_token: None,
        })
    }

    pub fn with_login(mut self, login: impl Into<String>) -> Self {
        self.login = non_empty(login.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = non_empty(password.into());
        self
    }

    pub fn with_api_token(mut self, api_token: impl Into<String>) -> Self {
        self.api_token = non_empty(api_token.into());
        self
    }

    /// Validate a decrypted JSON document against the record schema.
    ///
    /// Unknown fields are ignored.  Error messages name the offending
    /// field but never echo its value.
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| SecretZeroError::ValidationError("expected a JSON object".into()))?;

        let url = match object.get("url") {
            Some(Value::String(raw)) => normalize_url(raw)?,
            Some(_) => return Err(SecretZeroError::ValidationError("url must be a string".into())),
            None => return Err(SecretZeroError::ValidationError("url is required".into())),
        };

        Ok(Self {
            url,
            login: optional_string(object, "login")?,
            password: optional_string(object, "password")?,
            api_token: optional_string(object, "apiToken")?,
        })
    }

    /// Present fields as `(key suffix, value)` pairs in deposit order.
    ///
    /// `URL` always comes first.
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        let mut entries = vec![("URL", self.url.as_str())];
        let optional = [
            ("LOGIN", &self.login),
            ("PASSWORD", &self.password),
            ("API_TOKEN", &self.api_token),
        ];
        for (suffix, value) in optional {
            if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
                entries.push((suffix, v));
            }
        }
        entries
    }
}

impl fmt::Debug for SecretRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretRecord")
            .field("url", &self.url)
            .field("login", &self.login.as_ref().map(|_| "<redacted>"))
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Parse and normalize an application URL.  Only `https` is accepted.
pub fn normalize_url(raw: &str) -> Result<String> {
    let parsed = Url::parse(raw.trim())
        .map_err(|e| SecretZeroError::ValidationError(format!("url is not a valid URL: {e}")))?;

    if parsed.scheme() != "https" {
        return Err(SecretZeroError::ValidationError("url must use https".into()));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(SecretZeroError::ValidationError("url has no host".into()));
    }

    Ok(parsed.to_string())
}

fn optional_string(object: &Map<String, Value>, field: &str) -> Result<Option<String>> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(non_empty(s.clone())),
        Some(_) => Err(SecretZeroError::ValidationError(format!(
            "{field} must be a string"
        ))),
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Decrypted JSON whose string values are wiped on drop.
///
/// `serde_json::Value` has no notion of sensitive data, so this wrapper
/// walks the tree and zeroizes every string before the allocation is
/// released.
pub struct SensitiveJson(Value);

impl SensitiveJson {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl Drop for SensitiveJson {
    fn drop(&mut self) {
        scrub(&mut self.0);
    }
}

fn scrub(value: &mut Value) {
    match value {
        Value::String(s) => s.zeroize(),
        Value::Array(items) => items.iter_mut().for_each(scrub),
        Value::Object(map) => map.values_mut().for_each(scrub),
        _ => {}
    }
}

/// One secret as handed to the vault API.
///
/// `path` is always `/<single-segment>`; the writer rejects anything else
/// before a request is built.
pub struct VaultSecret {
    pub path: String,
    pub key: String,
    pub value: Zeroizing<String>,
    pub comment: String,
}

impl fmt::Debug for VaultSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultSecret")
            .field("path", &self.path)
            .field("key", &self.key)
            .field("value", &"<redacted>")
            .field("comment", &self.comment)
            .finish()
    }
}

/// Outcome of a deposit: the final key names, in write order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositResult {
    pub secrets_count: usize,
    pub created_keys: Vec<String>,
}

impl DepositResult {
    pub fn from_keys(created_keys: Vec<String>) -> Self {
        Self {
            secrets_count: created_keys.len(),
            created_keys,
        }
    }
}
