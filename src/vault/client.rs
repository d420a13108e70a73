//! Remote vault API boundary.
//!
//! `VaultApi` is the seam the writer talks to: every remote call comes
//! back as a tagged `ApiOutcome`, so the writer branches on a typed
//! conflict signal instead of matching error text.
//!
//! `VaultClient` is the HTTP implementation for an Infisical-compatible
//! REST API.  It is a cheap, cloneable handle around one shared state;
//! the first call that needs a token performs universal-auth login under
//! a mutex, and every later call (from any thread) reuses that token
//! until it nears expiry.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use ureq::Agent;
use url::Url;
use zeroize::Zeroizing;

use super::secret::VaultSecret;
use crate::errors::{Result, SecretZeroError};

/// Tokens are refreshed this long before the server says they expire.
const TOKEN_EXPIRY_SKEW: Duration = Duration::from_secs(60);

/// Result of a single remote write, as seen by the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiOutcome {
    Created,
    /// The folder or secret already exists.
    Conflict,
    Failed(String),
}

/// The write-only operations a vault backend must support.
pub trait VaultApi: Send + Sync {
    /// Create folder `name` under `parent` (always `/` here).
    fn create_folder(&self, parent: &str, name: &str) -> ApiOutcome;

    /// Create `secret.key` at `secret.path`.  Must never overwrite.
    fn create_secret(&self, secret: &VaultSecret) -> ApiOutcome;
}

impl<T: VaultApi + ?Sized> VaultApi for &T {
    fn create_folder(&self, parent: &str, name: &str) -> ApiOutcome {
        (**self).create_folder(parent, name)
    }

    fn create_secret(&self, secret: &VaultSecret) -> ApiOutcome {
        (**self).create_secret(secret)
    }
}

impl<T: VaultApi + ?Sized> VaultApi for Arc<T> {
    fn create_folder(&self, parent: &str, name: &str) -> ApiOutcome {
        (**self).create_folder(parent, name)
    }

    fn create_secret(&self, secret: &VaultSecret) -> ApiOutcome {
        (**self).create_secret(secret)
    }
}

/// Connection parameters for `VaultClient`.
pub struct VaultConfig {
    pub site_url: String,
    pub project_id: String,
    pub environment: String,
    pub client_id: Zeroizing<String>,
    pub client_secret: Zeroizing<String>,
    /// Upper bound for each HTTP exchange, connect through body.
    pub timeout: Duration,
    /// Extra attempts for idempotent calls after a transport error or 5xx.
    pub retries: u32,
}

/// Process-wide handle to the remote vault.
#[derive(Clone)]
pub struct VaultClient {
    inner: Arc<ClientState>,
}

struct ClientState {
    agent: Agent,
    site_url: Url,
    project_id: String,
    environment: String,
    client_id: Zeroizing<String>,
    client_secret: Zeroizing<String>,
    retries: u32,
    token: Mutex<Option<AccessToken>>,
}

struct AccessToken {
    value: Zeroizing<String>,
    expires_at: Option<Instant>,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        self.expires_at
            .map_or(true, |at| Instant::now() + TOKEN_EXPIRY_SKEW < at)
    }
}

/// A status code and body, before classification.
#[derive(Debug)]
struct HttpReply {
    status: u16,
    body: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FolderRequest<'a> {
    workspace_id: &'a str,
    environment: &'a str,
    name: &'a str,
    path: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SecretRequest<'a> {
    workspace_id: &'a str,
    environment: &'a str,
    secret_path: &'a str,
    secret_value: &'a str,
    secret_comment: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

impl VaultClient {
    /// Build a handle.  No network traffic happens until the first write.
    pub fn new(config: VaultConfig) -> Result<Self> {
        let site_url = Url::parse(config.site_url.trim())
            .map_err(|e| SecretZeroError::ConfigError(format!("invalid vault site_url: {e}")))?;
        if !matches!(site_url.scheme(), "https" | "http") {
            return Err(SecretZeroError::ConfigError(
                "vault site_url must be an http(s) URL".into(),
            ));
        }
        if config.project_id.trim().is_empty() {
            return Err(SecretZeroError::ConfigError("vault project_id is empty".into()));
        }
        if config.client_id.is_empty() || config.client_secret.is_empty() {
            return Err(SecretZeroError::ConfigError(
                "vault client id and secret are required".into(),
            ));
        }

        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Ok(Self {
            inner: Arc::new(ClientState {
                agent,
                site_url,
                project_id: config.project_id,
                environment: config.environment,
                client_id: config.client_id,
                client_secret: config.client_secret,
                retries: config.retries,
                token: Mutex::new(None),
            }),
        })
    }

    /// Whether a usable token is cached.
    pub fn is_authenticated(&self) -> bool {
        self.inner
            .token
            .lock()
            .map(|guard| guard.as_ref().is_some_and(AccessToken::is_fresh))
            .unwrap_or(false)
    }

    /// Forget the cached token; the next call logs in again.
    pub fn reset(&self) {
        if let Ok(mut guard) = self.inner.token.lock() {
            *guard = None;
        }
    }

    /// Return a valid token, logging in first if needed.
    ///
    /// The lock is held across the login so concurrent first callers
    /// wait for one authentication instead of racing their own.
    fn access_token(&self) -> Result<Zeroizing<String>> {
        let mut guard = self
            .inner
            .token
            .lock()
            .map_err(|_| SecretZeroError::VaultAuth("token cache lock poisoned".into()))?;

        if let Some(token) = guard.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        let fresh = self.login()?;
        let value = fresh.value.clone();
        *guard = Some(fresh);
        Ok(value)
    }

    fn login(&self) -> Result<AccessToken> {
        debug!(site = %self.inner.site_url, "authenticating to vault");

        let url = self
            .endpoint(&["api", "v1", "auth", "universal-auth", "login"])
            .map_err(SecretZeroError::VaultAuth)?;
        let body = LoginRequest {
            client_id: &self.inner.client_id,
            client_secret: &self.inner.client_secret,
        };

        let reply = self
            .post_with_retry(&url, None, &body, self.inner.retries)
            .map_err(SecretZeroError::VaultAuth)?;

        if !(200..300).contains(&reply.status) {
            return Err(SecretZeroError::VaultAuth(format!(
                "HTTP {}: {}",
                reply.status,
                error_message(&reply.body)
            )));
        }

        let parsed: LoginResponse = serde_json::from_str(&reply.body)
            .map_err(|e| SecretZeroError::VaultAuth(format!("unexpected login response: {e}")))?;

        Ok(AccessToken {
            value: Zeroizing::new(parsed.access_token),
            expires_at: parsed
                .expires_in
                .map(|secs| Instant::now() + Duration::from_secs(secs)),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> std::result::Result<Url, String> {
        let mut url = self.inner.site_url.clone();
        url.path_segments_mut()
            .map_err(|_| format!("{} cannot be a base URL", self.inner.site_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// POST `body` as JSON, retrying up to `retries` times on transport
    /// errors and 5xx responses.
    fn post_with_retry<B: Serialize>(
        &self,
        url: &Url,
        token: Option<&str>,
        body: &B,
        retries: u32,
    ) -> std::result::Result<HttpReply, String> {
        let mut attempt = 0;
        loop {
            let result = self.post(url, token, body);
            let retryable = match &result {
                Ok(reply) => reply.status >= 500,
                Err(_) => true,
            };
            if !retryable || attempt >= retries {
                return result;
            }
            attempt += 1;
            warn!(path = url.path(), attempt, "vault request failed, retrying");
        }
    }

    fn post<B: Serialize>(&self, url: &Url, token: Option<&str>, body: &B) -> std::result::Result<HttpReply, String> {
        let mut request = self.inner.agent.post(url.as_str());
        if let Some(token) = token {
            let bearer = Zeroizing::new(format!("Bearer {token}"));
            request = request.header("Authorization", bearer.as_str());
        }

        let mut response = request
            .send_json(body)
            .map_err(|e| format!("{} {}: {e}", "POST", url.path()))?;

        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string().unwrap_or_default();
        Ok(HttpReply { status, body })
    }

    /// Run an authenticated call and classify the reply.
    fn authenticated<B: Serialize>(&self, segments: &[&str], body: &B, retries: u32) -> ApiOutcome {
        let token = match self.access_token() {
            Ok(token) => token,
            Err(e) => return ApiOutcome::Failed(e.to_string()),
        };
        let url = match self.endpoint(segments) {
            Ok(url) => url,
            Err(e) => return ApiOutcome::Failed(e),
        };

        match self.post_with_retry(&url, Some(&token), body, retries) {
            Ok(reply) => {
                if reply.status == 401 {
                    // Revoked or expired early: drop it so the next call re-authenticates.
                    self.reset();
                }
                classify(&reply)
            }
            Err(e) => ApiOutcome::Failed(e),
        }
    }
}

impl VaultApi for VaultClient {
    fn create_folder(&self, parent: &str, name: &str) -> ApiOutcome {
        let body = FolderRequest {
            workspace_id: &self.inner.project_id,
            environment: &self.inner.environment,
            name,
            path: parent,
        };
        self.authenticated(&["api", "v1", "folders"], &body, self.inner.retries)
    }

    fn create_secret(&self, secret: &VaultSecret) -> ApiOutcome {
        let body = SecretRequest {
            workspace_id: &self.inner.project_id,
            environment: &self.inner.environment,
            secret_path: &secret.path,
            secret_value: &secret.value,
            secret_comment: &secret.comment,
            kind: "shared",
        };
        // Never transport-retried: a lost response would turn into a bogus conflict.
        self.authenticated(&["api", "v3", "secrets", "raw", &secret.key], &body, 0)
    }
}

/// Map an HTTP reply onto the writer's tagged outcome.
///
/// 409 is a conflict.  Some backend versions answer an existing resource
/// with 400 instead; that case is recognized here, at the API boundary,
/// and nowhere else.
fn classify(reply: &HttpReply) -> ApiOutcome {
    match reply.status {
        200..=299 => ApiOutcome::Created,
        409 => ApiOutcome::Conflict,
        400 if reports_existing(&reply.body) => ApiOutcome::Conflict,
        status => ApiOutcome::Failed(format!("HTTP {status}: {}", error_message(&reply.body))),
    }
}

fn reports_existing(body: &str) -> bool {
    let message = error_message(body).to_ascii_lowercase();
    message.contains("already exist") || message.contains("duplicate")
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) if !parsed.message.is_empty() => parsed.message,
        _ => body.chars().take(200).collect(),
    }
}
