//! Outbound admin notification after a successful deposit.
//!
//! The event carries metadata only: who deposited, for which app, how
//! many secrets.  Secret values cannot end up here because the event
//! type has no field that could hold one.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use ureq::Agent;
use zeroize::Zeroizing;

use super::signature::sign;
use crate::errors::{Result, SecretZeroError};

/// Header carrying the hex HMAC of the request body.
pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

/// Event name in the notification envelope.
pub const DEPOSIT_EVENT: &str = "secret.deposited";

/// Audit metadata for one deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    pub organization_slug: String,
    pub member_email: String,
    pub member_id: String,
    pub app_prefix: String,
    pub app_domain: String,
    pub secrets_count: usize,
    pub timestamp: String,
}

#[derive(Serialize)]
struct Envelope<'a> {
    event: &'a str,
    data: &'a NotificationEvent,
}

/// Something that can be told about a completed deposit.
pub trait DepositNotifier: Send + Sync {
    fn notify(&self, event: &NotificationEvent) -> Result<()>;
}

impl<T: DepositNotifier + ?Sized> DepositNotifier for &T {
    fn notify(&self, event: &NotificationEvent) -> Result<()> {
        (**self).notify(event)
    }
}

/// Serialize the envelope exactly as it is sent (and signed).
pub fn envelope_body(event: &NotificationEvent) -> Result<String> {
    serde_json::to_string(&Envelope {
        event: DEPOSIT_EVENT,
        data: event,
    })
    .map_err(|e| SecretZeroError::SerializationError(format!("notification: {e}")))
}

/// POSTs the event to an admin webhook, signed when a secret is set.
///
/// With no URL configured every notification is a silent no-op.
pub struct WebhookNotifier {
    url: Option<String>,
    secret: Option<Zeroizing<String>>,
    agent: Agent,
    retries: u32,
}

impl WebhookNotifier {
    pub fn new(url: Option<String>, secret: Option<Zeroizing<String>>, timeout: Duration, retries: u32) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            url: url.filter(|u| !u.trim().is_empty()),
            secret: secret.filter(|s| !s.is_empty()),
            agent,
            retries,
        }
    }

    /// Whether a webhook URL is configured.
    pub fn is_enabled(&self) -> bool {
        self.url.is_some()
    }

    fn post_once(&self, url: &str, body: &str, signature: Option<&str>) -> std::result::Result<u16, String> {
        let mut request = self
            .agent
            .post(url)
            .header("Content-Type", "application/json");
        if let Some(sig) = signature {
            request = request.header(SIGNATURE_HEADER, sig);
        }
        let response = request.send(body).map_err(|e| e.to_string())?;
        Ok(response.status().as_u16())
    }
}

impl DepositNotifier for WebhookNotifier {
    fn notify(&self, event: &NotificationEvent) -> Result<()> {
        let Some(url) = self.url.as_deref() else {
            debug!("no admin webhook configured, skipping notification");
            return Ok(());
        };

        let body = envelope_body(event)?;
        let signature = self
            .secret
            .as_ref()
            .map(|secret| sign(body.as_bytes(), secret.as_bytes()));

        let mut attempt = 0;
        loop {
            let outcome = self.post_once(url, &body, signature.as_deref());
            let retryable = match &outcome {
                Ok(status) => *status >= 500,
                Err(_) => true,
            };
            if retryable && attempt < self.retries {
                attempt += 1;
                warn!(attempt, "admin webhook failed, retrying");
                continue;
            }

            return match outcome {
                Ok(status) if (200..300).contains(&status) => {
                    debug!(status, "deposit notification sent");
                    Ok(())
                }
                Ok(status) => Err(SecretZeroError::NotificationFailed(format!("webhook returned HTTP {status}"))),
                Err(e) => Err(SecretZeroError::NotificationFailed(e)),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> NotificationEvent {
        NotificationEvent {
            organization_slug: "acme".into(),
            member_email: "dev@acme.test".into(),
            member_id: "member-1".into(),
            app_prefix: "GITHUB".into(),
            app_domain: "github.com".into(),
            secrets_count: 2,
            timestamp: "2024-01-01T00:00:00.000Z".into(),
        }
    }

    #[test]
    fn envelope_shape() {
        let body: serde_json::Value = serde_json::from_str(&envelope_body(&event()).unwrap()).unwrap();
        assert_eq!(body["event"], "secret.deposited");
        assert_eq!(body["data"]["organizationSlug"], "acme");
        assert_eq!(body["data"]["appPrefix"], "GITHUB");
        assert_eq!(body["data"]["secretsCount"], 2);
        assert_eq!(body["data"].as_object().unwrap().len(), 7);
    }

    #[test]
    fn disabled_notifier_is_a_no_op() {
        let notifier = WebhookNotifier::new(None, Some(Zeroizing::new("s".into())), Duration::from_secs(1), 0);
        assert!(!notifier.is_enabled());
        assert!(notifier.notify(&event()).is_ok());
    }

    #[test]
    fn blank_url_counts_as_disabled() {
        let notifier = WebhookNotifier::new(Some("  ".into()), None, Duration::from_secs(1), 0);
        assert!(!notifier.is_enabled());
    }

    #[test]
    fn unreachable_webhook_is_an_error() {
        let notifier = WebhookNotifier::new(
            Some("http://127.0.0.1:9/hook".into()),
            Some(Zeroizing::new("s3cret".into())),
            Duration::from_millis(500),
            0,
        );
        assert!(matches!(
            notifier.notify(&event()),
            Err(SecretZeroError::NotificationFailed(_))
        ));
    }
}
