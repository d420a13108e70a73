//! Inbound identity-provider webhook handling.
//!
//! The body is verified over its raw bytes before it is parsed.  Events
//! are only logged, by identifier, never with member emails or names of
//! people.

use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{error, info, warn};

use super::signature::verify;

/// Header the identity provider puts its signature in.
pub const INBOUND_SIGNATURE_HEADER: &str = "X-Stytch-Signature";

/// A status code and JSON body to send back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundResponse {
    pub status: u16,
    pub body: Value,
}

impl InboundResponse {
    fn ok() -> Self {
        Self {
            status: 200,
            body: json!({"received": true}),
        }
    }

    fn unauthorized() -> Self {
        Self {
            status: 401,
            body: json!({"error": "Invalid signature"}),
        }
    }

    fn internal_error() -> Self {
        Self {
            status: 500,
            body: json!({"error": "Internal server error"}),
        }
    }
}

/// Envelope of every inbound event.  Every field is optional: anything
/// that parses as JSON is acknowledged, so the sender never retries it.
#[derive(Debug, Default, Deserialize)]
pub struct InboundEvent {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
}

/// Verify, parse and dispatch one inbound webhook.
///
/// With `secret` set, a missing or wrong signature is a 401.  Without
/// one, signatures are not checked at all.
pub fn handle_inbound(raw_body: &[u8], signature: Option<&str>, secret: Option<&str>) -> InboundResponse {
    match secret.filter(|s| !s.is_empty()) {
        Some(secret) => {
            let valid = signature.is_some_and(|sig| verify(raw_body, sig, secret.as_bytes()));
            if !valid {
                error!("inbound webhook has an invalid signature");
                return InboundResponse::unauthorized();
            }
        }
        None => warn!("inbound webhook secret not configured, accepting unsigned event"),
    }

    let event: InboundEvent = match serde_json::from_slice::<Value>(raw_body) {
        Ok(value) => serde_json::from_value(value).unwrap_or_else(|e| {
            warn!(error = %e, "inbound webhook has an unexpected envelope");
            InboundEvent::default()
        }),
        Err(e) => {
            error!(error = %e, "could not parse inbound webhook");
            return InboundResponse::internal_error();
        }
    };

    let event_type = event.event_type.as_deref().unwrap_or("-");
    info!(
        event_id = event.event_id.as_deref().unwrap_or("-"),
        event_type,
        created_at = event.created_at.as_deref().unwrap_or("-"),
        "inbound webhook received"
    );

    let data = event.data.unwrap_or_default();
    match event_type {
        "member.created" => member_created(&data),
        "member.deleted" => member_deleted(&data),
        "organization.created" => organization_created(&data),
        "session.revoked" => session_revoked(&data),
        other => info!(event_type = other, "unhandled inbound event type"),
    }

    InboundResponse::ok()
}

fn member_created(data: &Map<String, Value>) {
    if let (Some(member), Some(org)) = (object(data, "member"), object(data, "organization")) {
        info!(
            member_id = field(member, "member_id"),
            organization_id = field(org, "organization_id"),
            organization_name = field(org, "organization_name"),
            "member created"
        );
    }
}

fn member_deleted(data: &Map<String, Value>) {
    if let Some(member) = object(data, "member") {
        info!(member_id = field(member, "member_id"), "member deleted");
    }
}

fn organization_created(data: &Map<String, Value>) {
    if let Some(org) = object(data, "organization") {
        info!(
            organization_id = field(org, "organization_id"),
            organization_name = field(org, "organization_name"),
            organization_slug = field(org, "organization_slug"),
            "organization created"
        );
    }
}

fn session_revoked(data: &Map<String, Value>) {
    if let Some(session) = object(data, "session") {
        info!(
            session_id = field(session, "session_id"),
            member_id = field(session, "member_id"),
            "session revoked"
        );
    }
}

fn object<'a>(data: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    data.get(key).and_then(Value::as_object)
}

fn field<'a>(map: &'a Map<String, Value>, key: &str) -> &'a str {
    map.get(key).and_then(Value::as_str).unwrap_or("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhook::sign;

    const BODY: &[u8] = br#"{"event_id":"evt_1","event_type":"member.created","created_at":"2024-01-01T00:00:00Z","data":{"member":{"member_id":"m1","email_address":"a@b.test"},"organization":{"organization_id":"o1"}}}"#;

    #[test]
    fn valid_signature_is_accepted() {
        let sig = sign(BODY, b"whsec");
        let resp = handle_inbound(BODY, Some(&sig), Some("whsec"));
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, json!({"received": true}));
    }

    #[test]
    fn missing_signature_is_rejected_when_secret_set() {
        let resp = handle_inbound(BODY, None, Some("whsec"));
        assert_eq!(resp.status, 401);
        assert_eq!(resp.body, json!({"error": "Invalid signature"}));
    }

    #[test]
    fn wrong_signature_is_rejected_before_parsing() {
        let resp = handle_inbound(b"not json", Some("00"), Some("whsec"));
        assert_eq!(resp.status, 401);
    }

    #[test]
    fn no_secret_skips_verification() {
        let resp = handle_inbound(BODY, None, None);
        assert_eq!(resp.status, 200);
    }

    #[test]
    fn malformed_json_is_internal_error() {
        let resp = handle_inbound(b"{oops", None, None);
        assert_eq!(resp.status, 500);
        assert_eq!(resp.body, json!({"error": "Internal server error"}));
    }

    #[test]
    fn unknown_event_is_acknowledged() {
        let body = br#"{"event_id":"evt_2","event_type":"member.updated","data":{}}"#;
        assert_eq!(handle_inbound(body, None, None).status, 200);
    }

    #[test]
    fn known_events_with_missing_data_are_acknowledged() {
        for kind in ["member.created", "member.deleted", "organization.created", "session.revoked"] {
            let body = format!(r#"{{"event_id":"e","event_type":"{kind}"}}"#);
            assert_eq!(handle_inbound(body.as_bytes(), None, None).status, 200, "{kind}");
        }
    }

    #[test]
    fn loose_envelopes_are_acknowledged() {
        for body in [
            r#"{"event_type":"member.deleted"}"#,
            r#"{"event_id":"e","event_type":"member.created","data":null}"#,
            r#"{"event_id":7,"event_type":"session.revoked","data":"x"}"#,
            r#"{}"#,
            r#"[1, 2]"#,
        ] {
            let resp = handle_inbound(body.as_bytes(), None, None);
            assert_eq!(resp.status, 200, "{body}");
            assert_eq!(resp.body, json!({"received": true}));
        }
    }
}
