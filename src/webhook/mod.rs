//! Webhooks: HMAC signing, the outbound deposit notification, and the
//! inbound identity-provider event handler.

pub mod inbound;
pub mod notify;
pub mod signature;

pub use inbound::{handle_inbound, InboundResponse, INBOUND_SIGNATURE_HEADER};
pub use notify::{DepositNotifier, NotificationEvent, WebhookNotifier, SIGNATURE_HEADER};
pub use signature::{sign, verify};
