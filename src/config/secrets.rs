use std::fmt;

use zeroize::Zeroizing;

/// Credentials read from the environment, wiped on drop.
///
/// Empty variables count as unset.
#[derive(Default)]
pub struct EnvSecrets {
    pub client_id: Option<Zeroizing<String>>,
    pub client_secret: Option<Zeroizing<String>>,
    pub private_key: Option<Zeroizing<String>>,
    pub webhook_secret: Option<Zeroizing<String>>,
    pub inbound_webhook_secret: Option<Zeroizing<String>>,
}

impl EnvSecrets {
    pub const CLIENT_ID: &'static str = "SECRETZERO_CLIENT_ID";
    pub const CLIENT_SECRET: &'static str = "SECRETZERO_CLIENT_SECRET";
    pub const PRIVATE_KEY: &'static str = "SECRETZERO_PRIVATE_KEY";
    pub const WEBHOOK_SECRET: &'static str = "SECRETZERO_WEBHOOK_SECRET";
    pub const INBOUND_WEBHOOK_SECRET: &'static str = "SECRETZERO_INBOUND_WEBHOOK_SECRET";

    /// Read every credential from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read credentials through `lookup` (used by tests).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|v| !v.is_empty()).map(Zeroizing::new);

        Self {
            client_id: read(Self::CLIENT_ID),
            client_secret: read(Self::CLIENT_SECRET),
            private_key: read(Self::PRIVATE_KEY),
            webhook_secret: read(Self::WEBHOOK_SECRET),
            inbound_webhook_secret: read(Self::INBOUND_WEBHOOK_SECRET),
        }
    }
}

impl fmt::Debug for EnvSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set = |v: &Option<Zeroizing<String>>| if v.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("EnvSecrets")
            .field("client_id", &set(&self.client_id))
            .field("client_secret", &set(&self.client_secret))
            .field("private_key", &set(&self.private_key))
            .field("webhook_secret", &set(&self.webhook_secret))
            .field("inbound_webhook_secret", &set(&self.inbound_webhook_secret))
            .finish()
    }
}
