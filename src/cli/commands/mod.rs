//! One module per subcommand.  Each exposes `execute`.

#[cfg(feature = "audit-log")]
pub mod audit_cmd;
pub mod completions;
pub mod deposit;
pub mod encrypt;
pub mod keygen;
pub mod prefix;
pub mod webhook;
