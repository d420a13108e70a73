//! Configuration: `secretzero.toml` settings and credentials from the
//! environment.

pub mod secrets;
pub mod settings;

pub use secrets::EnvSecrets;
pub use settings::Settings;
