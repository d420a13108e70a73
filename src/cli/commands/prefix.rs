//! `secretzero prefix`: show the key prefix a URL maps to.

use crate::cli::output;
use crate::errors::Result;
use crate::naming::{derive_app_prefix, extract_domain};

/// Execute the `prefix` command.
pub fn execute(url: &str) -> Result<()> {
    let prefix = derive_app_prefix(url)?;
    println!("{prefix}");
    output::tip(&format!(
        "{} -> {prefix}_URL, {prefix}_LOGIN, {prefix}_PASSWORD, {prefix}_API_TOKEN",
        extract_domain(url)
    ));
    Ok(())
}
