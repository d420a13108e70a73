//! Colored terminal output helpers.
//!
//! Human-facing messages go to stderr through these functions so that
//! stdout stays clean for JSON and PEM output.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::vault::DepositResult;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    eprintln!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    eprintln!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    eprintln!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print the keys a deposit created, flagging renamed duplicates.
pub fn print_deposit_table(result: &DepositResult) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "Key", "Note"]);

    for (i, key) in result.created_keys.iter().enumerate() {
        let note = if is_renamed(key) { "duplicate (renamed)" } else { "" };
        table.add_row(vec![(i + 1).to_string(), key.clone(), note.to_string()]);
    }

    eprintln!("{table}");
}

/// Whether `key` ends in the `_YYYYMMDD_HHMMSS` rename suffix.
fn is_renamed(key: &str) -> bool {
    let mut parts = key.rsplitn(3, '_');
    let time = parts.next().unwrap_or_default();
    let date = parts.next().unwrap_or_default();
    parts.next().is_some()
        && date.len() == 8
        && time.len() == 6
        && date.chars().chain(time.chars()).all(|c| c.is_ascii_digit())
}
