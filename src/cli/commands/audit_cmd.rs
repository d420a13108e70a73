//! `secretzero audit`: list recent deposits from the local ledger.
//!
//!   secretzero audit --last 20 --since 7d

use chrono::{DateTime, Duration, Utc};

use crate::audit::{AuditEntry, AuditLog};
use crate::cli::{load_config, output, Cli};
use crate::errors::{Result, SecretZeroError};

/// Execute the `audit` command.
pub fn execute(cli: &Cli, last: usize, since: Option<&str>) -> Result<()> {
    let cutoff = since.map(parse_age).transpose()?.map(|age| Utc::now() - age);

    let (dir, settings, _) = load_config(cli)?;
    let ledger_dir = settings.audit_path(&dir);
    if !AuditLog::db_path(&ledger_dir).exists() {
        output::info("No deposits recorded yet.");
        return Ok(());
    }

    let ledger = AuditLog::open(&ledger_dir)
        .ok_or_else(|| SecretZeroError::AuditError(format!("cannot open ledger in {}", ledger_dir.display())))?;

    let entries = ledger.query(last, cutoff)?;
    if entries.is_empty() {
        output::info("No deposits in that window.");
    } else {
        print_audit_table(&entries);
    }
    Ok(())
}

/// "7d", "24h" or "30m" as a duration.
fn parse_age(input: &str) -> Result<Duration> {
    let input = input.trim();
    let invalid = || SecretZeroError::CommandFailed(format!("invalid duration '{input}': use e.g. 7d, 24h or 30m"));

    let unit_at = input.char_indices().last().map(|(i, _)| i).ok_or_else(invalid)?;
    let (amount, unit) = input.split_at(unit_at);
    let amount: i64 = amount.parse().map_err(|_| invalid())?;

    match unit {
        "d" => Duration::try_days(amount),
        "h" => Duration::try_hours(amount),
        "m" => Duration::try_minutes(amount),
        _ => None,
    }
    .ok_or_else(invalid)
}

fn local_time(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string()
}

/// Print ledger entries as a table.
pub fn print_audit_table(entries: &[AuditEntry]) {
    use comfy_table::{ContentArrangement, Table};
    use console::style;

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["When", "Organization", "Member", "App", "Keys"]);

    for entry in entries {
        table.add_row(vec![
            local_time(&entry.timestamp),
            entry.organization.clone(),
            entry.member_id.clone(),
            style(&entry.app_prefix).cyan().to_string(),
            format!("{} ({})", entry.created_keys.join(", "), entry.secrets_count),
        ]);
    }

    println!("{table}");
    println!("{}", style(format!("{} deposit(s)", entries.len())).dim());
}
