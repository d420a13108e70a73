use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use secretzero::cli::commands::{self, encrypt::EncryptArgs};
use secretzero::cli::{output, Cli, Commands};

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries JSON and PEM output.
    let filter = EnvFilter::try_from_env("SECRETZERO_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("secretzero=debug")
        } else {
            EnvFilter::new("secretzero=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let result = match cli.command {
        Commands::Keygen { ref out_dir, force } => commands::keygen::execute(&cli, out_dir.as_deref(), force),
        Commands::Encrypt {
            ref public_key,
            ref org,
            ref url,
            ref login,
            password,
            api_token,
            ref output,
        } => commands::encrypt::execute(
            &cli,
            &EncryptArgs {
                public_key: public_key.as_deref(),
                org,
                url,
                login: login.as_deref(),
                password,
                api_token,
                output: output.as_deref(),
            },
        ),
        Commands::Deposit { ref input, ref session } => commands::deposit::execute(&cli, input, session),
        Commands::Prefix { ref url } => commands::prefix::execute(url),
        Commands::Webhook { ref action } => commands::webhook::execute(&cli, action),
        #[cfg(feature = "audit-log")]
        Commands::Audit { last, ref since } => commands::audit_cmd::execute(&cli, last, since.as_deref()),
        #[cfg(not(feature = "audit-log"))]
        Commands::Audit { .. } => Err(secretzero::errors::SecretZeroError::AuditError(
            "audit log support not compiled (enable the `audit-log` feature)".into(),
        )),
        Commands::Completions { shell } => commands::completions::execute(shell),
    };

    if let Err(e) = result {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}
