#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI reporting IMAP quota usage for the accounts of a `KeePass` group

use anyhow::Context;
use clap::Parser;
use futures::StreamExt;
use mailbox_quota::{
    AccountReport, Credential, CredentialStore, OutputFormat, QuotaChecker, Security, ServerConfig,
    TerminalPrompt, report, resolve_password, sort_by_usage, write_report,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mailbox-quota", version)]
#[command(about = "Get the mailboxes quota and usage")]
struct Args {
    /// Mail server address
    #[arg(short = 's', long, env = "IMAP_SERVER", help_heading = "Mail server options")]
    server: String,

    /// Mail server port
    #[arg(short = 'p', long, env = "IMAP_PORT", help_heading = "Mail server options")]
    port: u16,

    /// Use implicit TLS
    #[arg(short = 'S', long, help_heading = "Mail server options")]
    ssl: bool,

    /// Upgrade a plaintext connection with STARTTLS
    #[arg(long, conflicts_with = "ssl", help_heading = "Mail server options")]
    starttls: bool,

    /// Accept invalid or self-signed TLS certificates
    #[arg(long, help_heading = "Mail server options")]
    insecure: bool,

    /// Mailbox whose quota root is reported
    #[arg(short = 'R', long, default_value = "INBOX", help_heading = "Mail server options")]
    root: String,

    /// Output for results (use - for stdout)
    #[arg(short = 'o', long, default_value = "-", help_heading = "Output options")]
    output: String,

    /// Output format for results: text, csv or json
    #[arg(short = 'f', long, default_value = "text", help_heading = "Output options")]
    format: OutputFormat,

    /// Don't show progress messages
    #[arg(short = 'q', long, help_heading = "Output options")]
    quiet: bool,

    /// Path of the KDBX credential database
    #[arg(short = 'd', long, env = "KEEPASS_DATABASE", help_heading = "KeePass database options")]
    database: PathBuf,

    /// Group holding the mail accounts
    #[arg(short = 'g', long, help_heading = "KeePass database options")]
    group: String,

    /// Database password (use - to be prompted)
    #[arg(
        short = 'P',
        long,
        env = "KEEPASS_PASSWORD",
        hide_env_values = true,
        allow_hyphen_values = true,
        help_heading = "KeePass database options"
    )]
    password: Option<String>,

    /// Database key file path
    #[arg(short = 'k', long, env = "KEEPASS_KEY", help_heading = "KeePass database options")]
    key: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = ServerConfig::new(&args.server, args.port)
        .with_security(Security::from_flags(args.ssl, args.starttls)?)
        .with_root(args.root.as_str())
        .accept_invalid_certs(args.insecure);
    config.validate()?;

    let password = resolve_password(args.password.clone(), &TerminalPrompt::default())?;
    let store = CredentialStore::open(&args.database, password.as_deref(), args.key.as_deref())
        .with_context(|| format!("Cannot open {}", args.database.display()))?;
    let credentials = store.entries_in_group(&args.group)?;

    let checker = QuotaChecker::new(config);
    let reports = collect_reports(&checker, credentials, args.quiet).await;

    if args.output == "-" {
        write_report(std::io::stdout().lock(), args.format, &reports)?;
    } else {
        let file = File::create(&args.output)
            .with_context(|| format!("Cannot create {}", args.output))?;
        write_report(BufWriter::new(file), args.format, &reports)?;
    }

    Ok(())
}

/// Drain the report stream, printing progress on stderr, and return
/// the reports sorted by usage.
async fn collect_reports(
    checker: &QuotaChecker,
    credentials: Vec<Credential>,
    quiet: bool,
) -> Vec<AccountReport> {
    let total = credentials.len();
    let mut reports = Vec::with_capacity(total);

    let mut stream = std::pin::pin!(report(checker, credentials));
    while let Some(account) = stream.next().await {
        if !quiet {
            eprintln!("{:>3}/{} {}", reports.len() + 1, total, account.title);
        }
        reports.push(account);
    }

    sort_by_usage(&mut reports);
    reports
}
