//! # RBAC configuration validator
//!
//! Loads a JSON configuration document, reports every structural problem,
//! and optionally runs permission checks against the resulting engine.
//!
//! ```text
//! rbac-validate rbac.json
//! rbac-validate rbac.json --user alice --roles editor,viewer --permission post:write
//! rbac-validate rbac.json --snapshot
//! ```
//!
//! `RUST_LOG` controls log output on stderr (default: `info`).

use anyhow::{bail, Context, Result};
use clap::Parser;
use cretoai_rbac::{PermissionEngine, RbacConfig, User};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "rbac-validate")]
#[command(about = "Validate an RBAC configuration and run permission checks", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration document (JSON)
    config: PathBuf,

    /// User id for permission checks
    #[arg(short, long, requires = "permission")]
    user: Option<String>,

    /// Comma-separated roles of the user
    #[arg(short, long, value_delimiter = ',')]
    roles: Vec<String>,

    /// Permission to check (repeatable)
    #[arg(short, long)]
    permission: Vec<String>,

    /// Print the loaded engine state as JSON
    #[arg(long)]
    snapshot: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(false)` when at least one permission check was denied
fn run(cli: Cli) -> Result<bool> {
    let raw = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("reading {}", cli.config.display()))?;
    let document: RbacConfig = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", cli.config.display()))?;

    let issues = document.issues();
    if !issues.is_empty() {
        for issue in &issues {
            eprintln!("  - {issue}");
        }
        bail!("{} problem(s) in {}", issues.len(), cli.config.display());
    }

    let engine = PermissionEngine::from_config(&document)?;
    info!("Configuration {} loaded", cli.config.display());

    println!(
        "{} v{}: {} permissions, {} roles ({:?} strategy)",
        document.name.as_deref().unwrap_or("<unnamed>"),
        document.version.as_deref().unwrap_or("-"),
        engine.get_all_permissions().len(),
        engine.get_all_roles().len(),
        engine.strategy()
    );

    if cli.snapshot {
        println!("{}", engine.serialize_json()?);
    }

    let Some(user_id) = cli.user else {
        return Ok(true);
    };

    let user = User::with_roles(user_id, cli.roles);
    let mut all_allowed = true;
    for permission in &cli.permission {
        let result = engine.authorize(&user, permission);
        match result.reason {
            None => println!("ALLOW {} {}", user.id, permission),
            Some(reason) => {
                all_allowed = false;
                println!("DENY  {} {} ({})", user.id, permission, reason);
            }
        }
    }

    engine.shutdown();
    Ok(all_allowed)
}
