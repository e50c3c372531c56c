//! authgate - command line front end for the session gateway.
//!
//! Plays the part of the UI: logs in, inspects the session, and walks the
//! navigation guard. Notices raised by the request pipeline are printed to
//! stderr after each command.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use authgate_core::api::{ApiRequest, ChannelNotifier, Notice};
use authgate_core::auth::{codec, expiry};
use authgate_core::{Gateway, GatewayConfig, LoginError, LoginRequest, NavigationOutcome};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Fallback log file name when `--log-file` names a directory.
const DEFAULT_LOG_FILE: &str = "authgate.log";

#[derive(Parser)]
#[command(name = "authgate", version, about = "Session gateway for the indicator API")]
struct Cli {
    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and load the user profile
    Login {
        #[arg(short, long, env = "AUTHGATE_USERNAME")]
        username: Option<String>,
    },
    /// Clear the session
    Logout,
    /// Refresh and show the current user and permissions
    Whoami,
    /// Show the held credential's state without calling the API
    Status,
    /// Attempt a guarded view transition
    Navigate { path: String },
    /// Authenticated GET through the pipeline, printing the payload
    Get {
        path: String,
        /// Query parameter as key=value (repeatable)
        #[arg(short, long = "query", value_parser = parse_pair)]
        query: Vec<(String, String)>,
    },
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_file: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| DEFAULT_LOG_FILE.into());
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_file.as_deref());

    let mut config = GatewayConfig::load().context("Failed to load configuration")?;
    let (notifier, mut notices) = ChannelNotifier::channel();
    let gateway = Gateway::builder(config.clone())
        .notifier(Arc::new(notifier))
        .build()?;

    let result = match cli.command {
        Command::Login { username } => login(&gateway, &mut config, username).await,
        Command::Logout => {
            gateway.logout();
            println!("Logged out.");
            Ok(())
        }
        Command::Whoami => whoami(&gateway).await,
        Command::Status => {
            status(&gateway);
            Ok(())
        }
        Command::Navigate { path } => {
            navigate(&gateway, &path);
            Ok(())
        }
        Command::Get { path, query } => get(&gateway, &path, query).await,
    };

    drain_notices(&mut notices);
    result
}

fn drain_notices(notices: &mut UnboundedReceiver<Notice>) {
    while let Ok(notice) = notices.try_recv() {
        eprintln!("! {}", notice.message);
    }
}

async fn login(gateway: &Gateway, config: &mut GatewayConfig, username: Option<String>) -> Result<()> {
    let username = match username.or_else(|| config.last_username.clone()) {
        Some(name) if !name.is_empty() => name,
        _ => prompt("Username: ")?,
    };
    let password = match std::env::var("AUTHGATE_PASSWORD") {
        Ok(password) if !password.is_empty() => password,
        _ => rpassword::prompt_password("Password: ")?,
    };

    if username.is_empty() || password.is_empty() {
        anyhow::bail!("Username and password required");
    }

    match gateway.login(&LoginRequest::new(username.clone(), password)).await {
        Ok(()) => {
            config.last_username = Some(username);
            if let Err(e) = config.save() {
                warn!(error = %e, "Failed to save config");
            }
            match gateway.snapshot().profile {
                Some(profile) => println!("Logged in as {} (id {}).", profile.username, profile.id),
                None => println!("Credential issued, but the profile could not be loaded."),
            }
            Ok(())
        }
        Err(LoginError::InvalidCredentials) => {
            anyhow::bail!("Invalid username or password")
        }
        Err(e) => Err(e.into()),
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

async fn whoami(gateway: &Gateway) -> Result<()> {
    gateway.refresh_profile().await;
    let snapshot = gateway.snapshot();
    let Some(profile) = snapshot.profile else {
        println!("Not logged in.");
        return Ok(());
    };

    println!("User:   {} (id {})", profile.username, profile.id);
    if let Some(role) = profile.role_id {
        println!("Role:   {}", role);
    }
    if let Some(ref phone) = profile.phone {
        println!("Phone:  {}", phone);
    }
    println!("Active: {}", if profile.is_active() { "yes" } else { "no" });
    if snapshot.permissions.is_empty() {
        println!("Permissions: none");
    } else {
        println!("Permissions:");
        for code in snapshot.permissions.iter() {
            println!("  {}", code);
        }
    }
    Ok(())
}

fn status(gateway: &Gateway) {
    let Some(token) = gateway.store().credential() else {
        println!("No credential held.");
        return;
    };

    match codec::decode(&token) {
        Ok(claims) => {
            if let Some(sub) = claims.subject() {
                println!("Subject: {}", sub);
            }
            match expiry::seconds_until_expiry(&token) {
                Some(secs) => println!("Usable:  yes ({}m {}s left)", secs / 60, secs % 60),
                None => println!("Usable:  no (expired or no expiry claim)"),
            }
        }
        Err(e) => println!("Usable:  no ({})", e),
    }
}

fn navigate(gateway: &Gateway, path: &str) {
    let outcome = gateway.navigate(path);
    info!(path = path, ?outcome, "Navigation evaluated");
    match outcome {
        NavigationOutcome::Allow => println!("Entered {}", gateway.location()),
        NavigationOutcome::Redirect(to) => println!("Redirected to {}", to),
        NavigationOutcome::Reject => println!("Navigation to {} rejected", path),
    }
}

async fn get(gateway: &Gateway, path: &str, query: Vec<(String, String)>) -> Result<()> {
    let request = query
        .into_iter()
        .fold(ApiRequest::get(path), |req, (k, v)| req.with_query(k, v));
    let payload: serde_json::Value = gateway.api().send(request).await?;
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pair() {
        assert_eq!(
            parse_pair("page=2"),
            Ok(("page".to_string(), "2".to_string()))
        );
        assert_eq!(parse_pair("q=a=b").map(|(_, v)| v), Ok("a=b".to_string()));
        assert!(parse_pair("novalue").is_err());
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["authgate", "get", "/majors/", "-q", "page=1"])
            .expect("valid args");
        assert!(matches!(cli.command, Command::Get { ref query, .. } if query.len() == 1));

        let cli = Cli::try_parse_from(["authgate", "navigate", "/dashboard"]).expect("valid args");
        assert!(matches!(cli.command, Command::Navigate { ref path } if path == "/dashboard"));
    }
}
