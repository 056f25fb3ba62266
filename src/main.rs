//! driveup - Command-line OneDrive Uploader
//!
//! Signs in against the Microsoft identity platform using the device-code
//! or client-credential OAuth2 flow, then uploads local files to OneDrive
//! through the Microsoft Graph API.

#![deny(clippy::all)]

mod auth;
mod cli;
mod config;
mod error;
mod graph;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use auth::oauth::OAuth2Client;
use auth::session::{spawn_device_sign_in, AuthFlow, Session, SignInEvent};
use cli::{Cli, Command};
use config::Config;
use error::{AppError, AuthError, InputError};
use graph::{upload_all, GraphClient, UploadReport};

fn main() {
    // Load .env file (if present) before anything else
    if let Err(e) = dotenvy::dotenv() {
        // .env file is optional - only log if it's not a "file not found" error
        if !e.to_string().contains("not found") {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            eprintln!("\nPlease set the following environment variables:");
            eprintln!("  CLIENT_ID=<application id from your app registration>");
            eprintln!("  TENANT_ID=<directory id, or common/consumers>");
            eprintln!("  CLIENT_SECRET=<application secret, app-only flow only>");
            std::process::exit(1);
        }
    };

    init_logging(&config.logging.level);

    info!("Starting {} v{}", config.app.name, env!("CARGO_PKG_VERSION"));
    if !config.oauth.redirect_uri.is_empty() {
        debug!("redirect_uri is set but unused by the device-code flow");
    }

    // Initialize Tokio runtime
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create Tokio runtime");

    match runtime.block_on(run(cli, &config)) {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli, config: &Config) -> Result<i32> {
    let oauth = Arc::new(OAuth2Client::new(config)?);
    let graph = GraphClient::new(config)?;

    match cli.command {
        Command::Folders { no_browser } => {
            let session = device_sign_in(&oauth, !no_browser).await?;
            list_folders(&graph, &session).await
        }
        Command::Upload {
            files,
            folder,
            app_only,
            no_browser,
        } => upload(&oauth, &graph, files, folder, app_only, no_browser).await,
        Command::Whoami { no_browser } => {
            let session = device_sign_in(&oauth, !no_browser).await?;
            let profile = graph.get_user_profile(&session).await?;
            println!(
                "Signed in as {} <{}>",
                profile.display_name_or_upn(),
                profile.email()
            );
            Ok(0)
        }
    }
}

/// List root folders and render them, or a distinct "no folders" line.
async fn list_folders(graph: &GraphClient, session: &Session) -> Result<i32> {
    let folders = graph.list_folders(session).await?;

    if folders.is_empty() {
        println!("No folders found at the drive root.");
    } else {
        for folder in &folders {
            println!("{}", folder.display_text());
        }
    }

    Ok(0)
}

/// The upload workflow: validate input, sign in, resolve the destination
/// folder, run the batch, render the per-file report.
async fn upload(
    oauth: &Arc<OAuth2Client>,
    graph: &GraphClient,
    files: Vec<PathBuf>,
    folder: Option<String>,
    app_only: bool,
    no_browser: bool,
) -> Result<i32> {
    // Validate input before any sign-in round trip
    if files.is_empty() {
        return Err(InputError::NoFiles.into());
    }
    let folder = folder.filter(|f| !f.trim().is_empty());
    if app_only && folder.is_none() {
        return Err(InputError::NoFolder.into());
    }

    let session = if app_only {
        let token = oauth.client_credentials_token().await?;
        Session::from_token_response(token, AuthFlow::ClientCredentials)
    } else {
        device_sign_in(oauth, !no_browser).await?
    };

    debug!("Authenticated via {:?}", session.flow);
    if session.is_expired() {
        warn!("Access token is already expired; uploads will likely be rejected");
    }

    let folder_name = match folder {
        Some(name) => name,
        None => {
            let folders = graph.list_folders(&session).await?;
            if folders.is_empty() {
                println!("No folders found at the drive root.");
                return Err(InputError::NoFolder.into());
            }
            cli::prompt_folder_selection(&folders)?
        }
    };

    let results = upload_all(graph, &session, &folder_name, &files).await?;
    let report = UploadReport::new(results);

    for line in report.lines() {
        println!("{}", line);
    }
    println!("{}", report.summary_text());

    Ok(if report.all_succeeded() { 0 } else { 1 })
}

/// Drive the device-code sign-in task to completion.
///
/// Renders the prompt when it arrives, optionally opens the verification
/// page in the system browser, then waits for the terminal outcome.
async fn device_sign_in(
    oauth: &Arc<OAuth2Client>,
    open_browser: bool,
) -> Result<Session, AppError> {
    let mut events = spawn_device_sign_in(Arc::clone(oauth));

    while let Some(event) = events.recv().await {
        match event {
            SignInEvent::Prompt(authorization) => {
                match authorization.message.as_deref() {
                    Some(message) if !message.is_empty() => println!("{}", message),
                    _ => println!(
                        "To sign in, open {} and enter the code {}",
                        authorization.verification_uri, authorization.user_code
                    ),
                }

                if open_browser {
                    if let Err(e) = open::that(&authorization.verification_uri) {
                        warn!("Failed to open browser: {}", e);
                    }
                }

                println!("Waiting for sign-in to complete...");
            }
            SignInEvent::Completed(outcome) => {
                let session = outcome?;
                info!("Signed in; token valid until {}", session.expires_at);
                return Ok(session);
            }
        }
    }

    Err(AppError::Auth(AuthError::ChannelClosed))
}

/// Initialize tracing/logging to stderr.
fn init_logging(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();
}
