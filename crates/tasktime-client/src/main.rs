//! tasktime CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use tasktime_core::{TracingConfig, init_tracing};

use tasktime_client::cli::{AuthProvider, Cli, Command, ConfigAction};
use tasktime_client::commands;
use tasktime_client::config::ClientConfig;
use tasktime_client::error::{ClientError, ClientResult};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config_path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    let config = match cli.config {
        Some(ref path) => ClientConfig::load_from(path),
        None => ClientConfig::load(),
    }
    .map_err(ClientError::Config)?;

    let debug = cli.debug || config.debug;
    let tracing = match cli.command {
        Some(Command::Serve(_)) => TracingConfig::server(debug),
        _ => TracingConfig::cli(debug),
    };
    if let Err(e) = init_tracing(tracing) {
        eprintln!("warning: {}", e);
    }

    match cli.command {
        Some(Command::Serve(args)) => commands::serve::run(args, &config).await,
        Some(Command::Auth { provider }) => match provider {
            AuthProvider::Google {
                client_id,
                client_secret,
                credentials_file,
                force,
            } => {
                commands::auth::google(
                    client_id,
                    client_secret,
                    credentials_file,
                    force,
                    &config,
                    &config_path,
                )
                .await
            }
        },
        Some(Command::Logout) => commands::logout::run(&config).map(|_| ()),
        Some(Command::Summary(args)) => commands::summary::run(&args, &config).await,
        Some(Command::Config { action }) => match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&config_path),
        },
        None => {
            println!("tasktime - Monthly time per task from your Google Calendar");
            println!();
            println!("Run 'tasktime --help' for usage information.");
            println!();
            println!("Quick start:");
            println!(
                "  1. Sign in: tasktime auth google --client-id <ID> --client-secret <SECRET>"
            );
            println!("  2. Print the summary: tasktime summary");
            println!("  3. Or run the web API: tasktime serve");
            Ok(())
        }
    }
}
