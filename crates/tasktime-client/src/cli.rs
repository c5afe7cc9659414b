//! Command-line interface definition.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tasktime_core::OutputFormat;

/// tasktime - Monthly time per task from your Google Calendar
#[derive(Debug, Parser)]
#[command(name = "tasktime")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "TASKTIME_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API in the foreground
    Serve(ServeArgs),

    /// Authentication commands
    Auth {
        #[command(subcommand)]
        provider: AuthProvider,
    },

    /// Remove the stored tokens
    Logout,

    /// Print the monthly summary
    Summary(SummaryArgs),

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Options for `serve`.
#[derive(Debug, Default, Args)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "TASKTIME_BIND")]
    pub bind: Option<SocketAddr>,

    /// OAuth client ID
    #[arg(long, env = "GOOGLE_CLIENT_ID", hide_env_values = true)]
    pub client_id: Option<String>,

    /// OAuth client secret
    #[arg(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Redirect URI registered with Google (must end in /api/auth/callback/google)
    #[arg(long, env = "GOOGLE_REDIRECT_URI")]
    pub redirect_uri: Option<String>,

    /// Mark the session cookie Secure (serving behind HTTPS)
    #[arg(long)]
    pub secure_cookies: bool,
}

/// Options for `summary`.
#[derive(Debug, Default, Args)]
pub struct SummaryArgs {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Read events from a JSON file instead of Google Calendar
    #[arg(long, value_name = "PATH")]
    pub events_file: Option<PathBuf>,

    /// Include events starting this many days ago
    #[arg(long)]
    pub lookback_days: Option<u32>,

    /// Maximum number of events to fetch (0 for no limit)
    #[arg(long)]
    pub max_results: Option<usize>,
}

impl SummaryArgs {
    /// Returns the output format based on CLI flags.
    pub fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Tty
        }
    }
}

/// Authentication providers.
#[derive(Debug, Subcommand)]
pub enum AuthProvider {
    /// Authenticate with Google Calendar
    Google {
        /// OAuth client ID (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_ID", hide_env_values = true)]
        client_id: Option<String>,

        /// OAuth client secret (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true)]
        client_secret: Option<String>,

        /// Path to Google Cloud Console credentials JSON file
        ///
        /// The JSON downloaded from the OAuth 2.0 credentials page. An
        /// alternative to passing client_id and client_secret separately.
        #[arg(long, env = "GOOGLE_CREDENTIALS_FILE")]
        credentials_file: Option<PathBuf>,

        /// Force re-authentication even if already authenticated
        #[arg(long, short)]
        force: bool,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_summary_flags() {
        let cli = Cli::try_parse_from([
            "tasktime",
            "summary",
            "--json",
            "--events-file",
            "events.json",
            "--lookback-days",
            "30",
        ])
        .unwrap();

        match cli.command {
            Some(Command::Summary(args)) => {
                assert_eq!(args.output_format(), OutputFormat::Json);
                assert_eq!(args.events_file, Some(PathBuf::from("events.json")));
                assert_eq!(args.lookback_days, Some(30));
                assert_eq!(args.max_results, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_serve_bind() {
        let cli = Cli::try_parse_from(["tasktime", "--debug", "serve", "--bind", "0.0.0.0:8080"])
            .unwrap();
        assert!(cli.debug);
        match cli.command {
            Some(Command::Serve(args)) => {
                assert_eq!(args.bind, Some("0.0.0.0:8080".parse().unwrap()));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_bind_address() {
        assert!(Cli::try_parse_from(["tasktime", "serve", "--bind", "localhost"]).is_err());
    }
}
