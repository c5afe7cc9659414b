//! `tasktime serve`: the HTTP API in the foreground.

use tasktime_providers::GoogleProvider;
use tasktime_server::{AppState, ServerConfig};
use tracing::info;

use crate::cli::ServeArgs;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Starts the server and blocks until SIGTERM or Ctrl-C.
pub async fn run(args: ServeArgs, config: &ClientConfig) -> ClientResult<()> {
    let server_config = server_config(&args, config);

    let google = config
        .google
        .clone()
        .unwrap_or_default()
        .merged(args.client_id, args.client_secret, args.redirect_uri);
    let google_config = google.to_provider_config().map_err(ClientError::Config)?;

    info!(
        "redirect URI {}, calendar {}",
        google_config.redirect_uri, google_config.calendar_id
    );
    let provider = GoogleProvider::new(google_config)?;

    tasktime_server::serve(AppState::google(server_config, provider)).await?;
    Ok(())
}

fn server_config(args: &ServeArgs, config: &ClientConfig) -> ServerConfig {
    let mut server_config = config.server_config();
    if let Some(bind) = args.bind {
        server_config.bind = bind;
    }
    if args.secure_cookies {
        server_config.secure_cookies = true;
    }
    server_config
}
