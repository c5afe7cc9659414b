//! Authentication commands.

use std::path::{Path, PathBuf};

use tasktime_providers::{GoogleProvider, OAuthCredentials, TokenStorage};
use tracing::{info, warn};

use crate::config::{ClientConfig, GoogleSettings};
use crate::error::{ClientError, ClientResult};
use crate::loopback;

/// Run the Google sign-in flow.
///
/// Credentials come from CLI flags, a `--credentials-file`, or
/// `config.toml`. Credentials given on the command line are written back to
/// `config_path` so `tasktime serve` and `tasktime summary` find them.
pub async fn google(
    client_id: Option<String>,
    client_secret: Option<String>,
    credentials_file: Option<PathBuf>,
    force: bool,
    config: &ClientConfig,
    config_path: &Path,
) -> ClientResult<()> {
    let (credentials, source) =
        resolve_google_credentials(client_id, client_secret, credentials_file, config.google.as_ref())?;

    let settings = GoogleSettings {
        client_id: Some(credentials.client_id.clone()),
        client_secret: Some(credentials.client_secret.clone()),
        ..config.google.clone().unwrap_or_default()
    };
    let google_config = settings.to_provider_config().map_err(ClientError::Config)?;
    let storage = TokenStorage::new(&google_config.token_path);
    let provider = GoogleProvider::new(google_config)?;

    if !force {
        if let Some(tokens) = storage.load()? {
            if tokens.can_refresh() {
                persist_credentials(config_path, &credentials, source);
                println!("Already authenticated with Google Calendar.");
                println!("Use --force to re-authenticate.");
                return Ok(());
            }
        }
    }

    println!("Starting Google Calendar authentication...");
    println!();
    println!("A browser window will open for you to authorize access.");
    println!("If the browser doesn't open, check the terminal for a URL to copy.");
    println!();

    let tokens = loopback::authorize(provider.oauth()).await?;
    storage.save(&tokens)?;
    persist_credentials(config_path, &credentials, source);

    info!("Google authentication successful");
    println!("Authentication successful!");
    println!("Tokens saved to {}", storage.path().display());
    Ok(())
}

/// Where the credentials were found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CredentialSource {
    /// `--client-id`/`--client-secret` or `--credentials-file`.
    Cli,
    /// Already in `config.toml`.
    Config,
}

/// Picks credentials by priority: flags, then credentials file, then config.
fn resolve_google_credentials(
    cli_client_id: Option<String>,
    cli_client_secret: Option<String>,
    cli_credentials_file: Option<PathBuf>,
    config_google: Option<&GoogleSettings>,
) -> ClientResult<(OAuthCredentials, CredentialSource)> {
    if let (Some(id), Some(secret)) = (&cli_client_id, &cli_client_secret) {
        return Ok((OAuthCredentials::new(id, secret), CredentialSource::Cli));
    }

    if let Some(ref path) = cli_credentials_file {
        let credentials = OAuthCredentials::from_file(path).map_err(|e| {
            ClientError::Config(format!(
                "failed to load credentials from {}: {}",
                path.display(),
                e
            ))
        })?;
        return Ok((credentials, CredentialSource::Cli));
    }

    if cli_client_id.is_some() || cli_client_secret.is_some() {
        return Err(ClientError::Config(
            "both --client-id and --client-secret are required when providing credentials directly"
                .to_string(),
        ));
    }

    if let Some(google) = config_google {
        if google.client_id.is_some() && google.client_secret.is_some() {
            let credentials = google.resolve_credentials().map_err(|e| {
                ClientError::Config(format!(
                    "failed to resolve Google credentials from config: {}",
                    e
                ))
            })?;
            return Ok((credentials, CredentialSource::Config));
        }
    }

    Err(ClientError::Config(format!(
        "Google credentials are required. Provide via:\n  \
         - client_id + client_secret in {}\n  \
         - --client-id and --client-secret flags\n  \
         - --credentials-file flag (path to Google Cloud Console JSON)\n  \
         - GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET env vars",
        ClientConfig::default_path().display()
    )))
}

fn persist_credentials(path: &Path, credentials: &OAuthCredentials, source: CredentialSource) {
    if source == CredentialSource::Config {
        return;
    }
    match save_credentials(path, credentials) {
        Ok(()) => println!("Credentials saved to {}", path.display()),
        Err(e) => warn!("could not save credentials to {}: {}", path.display(), e),
    }
}

/// Writes the credentials into the `[google]` table of `path`, keeping the
/// rest of the file (comments included) untouched.
fn save_credentials(path: &Path, credentials: &OAuthCredentials) -> ClientResult<()> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    let mut doc = content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| ClientError::Config(format!("could not parse {}: {}", path.display(), e)))?;

    if !doc.contains_key("google") {
        doc["google"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    let google = doc["google"].as_table_mut().ok_or_else(|| {
        ClientError::Config(format!("`google` in {} is not a table", path.display()))
    })?;
    google["client_id"] = toml_edit::value(credentials.client_id.as_str());
    google["client_secret"] = toml_edit::value(credentials.client_secret.as_str());

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, doc.to_string())?;
    info!("credentials saved to {}", path.display());
    Ok(())
}
