//! Configuration commands.

use std::path::Path;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Dump the current configuration to stdout.
pub fn dump(config: &ClientConfig, path: &Path) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", path.display());
    println!("{}", toml_str);
    Ok(())
}

/// Validate the configuration.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    if let Some(ref google) = config.google {
        if google.client_id.is_some() || google.client_secret.is_some() {
            let provider = google
                .to_provider_config()
                .map_err(|e| ClientError::Config(format!("invalid Google settings: {}", e)))?;
            provider
                .validate()
                .map_err(|e| ClientError::Config(format!("invalid Google settings: {}", e)))?;
            println!("Google credentials are valid.");
        }
    }

    if config.server.session_ttl_hours == 0 {
        return Err(ClientError::Config(
            "server.session_ttl_hours must be at least 1".to_string(),
        ));
    }

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path(path: &Path) -> ClientResult<()> {
    println!("config: {}", path.display());
    Ok(())
}
