//! `tasktime logout`.

use tasktime_providers::TokenStorage;

use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Deletes the stored token file. Returns true if there was one.
pub fn run(config: &ClientConfig) -> ClientResult<bool> {
    let storage = TokenStorage::new(config.token_path());
    let removed = storage.clear()?;
    if removed {
        println!("Signed out, removed {}", storage.path().display());
    } else {
        println!("Not signed in.");
    }
    Ok(removed)
}
