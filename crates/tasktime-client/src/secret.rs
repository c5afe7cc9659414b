//! Secret references in `config.toml`.
//!
//! A credential value may point elsewhere instead of holding the secret:
//!
//! - `pass::path/in/store` runs `pass show path/in/store` and keeps the first line
//! - `env::VAR_NAME` reads `$VAR_NAME`
//! - anything else is used as written

/// Resolves a value that may be a secret reference.
pub fn resolve(value: &str) -> Result<String, String> {
    if let Some(path) = value.strip_prefix("pass::") {
        from_pass(path)
    } else if let Some(var) = value.strip_prefix("env::") {
        from_env(var)
    } else {
        Ok(value.to_string())
    }
}

fn from_pass(path: &str) -> Result<String, String> {
    let output = std::process::Command::new("pass")
        .args(["show", path])
        .output()
        .map_err(|e| format!("could not run `pass show {}`: {}", path, e))?;

    if !output.status.success() {
        return Err(format!(
            "`pass show {}` exited with {}: {}",
            path,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .ok_or_else(|| format!("`pass show {}` printed nothing", path))
}

fn from_env(var: &str) -> Result<String, String> {
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => Ok(value),
        Ok(_) => Err(format!("environment variable `{}` is empty", var)),
        Err(_) => Err(format!("environment variable `{}` is not set", var)),
    }
}
