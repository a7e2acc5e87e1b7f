//! Config directory resolution.

use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application directory name under `~/.config`.
const APP_DIR: &str = "cis";

/// Resolves the config directory.
///
/// - If `dir` is `Some`, returns it unchanged.
/// - Otherwise returns `~/.config/cis`.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined (when `dir` is `None`).
fn resolve_config_dir(dir: Option<&PathBuf>) -> Result<PathBuf> {
    if let Some(d) = dir {
        return Ok(d.clone());
    }

    let home = std::env::var("HOME").context("HOME environment variable is not set")?;
    Ok(PathBuf::from(home).join(".config").join(APP_DIR))
}

/// Resolves the config file path: `{dir}/config.toml` or
/// `~/.config/cis/config.toml`.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined (when `dir` is `None`).
pub fn resolve_config_path(dir: Option<&PathBuf>) -> Result<PathBuf> {
    Ok(resolve_config_dir(dir)?.join("config.toml"))
}

/// Resolves the cookie jar path.
///
/// A configured path wins; otherwise `cookies.json` in the config directory.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn resolve_cookie_jar_path(
    configured: Option<&PathBuf>,
    dir: Option<&PathBuf>,
) -> Result<PathBuf> {
    if let Some(path) = configured {
        return Ok(path.clone());
    }
    Ok(resolve_config_dir(dir)?.join("cookies.json"))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_resolve_with_dir() {
        // Arrange
        let dir = PathBuf::from("/tmp/myproject");

        // Act
        let path = resolve_config_path(Some(&dir)).unwrap();

        // Assert
        assert_eq!(path, PathBuf::from("/tmp/myproject/config.toml"));
    }

    #[test]
    fn test_resolve_default() {
        // Arrange & Act
        let path = resolve_config_path(None).unwrap();

        // Assert
        assert!(path.ends_with(".config/cis/config.toml"));
    }

    #[test]
    fn test_cookie_jar_defaults_next_to_config() {
        let dir = PathBuf::from("/tmp/myproject");
        let path = resolve_cookie_jar_path(None, Some(&dir)).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/myproject/cookies.json"));
    }

    #[test]
    fn test_configured_cookie_jar_wins() {
        // Arrange
        let configured = PathBuf::from("/var/tmp/jar.json");
        let dir = PathBuf::from("/tmp/myproject");

        // Act
        let path = resolve_cookie_jar_path(Some(&configured), Some(&dir)).unwrap();

        // Assert
        assert_eq!(path, configured);
    }
}
