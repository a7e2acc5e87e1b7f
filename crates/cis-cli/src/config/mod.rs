//! Application configuration module.
//!
//! Manages the TOML config file holding the CIS endpoint, the User-Agent
//! and the location of the cookie jar.

#[allow(clippy::module_inception)]
mod config;
mod paths;

#[allow(clippy::module_name_repetitions)]
pub use config::AppConfig;
pub use paths::{resolve_config_path, resolve_cookie_jar_path};
