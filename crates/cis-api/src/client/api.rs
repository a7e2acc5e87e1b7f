//! `CisApi` trait definition.
#![allow(clippy::future_not_send)]

use url::Url;

use crate::error::Result;

/// Connector to the Channel Information System.
///
/// Abstracts the single network operation the catalog needs so that
/// queries can run against a mock in tests.
/// Uses `trait_variant::make` to generate a `Send`-bound async trait.
#[allow(clippy::module_name_repetitions)]
#[trait_variant::make(CisApi: Send)]
pub trait LocalCisApi {
    /// Root URL of the REST API (e.g. `https://cis.ligo.org/api/`).
    fn api_root(&self) -> &Url;

    /// Performs one authenticated GET and returns the response body.
    ///
    /// `debug` logs request and response headers at `INFO` level.
    ///
    /// # Errors
    ///
    /// Returns `CisError::Http` for a non-success status and
    /// `CisError::Transport` if no response was received.
    async fn get_text(&self, url: &Url, debug: bool) -> Result<String>;
}
