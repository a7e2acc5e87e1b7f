//! `CisClient` - CIS REST API connector implementation.

use reqwest::Client;
use tracing::instrument;
use url::Url;

use super::api::LocalCisApi;
use super::session::Session;
use crate::error::{CisError, Result};

/// Default root of the CIS REST API.
pub const DEFAULT_API_ROOT: &str = "https://cis.ligo.org/api/";

/// CIS API client.
///
/// Every request, including each redirect hop, carries the cookies of the
/// owned [`Session`]. Cookies set along the way are stored back and, when
/// the session is bound to a file, persisted after the response.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct CisClient {
    /// HTTP client (reqwest, gzip enabled).
    http_client: Client,
    /// API root URL.
    api_root: Url,
    /// Cookie session.
    session: Session,
}

/// Builder for `CisClient`.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct CisClientBuilder {
    api_root: Option<Url>,
    user_agent: Option<String>,
    session: Option<Session>,
}

impl CisClientBuilder {
    /// Creates a new builder.
    const fn new() -> Self {
        Self {
            api_root: None,
            user_agent: None,
            session: None,
        }
    }

    /// Overrides the API root (for wiremock in tests).
    #[must_use]
    pub fn base_url(mut self, url: Url) -> Self {
        self.api_root = Some(url);
        self
    }

    /// Sets the User-Agent (required).
    #[must_use]
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Sets the cookie session (default: empty in-memory session).
    #[must_use]
    pub fn session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// - `user_agent` is not set.
    /// - the default API root fails to parse.
    /// - `reqwest::Client` build fails.
    pub fn build(self) -> Result<CisClient> {
        let user_agent = self
            .user_agent
            .ok_or(CisError::MissingSetting("user_agent"))?;

        let api_root = match self.api_root {
            Some(url) => url,
            None => Url::parse(DEFAULT_API_ROOT).map_err(|_| CisError::InvalidUrl {
                field: "API root",
                url: String::from(DEFAULT_API_ROOT),
            })?,
        };

        let session = self.session.unwrap_or_default();
        let http_client = Client::builder()
            .user_agent(&user_agent)
            .gzip(true)
            .cookie_provider(session.jar())
            .build()
            .map_err(CisError::Client)?;

        Ok(CisClient {
            http_client,
            api_root,
            session,
        })
    }
}

impl CisClient {
    /// Creates a new builder.
    #[must_use]
    pub const fn builder() -> CisClientBuilder {
        CisClientBuilder::new()
    }

    /// Persists the session to its bound file, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the cookie file cannot be written.
    pub fn save_session(&self) -> Result<()> {
        self.session.save()
    }

    /// Cookie session used by this client.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }
}

impl LocalCisApi for CisClient {
    fn api_root(&self) -> &Url {
        &self.api_root
    }

    #[instrument(skip_all, fields(url = %url))]
    async fn get_text(&self, url: &Url, debug: bool) -> Result<String> {
        let request = self.http_client.get(url.clone());

        if debug {
            tracing::info!(%url, "CIS API request");
        } else {
            tracing::debug!(%url, "CIS API request");
        }

        let response = request.send().await.map_err(|source| CisError::Transport {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if debug {
            tracing::info!(%status, headers = ?response.headers(), "CIS API response");
        } else {
            tracing::trace!(%status, headers = ?response.headers(), "CIS API response");
        }

        if self.session.is_dirty() {
            self.session.save()?;
        }

        if !status.is_success() {
            return Err(CisError::Http {
                status,
                url: url.to_string(),
            });
        }

        response.text().await.map_err(|source| CisError::Transport {
            url: url.to_string(),
            source,
        })
    }
}
