//! Error type shared by every CIS operation.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the CIS client.
#[derive(Debug, Error)]
#[allow(clippy::module_name_repetitions)]
pub enum CisError {
    /// A URL-typed field is missing its scheme, host or path.
    #[error("{field} URL '{url}' invalid")]
    InvalidUrl {
        /// Name of the field the URL was assigned to.
        field: &'static str,
        /// Offending value.
        url: String,
    },

    /// A channel or description was given an empty name.
    #[error("name must not be empty")]
    EmptyName,

    /// The service returned a failure for a requested resource.
    #[error("{message}")]
    NotFound {
        /// Message naming the searched term or URL.
        message: String,
    },

    /// A single-channel query matched more than one entry.
    #[error(
        "{count} channels found matching '{term}', please refine search, \
         or use `ChannelList::query` to return all results."
    )]
    AmbiguousResult {
        /// Number of matches.
        count: usize,
        /// Original search term.
        term: String,
    },

    /// A single-channel query matched nothing.
    #[error("No channels found matching '{term}'.")]
    EmptyResult {
        /// Original search term.
        term: String,
    },

    /// `ChannelList::find` found no channel with the given name.
    #[error("no channel named '{name}' in list")]
    LookupMiss {
        /// Lookup key.
        name: String,
    },

    /// A JSON payload did not match the expected schema.
    #[error("failed to decode {context}: {source}")]
    Schema {
        /// What was being decoded.
        context: String,
        /// Underlying decode error (names the missing or mistyped field).
        #[source]
        source: serde_json::Error,
    },

    /// Unknown integer data-type code.
    #[error("unknown data type code {code}")]
    InvalidDataType {
        /// Code received from the service.
        code: i64,
    },

    /// Unknown data-type name.
    #[error("unknown data type '{name}'")]
    UnknownDataTypeName {
        /// Name that failed to parse.
        name: String,
    },

    /// A timestamp string could not be parsed.
    #[error("invalid timestamp '{value}'")]
    InvalidTimestamp {
        /// Offending value.
        value: String,
    },

    /// A sieve name pattern failed to compile.
    #[error("invalid name pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Descriptions were requested for a channel with no API URL.
    #[error("channel '{name}' has no API URL")]
    MissingApiUrl {
        /// Channel name.
        name: String,
    },

    /// The service answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    Http {
        /// Response status.
        status: reqwest::StatusCode,
        /// Requested URL.
        url: String,
    },

    /// The request never produced a response.
    #[error("request to {url} failed: {source}")]
    Transport {
        /// Requested URL.
        url: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// A required client setting was not provided.
    #[error("{0} is required")]
    MissingSetting(&'static str),

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Reading or writing the cookie file failed.
    #[error("session file {path}: {source}")]
    Session {
        /// Cookie file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The cookie file could not be decoded or encoded.
    #[error("session file {path} is corrupt: {source}")]
    SessionFormat {
        /// Cookie file path.
        path: PathBuf,
        /// Error reported by the cookie store.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl CisError {
    /// Builds a `Schema` error for the given decode context.
    pub(crate) fn schema(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Schema {
            context: context.into(),
            source,
        }
    }

    /// Returns `true` if the service answered with a failure status.
    #[must_use]
    pub const fn is_http_failure(&self) -> bool {
        matches!(self, Self::Http { .. })
    }
}

/// Result alias for CIS operations.
pub type Result<T> = std::result::Result<T, CisError>;
