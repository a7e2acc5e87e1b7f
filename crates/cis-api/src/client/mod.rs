//! CIS connector module.
//!
//! Issues authenticated GET requests against the CIS REST API and keeps
//! the session cookies between calls.

mod api;
#[allow(clippy::module_inception)]
mod client;
mod session;

#[allow(clippy::module_name_repetitions)]
pub use api::{CisApi, LocalCisApi};
#[allow(clippy::module_name_repetitions)]
pub use client::{CisClient, CisClientBuilder, DEFAULT_API_ROOT};
pub use session::Session;
