//! Cookie-backed authentication session.
//!
//! A `Session` carries the cookies handed out by the CIS login flow so that
//! later requests do not have to negotiate again. Cookie parsing, matching
//! and expiry are handled by [`cookie_store`]; the session only adds the
//! owner-only JSON file it is persisted to.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cookie_store::{CookieStore, RawCookie};
use reqwest::header::HeaderValue;
use url::Url;

use crate::error::{CisError, Result};

/// Cookie store shared between a [`Session`] and the HTTP client.
///
/// reqwest consults it on every hop, redirects included.
pub(crate) struct CookieJar {
    store: Mutex<CookieStore>,
    changed: AtomicBool,
}

impl CookieJar {
    fn new(store: CookieStore) -> Self {
        Self {
            store: Mutex::new(store),
            changed: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CookieStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieJar")
            .field("cookies", &self.lock().iter_unexpired().count())
            .field("changed", &self.changed.load(Ordering::Acquire))
            .finish()
    }
}

impl reqwest::cookie::CookieStore for CookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let cookies: Vec<RawCookie<'static>> = cookie_headers
            .filter_map(|value| value.to_str().ok())
            .filter_map(|raw| RawCookie::parse(raw).ok())
            .map(RawCookie::into_owned)
            .collect();
        if cookies.is_empty() {
            return;
        }
        tracing::debug!(%url, count = cookies.len(), "Storing response cookies");
        self.lock().store_response_cookies(cookies.into_iter(), url);
        self.changed.store(true, Ordering::Release);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let header = self
            .lock()
            .get_request_values(url)
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        if header.is_empty() {
            None
        } else {
            HeaderValue::from_str(&header).ok()
        }
    }
}

/// Authentication session owning a cookie store.
#[derive(Debug)]
pub struct Session {
    /// File the session is persisted to, if any.
    path: Option<PathBuf>,
    /// Cookies, shared with the HTTP client.
    jar: Arc<CookieJar>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Creates an empty in-memory session.
    #[must_use]
    pub fn new() -> Self {
        Self {
            path: None,
            jar: Arc::new(CookieJar::new(CookieStore::default())),
        }
    }

    /// Loads a session from `path`, or starts an empty one bound to `path`
    /// if the file does not exist yet.
    ///
    /// An existing file is restricted to owner read/write before reading.
    /// Expired cookies are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No session file, starting empty session");
            return Ok(Self {
                path: Some(path),
                jar: Arc::new(CookieJar::new(CookieStore::default())),
            });
        }

        restrict_permissions(&path)?;
        let content = fs::read_to_string(&path).map_err(|source| CisError::Session {
            path: path.clone(),
            source,
        })?;
        let store = if content.trim().is_empty() {
            CookieStore::default()
        } else {
            cookie_store::serde::json::load(content.as_bytes()).map_err(|source| {
                CisError::SessionFormat {
                    path: path.clone(),
                    source,
                }
            })?
        };
        tracing::debug!(
            path = %path.display(),
            cookies = store.iter_unexpired().count(),
            "Loaded session"
        );

        Ok(Self {
            path: Some(path),
            jar: Arc::new(CookieJar::new(store)),
        })
    }

    /// File this session persists to.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of unexpired cookies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jar.lock().iter_unexpired().count()
    }

    /// Returns `true` if no unexpired cookies are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if a response set cookies since the last load or save.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.jar.changed.load(Ordering::Acquire)
    }

    /// Store handed to `reqwest::ClientBuilder::cookie_provider`.
    pub(crate) fn jar(&self) -> Arc<CookieJar> {
        Arc::clone(&self.jar)
    }

    /// Writes the session to its bound path, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self) -> Result<()> {
        if let Some(path) = self.path.as_deref() {
            self.save_to(path)?;
            self.jar.changed.store(false, Ordering::Release);
        }
        Ok(())
    }

    /// Writes the session to `path` with owner-only permissions,
    /// creating parent directories if needed.
    ///
    /// Session cookies (no `Expires`/`Max-Age`) are written too, so a later
    /// process can reuse a login.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation, serialization or the write fails.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let io_err = |source| CisError::Session {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut content = Vec::new();
        let count = {
            let store = self.jar.lock();
            cookie_store::serde::json::save_incl_expired_and_nonpersistent(&*store, &mut content)
                .map_err(|source| CisError::SessionFormat {
                    path: path.to_path_buf(),
                    source,
                })?;
            store.iter_unexpired().count()
        };

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut out = options.open(path).map_err(io_err)?;
        out.write_all(&content).map_err(io_err)?;
        restrict_permissions(path)?;
        tracing::debug!(path = %path.display(), cookies = count, "Saved session");
        Ok(())
    }
}

/// Sets owner read/write only on `path` (no-op off Unix).
fn restrict_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|source| {
            CisError::Session {
                path: path.to_path_buf(),
                source,
            }
        })?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use reqwest::cookie::CookieStore as _;

    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn receive(session: &Session, from: &str, header: &'static str) {
        let value = HeaderValue::from_static(header);
        session
            .jar()
            .set_cookies(&mut std::iter::once(&value), &url(from));
    }

    fn sent_to(session: &Session, to: &str) -> Option<String> {
        session
            .jar()
            .cookies(&url(to))
            .map(|value| value.to_str().unwrap().to_owned())
    }

    #[test]
    fn test_new_session_is_empty() {
        let session = Session::new();
        assert!(session.is_empty());
        assert!(session.path().is_none());
        assert!(!session.is_dirty());
    }

    #[test]
    fn test_received_cookie_is_replayed_to_same_host() {
        // Arrange
        let session = Session::new();

        // Act
        receive(
            &session,
            "https://cis.ligo.org/api/channel/",
            "sessionid=abc123; Path=/; HttpOnly",
        );

        // Assert
        assert!(session.is_dirty());
        assert_eq!(session.len(), 1);
        assert_eq!(
            sent_to(&session, "https://cis.ligo.org/api/channel/1").as_deref(),
            Some("sessionid=abc123")
        );
        assert_eq!(sent_to(&session, "https://ligo.org/"), None);
    }

    #[test]
    fn test_domain_cookie_from_login_host_reaches_service() {
        // Arrange
        let session = Session::new();

        // Act
        receive(
            &session,
            "https://login.ligo.org/idp",
            "_saml=xyz; Domain=.ligo.org; Path=/",
        );

        // Assert
        assert_eq!(
            sent_to(&session, "https://cis.ligo.org/api/").as_deref(),
            Some("_saml=xyz")
        );
        assert_eq!(sent_to(&session, "https://ligo.org.evil.com/"), None);
    }

    #[test]
    fn test_foreign_domain_cookie_is_rejected() {
        let session = Session::new();
        receive(&session, "https://cis.ligo.org/", "a=b; Domain=example.com");
        assert!(session.is_empty());
    }

    #[test]
    fn test_max_age_zero_removes_cookie() {
        // Arrange
        let session = Session::new();
        receive(&session, "https://cis.ligo.org/", "sessionid=abc; Path=/");

        // Act
        receive(&session, "https://cis.ligo.org/", "sessionid=abc; Path=/; Max-Age=0");

        // Assert
        assert!(session.is_empty());
        assert_eq!(sent_to(&session, "https://cis.ligo.org/"), None);
    }

    #[test]
    fn test_save_and_load_round_trip_keeps_session_cookies() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cookies.json");
        let session = Session::load(&path).unwrap();
        receive(&session, "https://cis.ligo.org/api/", "sessionid=abc123; Path=/");
        receive(
            &session,
            "https://cis.ligo.org/api/",
            "remember=1; Path=/; Max-Age=3600",
        );

        // Act
        session.save().unwrap();
        let reloaded = Session::load(&path).unwrap();

        // Assert
        assert!(!session.is_dirty());
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.path(), Some(path.as_path()));
        let header = sent_to(&reloaded, "https://cis.ligo.org/api/channel/").unwrap();
        assert!(header.contains("sessionid=abc123"));
        assert!(header.contains("remember=1"));
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        let session = Session::new();
        receive(&session, "https://cis.ligo.org/", "a=1");

        // Act
        session.save_to(&path).unwrap();

        // Assert
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_load_tightens_permissions() {
        use std::os::unix::fs::PermissionsExt;

        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        fs::write(&path, "").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        // Act
        let session = Session::load(&path).unwrap();

        // Assert
        assert!(session.is_empty());
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_load_missing_file_gives_empty_bound_session() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");

        // Act
        let session = Session::load(&path).unwrap();

        // Assert
        assert!(session.is_empty());
        assert_eq!(session.path(), Some(path.as_path()));
        assert!(!path.exists());
    }

    #[test]
    fn test_load_corrupt_file_fails() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        fs::write(&path, "{not json").unwrap();

        // Act
        let err = Session::load(&path).unwrap_err();

        // Assert
        assert!(matches!(err, CisError::SessionFormat { .. }));
    }

    #[test]
    fn test_save_without_path_is_noop() {
        let session = Session::new();
        receive(&session, "https://cis.ligo.org/", "a=1");
        session.save().unwrap();
        assert!(session.is_dirty());
    }
}
