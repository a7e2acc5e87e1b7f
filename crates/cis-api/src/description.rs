//! Annotated channel-name components.
//!
//! Every component of a channel name (`H1`, `PSL`, `ISS`, ...) can carry a
//! short and a long description edited through the CIS web interface.
//! [`Description`] holds one such record and [`DescriptionDict`] an ordered
//! set of them keyed by component name.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use crate::client::LocalCisApi;
use crate::error::{CisError, Result};
use crate::types::DescriptionRecord;
use crate::util::{non_empty, parse_optional_timestamp, validate_optional_url, validate_url};

/// Annotation for one component of a channel name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description {
    name: String,
    description: Option<String>,
    text: Option<String>,
    editor: Option<String>,
    apiurl: Option<Url>,
    cisid: Option<i64>,
    created: Option<DateTime<Utc>>,
    modified: Option<DateTime<Utc>>,
}

/// Field record used to build or override a [`Description`].
///
/// Unset fields fall back to the base when passed to
/// [`Description::with_overrides`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(clippy::module_name_repetitions)]
pub struct DescriptionBuilder {
    name: Option<String>,
    description: Option<String>,
    text: Option<String>,
    editor: Option<String>,
    apiurl: Option<String>,
    cisid: Option<i64>,
    created: Option<DateTime<Utc>>,
    modified: Option<DateTime<Utc>>,
}

impl DescriptionBuilder {
    /// Sets the component name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the short description.
    #[must_use]
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Sets the long text.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Sets the editor identity.
    #[must_use]
    pub fn editor(mut self, editor: impl Into<String>) -> Self {
        self.editor = Some(editor.into());
        self
    }

    /// Sets the API URL (validated on build).
    #[must_use]
    pub fn apiurl(mut self, url: impl Into<String>) -> Self {
        self.apiurl = Some(url.into());
        self
    }

    /// Sets the CIS id.
    #[must_use]
    pub const fn cisid(mut self, id: i64) -> Self {
        self.cisid = Some(id);
        self
    }

    /// Sets the creation time.
    #[must_use]
    pub const fn created(mut self, at: DateTime<Utc>) -> Self {
        self.created = Some(at);
        self
    }

    /// Sets the last modification time.
    #[must_use]
    pub const fn modified(mut self, at: DateTime<Utc>) -> Self {
        self.modified = Some(at);
        self
    }

    /// Builds the description.
    ///
    /// # Errors
    ///
    /// - the name is unset or empty (`EmptyName`).
    /// - `apiurl` is not an absolute URL (`InvalidUrl`).
    pub fn build(self) -> Result<Description> {
        let name = non_empty(self.name).ok_or(CisError::EmptyName)?;
        Ok(Description {
            name,
            description: non_empty(self.description),
            text: non_empty(self.text),
            editor: non_empty(self.editor),
            apiurl: validate_optional_url("description API", self.apiurl.as_deref())?,
            cisid: self.cisid,
            created: self.created,
            modified: self.modified,
        })
    }
}

impl Description {
    /// Creates a bare description carrying only a name.
    ///
    /// # Errors
    ///
    /// Returns `CisError::EmptyName` if `name` is empty.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        Self::builder().name(name).build()
    }

    /// Wraps a name-parse piece; callers guarantee it is non-empty.
    pub(crate) fn bare(name: &str) -> Self {
        Self {
            name: String::from(name),
            description: None,
            text: None,
            editor: None,
            apiurl: None,
            cisid: None,
            created: None,
            modified: None,
        }
    }

    /// Creates an empty builder.
    #[must_use]
    pub fn builder() -> DescriptionBuilder {
        DescriptionBuilder::default()
    }

    /// Returns a copy of `self` with every field set in `overrides` replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if an overriding value is invalid.
    pub fn with_overrides(&self, overrides: DescriptionBuilder) -> Result<Self> {
        let apiurl = match non_empty(overrides.apiurl) {
            Some(raw) => Some(validate_url("description API", &raw)?),
            None => self.apiurl.clone(),
        };
        let name = non_empty(overrides.name).unwrap_or_else(|| self.name.clone());
        Ok(Self {
            name,
            description: non_empty(overrides.description).or_else(|| self.description.clone()),
            text: non_empty(overrides.text).or_else(|| self.text.clone()),
            editor: non_empty(overrides.editor).or_else(|| self.editor.clone()),
            apiurl,
            cisid: overrides.cisid.or(self.cisid),
            created: overrides.created.or(self.created),
            modified: overrides.modified.or(self.modified),
        })
    }

    /// Builds a description from a decoded API record.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty, the URL is invalid or a
    /// timestamp cannot be parsed.
    pub fn from_record(record: DescriptionRecord) -> Result<Self> {
        let created = parse_optional_timestamp(record.created.as_deref())?;
        let modified = parse_optional_timestamp(record.modified.as_deref())?;
        let mut builder = Self::builder().name(record.name);
        builder.description = record.desc;
        builder.text = record.text;
        builder.editor = record.editor;
        builder.apiurl = record.url;
        builder.cisid = record.id;
        builder.created = created;
        builder.modified = modified;
        builder.build()
    }

    /// Builds a description from a JSON object (`name`, `desc`, `id`, `url`,
    /// `editor`, `text`, `created`, `modified`).
    ///
    /// # Errors
    ///
    /// Returns `CisError::Schema` if a field is missing or mistyped, or any
    /// error of [`Description::from_record`].
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let record = DescriptionRecord::deserialize(value)
            .map_err(|e| CisError::schema("description record", e))?;
        Self::from_record(record)
    }

    /// Fetches a single description from the CIS.
    ///
    /// # Errors
    ///
    /// Returns `CisError::NotFound` if the service answers with a failure
    /// status, or a schema error for a malformed body.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn request(api: &(impl LocalCisApi + Sync), url: &Url, debug: bool) -> Result<Self> {
        let body = api.get_text(url, debug).await.map_err(|e| {
            if e.is_http_failure() {
                CisError::NotFound {
                    message: format!("No description found with URL '{url}'"),
                }
            } else {
                e
            }
        })?;
        let record: DescriptionRecord = serde_json::from_str(&body)
            .map_err(|e| CisError::schema(format!("description at {url}"), e))?;
        Self::from_record(record)
    }

    /// Component name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Short description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Long text.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Identity of the last editor.
    #[must_use]
    pub fn editor(&self) -> Option<&str> {
        self.editor.as_deref()
    }

    /// API URL.
    #[must_use]
    pub const fn apiurl(&self) -> Option<&Url> {
        self.apiurl.as_ref()
    }

    /// CIS id.
    #[must_use]
    pub const fn cisid(&self) -> Option<i64> {
        self.cisid
    }

    /// Creation time.
    #[must_use]
    pub const fn created(&self) -> Option<DateTime<Utc>> {
        self.created
    }

    /// Last modification time.
    #[must_use]
    pub const fn modified(&self) -> Option<DateTime<Utc>> {
        self.modified
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Insertion-ordered set of descriptions keyed by component name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(clippy::module_name_repetitions)]
pub struct DescriptionDict {
    entries: Vec<Description>,
}

impl DescriptionDict {
    /// Creates an empty dict.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Inserts a description under its own name.
    ///
    /// An existing entry with the same name is replaced in place and
    /// returned; new names are appended.
    pub fn insert(&mut self, description: Description) -> Option<Description> {
        if let Some(slot) = self
            .entries
            .iter_mut()
            .find(|d| d.name == description.name)
        {
            return Some(std::mem::replace(slot, description));
        }
        self.entries.push(description);
        None
    }

    /// Looks up a description by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Description> {
        self.entries.iter().find(|d| d.name == name)
    }

    /// Number of entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Description> {
        self.entries.iter()
    }

    /// Iterates entry names in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(Description::name)
    }

    /// Reorders entries by where their name first occurs inside `channel_name`.
    ///
    /// Entries whose name does not occur go last, keeping their relative order.
    #[must_use]
    pub fn sorted_by_position_in(mut self, channel_name: &str) -> Self {
        self.entries
            .sort_by_key(|d| channel_name.find(d.name.as_str()).unwrap_or(usize::MAX));
        self
    }
}

impl FromIterator<Description> for DescriptionDict {
    fn from_iter<I: IntoIterator<Item = Description>>(iter: I) -> Self {
        let mut dict = Self::new();
        for description in iter {
            dict.insert(description);
        }
        dict
    }
}

impl IntoIterator for DescriptionDict {
    type Item = Description;
    type IntoIter = std::vec::IntoIter<Description>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a DescriptionDict {
    type Item = &'a Description;
    type IntoIter = std::slice::Iter<'a, Description>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl fmt::Display for DescriptionDict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            let short = entry.description().unwrap_or("-");
            match entry.text() {
                Some(text) => {
                    let indent = " ".repeat(entry.name.chars().count().saturating_add(2));
                    write!(f, "{}: {short},\n{indent}{text}", entry.name)?;
                }
                None => write!(f, "{}: {short}", entry.name)?,
            }
        }
        Ok(())
    }
}
