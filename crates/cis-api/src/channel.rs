//! Representation of an instrumental data channel.
//!
//! Each [`Channel`] is a single time-series signal recorded during the
//! operation or characterisation of an instrument. Its name follows the
//! `IFO:SYSTEM-SUBSYSTEM_SIGNAL` convention and is decomposed into up to
//! four [`Description`] components when the channel is built.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use crate::channel_list::{ChannelList, QueryOptions};
use crate::client::LocalCisApi;
use crate::description::{Description, DescriptionDict};
use crate::dtype::DataType;
use crate::error::{CisError, Result};
use crate::types::{ChannelRecord, DescriptionRecord};
use crate::util::{non_empty, parse_optional_timestamp, validate_optional_url, validate_url};

/// Interferometer prefix: one uppercase letter, one digit, colon.
#[allow(clippy::expect_used)]
static IFO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]\d:").expect("failed to compile IFO regex"));

/// Separator between system, subsystem and signal.
#[allow(clippy::expect_used)]
static COMPONENT_SEP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_]").expect("failed to compile separator regex"));

/// Path segment appended to a channel's API URL to list its descriptions.
const DESCRIPTIONS_SEGMENT: &str = "descriptions";

/// The four components of a channel name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameParts {
    /// Interferometer prefix, e.g. `H1`.
    pub ifo: Option<Description>,
    /// Instrumental system, e.g. `PSL`.
    pub system: Option<Description>,
    /// Sub-system, e.g. `ISS`.
    pub subsystem: Option<Description>,
    /// Signal, e.g. `PDA_OUT_DQ`.
    pub signal: Option<Description>,
}

impl NameParts {
    /// Converts into an `(ifo, system, subsystem, signal)` tuple.
    #[must_use]
    #[allow(clippy::type_complexity)]
    pub fn into_tuple(
        self,
    ) -> (
        Option<Description>,
        Option<Description>,
        Option<Description>,
        Option<Description>,
    ) {
        (self.ifo, self.system, self.subsystem, self.signal)
    }
}

/// Data type as given to a builder: resolved or still an integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataTypeSpec {
    Resolved(DataType),
    Code(i64),
}

impl DataTypeSpec {
    fn resolve(self) -> Result<Option<DataType>> {
        match self {
            Self::Resolved(dtype) => Ok(Some(dtype)),
            Self::Code(code) => DataType::from_code(code),
        }
    }
}

/// A data channel known to the CIS.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    name: String,
    sample_rate: Option<f64>,
    unit: Option<String>,
    dtype: Option<DataType>,
    frametype: Option<String>,
    model: Option<String>,
    url: Option<Url>,
    apiurl: Option<Url>,
    cisid: Option<i64>,
    created: Option<DateTime<Utc>>,
    description: Option<Description>,
    descriptions: Option<DescriptionDict>,
    parts: NameParts,
}

/// Field record used to build a [`Channel`] or override fields of one.
#[derive(Debug, Clone, Default, PartialEq)]
#[allow(clippy::module_name_repetitions)]
pub struct ChannelBuilder {
    name: Option<String>,
    sample_rate: Option<f64>,
    unit: Option<String>,
    dtype: Option<DataTypeSpec>,
    frametype: Option<String>,
    model: Option<String>,
    url: Option<String>,
    apiurl: Option<String>,
    cisid: Option<i64>,
    created: Option<DateTime<Utc>>,
    description: Option<Description>,
    descriptions: Option<DescriptionDict>,
}

impl ChannelBuilder {
    /// Sets the channel name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the sample rate in Hz.
    #[must_use]
    pub const fn sample_rate(mut self, rate: f64) -> Self {
        self.sample_rate = Some(rate);
        self
    }

    /// Sets the physical unit.
    #[must_use]
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Sets the data type.
    #[must_use]
    pub const fn dtype(mut self, dtype: DataType) -> Self {
        self.dtype = Some(DataTypeSpec::Resolved(dtype));
        self
    }

    /// Sets the data type from the service's integer code (decoded on build).
    #[must_use]
    pub const fn dtype_code(mut self, code: i64) -> Self {
        self.dtype = Some(DataTypeSpec::Code(code));
        self
    }

    /// Sets the frame type.
    #[must_use]
    pub fn frametype(mut self, frametype: impl Into<String>) -> Self {
        self.frametype = Some(frametype.into());
        self
    }

    /// Sets the front-end model name (stored lower-cased).
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the browser URL (validated on build).
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
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

    /// Sets the description of the whole channel.
    #[must_use]
    pub fn description(mut self, description: Description) -> Self {
        self.description = Some(description);
        self
    }

    /// Sets the description cache consulted while parsing the name.
    #[must_use]
    pub fn descriptions(mut self, descriptions: DescriptionDict) -> Self {
        self.descriptions = Some(descriptions);
        self
    }

    /// Builds the channel.
    ///
    /// # Errors
    ///
    /// - the name is unset or empty (`EmptyName`).
    /// - `url`/`apiurl` is not an absolute URL (`InvalidUrl`).
    /// - the data-type code is unknown (`InvalidDataType`).
    pub fn build(self) -> Result<Channel> {
        let name = non_empty(self.name).ok_or(CisError::EmptyName)?;
        let dtype = self.dtype.map(DataTypeSpec::resolve).transpose()?.flatten();
        Ok(Channel::assemble(ChannelFields {
            name,
            sample_rate: self.sample_rate,
            unit: non_empty(self.unit),
            dtype,
            frametype: non_empty(self.frametype),
            model: non_empty(self.model),
            url: validate_optional_url("channel", self.url.as_deref())?,
            apiurl: validate_optional_url("channel API", self.apiurl.as_deref())?,
            cisid: self.cisid,
            created: self.created,
            description: self.description,
            descriptions: self.descriptions,
        }))
    }
}

/// Validated fields of a channel before the name is parsed.
struct ChannelFields {
    name: String,
    sample_rate: Option<f64>,
    unit: Option<String>,
    dtype: Option<DataType>,
    frametype: Option<String>,
    model: Option<String>,
    url: Option<Url>,
    apiurl: Option<Url>,
    cisid: Option<i64>,
    created: Option<DateTime<Utc>>,
    description: Option<Description>,
    descriptions: Option<DescriptionDict>,
}

impl Channel {
    /// Creates a channel carrying only a name.
    ///
    /// # Errors
    ///
    /// Returns `CisError::EmptyName` if `name` is empty.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        Self::builder().name(name).build()
    }

    /// Creates an empty builder.
    #[must_use]
    pub fn builder() -> ChannelBuilder {
        ChannelBuilder::default()
    }

    /// Derives the name components and freezes the fields.
    fn assemble(fields: ChannelFields) -> Self {
        let parts = Self::parse_name(&fields.name, fields.descriptions.as_ref());
        Self {
            name: fields.name,
            sample_rate: fields.sample_rate,
            unit: fields.unit,
            dtype: fields.dtype,
            frametype: fields.frametype,
            model: fields.model.map(|m| m.to_lowercase()),
            url: fields.url,
            apiurl: fields.apiurl,
            cisid: fields.cisid,
            created: fields.created,
            description: fields.description,
            descriptions: fields.descriptions,
            parts,
        }
    }

    /// Decomposes a channel name into `ifo`, `system`, `subsystem` and `signal`.
    ///
    /// A leading `X1:` tag becomes the `ifo`; the rest is split on the first
    /// two `-` or `_`. Pieces found in `cache` are reused, others become bare
    /// descriptions. Missing or empty pieces are `None`.
    #[must_use]
    pub fn parse_name(name: &str, cache: Option<&DescriptionDict>) -> NameParts {
        if name.is_empty() {
            return NameParts::default();
        }

        let as_description = |piece: &str| -> Option<Description> {
            if piece.is_empty() {
                return None;
            }
            cache
                .and_then(|dict| dict.get(piece).cloned())
                .or_else(|| Some(Description::bare(piece)))
        };

        let (ifo, rest) = if IFO_RE.is_match(name) {
            name.split_once(':')
                .map_or((None, name), |(ifo, rest)| (as_description(ifo), rest))
        } else {
            (None, name)
        };

        let mut tags = COMPONENT_SEP_RE.splitn(rest, 3);
        let system = tags.next().and_then(as_description);
        let subsystem = tags.next().and_then(as_description);
        let signal = tags.next().and_then(as_description);

        NameParts {
            ifo,
            system,
            subsystem,
            signal,
        }
    }

    /// Returns a new channel with every field set in `overrides` replaced
    /// and the name components re-derived.
    ///
    /// Unset override fields keep the value of `self`; a default builder
    /// therefore reproduces `self` exactly.
    ///
    /// # Errors
    ///
    /// Returns an error if an overriding value is invalid.
    pub fn with_overrides(&self, overrides: ChannelBuilder) -> Result<Self> {
        let dtype = match overrides.dtype.map(DataTypeSpec::resolve).transpose()? {
            Some(Some(dtype)) => Some(dtype),
            _ => self.dtype,
        };
        let url = match non_empty(overrides.url) {
            Some(raw) => Some(validate_url("channel", &raw)?),
            None => self.url.clone(),
        };
        let apiurl = match non_empty(overrides.apiurl) {
            Some(raw) => Some(validate_url("channel API", &raw)?),
            None => self.apiurl.clone(),
        };

        Ok(Self::assemble(ChannelFields {
            name: non_empty(overrides.name).unwrap_or_else(|| self.name.clone()),
            sample_rate: overrides.sample_rate.or(self.sample_rate),
            unit: non_empty(overrides.unit).or_else(|| self.unit.clone()),
            dtype,
            frametype: non_empty(overrides.frametype).or_else(|| self.frametype.clone()),
            model: non_empty(overrides.model).or_else(|| self.model.clone()),
            url,
            apiurl,
            cisid: overrides.cisid.or(self.cisid),
            created: overrides.created.or(self.created),
            description: overrides.description.or_else(|| self.description.clone()),
            descriptions: overrides
                .descriptions
                .or_else(|| self.descriptions.clone()),
        }))
    }

    /// Returns a copy under a new name, re-parsed against the attached
    /// description cache.
    ///
    /// # Errors
    ///
    /// Returns `CisError::EmptyName` if `name` is empty.
    pub fn renamed(&self, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(CisError::EmptyName);
        }
        self.with_overrides(ChannelBuilder::default().name(name))
    }

    /// Builds a channel from a decoded API record.
    ///
    /// # Errors
    ///
    /// Returns an error if a URL, timestamp or data-type code is invalid.
    pub fn from_record(record: ChannelRecord) -> Result<Self> {
        let created = parse_optional_timestamp(record.created.as_deref())?;
        let mut builder = Self::builder().name(record.name);
        builder.sample_rate = record.datarate;
        builder.unit = record.units;
        builder.dtype = record.datatype.map(DataTypeSpec::Code);
        builder.url = record.displayurl;
        builder.apiurl = record.url;
        builder.model = record.source;
        builder.cisid = record.id;
        builder.frametype = record.frametype;
        builder.created = created;
        builder.build()
    }

    /// Builds a channel from a JSON object as returned by the search API.
    ///
    /// Mapping: `name`, `datarate`→sample rate, `units`→unit,
    /// `datatype`→dtype, `displayurl`→url, `url`→apiurl, `source`→model,
    /// `created`, `id`→cisid, `frametype`.
    ///
    /// # Errors
    ///
    /// Returns `CisError::Schema` naming a missing or mistyped field, or any
    /// error of [`Channel::from_record`].
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let record = ChannelRecord::deserialize(value)
            .map_err(|e| CisError::schema("channel record", e))?;
        Self::from_record(record)
    }

    /// Attaches a description cache and rebinds the name components to it.
    ///
    /// The channel description is taken from the entry keyed by the name
    /// without its IFO prefix when the channel has none. The cache is
    /// reordered by where each key first occurs in the channel name.
    #[must_use]
    pub fn with_descriptions(self, descriptions: DescriptionDict) -> Self {
        let stub = self
            .name
            .split_once(':')
            .map_or(self.name.as_str(), |(_, rest)| rest);
        let description = self
            .description
            .clone()
            .or_else(|| descriptions.get(stub).cloned());
        let descriptions = descriptions.sorted_by_position_in(&self.name);
        Self::assemble(ChannelFields {
            name: self.name,
            sample_rate: self.sample_rate,
            unit: self.unit,
            dtype: self.dtype,
            frametype: self.frametype,
            model: self.model,
            url: self.url,
            apiurl: self.apiurl,
            cisid: self.cisid,
            created: self.created,
            description,
            descriptions: Some(descriptions),
        })
    }

    /// URL listing this channel's descriptions (`<apiurl>/descriptions`).
    ///
    /// # Errors
    ///
    /// Returns `CisError::MissingApiUrl` if the channel has no API URL.
    pub fn descriptions_url(&self) -> Result<Url> {
        let apiurl = self.apiurl.as_ref().ok_or_else(|| CisError::MissingApiUrl {
            name: self.name.clone(),
        })?;
        let base = apiurl.as_str();
        let joined = if base.ends_with('/') {
            format!("{base}{DESCRIPTIONS_SEGMENT}")
        } else {
            format!("{base}/{DESCRIPTIONS_SEGMENT}")
        };
        validate_url("descriptions", &joined)
    }

    /// Downloads every description associated with this channel.
    ///
    /// `url` defaults to [`Channel::descriptions_url`]. The returned channel
    /// carries the fetched descriptions (see [`Channel::with_descriptions`]).
    ///
    /// # Errors
    ///
    /// - `CisError::NotFound` if the service answers with a failure status.
    /// - `CisError::Schema` if the body is not a list of description records.
    /// - `CisError::MissingApiUrl` if no URL is given and the channel has none.
    #[instrument(skip_all, fields(channel = %self.name))]
    pub async fn get_descriptions(
        &self,
        api: &(impl LocalCisApi + Sync),
        url: Option<&Url>,
        debug: bool,
    ) -> Result<Self> {
        let url = match url {
            Some(u) => u.clone(),
            None => self.descriptions_url()?,
        };

        let body = api.get_text(&url, debug).await.map_err(|e| {
            if e.is_http_failure() {
                CisError::NotFound {
                    message: format!("No descriptions found at URL '{url}'"),
                }
            } else {
                e
            }
        })?;

        let records: Vec<DescriptionRecord> = serde_json::from_str(&body)
            .map_err(|e| CisError::schema(format!("descriptions at {url}"), e))?;
        let descriptions = records
            .into_iter()
            .map(Description::from_record)
            .collect::<Result<DescriptionDict>>()?;
        tracing::debug!(count = descriptions.len(), "Fetched descriptions");

        Ok(self.clone().with_descriptions(descriptions))
    }

    /// Queries the CIS for the single channel matching `name`.
    ///
    /// # Errors
    ///
    /// - `CisError::EmptyResult` if nothing matches.
    /// - `CisError::AmbiguousResult` if more than one channel matches.
    /// - any error of [`ChannelList::query`].
    #[instrument(skip_all, fields(term = %name))]
    pub async fn query(
        api: &(impl LocalCisApi + Sync),
        name: &str,
        options: QueryOptions,
    ) -> Result<Self> {
        let mut list = ChannelList::query(api, name, options).await?;
        match list.len() {
            0 => Err(CisError::EmptyResult {
                term: String::from(name),
            }),
            1 => list.pop().ok_or_else(|| CisError::EmptyResult {
                term: String::from(name),
            }),
            count => Err(CisError::AmbiguousResult {
                count,
                term: String::from(name),
            }),
        }
    }

    /// Channel name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name with underscores escaped for LaTeX.
    #[must_use]
    pub fn tex_name(&self) -> String {
        self.name.replace('_', r"\_")
    }

    /// Samples per second.
    #[must_use]
    pub const fn sample_rate(&self) -> Option<f64> {
        self.sample_rate
    }

    /// Physical unit.
    #[must_use]
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// Data type.
    #[must_use]
    pub const fn dtype(&self) -> Option<DataType> {
        self.dtype
    }

    /// Frame type.
    #[must_use]
    pub fn frametype(&self) -> Option<&str> {
        self.frametype.as_deref()
    }

    /// Front-end model name, lower-case.
    #[must_use]
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Browser URL.
    #[must_use]
    pub const fn url(&self) -> Option<&Url> {
        self.url.as_ref()
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

    /// Description of the whole channel.
    #[must_use]
    pub const fn description(&self) -> Option<&Description> {
        self.description.as_ref()
    }

    /// Attached description cache.
    #[must_use]
    pub const fn descriptions(&self) -> Option<&DescriptionDict> {
        self.descriptions.as_ref()
    }

    /// Interferometer component.
    #[must_use]
    pub const fn ifo(&self) -> Option<&Description> {
        self.parts.ifo.as_ref()
    }

    /// System component.
    #[must_use]
    pub const fn system(&self) -> Option<&Description> {
        self.parts.system.as_ref()
    }

    /// Sub-system component.
    #[must_use]
    pub const fn subsystem(&self) -> Option<&Description> {
        self.parts.subsystem.as_ref()
    }

    /// Signal component.
    #[must_use]
    pub const fn signal(&self) -> Option<&Description> {
        self.parts.signal.as_ref()
    }

    /// All four name components.
    #[must_use]
    pub const fn name_parts(&self) -> &NameParts {
        &self.parts
    }

    /// One-line summary: name, short description and sample rate.
    #[must_use]
    pub fn summary(&self) -> String {
        let rate = self
            .sample_rate
            .map_or_else(|| String::from("None"), |r| format!("{r:?}"));
        match self.description.as_ref().and_then(Description::description) {
            Some(text) => format!(
                "<Channel(\"{}\", description=\"{text}\", sample_rate={rate})>",
                self.name
            ),
            None => format!("<Channel(\"{}\", sample_rate={rate})>", self.name),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
