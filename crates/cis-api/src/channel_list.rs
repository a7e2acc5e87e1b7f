//! Ordered collections of channels: lookup, filtering and remote search.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::instrument;
use url::Url;

use crate::channel::Channel;
use crate::client::LocalCisApi;
use crate::error::{CisError, Result};
use crate::types::ChannelPage;
use crate::util::validate_url;

/// Characters the search endpoint expects as `%20`.
#[allow(clippy::expect_used)]
static QUERY_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\*\s]").expect("failed to compile query regex"));

/// Safety net against a `next` link that never ends.
const MAX_PAGES: u32 = 10_000;

/// Options for remote queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// Fetch the descriptions of every matching channel.
    ///
    /// Search results without an API URL are kept without descriptions and
    /// logged at `warn` level.
    pub descriptions: bool,
    /// Log each request and response at `info` level.
    pub debug: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            descriptions: true,
            debug: false,
        }
    }
}

/// Name criterion for [`SieveParams`].
#[derive(Debug, Clone)]
pub enum NamePattern {
    /// Pattern source, compiled when the sieve runs.
    Text(String),
    /// Precompiled pattern.
    Regex(Regex),
}

impl NamePattern {
    fn source(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Regex(re) => re.as_str(),
        }
    }

    /// Compiles the pattern, anchoring it at both ends if `exact`.
    ///
    /// The whole source is grouped before anchoring, so alternations stay
    /// anchored on every branch.
    fn compile(&self, exact: bool) -> Result<Regex> {
        if exact {
            return Ok(Regex::new(&format!(r"\A(?:{})\z", self.source()))?);
        }
        match self {
            Self::Text(text) => Ok(Regex::new(text)?),
            Self::Regex(re) => Ok(re.clone()),
        }
    }
}

impl From<&str> for NamePattern {
    fn from(value: &str) -> Self {
        Self::Text(String::from(value))
    }
}

impl From<String> for NamePattern {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Regex> for NamePattern {
    fn from(value: Regex) -> Self {
        Self::Regex(value)
    }
}

/// Criteria for [`ChannelList::sieve`]. Unset criteria always pass.
#[derive(Debug, Clone, Default)]
pub struct SieveParams {
    /// Pattern searched in the channel name.
    pub name: Option<NamePattern>,
    /// Exact sample rate in Hz.
    pub sample_rate: Option<f64>,
    /// Inclusive `(low, high)` sample-rate range in Hz.
    pub sample_range: Option<(f64, f64)>,
    /// Require `name` to match the whole channel name.
    pub exact_match: bool,
}

impl SieveParams {
    /// Sets the name pattern.
    #[must_use]
    pub fn name(mut self, pattern: impl Into<NamePattern>) -> Self {
        self.name = Some(pattern.into());
        self
    }

    /// Sets the exact sample rate.
    #[must_use]
    pub const fn sample_rate(mut self, rate: f64) -> Self {
        self.sample_rate = Some(rate);
        self
    }

    /// Sets the inclusive sample-rate range.
    #[must_use]
    pub const fn sample_range(mut self, low: f64, high: f64) -> Self {
        self.sample_range = Some((low, high));
        self
    }

    /// Requires the name pattern to match the full name.
    #[must_use]
    pub const fn exact_match(mut self, exact: bool) -> Self {
        self.exact_match = exact;
        self
    }
}

/// An ordered list of channels.
#[derive(Debug, Clone, Default, PartialEq)]
#[allow(clippy::module_name_repetitions)]
pub struct ChannelList {
    channels: Vec<Channel>,
}

impl ChannelList {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            channels: Vec::new(),
        }
    }

    /// Appends a channel.
    pub fn push(&mut self, channel: Channel) {
        self.channels.push(channel);
    }

    /// Removes and returns the last channel.
    pub fn pop(&mut self) -> Option<Channel> {
        self.channels.pop()
    }

    /// Number of channels.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.channels.len()
    }

    /// Returns `true` if the list is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Channel at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Channel> {
        self.channels.get(index)
    }

    /// Iterates channels in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Channel> {
        self.channels.iter()
    }

    /// Returns the channels as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Channel] {
        &self.channels
    }

    /// Position of the first channel named exactly `name`.
    ///
    /// # Errors
    ///
    /// Returns `CisError::LookupMiss` if no channel has that name.
    pub fn find(&self, name: &str) -> Result<usize> {
        self.channels
            .iter()
            .position(|c| c.name() == name)
            .ok_or_else(|| CisError::LookupMiss {
                name: String::from(name),
            })
    }

    /// Returns the channels that satisfy every criterion in `params`.
    ///
    /// Channels without a sample rate never pass a rate criterion.
    ///
    /// # Errors
    ///
    /// Returns `CisError::InvalidPattern` if the name pattern does not compile.
    #[allow(clippy::float_cmp)]
    pub fn sieve(&self, params: &SieveParams) -> Result<Self> {
        let name_re = params
            .name
            .as_ref()
            .map(|p| p.compile(params.exact_match))
            .transpose()?;

        let channels = self
            .channels
            .iter()
            .filter(|c| name_re.as_ref().is_none_or(|re| re.is_match(c.name())))
            .filter(|c| {
                params
                    .sample_rate
                    .is_none_or(|rate| c.sample_rate().is_some_and(|r| r == rate))
            })
            .filter(|c| {
                params.sample_range.is_none_or(|(low, high)| {
                    c.sample_rate().is_some_and(|r| low <= r && r <= high)
                })
            })
            .cloned()
            .collect();
        Ok(Self { channels })
    }

    /// Distinct IFO prefixes present in the list.
    #[must_use]
    pub fn ifos(&self) -> BTreeSet<String> {
        self.channels
            .iter()
            .filter_map(|c| c.ifo().map(|d| String::from(d.name())))
            .collect()
    }

    /// Search URL for `term` under `api_root`.
    ///
    /// `*` and whitespace in the term are sent as `%20`.
    ///
    /// # Errors
    ///
    /// Returns `CisError::InvalidUrl` if the API root cannot be joined.
    pub fn search_url(api_root: &Url, term: &str) -> Result<Url> {
        let mut url = api_root
            .join("channel/")
            .map_err(|_| CisError::InvalidUrl {
                field: "search",
                url: format!("{api_root}channel/"),
            })?;
        let encoded = QUERY_SPACE_RE.replace_all(term, "%20");
        url.set_query(Some(&format!("q={encoded}")));
        Ok(url)
    }

    /// Queries the CIS for every channel matching `term`.
    ///
    /// Follows the `next` link of each result page until the last one, then
    /// sorts the channels by name. With `options.descriptions` every channel
    /// is enriched through [`Channel::get_descriptions`].
    ///
    /// # Errors
    ///
    /// - `CisError::NotFound` if a page request answers with a failure status.
    /// - `CisError::Schema` if a page or record is malformed.
    /// - any transport or description error.
    #[instrument(skip_all, fields(term = %term))]
    pub async fn query(
        api: &(impl LocalCisApi + Sync),
        term: &str,
        options: QueryOptions,
    ) -> Result<Self> {
        Self::query_pages(api, term, options, MAX_PAGES).await
    }

    /// Pagination loop behind [`Self::query`], stopping after `max_pages`.
    pub(crate) async fn query_pages(
        api: &(impl LocalCisApi + Sync),
        term: &str,
        options: QueryOptions,
        max_pages: u32,
    ) -> Result<Self> {
        let mut next = Some(Self::search_url(api.api_root(), term)?);
        let mut channels: Vec<Channel> = Vec::new();
        let mut page: u32 = 0;

        while let Some(url) = next.take() {
            page = page.saturating_add(1);
            if page > max_pages {
                tracing::warn!(pages = max_pages, "page limit reached, stopping pagination");
                break;
            }

            let body = api.get_text(&url, options.debug).await.map_err(|e| {
                if e.is_http_failure() {
                    CisError::NotFound {
                        message: format!(
                            "Channel named '{term}' not found in Channel Information System. \
                             Please double check the name and try again."
                        ),
                    }
                } else {
                    e
                }
            })?;
            let results: ChannelPage = serde_json::from_str(&body)
                .map_err(|e| CisError::schema(format!("channel search page {page}"), e))?;

            let fetched = results.results.len();
            for record in results.results {
                let channel = Channel::from_record(record)?;
                let channel = if !options.descriptions {
                    channel
                } else if channel.apiurl().is_none() {
                    tracing::warn!(
                        channel = channel.name(),
                        "Channel has no API URL, skipping descriptions"
                    );
                    channel
                } else {
                    channel.get_descriptions(api, None, options.debug).await?
                };
                channels.push(channel);
            }

            tracing::info!(
                page = page,
                fetched = fetched,
                total = ?results.count,
                "Channel search page completed"
            );

            next = results
                .next
                .filter(|n| !n.is_empty())
                .map(|n| validate_url("next page", &n))
                .transpose()?;
        }

        channels.sort_by(|a, b| a.name().cmp(b.name()));
        tracing::debug!(total = channels.len(), pages = page, "Channel search completed");
        Ok(Self { channels })
    }
}

impl FromIterator<Channel> for ChannelList {
    fn from_iter<I: IntoIterator<Item = Channel>>(iter: I) -> Self {
        Self {
            channels: iter.into_iter().collect(),
        }
    }
}

impl Extend<Channel> for ChannelList {
    fn extend<I: IntoIterator<Item = Channel>>(&mut self, iter: I) {
        self.channels.extend(iter);
    }
}

impl IntoIterator for ChannelList {
    type Item = Channel;
    type IntoIter = std::vec::IntoIter<Channel>;

    fn into_iter(self) -> Self::IntoIter {
        self.channels.into_iter()
    }
}

impl<'a> IntoIterator for &'a ChannelList {
    type Item = &'a Channel;
    type IntoIter = std::slice::Iter<'a, Channel>;

    fn into_iter(self) -> Self::IntoIter {
        self.channels.iter()
    }
}
