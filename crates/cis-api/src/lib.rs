//! Client library for the LIGO Channel Information System (CIS).
//!
//! Provides typed channel and description records, channel-name parsing,
//! in-memory filtering and a cookie-aware connector for the CIS REST API.

/// Channel records and name parsing.
pub mod channel;

/// Channel collections, filtering and remote search.
pub mod channel_list;

/// CIS REST API connector.
pub mod client;

/// Name-component descriptions.
pub mod description;

/// Sample data types.
pub mod dtype;

/// Error type.
pub mod error;

/// Wire records.
pub mod types;

/// Field normalisation helpers.
pub mod util;

pub use channel::{Channel, ChannelBuilder, NameParts};
pub use channel_list::{ChannelList, NamePattern, QueryOptions, SieveParams};
pub use client::{CisApi, CisClient, LocalCisApi, Session};
pub use description::{Description, DescriptionBuilder, DescriptionDict};
pub use dtype::DataType;
pub use error::{CisError, Result};
