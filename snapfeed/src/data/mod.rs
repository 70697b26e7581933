//! Data-access layer.
//!
//! Thin async functions mapping application intents ("get feed page", "like
//! post", "follow user") onto platform queries and mutations. Each takes the
//! platform and, where the intent depends on who is asking, the viewer id.
//! Authorization is left to the platform.

pub mod comments;
pub mod feed;
pub mod follows;
pub mod likes;
pub mod posts;
pub mod profiles;
pub mod storage;

pub use feed::{FeedRequest, get_feed, get_post};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    errors::{DataError, PlatformError},
    types::Row,
};

pub(crate) fn decode<T: DeserializeOwned>(row: Row) -> Result<T, DataError> {
    serde_json::from_value(Value::Object(row)).map_err(|err| DataError::from(PlatformError::serialization(err)))
}

pub(crate) fn decode_all<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, DataError> {
    rows.into_iter().map(decode).collect()
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Row, DataError> {
    match serde_json::to_value(value).map_err(PlatformError::serialization)? {
        Value::Object(row) => Ok(row),
        other => Err(PlatformError::serialization(format!("expected an object, got {other}")).into()),
    }
}

/// First row of a mutation result, or a not-found error naming `what`.
pub(crate) fn first_row(rows: Vec<Row>, what: &'static str, key: &str) -> Result<Row, DataError> {
    rows.into_iter().next().ok_or_else(|| DataError::not_found(what, key))
}

pub(crate) fn require_viewer(viewer: Option<&str>) -> Result<&str, DataError> {
    viewer.ok_or(DataError::Unauthenticated)
}
