//! The remote data platform boundary.
//!
//! This module provides:
//! - `Platform` - query, mutation, file and auth interface the app talks to
//! - `MemoryPlatform` - in-process platform with request recording and fault injection
//! - `RedisPlatform` - Redis-hosted platform used by the CLI
//!
//! Authorization is the platform's job. Implementations evaluate the
//! row-level policies declared on each table; callers never re-check them.
//!
//! # Example
//! ```ignore
//! let platform = MemoryPlatform::new();
//! let rows = platform
//!     .select(&Query::from("posts").order("created_at", SortOrder::Desc).range(0, 10))
//!     .await?;
//! ```

mod auth;
pub mod memory;
pub mod redis_platform;
mod rows;

pub use auth::CredentialHasher;
pub use memory::{MemoryPlatform, MutationGate, Request, RequestKind};
pub use redis_platform::RedisPlatform;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{errors::PlatformError, query::Query, types::Row};

/// The authenticated account behind a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub user: AuthUser,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Account creation request. The platform creates the matching profile row;
/// `username` defaults to the local part of the email.
#[derive(Debug, Clone)]
pub struct SignUp {
    pub email: String,
    pub password: String,
    pub username: Option<String>,
    pub full_name: Option<String>,
}

impl SignUp {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            username: None,
            full_name: None,
        }
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }
}

/// Metadata of an uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredObject {
    pub bucket: String,
    pub path: String,
    pub content_type: String,
    pub size: usize,
}

/// Query/mutation, file and authentication interface of the data platform.
///
/// Every call is a network round trip from the client's point of view, and
/// the only place application code suspends.
#[allow(async_fn_in_trait)]
pub trait Platform {
    /// Rows matching `query`, ordered and paged. A `single()` query fails
    /// with [`PlatformError::NoRows`] when nothing matches.
    async fn select(&self, query: &Query) -> Result<Vec<Row>, PlatformError>;

    /// Number of visible rows matching the query's filters.
    async fn count(&self, query: &Query) -> Result<u64, PlatformError>;

    /// Insert one row; returns it with server-assigned id and timestamps.
    async fn insert(&self, table: &str, row: Row) -> Result<Row, PlatformError>;

    /// Apply `patch` to every row the query selects and the caller may update.
    async fn update(&self, query: &Query, patch: Row) -> Result<Vec<Row>, PlatformError>;

    /// Delete every row the query selects and the caller may delete.
    async fn delete(&self, query: &Query) -> Result<Vec<Row>, PlatformError>;

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
        content_type: &str,
        upsert: bool,
    ) -> Result<StoredObject, PlatformError>;

    /// Publicly resolvable URL for a stored object. Pure, no request.
    fn public_url(&self, bucket: &str, path: &str) -> String;

    async fn sign_up(&self, request: &SignUp) -> Result<Session, PlatformError>;

    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, PlatformError>;

    async fn current_session(&self) -> Result<Option<Session>, PlatformError>;

    async fn current_user(&self) -> Result<Option<AuthUser>, PlatformError>;

    async fn sign_out(&self) -> Result<(), PlatformError>;
}

/// Default public URL layout for stored objects.
pub fn object_url(base_url: &str, bucket: &str, path: &str) -> String {
    format!(
        "{}/storage/v1/object/public/{bucket}/{path}",
        base_url.trim_end_matches('/')
    )
}

/// Enforce `single()` semantics on a result set.
pub(crate) fn expect_single(query: &Query, rows: Vec<Row>) -> Result<Vec<Row>, PlatformError> {
    if !query.single {
        return Ok(rows);
    }
    match rows.len() {
        0 => Err(PlatformError::NoRows {
            table: query.table.clone(),
        }),
        1 => Ok(rows),
        n => Err(PlatformError::InvalidRequest {
            message: format!("single() query on {} matched {n} rows", query.table),
        }),
    }
}
