//! Snapfeed core library.
//!
//! A photo-sharing client over a hosted data platform: feed aggregation,
//! optimistic like/follow toggles, comment threads, profiles and a session
//! store. Persistence, authorization and file storage live behind the
//! [`Platform`] trait, with an in-memory implementation for tests and demos
//! and a Redis-backed one.

extern crate self as snapfeed;

pub mod client;
pub mod config;
pub mod data;
pub mod errors;
pub mod events;
pub mod id;
pub mod keys;
pub mod models;
pub mod platform;
pub mod policy;
pub mod query;
pub mod registry;
pub mod runtime;
pub mod session;
pub mod toggle;
pub mod types;
pub mod validators;
pub mod views;

pub use client::Snapfeed;
pub use config::SnapfeedConfig;
pub use errors::*;
pub use events::{EventBus, FeedEvent};
pub use models::*;
pub use platform::{Credentials, MemoryPlatform, Platform, RedisPlatform, Session, SignUp};
pub use query::{Query, SortOrder};
pub use session::SessionStore;
pub use snapfeed_macros::Record;
pub use toggle::{OptimisticToggle, ToggleOutcome};
pub use types::{Record, Row};
pub use views::LoadState;

// Re-export redis types so users don't need to depend on a specific redis version
pub use redis;
pub use redis::aio::ConnectionManager;

// Re-export inventory for table registration in the Record derive macro
pub use inventory;

/// Delete all keys matching a pattern (for test cleanup).
///
/// This performs a SCAN + DEL operation to safely delete keys without blocking Redis.
pub async fn cleanup_pattern(conn: &mut ConnectionManager, pattern: &str) -> Result<u64, PlatformError> {
    const SCAN_COUNT: usize = 1000;
    let mut cursor: u64 = 0;
    let mut total_deleted: u64 = 0;

    loop {
        let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(SCAN_COUNT)
            .query_async(conn)
            .await?;

        if !keys.is_empty() {
            let deleted: u64 = redis::cmd("DEL").arg(&keys).query_async(conn).await?;
            total_deleted += deleted;
        }

        cursor = next_cursor;
        if cursor == 0 {
            break;
        }
    }

    log::debug!("cleanup of {pattern} removed {total_deleted} keys");
    Ok(total_deleted)
}
