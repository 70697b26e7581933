use serde_json::Value;

use super::{decode, require_viewer};
use crate::{
    errors::DataError,
    models::Follow,
    platform::Platform,
    query::Query,
    types::{Record, Row},
};

fn edge(follower_id: &str, following_id: &str) -> Query {
    Query::from(Follow::TABLE)
        .eq("follower_id", follower_id)
        .eq("following_id", following_id)
}

/// Follow `target`. Following yourself fails before any request is made.
pub async fn follow<P: Platform>(platform: &P, viewer: Option<&str>, target: &str) -> Result<Follow, DataError> {
    let viewer = require_viewer(viewer)?;
    if viewer == target {
        return Err(DataError::SelfFollow);
    }
    let mut row = Row::new();
    row.insert("follower_id".to_string(), Value::from(viewer));
    row.insert("following_id".to_string(), Value::from(target));
    decode(platform.insert(Follow::TABLE, row).await?)
}

pub async fn unfollow<P: Platform>(platform: &P, viewer: Option<&str>, target: &str) -> Result<(), DataError> {
    let viewer = require_viewer(viewer)?;
    if viewer == target {
        return Err(DataError::SelfFollow);
    }
    platform.delete(&edge(viewer, target)).await?;
    Ok(())
}

/// Bring the viewer's follow edge to `target` to `following`.
pub async fn set_following<P: Platform>(
    platform: &P,
    viewer: Option<&str>,
    target: &str,
    following: bool,
) -> Result<(), DataError> {
    if following {
        follow(platform, viewer, target).await.map(|_| ())
    } else {
        unfollow(platform, viewer, target).await
    }
}

/// Whether the viewer follows `target`. Anonymous viewers and the profile
/// owner get `false` without a request.
pub async fn is_following<P: Platform>(platform: &P, viewer: Option<&str>, target: &str) -> Result<bool, DataError> {
    match viewer {
        Some(viewer) if viewer != target => Ok(platform.count(&edge(viewer, target)).await? > 0),
        _ => Ok(false),
    }
}

pub async fn follower_count<P: Platform>(platform: &P, user_id: &str) -> Result<u64, DataError> {
    Ok(platform.count(&Query::from(Follow::TABLE).eq("following_id", user_id)).await?)
}

pub async fn following_count<P: Platform>(platform: &P, user_id: &str) -> Result<u64, DataError> {
    Ok(platform.count(&Query::from(Follow::TABLE).eq("follower_id", user_id)).await?)
}
