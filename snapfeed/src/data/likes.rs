use serde_json::Value;

use super::{decode, require_viewer};
use crate::{
    errors::DataError,
    models::Like,
    platform::Platform,
    query::Query,
    types::{Record, Row},
};

pub async fn like_post<P: Platform>(platform: &P, viewer: Option<&str>, post_id: &str) -> Result<Like, DataError> {
    let viewer = require_viewer(viewer)?;
    let mut row = Row::new();
    row.insert("post_id".to_string(), Value::from(post_id));
    row.insert("user_id".to_string(), Value::from(viewer));
    decode(platform.insert(Like::TABLE, row).await?)
}

/// Remove the viewer's like. Unliking a post that is not liked is a no-op.
pub async fn unlike_post<P: Platform>(platform: &P, viewer: Option<&str>, post_id: &str) -> Result<(), DataError> {
    let viewer = require_viewer(viewer)?;
    let query = Query::from(Like::TABLE).eq("post_id", post_id).eq("user_id", viewer);
    platform.delete(&query).await?;
    Ok(())
}

/// Bring the viewer's like on `post_id` to `liked`.
pub async fn set_liked<P: Platform>(
    platform: &P,
    viewer: Option<&str>,
    post_id: &str,
    liked: bool,
) -> Result<(), DataError> {
    if liked {
        like_post(platform, viewer, post_id).await.map(|_| ())
    } else {
        unlike_post(platform, viewer, post_id).await
    }
}
