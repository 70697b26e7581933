use serde_json::Value;

use super::{decode, first_row, require_viewer};
use crate::{
    errors::{DataError, ValidationError, ValidationResult},
    models::Post,
    platform::Platform,
    query::Query,
    types::{Record, Row},
};

pub const MAX_CAPTION_LENGTH: usize = 2_200;

/// Trimmed caption, `None` when blank.
pub fn normalize_caption(caption: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(caption) = caption.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(None);
    };
    if caption.chars().count() > MAX_CAPTION_LENGTH {
        return Err(ValidationError::single(
            "caption",
            "validation.length",
            format!("Caption must be at most {MAX_CAPTION_LENGTH} characters."),
        ));
    }
    Ok(Some(caption.to_string()))
}

pub async fn create_post<P: Platform>(
    platform: &P,
    viewer: Option<&str>,
    image_url: &str,
    caption: Option<&str>,
) -> Result<Post, DataError> {
    let viewer = require_viewer(viewer)?;
    let caption = normalize_caption(caption)?;

    let mut row = Row::new();
    row.insert("user_id".to_string(), Value::from(viewer));
    row.insert("image_url".to_string(), Value::from(image_url));
    row.insert("caption".to_string(), caption.map(Value::from).unwrap_or(Value::Null));

    let post: Post = decode(platform.insert(Post::TABLE, row).await?)?;
    log::info!("created post {}", post.id);
    Ok(post)
}

/// Delete a post. Likes and comments go with it on the platform side.
///
/// A post the caller may not delete is reported as not found.
pub async fn delete_post<P: Platform>(platform: &P, post_id: &str) -> Result<Post, DataError> {
    let deleted = platform.delete(&Query::from(Post::TABLE).eq("id", post_id)).await?;
    decode(first_row(deleted, "post", post_id)?)
}

pub async fn count_posts<P: Platform>(platform: &P, user_id: &str) -> Result<u64, DataError> {
    Ok(platform.count(&Query::from(Post::TABLE).eq("user_id", user_id)).await?)
}
