use serde_json::Value;

use super::{decode, decode_all, first_row, require_viewer};
use crate::{
    errors::{DataError, ValidationError, ValidationResult},
    models::{Comment, CommentWithAuthor, Profile},
    platform::Platform,
    query::{Query, SortOrder},
    types::{Record, Row},
};

pub const MAX_COMMENT_LENGTH: usize = 2_200;

/// Trimmed comment text; blank content is rejected.
pub fn normalize_content(content: &str) -> ValidationResult<String> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ValidationError::single(
            "content",
            "validation.required",
            "Comment cannot be empty.",
        ));
    }
    if content.chars().count() > MAX_COMMENT_LENGTH {
        return Err(ValidationError::single(
            "content",
            "validation.length",
            format!("Comment must be at most {MAX_COMMENT_LENGTH} characters."),
        ));
    }
    Ok(content.to_string())
}

fn with_author() -> Query {
    Query::from(Comment::TABLE).expand("author", Profile::TABLE, "user_id")
}

/// All comments of a post, oldest first.
pub async fn list_comments<P: Platform>(platform: &P, post_id: &str) -> Result<Vec<CommentWithAuthor>, DataError> {
    let query = with_author()
        .eq("post_id", post_id)
        .order("created_at", SortOrder::Asc);
    decode_all(platform.select(&query).await?)
}

/// Create a comment and read it back with its author.
pub async fn add_comment<P: Platform>(
    platform: &P,
    viewer: Option<&str>,
    post_id: &str,
    content: &str,
) -> Result<CommentWithAuthor, DataError> {
    let viewer = require_viewer(viewer)?;
    let content = normalize_content(content)?;

    let mut row = Row::new();
    row.insert("post_id".to_string(), Value::from(post_id));
    row.insert("user_id".to_string(), Value::from(viewer));
    row.insert("content".to_string(), Value::from(content));
    let created: Comment = decode(platform.insert(Comment::TABLE, row).await?)?;

    let rows = platform.select(&with_author().eq("id", created.id.as_str())).await?;
    decode(first_row(rows, "comment", &created.id)?)
}

/// Delete a comment. A comment the caller may not delete is reported as not found.
pub async fn delete_comment<P: Platform>(platform: &P, comment_id: &str) -> Result<Comment, DataError> {
    let deleted = platform.delete(&Query::from(Comment::TABLE).eq("id", comment_id)).await?;
    decode(first_row(deleted, "comment", comment_id)?)
}

pub async fn count_comments<P: Platform>(platform: &P, post_id: &str) -> Result<u64, DataError> {
    Ok(platform.count(&Query::from(Comment::TABLE).eq("post_id", post_id)).await?)
}
