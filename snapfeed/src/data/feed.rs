//! Feed aggregation.
//!
//! A page costs a fixed number of requests whatever its size: one posts query
//! (with the author embedded), one likes query and one comments query over the
//! page's ids, plus one query for the viewer's own likes when signed in.
//! Counts are folded client-side.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use super::decode_all;
use crate::{
    errors::{DataError, PlatformError},
    models::{Comment, FeedPost, Like, Post, PostWithAuthor, Profile},
    platform::Platform,
    query::{Query, SortOrder},
    types::{Record, Row},
};

/// One page of a feed, optionally scoped to a single author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRequest {
    pub limit: usize,
    pub offset: usize,
    pub user_id: Option<String>,
}

impl FeedRequest {
    pub fn page(limit: usize, offset: usize) -> Self {
        Self {
            limit,
            offset,
            user_id: None,
        }
    }

    pub fn for_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

fn posts_query() -> Query {
    Query::from(Post::TABLE).expand("author", Profile::TABLE, "user_id")
}

/// Newest-first page of posts with like/comment counts and the viewer's
/// like state.
pub async fn get_feed<P: Platform>(
    platform: &P,
    viewer: Option<&str>,
    request: &FeedRequest,
) -> Result<Vec<FeedPost>, DataError> {
    let mut query = posts_query()
        .order("created_at", SortOrder::Desc)
        .range(request.offset, request.limit);
    if let Some(user_id) = &request.user_id {
        query = query.eq("user_id", user_id.as_str());
    }

    let posts: Vec<PostWithAuthor> = decode_all(platform.select(&query).await?)?;
    log::debug!(
        "feed page offset={} limit={} returned {} posts",
        request.offset,
        request.limit,
        posts.len()
    );
    aggregate(platform, viewer, posts).await
}

/// A single post with the same derived fields as a feed entry.
pub async fn get_post<P: Platform>(platform: &P, viewer: Option<&str>, post_id: &str) -> Result<FeedPost, DataError> {
    let rows = platform.select(&posts_query().eq("id", post_id)).await?;
    let posts: Vec<PostWithAuthor> = decode_all(rows)?;
    aggregate(platform, viewer, posts)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| DataError::not_found("post", post_id))
}

/// Attach counts and like state to `posts`, keeping their order.
pub(crate) async fn aggregate<P: Platform>(
    platform: &P,
    viewer: Option<&str>,
    posts: Vec<PostWithAuthor>,
) -> Result<Vec<FeedPost>, DataError> {
    if posts.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<String> = posts.iter().map(|entry| entry.post.id.clone()).collect();
    let likes_query = Query::from(Like::TABLE)
        .columns(["post_id"])
        .is_in("post_id", ids.clone());
    let comments_query = Query::from(Comment::TABLE)
        .columns(["post_id"])
        .is_in("post_id", ids.clone());
    let viewer_query = viewer.map(|viewer| {
        Query::from(Like::TABLE)
            .columns(["post_id"])
            .is_in("post_id", ids.clone())
            .eq("user_id", viewer)
    });

    let (likes, comments, own_likes) = tokio::try_join!(
        platform.select(&likes_query),
        platform.select(&comments_query),
        async {
            match &viewer_query {
                Some(query) => platform.select(query).await.map(Some),
                None => Ok::<_, PlatformError>(None),
            }
        },
    )?;

    let likes_count = tally(&likes);
    let comments_count = tally(&comments);
    let liked: HashSet<&str> = own_likes.iter().flatten().filter_map(post_id_of).collect();

    Ok(posts
        .into_iter()
        .map(|PostWithAuthor { post, author }| {
            let id = post.id.as_str();
            FeedPost {
                likes_count: likes_count.get(id).copied().unwrap_or(0),
                comments_count: comments_count.get(id).copied().unwrap_or(0),
                is_liked: liked.contains(id),
                author,
                post,
            }
        })
        .collect())
}

fn post_id_of(row: &Row) -> Option<&str> {
    row.get("post_id").and_then(Value::as_str)
}

fn tally(rows: &[Row]) -> HashMap<&str, u64> {
    let mut counts = HashMap::new();
    for post_id in rows.iter().filter_map(post_id_of) {
        *counts.entry(post_id).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tally_counts_per_post() {
        let rows: Vec<Row> = [json!({"post_id": "a"}), json!({"post_id": "b"}), json!({"post_id": "a"})]
            .into_iter()
            .filter_map(|v| v.as_object().cloned())
            .collect();
        let counts = tally(&rows);
        assert_eq!(counts.get("a"), Some(&2));
        assert_eq!(counts.get("b"), Some(&1));
        assert_eq!(counts.get("c"), None);
    }

    #[test]
    fn scoped_request() {
        let request = FeedRequest::page(10, 20).for_user("u1");
        assert_eq!(request.user_id.as_deref(), Some("u1"));
        assert_eq!((request.limit, request.offset), (10, 20));
    }
}
