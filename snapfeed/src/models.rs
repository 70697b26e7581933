//! Platform tables and the read-side shapes assembled from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Record;

/// Public profile of an account. Created by the platform when the account
/// signs up; the id is the account id.
#[derive(Record, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[record(table = "profiles", policy(select = "anyone", insert = "owner", update = "owner", delete = "deny"))]
pub struct Profile {
    #[record(id, owner)]
    pub id: String,
    #[record(unique(case_insensitive))]
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[record(created_at)]
    pub created_at: DateTime<Utc>,
    #[record(updated_at)]
    pub updated_at: DateTime<Utc>,
}

/// A photo post.
#[derive(Record, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[record(table = "posts")]
pub struct Post {
    #[record(id)]
    pub id: String,
    #[record(owner, references = "profiles", cascade)]
    pub user_id: String,
    pub image_url: String,
    #[serde(default)]
    pub caption: Option<String>,
    #[record(created_at)]
    pub created_at: DateTime<Utc>,
    #[record(updated_at)]
    pub updated_at: DateTime<Utc>,
}

/// One account liking one post.
#[derive(Record, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[record(table = "likes", unique_together = ["post_id", "user_id"])]
#[record(policy(select = "anyone", insert = "owner", update = "deny", delete = "owner"))]
pub struct Like {
    #[record(id)]
    pub id: String,
    #[record(references = "posts", cascade)]
    pub post_id: String,
    #[record(owner, references = "profiles", cascade)]
    pub user_id: String,
    #[record(created_at)]
    pub created_at: DateTime<Utc>,
}

/// A comment on a post.
#[derive(Record, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[record(table = "comments")]
pub struct Comment {
    #[record(id)]
    pub id: String,
    #[record(references = "posts", cascade)]
    pub post_id: String,
    #[record(owner, references = "profiles", cascade)]
    pub user_id: String,
    pub content: String,
    #[record(created_at)]
    pub created_at: DateTime<Utc>,
    #[record(updated_at)]
    pub updated_at: DateTime<Utc>,
}

/// `follower_id` follows `following_id`.
#[derive(Record, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[record(table = "follows", unique_together = ["follower_id", "following_id"])]
#[record(distinct = ["follower_id", "following_id"])]
#[record(policy(select = "anyone", insert = "owner", update = "deny", delete = "owner"))]
pub struct Follow {
    #[record(id)]
    pub id: String,
    #[record(owner, references = "profiles", cascade)]
    pub follower_id: String,
    #[record(references = "profiles", cascade)]
    pub following_id: String,
    #[record(created_at)]
    pub created_at: DateTime<Utc>,
}

/// Register every table with the descriptor registry.
pub fn register_schema() {
    Profile::ensure_registered();
    Post::ensure_registered();
    Like::ensure_registered();
    Comment::ensure_registered();
    Follow::ensure_registered();
}

/// Owning profile embedded into post and comment reads.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProfileSummary {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl From<&Profile> for ProfileSummary {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id.clone(),
            username: profile.username.clone(),
            full_name: profile.full_name.clone(),
            avatar_url: profile.avatar_url.clone(),
        }
    }
}

/// Post row joined with its author profile.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PostWithAuthor {
    #[serde(flatten)]
    pub post: Post,
    #[serde(default)]
    pub author: Option<ProfileSummary>,
}

/// A post as shown in a feed: the row plus per-page derived fields.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FeedPost {
    #[serde(flatten)]
    pub post: Post,
    pub author: Option<ProfileSummary>,
    pub likes_count: u64,
    pub comments_count: u64,
    /// Whether the current viewer likes this post.
    pub is_liked: bool,
}

impl FeedPost {
    pub fn id(&self) -> &str {
        &self.post.id
    }
}

/// Comment row joined with its author profile.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CommentWithAuthor {
    #[serde(flatten)]
    pub comment: Comment,
    #[serde(default)]
    pub author: Option<ProfileSummary>,
}

/// Profile screen data.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ProfileAggregate {
    pub profile: Profile,
    pub posts: Vec<FeedPost>,
    pub post_count: u64,
    pub follower_count: u64,
    pub following_count: u64,
    /// Whether the viewer follows this profile.
    pub is_following: bool,
    /// Whether the viewer is looking at their own profile.
    pub is_own: bool,
}
