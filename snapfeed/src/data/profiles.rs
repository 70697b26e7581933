use serde_json::Value;

use super::{FeedRequest, decode, decode_all, first_row, follows, get_feed, posts::count_posts, require_viewer};
use crate::{
    errors::{DataError, ValidationError, ValidationIssue, ValidationResult},
    models::{Profile, ProfileAggregate},
    platform::Platform,
    query::{Query, SortOrder},
    types::{Record, Row},
    validators::is_valid_username,
};

pub const MAX_BIO_LENGTH: usize = 150;

/// Profile by account id. A missing profile is `Ok(None)`.
pub async fn get_profile_by_id<P: Platform>(platform: &P, user_id: &str) -> Result<Option<Profile>, DataError> {
    let query = Query::from(Profile::TABLE).eq("id", user_id).single();
    match platform.select(&query).await {
        Ok(rows) => rows.into_iter().next().map(decode).transpose(),
        Err(err) if err.is_no_rows() => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Profile by username, matched case-insensitively.
pub async fn get_profile_by_username<P: Platform>(platform: &P, username: &str) -> Result<Profile, DataError> {
    let username = username.trim().to_lowercase();
    let rows = platform
        .select(&Query::from(Profile::TABLE).eq("username", username.as_str()))
        .await?;
    decode(first_row(rows, "profile", &username)?)
}

/// Profiles whose username contains `term`, ordered by username.
pub async fn search_profiles<P: Platform>(platform: &P, term: &str, limit: usize) -> Result<Vec<Profile>, DataError> {
    let term: String = term.trim().chars().filter(|c| *c != '%').collect();
    if term.is_empty() {
        return Ok(Vec::new());
    }
    let query = Query::from(Profile::TABLE)
        .ilike("username", format!("%{term}%"))
        .order("username", SortOrder::Asc)
        .limit(limit);
    decode_all(platform.select(&query).await?)
}

/// Profile fields to change. `None` leaves a field as is; an empty
/// `full_name`, `bio` or `avatar_url` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.full_name.is_none() && self.bio.is_none() && self.avatar_url.is_none()
    }
}

fn optional_text(value: &str) -> Value {
    match value.trim() {
        "" => Value::Null,
        text => Value::from(text),
    }
}

/// Validate `update` and turn it into a row patch.
pub fn validate_profile_update(update: &ProfileUpdate) -> ValidationResult<Row> {
    let mut issues = Vec::new();
    let mut patch = Row::new();

    if let Some(username) = &update.username {
        let username = username.trim().to_lowercase();
        if is_valid_username(&username) {
            patch.insert("username".to_string(), Value::from(username));
        } else {
            issues.push(ValidationIssue::new(
                "username",
                "validation.username",
                "Username must be 3 to 30 characters of a-z, 0-9, '_' or '.'.",
            ));
        }
    }
    if let Some(full_name) = &update.full_name {
        patch.insert("full_name".to_string(), optional_text(full_name));
    }
    if let Some(bio) = &update.bio {
        if bio.trim().chars().count() > MAX_BIO_LENGTH {
            issues.push(ValidationIssue::new(
                "bio",
                "validation.length",
                format!("Bio must be at most {MAX_BIO_LENGTH} characters."),
            ));
        } else {
            patch.insert("bio".to_string(), optional_text(bio));
        }
    }
    if let Some(avatar_url) = &update.avatar_url {
        patch.insert("avatar_url".to_string(), optional_text(avatar_url));
    }

    ValidationError::new(issues).into_result()?;
    Ok(patch)
}

/// Update the viewer's own profile.
pub async fn update_profile<P: Platform>(
    platform: &P,
    viewer: Option<&str>,
    update: &ProfileUpdate,
) -> Result<Profile, DataError> {
    let viewer = require_viewer(viewer)?;
    let patch = validate_profile_update(update)?;
    if patch.is_empty() {
        return get_profile_by_id(platform, viewer)
            .await?
            .ok_or_else(|| DataError::not_found("profile", viewer));
    }
    let updated = platform
        .update(&Query::from(Profile::TABLE).eq("id", viewer), patch)
        .await?;
    let profile: Profile = decode(first_row(updated, "profile", viewer)?)?;
    log::info!("updated profile {}", profile.username);
    Ok(profile)
}

/// Everything the profile screen shows for `username`.
pub async fn load_profile_aggregate<P: Platform>(
    platform: &P,
    viewer: Option<&str>,
    username: &str,
    page_size: usize,
) -> Result<ProfileAggregate, DataError> {
    let profile = get_profile_by_username(platform, username).await?;
    let user_id = profile.id.as_str();
    let page = FeedRequest::page(page_size, 0).for_user(user_id);

    let (posts, post_count, follower_count, following_count, is_following) = tokio::try_join!(
        get_feed(platform, viewer, &page),
        count_posts(platform, user_id),
        follows::follower_count(platform, user_id),
        follows::following_count(platform, user_id),
        follows::is_following(platform, viewer, user_id),
    )?;

    let is_own = viewer == Some(user_id);
    Ok(ProfileAggregate {
        profile,
        posts,
        post_count,
        follower_count,
        following_count,
        is_following,
        is_own,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_becomes_a_patch() {
        let update = ProfileUpdate {
            username: Some(" Jane.Doe ".to_string()),
            bio: Some("   ".to_string()),
            ..ProfileUpdate::default()
        };
        let patch = validate_profile_update(&update).expect("valid");
        assert_eq!(patch.get("username"), Some(&Value::from("jane.doe")));
        assert_eq!(patch.get("bio"), Some(&Value::Null));
        assert!(!patch.contains_key("full_name"));
    }

    #[test]
    fn invalid_fields_are_all_reported() {
        let update = ProfileUpdate {
            username: Some("no".to_string()),
            bio: Some("b".repeat(MAX_BIO_LENGTH + 1)),
            ..ProfileUpdate::default()
        };
        let err = validate_profile_update(&update).expect_err("invalid");
        let fields: Vec<&str> = err.issues.iter().map(|issue| issue.field.as_str()).collect();
        assert_eq!(fields, vec!["username", "bio"]);
    }
}
