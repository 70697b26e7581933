use super::support::*;
use snapfeed::{data::profiles, views::ProfileForm};

#[tokio::test]
async fn aggregate_collects_counts_posts_and_relationship() {
    let app = app();
    let ada = sign_up(&app, "ada").await;
    publish(&app, "one").await;
    publish(&app, "two").await;
    sign_up(&app, "grace").await;
    data::follows::follow(app.platform(), app.viewer_id().as_deref(), &ada)
        .await
        .expect("follow");
    sign_up(&app, "linus").await;

    let profile = app.profile();
    profile.load("ADA").await.expect("load");
    let aggregate = profile.aggregate().expect("loaded");
    assert_eq!(aggregate.profile.id, ada);
    assert_eq!(aggregate.post_count, 2);
    assert_eq!(aggregate.posts.len(), 2);
    assert_eq!(aggregate.follower_count, 1);
    assert_eq!(aggregate.following_count, 0);
    assert!(!aggregate.is_following);
    assert!(!aggregate.is_own);

    sign_in(&app, "grace").await;
    let profile = app.profile();
    profile.load("ada").await.expect("load");
    assert!(profile.aggregate().is_some_and(|a| a.is_following));

    let own = app.profile();
    own.load("grace").await.expect("load");
    let aggregate = own.aggregate().expect("loaded");
    assert!(aggregate.is_own);
    assert_eq!(aggregate.following_count, 1);
}

#[tokio::test]
async fn unknown_username_is_gone() {
    let app = app();
    let profile = app.profile();
    let err = profile.load("nobody").await.expect_err("unknown");
    assert!(matches!(err, DataError::NotFound { what: "profile", .. }));
    assert_eq!(profile.load_state(), LoadState::Gone);
    assert!(profile.aggregate().is_none());
    assert!(profile.toggle_follow().await.is_ignored());
}

#[tokio::test]
async fn search_matches_part_of_a_username() {
    let app = app();
    for name in ["jane", "janet", "bob"] {
        sign_up(&app, name).await;
    }
    let found = profiles::search_profiles(app.platform(), "JAN", 10).await.expect("search");
    let names: Vec<&str> = found.iter().map(|p| p.username.as_str()).collect();
    assert_eq!(names, vec!["jane", "janet"]);

    app.platform().clear_requests();
    let none = profiles::search_profiles(app.platform(), " % ", 10).await.expect("search");
    assert!(none.is_empty());
    assert!(app.platform().requests().is_empty());
}

#[tokio::test]
async fn editor_saves_and_refreshes_the_session_profile() {
    let app = app();
    let ada = sign_up(&app, "ada").await;

    let editor = app.profile_editor();
    assert_eq!(editor.form().username, "ada");
    editor.set_form(ProfileForm {
        username: "Ada.Lovelace".to_string(),
        full_name: "Ada Lovelace".to_string(),
        bio: "First programmer".to_string(),
    });
    editor.set_avatar("me.png", PNG.to_vec());

    let saved = editor.save().await.expect("save").expect("not in flight");
    assert_eq!(saved.username, "ada.lovelace");
    assert_eq!(saved.bio.as_deref(), Some("First programmer"));
    let avatar_path = format!("{ada}/avatar.png");
    assert_eq!(app.platform().object("avatars", &avatar_path), Some(PNG.to_vec()));
    assert!(saved.avatar_url.as_deref().is_some_and(|url| url.ends_with(&avatar_path)));

    let cached = app.session().profile().expect("cached profile");
    assert_eq!(cached.username, "ada.lovelace");
    assert!(!editor.is_saving());
}

#[tokio::test]
async fn invalid_profile_edit_never_reaches_the_platform() {
    let app = app();
    sign_up(&app, "ada").await;
    let editor = app.profile_editor();
    editor.set_form(ProfileForm {
        username: "no spaces allowed".to_string(),
        full_name: String::new(),
        bio: "x".repeat(151),
    });
    editor.set_avatar("me.png", PNG.to_vec());
    app.platform().clear_requests();

    let err = editor.save().await.expect_err("invalid");
    let DataError::Validation(validation) = err else {
        panic!("expected a validation error");
    };
    let fields: Vec<&str> = validation.issues.iter().map(|issue| issue.field.as_str()).collect();
    assert_eq!(fields, vec!["username", "bio"]);
    assert_eq!(mutations(&app), 0);
    assert!(editor.notice().is_some());
    assert_eq!(app.session().profile().map(|p| p.username), Some("ada".to_string()));
}

#[tokio::test]
async fn taken_username_is_a_platform_error() {
    let app = app();
    sign_up(&app, "ada").await;
    sign_up(&app, "grace").await;

    let update = profiles::ProfileUpdate {
        username: Some("ADA".to_string()),
        ..Default::default()
    };
    let err = profiles::update_profile(app.platform(), app.viewer_id().as_deref(), &update)
        .await
        .expect_err("taken");
    assert!(matches!(err, DataError::Platform(_)));
    assert_eq!(err.user_message(), "Something went wrong. Please try again.");
}
