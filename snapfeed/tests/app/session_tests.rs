use super::support::*;

#[tokio::test]
async fn sign_up_signs_in_and_caches_the_profile() {
    let app = app();
    let id = sign_up(&app, "ada").await;
    assert_eq!(app.viewer_id(), Some(id.clone()));
    let profile = app.session().profile().expect("profile cached");
    assert_eq!(profile.id, id);
    assert_eq!(profile.username, "ada");
}

#[tokio::test]
async fn wrong_password_keeps_the_viewer_signed_out() {
    let app = app();
    sign_up(&app, "ada").await;
    app.sign_out().await.expect("sign out");

    let err = app
        .sign_in(&Credentials::new(email("ada"), "not-the-password"))
        .await
        .expect_err("bad password");
    assert_eq!(err.user_message(), "Invalid email or password.");
    assert!(!app.session().is_signed_in());
    assert!(app.session().profile().is_none());
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let app = app();
    sign_up(&app, "ada").await;
    let err = app
        .sign_up(&SignUp::new("ADA@example.com", PASSWORD))
        .await
        .expect_err("duplicate");
    assert!(matches!(err, DataError::Platform(_)));
}

#[tokio::test]
async fn sign_up_rejects_a_malformed_username() {
    let app = app();
    let err = app
        .sign_up(&SignUp::new(email("hello"), PASSWORD).username("Hello World!"))
        .await
        .expect_err("malformed username");
    assert!(matches!(err, DataError::Platform(_)));
    assert!(!app.session().is_signed_in());
    assert!(app.platform().table_rows("profiles").is_empty());

    let session = app
        .sign_up(&SignUp::new(email("hello"), PASSWORD).username("Hello.World"))
        .await
        .expect("valid username after the rejected one");
    assert_eq!(app.session().profile().map(|p| p.username), Some("hello.world".to_string()));
    assert_eq!(app.viewer_id(), Some(session.user.id));
}

#[tokio::test]
async fn restore_adopts_the_platform_session() {
    let app = app();
    let id = sign_up(&app, "ada").await;
    app.session().reset();
    assert!(!app.session().is_signed_in());

    let restored = app.restore().await.expect("restore").expect("session");
    assert_eq!(restored.user.id, id);
    assert_eq!(app.session().profile().map(|p| p.username), Some("ada".to_string()));
}

#[tokio::test]
async fn clones_share_one_session() {
    let app = app();
    let other = app.clone();
    let id = sign_up(&app, "ada").await;
    assert_eq!(other.viewer_id(), Some(id));
    other.sign_out().await.expect("sign out");
    assert!(!app.session().is_signed_in());
}

#[tokio::test]
async fn sign_out_clears_local_state_even_when_the_platform_fails() {
    let app = app();
    sign_up(&app, "ada").await;
    app.platform().fail_next(RequestKind::Auth, "auth");
    assert!(app.sign_out().await.is_err());
    assert!(!app.session().is_signed_in());
    assert!(app.viewer_id().is_none());
}
