use super::support::*;
use snapfeed::data::storage::MAX_IMAGE_BYTES;

#[tokio::test]
async fn submit_uploads_creates_and_resets() {
    let app = app();
    let ada = sign_up(&app, "ada").await;
    let mut events = app.events().subscribe();

    let composer = app.composer();
    composer.set_image("Beach.PNG", PNG.to_vec());
    composer.set_caption("  Sunday swim  ");
    let post = composer.submit().await.expect("submit").expect("not in flight");

    assert_eq!(post.user_id, ada);
    assert_eq!(post.caption.as_deref(), Some("Sunday swim"));
    let prefix = format!("/posts/{ada}/");
    assert!(post.image_url.contains(&prefix), "{}", post.image_url);
    assert!(post.image_url.ends_with(".png"));
    assert_eq!(app.platform().request_count(RequestKind::Upload, "posts"), 1);
    assert_eq!(app.platform().request_count(RequestKind::Insert, "posts"), 1);

    assert!(!composer.has_image());
    assert!(composer.caption().is_empty());
    assert_eq!(
        events.drain(),
        vec![FeedEvent::PostCreated {
            post_id: post.id.clone()
        }]
    );
}

#[tokio::test]
async fn blank_caption_is_stored_as_none() {
    let app = app();
    sign_up(&app, "ada").await;
    let composer = app.composer();
    composer.set_image("a.jpg", PNG.to_vec());
    composer.set_caption("   ");
    let post = composer.submit().await.expect("submit").expect("not in flight");
    assert_eq!(post.caption, None);
}

#[tokio::test]
async fn invalid_images_are_rejected_locally() {
    let app = app();
    sign_up(&app, "ada").await;
    let composer = app.composer();
    app.platform().clear_requests();

    assert!(composer.validate().is_err());
    composer.set_image("notes.txt", PNG.to_vec());
    assert_eq!(composer.validate().expect_err("extension").issues[0].code, "validation.extension");
    composer.set_image("huge.png", vec![0; MAX_IMAGE_BYTES + 1]);
    assert_eq!(composer.validate().expect_err("size").issues[0].code, "validation.size");

    let err = composer.submit().await.expect_err("too large");
    assert!(matches!(err, DataError::Validation(_)));
    assert!(composer.has_image());
    assert!(composer.notice().is_some());
    assert!(app.platform().requests().is_empty());
}

#[tokio::test]
async fn overlong_caption_uploads_nothing() {
    let app = app();
    sign_up(&app, "ada").await;
    let composer = app.composer();
    composer.set_image("a.png", PNG.to_vec());
    composer.set_caption("x".repeat(2_201));
    app.platform().clear_requests();

    assert!(composer.submit().await.is_err());
    assert_eq!(mutations(&app), 0);
    assert_eq!(composer.caption().len(), 2_201);
}

#[tokio::test]
async fn signed_out_composer_uploads_nothing() {
    let app = app();
    let composer = app.composer();
    composer.set_image("a.png", PNG.to_vec());
    let err = composer.submit().await.expect_err("signed out");
    assert!(matches!(err, DataError::Unauthenticated));
    assert!(app.platform().requests().is_empty());
}

#[tokio::test]
async fn second_submit_while_in_flight_is_dropped() {
    let app = app();
    sign_up(&app, "ada").await;
    let composer = app.composer();
    composer.set_image("a.png", PNG.to_vec());

    let gate = app.platform().hold_mutations();
    let (first, ()) = tokio::join!(composer.submit(), async {
        tokio::task::yield_now().await;
        assert!(composer.is_submitting());
        assert!(matches!(composer.submit().await, Ok(None)));
        gate.release();
    });
    assert!(first.expect("submit").is_some());
    assert_eq!(app.platform().request_count(RequestKind::Upload, "posts"), 1);
    assert_eq!(app.platform().table_rows("posts").len(), 1);
}

#[tokio::test]
async fn failed_insert_keeps_the_form() {
    let app = app();
    sign_up(&app, "ada").await;
    let composer = app.composer();
    composer.set_image("a.png", PNG.to_vec());
    composer.set_caption("retry me");
    app.platform().fail_next(RequestKind::Insert, "posts");

    assert!(composer.submit().await.is_err());
    assert!(composer.has_image());
    assert_eq!(composer.caption(), "retry me");
    assert!(!composer.is_submitting());
}

#[tokio::test]
async fn retry_after_failed_insert_reuses_the_stored_image() {
    let app = app();
    sign_up(&app, "ada").await;
    let composer = app.composer();
    composer.set_image("a.png", PNG.to_vec());
    app.platform().fail_next(RequestKind::Insert, "posts");

    assert!(composer.submit().await.is_err());
    assert_eq!(app.platform().request_count(RequestKind::Upload, "posts"), 1);
    assert!(app.platform().table_rows("posts").is_empty());

    let post = composer.submit().await.expect("retry").expect("not in flight");
    assert_eq!(app.platform().request_count(RequestKind::Upload, "posts"), 1);
    assert!(post.image_url.ends_with(".png"));
    assert_eq!(app.platform().table_rows("posts").len(), 1);
}

#[tokio::test]
async fn new_image_after_failed_insert_is_uploaded() {
    let app = app();
    sign_up(&app, "ada").await;
    let composer = app.composer();
    composer.set_image("a.png", PNG.to_vec());
    app.platform().fail_next(RequestKind::Insert, "posts");
    assert!(composer.submit().await.is_err());

    composer.set_image("b.jpg", PNG.to_vec());
    let post = composer.submit().await.expect("submit").expect("not in flight");
    assert_eq!(app.platform().request_count(RequestKind::Upload, "posts"), 2);
    assert!(post.image_url.ends_with(".jpg"), "{}", post.image_url);
}
