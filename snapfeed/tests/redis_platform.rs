//! End-to-end checks against a live Redis (`REDIS_URL`, default
//! `redis://127.0.0.1/`). Run with `cargo test -- --ignored`.

use std::sync::atomic::{AtomicUsize, Ordering};

use snapfeed::{
    Credentials, DataError, Platform, RedisPlatform, SignUp, Snapfeed, ToggleOutcome, cleanup_pattern,
    id::generate_token, platform::CredentialHasher,
};

static NAMESPACE_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string())
}

async fn platform() -> RedisPlatform {
    let idx = NAMESPACE_COUNTER.fetch_add(1, Ordering::SeqCst);
    let prefix = format!("snapfeed_test_{idx}_{}", &generate_token()[..8]);
    RedisPlatform::connect(&redis_url(), prefix)
        .await
        .expect("redis connection")
        .with_hasher(CredentialHasher::fast())
}

async fn cleanup(platform: &RedisPlatform) {
    let mut conn = platform.connection();
    cleanup_pattern(&mut conn, &platform.keys().pattern())
        .await
        .expect("cleanup");
}

#[tokio::test]
#[ignore = "requires a running Redis"]
async fn feed_likes_and_comments_round_trip() {
    let app = Snapfeed::new(platform().await);
    app.sign_up(&SignUp::new("ada@example.com", "password1").username("ada"))
        .await
        .expect("sign up");

    let composer = app.composer();
    composer.set_image("a.png", vec![0x89, b'P', b'N', b'G']);
    composer.set_caption("from redis");
    let post = composer.submit().await.expect("submit").expect("post");

    let feed = app.feed();
    feed.refresh().await.expect("refresh");
    assert!(matches!(feed.toggle_like(&post.id).await, ToggleOutcome::Committed));
    app.comments(post.id.as_str()).add("hello").await.expect("comment");

    let reloaded = app.feed();
    reloaded.refresh().await.expect("refresh");
    let shown = reloaded.post(&post.id).expect("post shown");
    assert!(shown.is_liked);
    assert_eq!(shown.likes_count, 1);
    assert_eq!(shown.comments_count, 1);

    cleanup(app.platform()).await;
}

#[tokio::test]
#[ignore = "requires a running Redis"]
async fn sessions_survive_a_new_connection() {
    let first = platform().await;
    let session = first
        .sign_up(&SignUp::new("grace@example.com", "password1"))
        .await
        .expect("sign up");

    let second = RedisPlatform::from_connection(first.connection(), first.keys().prefix());
    let restored = second
        .restore_session(&session.access_token)
        .await
        .expect("restore")
        .expect("known token");
    assert_eq!(restored.user.id, session.user.id);
    assert!(second.restore_session("unknown").await.expect("restore").is_none());

    cleanup(&first).await;
}

#[tokio::test]
#[ignore = "requires a running Redis"]
async fn constraints_hold_on_redis() {
    let app = Snapfeed::new(platform().await);
    let ada = app
        .sign_up(&SignUp::new("ada@example.com", "password1").username("ada"))
        .await
        .expect("sign up")
        .user
        .id;

    let err = snapfeed::data::follows::follow(app.platform(), Some(&ada), &ada)
        .await
        .expect_err("self follow");
    assert!(matches!(err, DataError::SelfFollow));

    app.sign_out().await.expect("sign out");
    let err = app
        .sign_in(&Credentials::new("ada@example.com", "wrong"))
        .await
        .expect_err("wrong password");
    assert_eq!(err.user_message(), "Invalid email or password.");

    let duplicate = app
        .sign_up(&SignUp::new("someone@example.com", "password1").username("ADA"))
        .await;
    assert!(duplicate.is_err());

    cleanup(app.platform()).await;
}
