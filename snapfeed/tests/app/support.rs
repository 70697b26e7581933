pub(crate) use snapfeed::{
    Credentials, DataError, FeedEvent, LoadState, MemoryPlatform, Platform, SignUp, Snapfeed, ToggleOutcome,
    data::{self, FeedRequest},
    models::{FeedPost, Post},
    platform::RequestKind,
};

pub(crate) const PASSWORD: &str = "password1";
pub(crate) const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

pub(crate) type App = Snapfeed<MemoryPlatform>;

pub(crate) fn app() -> App {
    Snapfeed::new(MemoryPlatform::new())
}

pub(crate) fn email(username: &str) -> String {
    format!("{username}@example.com")
}

/// Create an account and leave it signed in. Returns the account id.
pub(crate) async fn sign_up(app: &App, username: &str) -> String {
    app.sign_up(&SignUp::new(email(username), PASSWORD).username(username))
        .await
        .expect("sign up")
        .user
        .id
}

/// Switch the signed-in account. Returns the account id.
pub(crate) async fn sign_in(app: &App, username: &str) -> String {
    app.sign_in(&Credentials::new(email(username), PASSWORD))
        .await
        .expect("sign in")
        .user
        .id
}

/// Publish a post as the signed-in account without going through storage.
pub(crate) async fn publish(app: &App, caption: &str) -> Post {
    let viewer = app.viewer_id();
    data::posts::create_post(
        app.platform(),
        viewer.as_deref(),
        "http://localhost:54321/storage/v1/object/public/posts/x.png",
        Some(caption),
    )
    .await
    .expect("create post")
}

pub(crate) async fn like(app: &App, post_id: &str) {
    let viewer = app.viewer_id();
    data::likes::like_post(app.platform(), viewer.as_deref(), post_id)
        .await
        .expect("like post");
}

pub(crate) async fn comment(app: &App, post_id: &str, content: &str) {
    let viewer = app.viewer_id();
    data::comments::add_comment(app.platform(), viewer.as_deref(), post_id, content)
        .await
        .expect("add comment");
}

pub(crate) fn find<'a>(posts: &'a [FeedPost], post_id: &str) -> &'a FeedPost {
    posts
        .iter()
        .find(|post| post.id() == post_id)
        .unwrap_or_else(|| panic!("post {post_id} is in the feed"))
}

pub(crate) fn mutations(app: &App) -> usize {
    app.platform()
        .requests()
        .iter()
        .filter(|request| {
            matches!(
                request.kind,
                RequestKind::Insert | RequestKind::Update | RequestKind::Delete | RequestKind::Upload
            )
        })
        .count()
}
