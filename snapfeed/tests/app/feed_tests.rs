use super::support::*;

#[tokio::test]
async fn feed_page_issues_a_fixed_number_of_requests() {
    let app = app().with_page_size(10);
    sign_up(&app, "ada").await;
    let mut ids = Vec::new();
    for index in 0..15 {
        ids.push(publish(&app, &format!("post {index}")).await.id);
    }
    sign_up(&app, "grace").await;
    for id in ids.iter().take(4) {
        like(&app, id).await;
        comment(&app, id, "nice").await;
    }

    let platform = app.platform();
    platform.clear_requests();
    let feed = app.feed();
    assert_eq!(feed.refresh().await.expect("refresh"), 10);
    assert_eq!(platform.requests().len(), 4);
    assert_eq!(platform.request_count(RequestKind::Select, "posts"), 1);
    assert_eq!(platform.request_count(RequestKind::Select, "likes"), 2);
    assert_eq!(platform.request_count(RequestKind::Select, "comments"), 1);

    app.sign_out().await.expect("sign out");
    platform.clear_requests();
    let anonymous = app.feed();
    anonymous.refresh().await.expect("refresh");
    assert_eq!(platform.requests().len(), 3);
    assert_eq!(platform.request_count(RequestKind::Select, "likes"), 1);
}

#[tokio::test]
async fn empty_page_costs_one_request() {
    let app = app();
    let feed = app.feed();
    assert_eq!(feed.refresh().await.expect("refresh"), 0);
    assert_eq!(app.platform().requests().len(), 1);
    assert!(feed.posts().is_empty());
    assert!(feed.is_exhausted());
    assert_eq!(feed.load_state(), LoadState::Ready);
}

#[tokio::test]
async fn feed_is_newest_first_with_counts_and_like_state() {
    let app = app();
    sign_up(&app, "ada").await;
    let first = publish(&app, "first").await.id;
    let second = publish(&app, "second").await.id;

    sign_up(&app, "grace").await;
    like(&app, &first).await;
    comment(&app, &second, "one").await;
    comment(&app, &second, "two").await;

    let feed = app.feed();
    feed.refresh().await.expect("refresh");
    let posts = feed.posts();
    let order: Vec<&str> = posts.iter().map(FeedPost::id).collect();
    assert_eq!(order, vec![second.as_str(), first.as_str()]);

    let liked = find(&posts, &first);
    assert!(liked.is_liked);
    assert_eq!(liked.likes_count, 1);
    assert_eq!(liked.comments_count, 0);
    let commented = find(&posts, &second);
    assert!(!commented.is_liked);
    assert_eq!(commented.comments_count, 2);
    assert_eq!(commented.author.as_ref().map(|a| a.username.as_str()), Some("ada"));

    app.sign_out().await.expect("sign out");
    let anonymous = app.feed();
    anonymous.refresh().await.expect("refresh");
    let posts = anonymous.posts();
    assert!(posts.iter().all(|post| !post.is_liked));
    assert_eq!(find(&posts, &first).likes_count, 1);
}

#[tokio::test]
async fn load_more_appends_until_exhausted() {
    let app = app().with_page_size(2);
    sign_up(&app, "ada").await;
    for index in 0..5 {
        publish(&app, &format!("post {index}")).await;
    }

    let feed = app.feed();
    assert_eq!(feed.refresh().await.expect("refresh"), 2);
    assert!(!feed.is_exhausted());
    assert_eq!(feed.load_more().await.expect("page 2"), 2);
    assert_eq!(feed.load_more().await.expect("page 3"), 1);
    assert!(feed.is_exhausted());
    assert_eq!(feed.posts().len(), 5);

    app.platform().clear_requests();
    assert_eq!(feed.load_more().await.expect("exhausted"), 0);
    assert!(app.platform().requests().is_empty());
}

#[tokio::test]
async fn user_feed_only_shows_that_author() {
    let app = app();
    let ada = sign_up(&app, "ada").await;
    publish(&app, "by ada").await;
    sign_up(&app, "grace").await;
    publish(&app, "by grace").await;

    let feed = app.user_feed(ada.clone());
    feed.refresh().await.expect("refresh");
    let posts = feed.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].post.user_id, ada);

    let page = data::get_feed(app.platform(), None, &FeedRequest::page(10, 0).for_user(ada.as_str()))
        .await
        .expect("feed");
    assert_eq!(page.len(), 1);
}

#[tokio::test]
async fn deleting_a_post_removes_it_with_its_likes_and_comments() {
    let app = app();
    sign_up(&app, "ada").await;
    let post = publish(&app, "gone soon").await.id;
    like(&app, &post).await;
    comment(&app, &post, "bye").await;

    let feed = app.feed();
    feed.refresh().await.expect("refresh");
    feed.delete_post(&post).await.expect("delete");
    assert!(feed.post(&post).is_none());
    assert!(app.platform().table_rows("likes").is_empty());
    assert!(app.platform().table_rows("comments").is_empty());
}

#[tokio::test]
async fn failed_delete_keeps_the_post_and_is_not_retried() {
    let app = app();
    sign_up(&app, "ada").await;
    let post = publish(&app, "stays").await.id;

    let feed = app.feed();
    feed.refresh().await.expect("refresh");
    app.platform().clear_requests();
    app.platform().fail_next(RequestKind::Delete, "posts");

    let err = feed.delete_post(&post).await.expect_err("injected failure");
    assert!(matches!(err, DataError::Platform(_)));
    assert!(feed.post(&post).is_some());
    assert!(feed.notice().is_some());
    assert_eq!(app.platform().request_count(RequestKind::Delete, "posts"), 1);
    assert_eq!(app.platform().table_rows("posts").len(), 1);
}

#[tokio::test]
async fn deleting_someone_elses_post_is_not_found() {
    let app = app();
    sign_up(&app, "ada").await;
    let post = publish(&app, "mine").await.id;
    sign_up(&app, "grace").await;

    let feed = app.feed();
    feed.refresh().await.expect("refresh");
    let err = feed.delete_post(&post).await.expect_err("not the owner");
    assert!(matches!(err, DataError::NotFound { what: "post", .. }));
    assert!(feed.post(&post).is_some());
}

#[tokio::test]
async fn post_detail_of_a_missing_post_is_gone() {
    let app = app();
    let detail = app.post_detail("missing");
    let err = detail.load().await.expect_err("no such post");
    assert!(matches!(err, DataError::NotFound { .. }));
    assert_eq!(detail.load_state(), LoadState::Gone);
    assert!(detail.post().is_none());
}

#[tokio::test]
async fn feed_follows_events_from_other_views() {
    let app = app();
    sign_up(&app, "ada").await;
    let post = publish(&app, "talk to me").await.id;

    let feed = app.feed();
    feed.refresh().await.expect("refresh");

    let thread = app.comments(post.as_str());
    thread.add("first").await.expect("comment");
    thread.add("second").await.expect("comment");
    assert_eq!(feed.apply_events(), 2);
    assert_eq!(feed.post(&post).map(|p| p.comments_count), Some(2));

    let composer = app.composer();
    composer.set_image("new.png", PNG.to_vec());
    composer.submit().await.expect("submit");
    assert!(!feed.has_new_posts());
    feed.apply_events();
    assert!(feed.has_new_posts());

    let detail = app.post_detail(post.as_str());
    detail.delete().await.expect("delete");
    assert_eq!(detail.load_state(), LoadState::Gone);
    feed.apply_events();
    assert!(feed.post(&post).is_none());
}
