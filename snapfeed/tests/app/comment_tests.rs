use super::support::*;

fn contents(thread: &snapfeed::views::CommentThread<MemoryPlatform>) -> Vec<String> {
    thread.comments().into_iter().map(|entry| entry.comment.content).collect()
}

#[tokio::test]
async fn comments_read_in_creation_order() {
    let app = app();
    sign_up(&app, "ada").await;
    let post = publish(&app, "thread").await.id;

    let thread = app.comments(post.as_str());
    assert_eq!(thread.load().await.expect("load"), 0);
    for text in ["A", "B", "C"] {
        thread.add(text).await.expect("add");
    }
    assert_eq!(contents(&thread), vec!["A", "B", "C"]);

    let fresh = app.comments(post.as_str());
    fresh.load().await.expect("load");
    assert_eq!(contents(&fresh), vec!["A", "B", "C"]);
    let author = fresh.comments()[0].author.clone().expect("author embedded");
    assert_eq!(author.username, "ada");
}

#[tokio::test]
async fn blank_comment_is_rejected_before_any_request() {
    let app = app();
    sign_up(&app, "ada").await;
    let post = publish(&app, "quiet").await.id;
    let thread = app.comments(post.as_str());
    app.platform().clear_requests();

    let err = thread.add("   \n ").await.expect_err("blank");
    assert!(matches!(err, DataError::Validation(_)));
    assert!(app.platform().requests().is_empty());
    assert!(thread.is_empty());
    assert!(thread.notice().is_some());
}

#[tokio::test]
async fn comment_content_is_trimmed() {
    let app = app();
    sign_up(&app, "ada").await;
    let post = publish(&app, "tidy").await.id;
    let thread = app.comments(post.as_str());
    let added = thread.add("  hello  ").await.expect("add");
    assert_eq!(added.comment.content, "hello");
}

#[tokio::test]
async fn failed_comment_delete_keeps_the_comment() {
    let app = app();
    sign_up(&app, "ada").await;
    let post = publish(&app, "keep").await.id;
    let thread = app.comments(post.as_str());
    let added = thread.add("still here").await.expect("add");

    app.platform().clear_requests();
    app.platform().fail_next(RequestKind::Delete, "comments");
    thread.delete(&added.comment.id).await.expect_err("injected failure");
    assert_eq!(thread.len(), 1);
    assert!(thread.notice().is_some());
    assert_eq!(app.platform().request_count(RequestKind::Delete, "comments"), 1);

    thread.delete(&added.comment.id).await.expect("delete");
    assert!(thread.is_empty());
}

#[tokio::test]
async fn only_the_author_can_delete_a_comment() {
    let app = app();
    sign_up(&app, "ada").await;
    let post = publish(&app, "mine").await.id;
    let thread = app.comments(post.as_str());
    let added = thread.add("by ada").await.expect("add");

    sign_up(&app, "grace").await;
    let err = thread.delete(&added.comment.id).await.expect_err("not the author");
    assert!(matches!(err, DataError::NotFound { what: "comment", .. }));
    assert_eq!(thread.len(), 1);
}

#[tokio::test]
async fn detail_count_follows_the_thread() {
    let app = app();
    sign_up(&app, "ada").await;
    let post = publish(&app, "count me").await.id;

    let detail = app.post_detail(post.as_str());
    detail.load().await.expect("load");
    assert_eq!(detail.post().map(|p| p.comments_count), Some(0));
    detail.comments().add("one").await.expect("add");
    assert_eq!(detail.post().map(|p| p.comments_count), Some(1));
}
