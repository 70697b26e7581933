use super::support::*;

#[tokio::test]
async fn like_flips_before_the_platform_answers() {
    let app = app();
    sign_up(&app, "ada").await;
    let post = publish(&app, "hold on").await.id;
    let feed = app.feed();
    feed.refresh().await.expect("refresh");

    let gate = app.platform().hold_mutations();
    let (outcome, ()) = tokio::join!(feed.toggle_like(&post), async {
        tokio::task::yield_now().await;
        let shown = feed.post(&post).expect("post shown");
        assert!(shown.is_liked);
        assert_eq!(shown.likes_count, 1);
        assert!(feed.is_pending(&post));
        assert!(feed.toggle_like(&post).await.is_ignored());
        gate.release();
    });

    assert!(outcome.is_committed(), "{outcome:?}");
    assert!(!feed.is_pending(&post));
    assert_eq!(app.platform().request_count(RequestKind::Insert, "likes"), 1);
    assert_eq!(app.platform().table_rows("likes").len(), 1);
}

#[tokio::test]
async fn failed_like_restores_the_exact_prior_state() {
    let app = app();
    sign_up(&app, "ada").await;
    let post = publish(&app, "popular").await.id;
    for fan in ["grace", "linus", "barbara"] {
        sign_up(&app, fan).await;
        like(&app, &post).await;
    }

    let feed = app.feed();
    feed.refresh().await.expect("refresh");
    let before = feed.post(&post).expect("post shown");
    assert!(before.is_liked);
    assert_eq!(before.likes_count, 3);

    app.platform().fail_next(RequestKind::Delete, "likes");
    let outcome = feed.toggle_like(&post).await;
    assert!(matches!(outcome, ToggleOutcome::Reverted(DataError::Platform(_))));
    assert_eq!(feed.post(&post), Some(before));
    assert!(feed.notice().is_some());
    assert_eq!(app.platform().table_rows("likes").len(), 3);

    let outcome = feed.toggle_like(&post).await;
    assert!(outcome.is_committed());
    let after = feed.post(&post).expect("post shown");
    assert!(!after.is_liked);
    assert_eq!(after.likes_count, 2);
}

#[tokio::test]
async fn signed_out_like_reverts_without_a_request() {
    let app = app();
    sign_up(&app, "ada").await;
    let post = publish(&app, "look").await.id;
    app.sign_out().await.expect("sign out");

    let feed = app.feed();
    feed.refresh().await.expect("refresh");
    app.platform().clear_requests();

    let outcome = feed.toggle_like(&post).await;
    assert!(matches!(outcome, ToggleOutcome::Reverted(DataError::Unauthenticated)));
    assert_eq!(mutations(&app), 0);
    let shown = feed.post(&post).expect("post shown");
    assert!(!shown.is_liked);
    assert_eq!(shown.likes_count, 0);
}

#[tokio::test]
async fn detail_like_uses_the_same_toggle() {
    let app = app();
    sign_up(&app, "ada").await;
    let post = publish(&app, "detail").await.id;

    let detail = app.post_detail(post.as_str());
    detail.load().await.expect("load");
    app.platform().fail_next(RequestKind::Insert, "likes");
    assert!(detail.toggle_like().await.error().is_some());
    assert_eq!(detail.post().map(|p| (p.is_liked, p.likes_count)), Some((false, 0)));

    assert!(detail.toggle_like().await.is_committed());
    assert_eq!(detail.post().map(|p| (p.is_liked, p.likes_count)), Some((true, 1)));
}

#[tokio::test]
async fn following_yourself_never_reaches_the_platform() {
    let app = app();
    let ada = sign_up(&app, "ada").await;

    let profile = app.profile();
    profile.load("ada").await.expect("load");
    assert!(profile.aggregate().is_some_and(|a| a.is_own));
    app.platform().clear_requests();

    let outcome = profile.toggle_follow().await;
    assert!(matches!(outcome, ToggleOutcome::Reverted(DataError::SelfFollow)));
    assert!(app.platform().requests().is_empty());
    let aggregate = profile.aggregate().expect("still loaded");
    assert!(!aggregate.is_following);
    assert_eq!(aggregate.follower_count, 0);
    assert!(profile.notice().is_some());

    let err = data::follows::follow(app.platform(), Some(&ada), &ada)
        .await
        .expect_err("self follow");
    assert!(matches!(err, DataError::SelfFollow));
    assert!(app.platform().requests().is_empty());
    assert!(app.platform().table_rows("follows").is_empty());
}

#[tokio::test]
async fn follow_toggle_commits_and_reverts() {
    let app = app();
    sign_up(&app, "ada").await;
    sign_up(&app, "grace").await;

    let profile = app.profile();
    profile.load("ada").await.expect("load");
    assert!(profile.toggle_follow().await.is_committed());
    let aggregate = profile.aggregate().expect("loaded");
    assert!(aggregate.is_following);
    assert_eq!(aggregate.follower_count, 1);

    app.platform().fail_next(RequestKind::Delete, "follows");
    assert!(profile.toggle_follow().await.error().is_some());
    let aggregate = profile.aggregate().expect("loaded");
    assert!(aggregate.is_following);
    assert_eq!(aggregate.follower_count, 1);
    assert_eq!(app.platform().table_rows("follows").len(), 1);
}

#[tokio::test]
async fn follow_toggle_ignores_taps_while_in_flight() {
    let app = app();
    sign_up(&app, "ada").await;
    sign_up(&app, "grace").await;
    let profile = app.profile();
    profile.load("ada").await.expect("load");

    let gate = app.platform().hold_mutations();
    let (outcome, ()) = tokio::join!(profile.toggle_follow(), async {
        tokio::task::yield_now().await;
        assert!(profile.is_follow_pending());
        assert!(profile.toggle_follow().await.is_ignored());
        gate.release();
    });
    assert!(outcome.is_committed());
    assert_eq!(app.platform().request_count(RequestKind::Insert, "follows"), 1);
}

#[tokio::test]
async fn refresh_keeps_a_like_that_is_in_flight() {
    let app = app();
    sign_up(&app, "ada").await;
    let post = publish(&app, "hold on").await.id;
    let feed = app.feed();
    feed.refresh().await.expect("refresh");

    let gate = app.platform().hold_mutations();
    let (outcome, ()) = tokio::join!(feed.toggle_like(&post), async {
        tokio::task::yield_now().await;
        feed.refresh().await.expect("refresh while liking");
        assert!(feed.is_pending(&post));
        let shown = feed.post(&post).expect("post shown");
        assert_eq!((shown.is_liked, shown.likes_count), (true, 1));
        assert!(feed.toggle_like(&post).await.is_ignored());
        gate.release();
    });

    assert!(outcome.is_committed(), "{outcome:?}");
    assert!(!feed.is_pending(&post));
    assert_eq!(app.platform().request_count(RequestKind::Insert, "likes"), 1);
    let shown = feed.post(&post).expect("post shown");
    assert_eq!((shown.is_liked, shown.likes_count), (true, 1));
}

#[tokio::test]
async fn failed_like_reverts_after_a_refresh() {
    let app = app();
    sign_up(&app, "ada").await;
    let post = publish(&app, "hold on").await.id;
    let feed = app.feed();
    feed.refresh().await.expect("refresh");

    app.platform().fail_next(RequestKind::Insert, "likes");
    let gate = app.platform().hold_mutations();
    let (outcome, ()) = tokio::join!(feed.toggle_like(&post), async {
        tokio::task::yield_now().await;
        feed.refresh().await.expect("refresh while liking");
        gate.release();
    });

    assert!(outcome.error().is_some(), "{outcome:?}");
    let shown = feed.post(&post).expect("post shown");
    assert_eq!((shown.is_liked, shown.likes_count), (false, 0));
    assert!(app.platform().table_rows("likes").is_empty());
}

#[tokio::test]
async fn detail_reload_keeps_a_like_that_is_in_flight() {
    let app = app();
    sign_up(&app, "ada").await;
    let post = publish(&app, "detail").await.id;
    let detail = app.post_detail(post.as_str());
    detail.load().await.expect("load");

    let gate = app.platform().hold_mutations();
    let (outcome, ()) = tokio::join!(detail.toggle_like(), async {
        tokio::task::yield_now().await;
        detail.load().await.expect("reload while liking");
        assert_eq!(detail.post().map(|p| (p.is_liked, p.likes_count)), Some((true, 1)));
        assert!(detail.toggle_like().await.is_ignored());
        gate.release();
    });

    assert!(outcome.is_committed(), "{outcome:?}");
    assert_eq!(app.platform().request_count(RequestKind::Insert, "likes"), 1);
    assert_eq!(detail.post().map(|p| (p.is_liked, p.likes_count)), Some((true, 1)));
}

#[tokio::test]
async fn profile_reload_keeps_a_follow_that_is_in_flight() {
    let app = app();
    sign_up(&app, "ada").await;
    sign_up(&app, "grace").await;
    let profile = app.profile();
    profile.load("ada").await.expect("load");

    let gate = app.platform().hold_mutations();
    let (outcome, ()) = tokio::join!(profile.toggle_follow(), async {
        tokio::task::yield_now().await;
        profile.load("ada").await.expect("reload while following");
        assert!(profile.is_follow_pending());
        assert!(profile.toggle_follow().await.is_ignored());
        gate.release();
    });

    assert!(outcome.is_committed(), "{outcome:?}");
    assert_eq!(app.platform().request_count(RequestKind::Insert, "follows"), 1);
    let aggregate = profile.aggregate().expect("loaded");
    assert!(aggregate.is_following);
    assert_eq!(aggregate.follower_count, 1);
}

#[tokio::test]
async fn follow_in_flight_does_not_touch_the_next_profile() {
    let app = app();
    sign_up(&app, "ada").await;
    sign_up(&app, "linus").await;
    sign_up(&app, "grace").await;
    let profile = app.profile();
    profile.load("ada").await.expect("load");

    let gate = app.platform().hold_mutations();
    let (outcome, ()) = tokio::join!(profile.toggle_follow(), async {
        tokio::task::yield_now().await;
        profile.load("linus").await.expect("open another profile");
        assert!(!profile.is_follow_pending());
        gate.release();
    });

    assert!(outcome.is_committed(), "{outcome:?}");
    let aggregate = profile.aggregate().expect("loaded");
    assert_eq!(aggregate.profile.username, "linus");
    assert!(!aggregate.is_following);
    assert_eq!(aggregate.follower_count, 0);
    assert_eq!(app.platform().table_rows("follows").len(), 1);
}
