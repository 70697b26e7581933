use anyhow::{Context, Result};
use clap::Args;
use snapfeed::{
    MemoryPlatform, Snapfeed, ToggleOutcome,
    platform::{RequestKind, SignUp},
};

use crate::examples::ExampleGroup;
use crate::output::OutputManager;

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Guided tour",
    commands: &[
        "snapfeed demo                     # Two accounts, posts, likes, comments",
        "snapfeed demo --posts 5 --output json",
    ],
}];

/// Smallest valid PNG, used as the demo image.
const PIXEL_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, 0x00, 0x00, 0x00,
    0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49,
    0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00,
    0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

#[derive(Args)]
pub struct DemoArgs {
    /// Number of posts the demo author publishes
    #[arg(long, default_value_t = 3)]
    pub posts: usize,
}

/// Walk through the app against an in-memory platform.
pub async fn handle_demo(args: DemoArgs, output: &OutputManager) -> Result<()> {
    let app = Snapfeed::new(MemoryPlatform::new()).with_page_size(args.posts.max(1));
    let feed = app.feed();

    output.heading("Accounts");
    app.sign_up(&SignUp::new("ada@example.com", "lovelace").username("ada").full_name("Ada"))
        .await?;
    let ada = app.viewer_id().context("sign-up leaves the account signed in")?;
    output.success("Signed up @ada");

    output.heading("Posts");
    let composer = app.composer();
    let mut first_post = None;
    for index in 1..=args.posts.max(1) {
        composer.set_image(format!("photo-{index}.png"), PIXEL_PNG.to_vec());
        composer.set_caption(format!("Photo number {index}"));
        if let Some(post) = composer.submit().await? {
            output.bullet(&format!("{} {}", post.id, post.caption.as_deref().unwrap_or("")));
            first_post.get_or_insert(post.id);
        }
    }
    let post_id = first_post.context("at least one post is published")?;

    app.sign_up(&SignUp::new("grace@example.com", "hopper").username("grace"))
        .await?;
    output.success("Signed up @grace");

    output.heading("Likes and comments from @grace");
    feed.refresh().await?;
    match feed.toggle_like(&post_id).await {
        ToggleOutcome::Committed => output.success("Liked the first post"),
        other => output.warning(&format!("Like did not stick: {other:?}")),
    }
    let thread = app.comments(post_id.as_str());
    thread.load().await?;
    for text in ["Lovely light", "Where is this?"] {
        thread.add(text).await?;
    }
    output.success(&format!("{} comments on the first post", thread.len()));

    let applied = feed.apply_events();
    output.verbose(&format!("Feed applied {applied} events"));

    output.heading("A failed like");
    app.platform().fail_next(RequestKind::Delete, "likes");
    if let ToggleOutcome::Reverted(err) = feed.toggle_like(&post_id).await {
        output.warning(&format!("Unlike reverted: {}", err.user_message()));
    }

    output.heading("Following");
    let profile = app.profile();
    profile.load("ada").await?;
    profile.toggle_follow().await;
    if let Some(aggregate) = profile.aggregate() {
        output.key_value("@ada followers", &aggregate.follower_count.to_string());
    }
    output.verbose(&format!("@ada is {ada}"));

    output.heading("Feed");
    output.display(&feed.posts())?;

    output.info(&format!(
        "{} requests issued against the in-memory platform",
        app.platform().requests().len()
    ));
    Ok(())
}
