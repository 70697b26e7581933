use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use snapfeed::{DataError, LoadState, Platform, Snapfeed, ToggleOutcome};

use super::{report, require_viewer};
use crate::examples::ExampleGroup;
use crate::output::OutputManager;
use crate::utils::format_file_size;

pub const POST_EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Publish",
        commands: &["snapfeed post create ./beach.jpg --caption 'Sunday swim'"],
    },
    ExampleGroup {
        title: "Inspect and remove",
        commands: &[
            "snapfeed post show <post-id>      # Post with its comments",
            "snapfeed post delete <post-id>",
        ],
    },
];

pub const LIKE_EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Likes",
    commands: &["snapfeed like <post-id>", "snapfeed unlike <post-id>"],
}];

pub const COMMENT_EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Comments",
    commands: &[
        "snapfeed comments <post-id>",
        "snapfeed comment add <post-id> 'Great shot!'",
        "snapfeed comment delete <post-id> <comment-id>",
    ],
}];

#[derive(Subcommand)]
pub enum PostCommands {
    /// Show a post with its comments
    #[command(name = "show")]
    Show {
        /// Post id
        post_id: String,
    },

    /// Upload an image and publish it
    #[command(name = "create")]
    Create {
        /// Image file (jpg, jpeg, png, gif, webp; at most 10 MB)
        image: PathBuf,

        /// Caption
        #[arg(long)]
        caption: Option<String>,
    },

    /// Delete one of your posts
    #[command(name = "delete")]
    Delete {
        /// Post id
        post_id: String,
    },
}

#[derive(Subcommand)]
pub enum CommentCommands {
    /// Comment on a post
    #[command(name = "add")]
    Add {
        /// Post id
        post_id: String,
        /// Comment text
        text: String,
    },

    /// Delete one of your comments
    #[command(name = "delete")]
    Delete {
        /// Post id
        post_id: String,
        /// Comment id
        comment_id: String,
    },
}

#[derive(Args)]
pub struct PostIdArgs {
    /// Post id
    pub post_id: String,
}

pub async fn handle_post_commands<P: Platform>(
    app: &Snapfeed<P>,
    command: PostCommands,
    output: &OutputManager,
) -> Result<()> {
    match command {
        PostCommands::Show { post_id } => show_post(app, &post_id, output).await,
        PostCommands::Create { image, caption } => create_post(app, image, caption, output).await,
        PostCommands::Delete { post_id } => {
            require_viewer(app, output)?;
            let detail = app.post_detail(post_id.as_str());
            detail.delete().await.map_err(|err| report(output, err))?;
            output.success(&format!("Deleted post {post_id}"));
            Ok(())
        }
    }
}

async fn show_post<P: Platform>(app: &Snapfeed<P>, post_id: &str, output: &OutputManager) -> Result<()> {
    let detail = app.post_detail(post_id);
    if let Err(err) = detail.load().await {
        if detail.load_state() == LoadState::Gone {
            output.error(&format!("Post {post_id} does not exist."));
            return Err(err.into());
        }
        return Err(report(output, err));
    }
    if let Some(post) = detail.post() {
        output.display(&post)?;
    }
    output.heading("Comments");
    output.display(&detail.comments().comments())?;
    Ok(())
}

async fn create_post<P: Platform>(
    app: &Snapfeed<P>,
    image: PathBuf,
    caption: Option<String>,
    output: &OutputManager,
) -> Result<()> {
    require_viewer(app, output)?;
    let bytes = std::fs::read(&image).with_context(|| format!("Failed to read {}", image.display()))?;
    let file_name = image
        .file_name()
        .and_then(|name| name.to_str())
        .context("Image path has no file name")?
        .to_string();
    output.verbose(&format!("{file_name}: {}", format_file_size(bytes.len() as u64)));

    let composer = app.composer();
    composer.set_image(file_name, bytes);
    composer.set_caption(caption.unwrap_or_default());
    if let Err(err) = composer.validate() {
        return Err(report(output, DataError::from(err)));
    }

    output.progress("Uploading");
    let result = composer.submit().await;
    output.clear_line();
    match result.map_err(|err| report(output, err))? {
        Some(post) => {
            output.success(&format!("Published post {}", post.id));
            output.key_value("Image", &post.image_url);
        }
        None => output.warning("A post is already being published."),
    }
    Ok(())
}

/// Bring the like on `post_id` to `liked`.
pub async fn handle_like<P: Platform>(
    app: &Snapfeed<P>,
    args: PostIdArgs,
    liked: bool,
    output: &OutputManager,
) -> Result<()> {
    require_viewer(app, output)?;
    let detail = app.post_detail(args.post_id.as_str());
    detail.load().await.map_err(|err| report(output, err))?;

    let current = detail.post().is_some_and(|post| post.is_liked);
    if current == liked {
        output.info(if liked { "Already liked." } else { "Not liked." });
        return Ok(());
    }

    match detail.toggle_like().await {
        ToggleOutcome::Committed => {
            let likes = detail.post().map(|post| post.likes_count).unwrap_or_default();
            output.success(&format!("{} ({likes} likes)", if liked { "Liked" } else { "Unliked" }));
            Ok(())
        }
        ToggleOutcome::Reverted(err) => Err(report(output, err)),
        ToggleOutcome::Ignored => {
            output.warning("A like change is already in flight.");
            Ok(())
        }
    }
}

pub async fn handle_comments<P: Platform>(app: &Snapfeed<P>, args: PostIdArgs, output: &OutputManager) -> Result<()> {
    let thread = app.comments(args.post_id);
    thread.load().await.map_err(|err| report(output, err))?;
    output.display(&thread.comments())
}

pub async fn handle_comment_commands<P: Platform>(
    app: &Snapfeed<P>,
    command: CommentCommands,
    output: &OutputManager,
) -> Result<()> {
    require_viewer(app, output)?;
    match command {
        CommentCommands::Add { post_id, text } => {
            let thread = app.comments(post_id);
            let comment = thread.add(&text).await.map_err(|err| report(output, err))?;
            output.success(&format!("Comment {} added", comment.comment.id));
        }
        CommentCommands::Delete { post_id, comment_id } => {
            let thread = app.comments(post_id);
            thread.delete(&comment_id).await.map_err(|err| report(output, err))?;
            output.success(&format!("Comment {comment_id} deleted"));
        }
    }
    Ok(())
}
