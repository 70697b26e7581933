use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use snapfeed::{LoadState, Platform, Snapfeed, ToggleOutcome, data::profiles, views::ProfileForm};

use super::{report, require_viewer};
use crate::examples::ExampleGroup;
use crate::output::OutputManager;

pub const FOLLOW_EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Following",
    commands: &["snapfeed follow jane", "snapfeed unfollow jane"],
}];

pub const PROFILE_EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "View",
        commands: &[
            "snapfeed profile show             # Your own profile",
            "snapfeed profile show jane",
        ],
    },
    ExampleGroup {
        title: "Edit",
        commands: &[
            "snapfeed profile edit --bio 'Coffee and film cameras'",
            "snapfeed profile edit --username jane.doe --avatar ./me.png",
        ],
    },
];

pub const SEARCH_EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Find people",
    commands: &["snapfeed search jan", "snapfeed search doe --limit 5"],
}];

#[derive(Args)]
pub struct UsernameArgs {
    /// Username
    pub username: String,
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Show a profile (yours when no username is given)
    #[command(name = "show")]
    Show {
        /// Username
        username: Option<String>,
    },

    /// Edit your profile
    #[command(name = "edit")]
    Edit {
        /// New username (3-30 of a-z, 0-9, '_' and '.')
        #[arg(long)]
        username: Option<String>,

        /// Display name (empty to clear)
        #[arg(long)]
        full_name: Option<String>,

        /// Bio, at most 150 characters (empty to clear)
        #[arg(long)]
        bio: Option<String>,

        /// Avatar image file
        #[arg(long)]
        avatar: Option<PathBuf>,
    },
}

#[derive(Args)]
pub struct SearchArgs {
    /// Part of a username
    pub term: String,

    /// Maximum number of results
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

/// Bring the follow edge to `username` to `following`.
pub async fn handle_follow<P: Platform>(
    app: &Snapfeed<P>,
    args: UsernameArgs,
    following: bool,
    output: &OutputManager,
) -> Result<()> {
    require_viewer(app, output)?;
    let view = app.profile();
    view.load(&args.username).await.map_err(|err| report(output, err))?;

    let current = view.aggregate().is_some_and(|aggregate| aggregate.is_following);
    if current == following {
        output.info(if following { "Already following." } else { "Not following." });
        return Ok(());
    }

    match view.toggle_follow().await {
        ToggleOutcome::Committed => {
            let verb = if following { "Following" } else { "Unfollowed" };
            output.success(&format!("{verb} @{}", args.username));
            Ok(())
        }
        ToggleOutcome::Reverted(err) => Err(report(output, err)),
        ToggleOutcome::Ignored => {
            output.warning("A follow change is already in flight.");
            Ok(())
        }
    }
}

pub async fn handle_profile_commands<P: Platform>(
    app: &Snapfeed<P>,
    command: ProfileCommands,
    output: &OutputManager,
) -> Result<()> {
    match command {
        ProfileCommands::Show { username } => {
            let username = match username {
                Some(username) => username,
                None => {
                    require_viewer(app, output)?;
                    app.session()
                        .profile()
                        .map(|profile| profile.username)
                        .context("Signed-in account has no profile")?
                }
            };
            let view = app.profile();
            if let Err(err) = view.load(&username).await {
                if view.load_state() == LoadState::Gone {
                    output.error(&format!("No user named @{username}."));
                    return Err(err.into());
                }
                return Err(report(output, err));
            }
            if let Some(aggregate) = view.aggregate() {
                output.display(&aggregate)?;
                output.heading("Recent posts");
                output.display(&aggregate.posts)?;
            }
            Ok(())
        }
        ProfileCommands::Edit {
            username,
            full_name,
            bio,
            avatar,
        } => {
            require_viewer(app, output)?;
            let editor = app.profile_editor();
            let current = editor.form();
            editor.set_form(ProfileForm {
                username: username.unwrap_or(current.username),
                full_name: full_name.unwrap_or(current.full_name),
                bio: bio.unwrap_or(current.bio),
            });
            if let Some(path) = avatar {
                let bytes = std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
                let file_name = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .context("Avatar path has no file name")?
                    .to_string();
                editor.set_avatar(file_name, bytes);
            }

            match editor.save().await.map_err(|err| report(output, err))? {
                Some(profile) => {
                    output.success("Profile saved.");
                    output.display(&profile)?;
                }
                None => output.warning("A save is already in progress."),
            }
            Ok(())
        }
    }
}

pub async fn handle_search<P: Platform>(app: &Snapfeed<P>, args: SearchArgs, output: &OutputManager) -> Result<()> {
    let found = profiles::search_profiles(app.platform(), &args.term, args.limit)
        .await
        .map_err(|err| report(output, err))?;
    output.display(&found)
}
