use anyhow::Result;
use clap::Args;
use snapfeed::{Platform, Snapfeed, data::profiles};

use super::report;
use crate::examples::ExampleGroup;
use crate::output::OutputManager;

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Home feed",
        commands: &[
            "snapfeed feed                     # Newest posts first",
            "snapfeed feed --pages 3           # First three pages",
        ],
    },
    ExampleGroup {
        title: "One author",
        commands: &["snapfeed feed --user jane"],
    },
];

#[derive(Args)]
pub struct FeedArgs {
    /// Only posts by this username
    #[arg(long)]
    pub user: Option<String>,

    /// Number of pages to load
    #[arg(long, default_value_t = 1)]
    pub pages: usize,
}

pub async fn handle_feed<P: Platform>(app: &Snapfeed<P>, args: FeedArgs, output: &OutputManager) -> Result<()> {
    let view = match &args.user {
        Some(username) => {
            let profile = profiles::get_profile_by_username(app.platform(), username)
                .await
                .map_err(|err| report(output, err))?;
            app.user_feed(profile.id)
        }
        None => app.feed(),
    };

    output.progress("Loading feed");
    let loaded = view.refresh().await;
    output.clear_line();
    loaded.map_err(|err| report(output, err))?;

    for _ in 1..args.pages {
        if view.is_exhausted() {
            break;
        }
        view.load_more().await.map_err(|err| report(output, err))?;
    }

    let posts = view.posts();
    output.display(&posts)?;
    if !view.is_exhausted() {
        output.info(&format!("More posts available; try --pages {}", args.pages + 1));
    }
    Ok(())
}
