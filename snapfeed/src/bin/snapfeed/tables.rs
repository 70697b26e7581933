use colored::Colorize;
use comfy_table::{Cell, Table};
use snapfeed::{CommentWithAuthor, FeedPost, Profile, ProfileAggregate, ProfileSummary};

use crate::output::{GlobalOptions, TableDisplay, add_table_header, create_table};
use crate::theme::{ICONS, THEME};
use crate::utils::{format_datetime, truncate};

fn author_name(author: Option<&ProfileSummary>) -> String {
    author.map(|a| format!("@{}", a.username)).unwrap_or_else(|| "?".to_string())
}

fn like_cell(post: &FeedPost, options: &GlobalOptions) -> String {
    if !post.is_liked {
        return format!("{} {}", ICONS.empty_heart, post.likes_count);
    }
    if options.no_color {
        format!("{} {}", ICONS.heart, post.likes_count)
    } else {
        format!("{} {}", ICONS.heart.color(THEME.like), post.likes_count)
    }
}

impl TableDisplay for Vec<FeedPost> {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = create_table(options);
        add_table_header(&mut table, options, &["Post", "Author", "Caption", "Likes", "Comments", "Posted"]);
        if self.is_empty() {
            table.add_row(vec![Cell::new("No posts yet")]);
            return table;
        }
        for post in self {
            table.add_row(vec![
                Cell::new(post.id()),
                Cell::new(author_name(post.author.as_ref())),
                Cell::new(truncate(post.post.caption.as_deref().unwrap_or(""), 40)),
                Cell::new(like_cell(post, options)),
                Cell::new(post.comments_count),
                Cell::new(format_datetime(post.post.created_at)),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        self.iter().map(TableDisplay::to_compact).collect::<Vec<_>>().join("\n")
    }
}

impl TableDisplay for FeedPost {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = create_table(options);
        table.add_row(vec![Cell::new("Post"), Cell::new(self.id())]);
        table.add_row(vec![Cell::new("Author"), Cell::new(author_name(self.author.as_ref()))]);
        table.add_row(vec![Cell::new("Image"), Cell::new(&self.post.image_url)]);
        table.add_row(vec![Cell::new("Caption"), Cell::new(self.post.caption.as_deref().unwrap_or(""))]);
        table.add_row(vec![Cell::new("Likes"), Cell::new(like_cell(self, options))]);
        table.add_row(vec![Cell::new("Comments"), Cell::new(self.comments_count)]);
        table.add_row(vec![Cell::new("Posted"), Cell::new(format_datetime(self.post.created_at))]);
        table
    }

    fn to_compact(&self) -> String {
        format!(
            "{} {} likes={} comments={}",
            self.id(),
            author_name(self.author.as_ref()),
            self.likes_count,
            self.comments_count
        )
    }
}

impl TableDisplay for Vec<CommentWithAuthor> {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = create_table(options);
        add_table_header(&mut table, options, &["Comment", "Author", "Text", "Posted"]);
        if self.is_empty() {
            table.add_row(vec![Cell::new("No comments yet")]);
            return table;
        }
        for entry in self {
            table.add_row(vec![
                Cell::new(&entry.comment.id),
                Cell::new(author_name(entry.author.as_ref())),
                Cell::new(truncate(&entry.comment.content, 60)),
                Cell::new(format_datetime(entry.comment.created_at)),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        self.iter()
            .map(|entry| format!("{}: {}", author_name(entry.author.as_ref()), entry.comment.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl TableDisplay for Vec<Profile> {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = create_table(options);
        add_table_header(&mut table, options, &["Username", "Name", "Bio"]);
        if self.is_empty() {
            table.add_row(vec![Cell::new("No matching profiles")]);
            return table;
        }
        for profile in self {
            table.add_row(vec![
                Cell::new(format!("@{}", profile.username)),
                Cell::new(profile.full_name.as_deref().unwrap_or("")),
                Cell::new(truncate(profile.bio.as_deref().unwrap_or(""), 40)),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        self.iter().map(|p| p.username.as_str()).collect::<Vec<_>>().join(" ")
    }
}

impl TableDisplay for Profile {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = create_table(options);
        table.add_row(vec![Cell::new("Username"), Cell::new(format!("@{}", self.username))]);
        table.add_row(vec![Cell::new("Name"), Cell::new(self.full_name.as_deref().unwrap_or(""))]);
        table.add_row(vec![Cell::new("Bio"), Cell::new(self.bio.as_deref().unwrap_or(""))]);
        table.add_row(vec![Cell::new("Avatar"), Cell::new(self.avatar_url.as_deref().unwrap_or(""))]);
        table.add_row(vec![Cell::new("Id"), Cell::new(&self.id)]);
        table
    }

    fn to_compact(&self) -> String {
        format!("{} {}", self.username, self.id)
    }
}

impl TableDisplay for ProfileAggregate {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = self.profile.to_table(options);
        table.add_row(vec![Cell::new("Posts"), Cell::new(self.post_count)]);
        table.add_row(vec![Cell::new("Followers"), Cell::new(self.follower_count)]);
        table.add_row(vec![Cell::new("Following"), Cell::new(self.following_count)]);
        let relation = if self.is_own {
            "you"
        } else if self.is_following {
            "following"
        } else {
            "not following"
        };
        table.add_row(vec![Cell::new("Relation"), Cell::new(relation)]);
        table
    }

    fn to_compact(&self) -> String {
        format!(
            "{} posts={} followers={} following={}",
            self.profile.username, self.post_count, self.follower_count, self.following_count
        )
    }
}
