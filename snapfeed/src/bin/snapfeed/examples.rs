use crate::commands::{account, demo, feed, post, social};

#[derive(Clone, Copy)]
pub struct ExampleGroup {
    pub title: &'static str,
    pub commands: &'static [&'static str],
}

#[derive(Clone, Copy)]
pub struct CommandExample {
    pub name: &'static str,
    pub groups: &'static [ExampleGroup],
}

pub fn command_examples() -> &'static [CommandExample] {
    &[
        CommandExample {
            name: "signup",
            groups: account::SIGNUP_EXAMPLES,
        },
        CommandExample {
            name: "login",
            groups: account::LOGIN_EXAMPLES,
        },
        CommandExample {
            name: "feed",
            groups: feed::EXAMPLES,
        },
        CommandExample {
            name: "post",
            groups: post::POST_EXAMPLES,
        },
        CommandExample {
            name: "like",
            groups: post::LIKE_EXAMPLES,
        },
        CommandExample {
            name: "comments",
            groups: post::COMMENT_EXAMPLES,
        },
        CommandExample {
            name: "comment",
            groups: post::COMMENT_EXAMPLES,
        },
        CommandExample {
            name: "follow",
            groups: social::FOLLOW_EXAMPLES,
        },
        CommandExample {
            name: "profile",
            groups: social::PROFILE_EXAMPLES,
        },
        CommandExample {
            name: "search",
            groups: social::SEARCH_EXAMPLES,
        },
        CommandExample {
            name: "demo",
            groups: demo::EXAMPLES,
        },
    ]
}
