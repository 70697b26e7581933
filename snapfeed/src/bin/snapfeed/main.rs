mod commands;
mod context;
mod examples;
mod output;
mod tables;
mod theme;
mod utils;

use anyhow::{Context, Result};
use clap::{
    ColorChoice, Command, CommandFactory, FromArgMatches, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Color as ClapColor, RgbColor, Style},
    },
    error::ErrorKind,
};

use colored::{Color as ThemeColor, Colorize, control::ShouldColorize};
use snapfeed::{
    MemoryPlatform, Platform, RedisPlatform, SessionStore, Snapfeed,
    config::Backend,
};
use std::fmt::Write;
use std::io::{self, Write as IoWrite};

use commands::{
    account::{LoginArgs, SignupArgs, handle_login, handle_logout, handle_signup, handle_whoami},
    demo::{DemoArgs, handle_demo},
    feed::{FeedArgs, handle_feed},
    post::{
        CommentCommands, PostCommands, PostIdArgs, handle_comment_commands, handle_comments, handle_like,
        handle_post_commands,
    },
    social::{ProfileCommands, SearchArgs, UsernameArgs, handle_follow, handle_profile_commands, handle_search},
};
use context::ProjectContext;
use examples::{ExampleGroup, command_examples};
use output::{GlobalOptions, OutputFormat, OutputManager};
use theme::{ICONS, THEME};

const ENVIRONMENT_VARIABLES: &[(&str, &str)] = &[
    ("REDIS_URL", "Redis connection URL of the data platform"),
    ("SNAPFEED_REDIS_URL", "Fallback Redis URL when the configured variable is unset"),
    ("SNAPFEED_PASSWORD", "Password for signup/login when --password is omitted"),
    ("RUST_LOG", "Log filter, e.g. snapfeed=debug"),
];

#[derive(Parser)]
#[command(name = "snapfeed")]
#[command(author = "Snapfeed Team")]
#[command(version = "0.1.0")]
#[command(
    about = "Photo feed client for the Snapfeed data platform",
    long_about = r#"Photo feed client for the Snapfeed data platform that provides:

• A newest-first feed with like and comment counts
• Likes, follows and comments with instant feedback
• Profiles, search and profile editing
• Image posts uploaded to platform storage

Configuration is read from .snapfeed/config.toml in the current directory
or any parent; the signed-in session is kept in .snapfeed/session.json.
"#
)]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    output: OutputFormat,

    /// Suppress output (only errors will be shown)
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Enable verbose output
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn parse_with_styles() -> Self {
        let command = build_cli_command();
        match command.styles(help_styles()).try_get_matches() {
            Ok(matches) => match Cli::from_arg_matches(&matches) {
                Ok(cli) => cli,
                Err(err) => err.exit(),
            },
            Err(err) => match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    let _ = print_blank_line_stdout();
                    if let Err(print_err) = err.print()
                        && print_err.kind() != io::ErrorKind::BrokenPipe
                    {
                        eprintln!("Failed to display help: {print_err}");
                    }
                    let _ = print_blank_line_stdout();
                    std::process::exit(0);
                }
                ErrorKind::MissingSubcommand => {
                    handle_missing_subcommand(err);
                }
                _ => {
                    let exit_code = err.exit_code();
                    let _ = print_blank_line_stderr();
                    if let Err(print_err) = err.print()
                        && print_err.kind() != io::ErrorKind::BrokenPipe
                    {
                        eprintln!("Failed to display error: {print_err}");
                    }
                    let _ = print_blank_line_stderr();
                    std::process::exit(exit_code);
                }
            },
        }
    }
}

fn handle_missing_subcommand(error: clap::error::Error) -> ! {
    let mut command = build_cli_command();
    let command_name = command
        .get_display_name()
        .unwrap_or_else(|| command.get_name())
        .to_string();

    let _ = print_blank_line_stderr();
    eprintln!("error: '{command_name}' requires a subcommand but one was not provided");
    let _ = print_blank_line_stderr();

    command = command.styles(help_styles());

    let mut stderr = io::stderr();
    if command.write_long_help(&mut stderr).is_ok() {
        let _ = IoWrite::write_all(&mut stderr, b"\n");
        let _ = IoWrite::flush(&mut stderr);
    }

    let _ = print_blank_line_stderr();
    std::process::exit(error.exit_code());
}

fn build_cli_command() -> Command {
    let use_color = detect_color_support();
    let appendix = render_top_level_appendix(use_color);
    let mut command = Cli::command().after_long_help(appendix);
    command = command.color(if use_color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    });
    attach_command_examples(&mut command, use_color);
    command
}

fn attach_command_examples(command: &mut Command, use_color: bool) {
    for example in command_examples() {
        if let Some(subcommand) = command.find_subcommand_mut(example.name) {
            let help_text = render_examples(example.groups, use_color);
            let mut updated = subcommand.clone();
            updated = updated.after_long_help(help_text);
            *subcommand = updated;
        }
    }
}

fn render_examples(groups: &[ExampleGroup], use_color: bool) -> String {
    let theme = &THEME;
    let mut buffer = String::new();

    let heading = stylize("Examples:", theme.highlight, true, use_color);
    let _ = writeln!(buffer, "{heading}");

    for (index, group) in groups.iter().enumerate() {
        let title = stylize(group.title, theme.primary, true, use_color);
        let _ = writeln!(buffer, "  {title}");

        for command in group.commands {
            let arrow = stylize(ICONS.arrow, theme.secondary, false, use_color);
            let command_text = stylize(command, theme.secondary, false, use_color);
            let _ = writeln!(buffer, "    {arrow} {command_text}");
        }

        if index + 1 < groups.len() {
            buffer.push('\n');
        }
    }

    if !buffer.ends_with('\n') {
        buffer.push('\n');
    }

    buffer
}

fn render_top_level_appendix(use_color: bool) -> String {
    let theme = &THEME;
    let mut buffer = String::new();

    let env_heading = stylize("Environment Variables:", theme.highlight, true, use_color);
    let _ = writeln!(buffer, "{env_heading}");
    for (key, description) in ENVIRONMENT_VARIABLES {
        let key_text = stylize(key, theme.key, true, use_color);
        let value_text = stylize(description, theme.value, false, use_color);
        let _ = writeln!(buffer, "  {key_text}  {value_text}");
    }

    buffer.push('\n');

    let tip_heading = stylize("Tip:", theme.highlight, true, use_color);
    let tip_text = stylize(
        "Use 'snapfeed <command> --help' to view examples for each command.",
        theme.secondary,
        false,
        use_color,
    );
    let _ = writeln!(buffer, "{tip_heading} {tip_text}");

    if !buffer.ends_with('\n') {
        buffer.push('\n');
    }

    buffer
}

fn print_blank_line_stdout() -> io::Result<()> {
    let mut stdout = io::stdout();
    IoWrite::write_all(&mut stdout, b"\n")?;
    IoWrite::flush(&mut stdout)
}

fn print_blank_line_stderr() -> io::Result<()> {
    let mut stderr = io::stderr();
    IoWrite::write_all(&mut stderr, b"\n")?;
    IoWrite::flush(&mut stderr)
}

fn stylize(text: &str, color: ThemeColor, bold: bool, use_color: bool) -> String {
    if use_color {
        let styled = text.color(color);
        if bold {
            styled.bold().to_string()
        } else {
            styled.to_string()
        }
    } else {
        text.to_string()
    }
}

fn detect_color_support() -> bool {
    ShouldColorize::from_env().should_colorize()
}

fn help_styles() -> Styles {
    let theme = &THEME;
    Styles::styled()
        .usage(style_from_color(theme.primary).bold())
        .header(style_from_color(theme.highlight).bold())
        .literal(style_from_color(theme.secondary))
        .placeholder(style_from_color(theme.muted))
        .valid(style_from_color(theme.success))
        .invalid(style_from_color(theme.warning))
        .error(style_from_color(theme.error).bold())
}

fn style_from_color(color: ThemeColor) -> Style {
    Style::new().fg_color(Some(color_to_clap_color(color)))
}

fn color_to_clap_color(color: ThemeColor) -> ClapColor {
    match color {
        ThemeColor::Black => ClapColor::Ansi(AnsiColor::Black),
        ThemeColor::Red => ClapColor::Ansi(AnsiColor::Red),
        ThemeColor::Green => ClapColor::Ansi(AnsiColor::Green),
        ThemeColor::Yellow => ClapColor::Ansi(AnsiColor::Yellow),
        ThemeColor::Blue => ClapColor::Ansi(AnsiColor::Blue),
        ThemeColor::Magenta => ClapColor::Ansi(AnsiColor::Magenta),
        ThemeColor::Cyan => ClapColor::Ansi(AnsiColor::Cyan),
        ThemeColor::White => ClapColor::Ansi(AnsiColor::White),
        ThemeColor::BrightBlack => ClapColor::Ansi(AnsiColor::BrightBlack),
        ThemeColor::BrightRed => ClapColor::Ansi(AnsiColor::BrightRed),
        ThemeColor::BrightGreen => ClapColor::Ansi(AnsiColor::BrightGreen),
        ThemeColor::BrightYellow => ClapColor::Ansi(AnsiColor::BrightYellow),
        ThemeColor::BrightBlue => ClapColor::Ansi(AnsiColor::BrightBlue),
        ThemeColor::BrightMagenta => ClapColor::Ansi(AnsiColor::BrightMagenta),
        ThemeColor::BrightCyan => ClapColor::Ansi(AnsiColor::BrightCyan),
        ThemeColor::BrightWhite => ClapColor::Ansi(AnsiColor::BrightWhite),
        ThemeColor::TrueColor { r, g, b } => ClapColor::Rgb(RgbColor(r, g, b)),
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and sign in
    Signup(SignupArgs),

    /// Sign in with email and password
    Login(LoginArgs),

    /// Sign out and forget the saved session
    Logout,

    /// Show the signed-in account
    Whoami,

    /// Show the feed
    Feed(FeedArgs),

    /// Show, create or delete posts
    #[command(subcommand)]
    Post(PostCommands),

    /// Like a post
    Like(PostIdArgs),

    /// Remove your like from a post
    Unlike(PostIdArgs),

    /// List the comments of a post
    Comments(PostIdArgs),

    /// Add or delete comments
    #[command(subcommand)]
    Comment(CommentCommands),

    /// Follow a user
    Follow(UsernameArgs),

    /// Stop following a user
    Unfollow(UsernameArgs),

    /// Show or edit profiles
    #[command(subcommand)]
    Profile(ProfileCommands),

    /// Search users by username
    Search(SearchArgs),

    /// Guided tour against an in-memory platform
    Demo(DemoArgs),
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse_with_styles();

    let _ = print_blank_line_stdout();

    match execute(cli).await {
        Ok(()) => {
            let _ = print_blank_line_stdout();
        }
        Err(err) => {
            eprintln!("Error: {err}");
            let _ = print_blank_line_stdout();
            std::process::exit(1);
        }
    }
}

async fn execute(cli: Cli) -> Result<()> {
    let global_options = GlobalOptions {
        output_format: cli.output,
        quiet: cli.quiet,
        verbose: cli.verbose,
        no_color: cli.no_color,
    };

    if global_options.no_color {
        colored::control::set_override(false);
    }

    let output = OutputManager::new(global_options);

    let command = match cli.command {
        Commands::Demo(args) => return handle_demo(args, &output).await,
        command => command,
    };

    let ctx = ProjectContext::find()?;
    output.verbose(&format!("Project root {}", ctx.project_root.display()));

    match ctx.config.platform.backend {
        Backend::Memory => {
            output.warning("Using the in-memory platform; nothing is kept after this command.");
            let platform = MemoryPlatform::new().with_public_base_url(ctx.config.public_base_url()?);
            let app = Snapfeed::new(platform).with_page_size(ctx.config.page_size());
            dispatch(&app, command, &output).await
        }
        Backend::Redis => {
            let app = connect(&ctx, &output).await?;
            let result = dispatch(&app, command, &output).await;
            ctx.save_session(app.session().session().as_ref())?;
            result
        }
    }
}

/// Connect to the Redis platform and pick up the saved session, if any.
async fn connect(ctx: &ProjectContext, output: &OutputManager) -> Result<Snapfeed<RedisPlatform>> {
    let url = ctx.platform_url()?;
    let platform = RedisPlatform::connect(&url, ctx.config.platform.prefix.clone())
        .await
        .context("Failed to connect to the platform")?
        .with_public_base_url(ctx.config.public_base_url()?);

    if let Some(saved) = ctx.load_session()?
        && platform.restore_session(&saved.access_token).await?.is_none()
    {
        output.warning(&format!("The saved session for {} has expired.", saved.email));
    }

    let app = Snapfeed::with_session(platform, SessionStore::global().clone()).with_page_size(ctx.config.page_size());
    app.restore().await?;
    Ok(app)
}

async fn dispatch<P: Platform>(app: &Snapfeed<P>, command: Commands, output: &OutputManager) -> Result<()> {
    match command {
        Commands::Signup(args) => handle_signup(app, args, output).await,
        Commands::Login(args) => handle_login(app, args, output).await,
        Commands::Logout => handle_logout(app, output).await,
        Commands::Whoami => handle_whoami(app, output).await,
        Commands::Feed(args) => handle_feed(app, args, output).await,
        Commands::Post(command) => handle_post_commands(app, command, output).await,
        Commands::Like(args) => handle_like(app, args, true, output).await,
        Commands::Unlike(args) => handle_like(app, args, false, output).await,
        Commands::Comments(args) => handle_comments(app, args, output).await,
        Commands::Comment(command) => handle_comment_commands(app, command, output).await,
        Commands::Follow(args) => handle_follow(app, args, true, output).await,
        Commands::Unfollow(args) => handle_follow(app, args, false, output).await,
        Commands::Profile(command) => handle_profile_commands(app, command, output).await,
        Commands::Search(args) => handle_search(app, args, output).await,
        Commands::Demo(args) => handle_demo(args, output).await,
    }
}
