use anyhow::Result;
use clap::Args;
use snapfeed::{Credentials, Platform, SignUp, Snapfeed};

use super::report;
use crate::examples::ExampleGroup;
use crate::output::OutputManager;

pub const SIGNUP_EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Create an account",
    commands: &[
        "snapfeed signup --email jane@example.com --password s3cret!          # Username from the email",
        "snapfeed signup --email jane@example.com --username jane --full-name 'Jane Doe'",
    ],
}];

pub const LOGIN_EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Sign in",
    commands: &[
        "snapfeed login --email jane@example.com --password s3cret!",
        "SNAPFEED_PASSWORD=s3cret! snapfeed login --email jane@example.com",
    ],
}];

#[derive(Args)]
pub struct SignupArgs {
    /// Account email
    #[arg(long)]
    pub email: String,

    /// Account password (at least 6 characters)
    #[arg(long, env = "SNAPFEED_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Username (defaults to the email's local part)
    #[arg(long)]
    pub username: Option<String>,

    /// Display name
    #[arg(long)]
    pub full_name: Option<String>,
}

#[derive(Args)]
pub struct LoginArgs {
    /// Account email
    #[arg(long)]
    pub email: String,

    /// Account password
    #[arg(long, env = "SNAPFEED_PASSWORD", hide_env_values = true)]
    pub password: String,
}

pub async fn handle_signup<P: Platform>(app: &Snapfeed<P>, args: SignupArgs, output: &OutputManager) -> Result<()> {
    let mut request = SignUp::new(args.email, args.password);
    if let Some(username) = args.username {
        request = request.username(username);
    }
    if let Some(full_name) = args.full_name {
        request = request.full_name(full_name);
    }

    output.progress("Creating account");
    let result = app.sign_up(&request).await;
    output.clear_line();
    let session = result.map_err(|err| report(output, err))?;

    let username = app.session().profile().map(|p| p.username).unwrap_or_default();
    output.success(&format!("Welcome, @{username}!"));
    output.verbose(&format!("Account id {}", session.user.id));
    Ok(())
}

pub async fn handle_login<P: Platform>(app: &Snapfeed<P>, args: LoginArgs, output: &OutputManager) -> Result<()> {
    output.progress("Signing in");
    let result = app.sign_in(&Credentials::new(args.email, args.password)).await;
    output.clear_line();
    let session = result.map_err(|err| report(output, err))?;

    output.success(&format!("Signed in as {}", session.user.email));
    Ok(())
}

pub async fn handle_logout<P: Platform>(app: &Snapfeed<P>, output: &OutputManager) -> Result<()> {
    if !app.session().is_signed_in() {
        output.info("Not signed in.");
        return Ok(());
    }
    if let Err(err) = app.sign_out().await {
        output.warning(&format!("Platform sign-out failed ({err}); local session cleared anyway."));
    } else {
        output.success("Signed out.");
    }
    Ok(())
}

pub async fn handle_whoami<P: Platform>(app: &Snapfeed<P>, output: &OutputManager) -> Result<()> {
    let Some(session) = app.session().session() else {
        output.info("Not signed in.");
        return Ok(());
    };
    match app.session().profile() {
        Some(profile) => output.display(&profile)?,
        None => output.key_value("Email", &session.user.email),
    }
    output.key_value("Session expires", &crate::utils::format_datetime(session.expires_at));
    Ok(())
}
