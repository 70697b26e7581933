pub mod account;
pub mod demo;
pub mod feed;
pub mod post;
pub mod social;

use anyhow::Result;
use snapfeed::{DataError, Platform, Snapfeed};

use crate::output::OutputManager;

/// Id of the signed-in account, or an error telling the user to log in.
pub fn require_viewer<P: Platform>(app: &Snapfeed<P>, output: &OutputManager) -> Result<String> {
    match app.viewer_id() {
        Some(viewer) => Ok(viewer),
        None => {
            output.error("You are not logged in.");
            output.info("Run 'snapfeed login' first.");
            Err(DataError::Unauthenticated.into())
        }
    }
}

/// Report a failed action the way the app would, then hand the error on.
pub fn report(output: &OutputManager, err: DataError) -> anyhow::Error {
    output.error(&err.user_message());
    err.into()
}
