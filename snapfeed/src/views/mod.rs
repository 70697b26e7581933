//! Screen-level interaction state.
//!
//! Each view keeps its state behind a `std::sync::Mutex` that is only held
//! between awaits, never across one. Failures are logged, turned into a
//! user-visible notice, and leave previously loaded data in place.

mod comments;
mod composer;
mod feed;
mod post_detail;
mod profile;
mod profile_editor;

pub use comments::CommentThread;
pub use composer::PostComposer;
pub use feed::FeedView;
pub use post_detail::PostDetailView;
pub use profile::ProfileView;
pub use profile_editor::{ProfileEditor, ProfileForm};

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::errors::DataError;

/// Lifecycle of a view's primary load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Ready,
    /// The last load failed; earlier data, if any, is still shown.
    Failed,
    /// The thing being viewed does not exist (or no longer does).
    Gone,
}

pub(crate) fn lock<S>(state: &Mutex<S>) -> MutexGuard<'_, S> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Log a failed action and return the notice to show for it.
pub(crate) fn failure_notice(action: &str, err: &DataError) -> String {
    match err {
        DataError::Platform(_) => log::error!("{action} failed: {err}"),
        _ => log::warn!("{action} failed: {err}"),
    }
    err.user_message()
}
