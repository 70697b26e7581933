//! Application handle tying a platform to the session store and event bus.
//!
//! ```ignore
//! let app = Snapfeed::new(MemoryPlatform::new());
//! app.sign_up(&SignUp::new("jane@example.com", "secret1").username("jane")).await?;
//!
//! let feed = app.feed();
//! feed.refresh().await?;
//! feed.toggle_like(&post_id).await;
//! ```
//!
//! Clones share the platform, the session and the event bus, so every view
//! built from one handle sees the same signed-in account and the same
//! notifications.

use std::sync::Arc;

use crate::{
    errors::DataError,
    events::EventBus,
    platform::{Credentials, Platform, Session, SignUp},
    session::SessionStore,
    views::{CommentThread, FeedView, PostComposer, PostDetailView, ProfileEditor, ProfileView},
};

/// Default number of posts per feed page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

pub struct Snapfeed<P> {
    platform: Arc<P>,
    session: SessionStore,
    events: EventBus,
    page_size: usize,
}

impl<P> Clone for Snapfeed<P> {
    fn clone(&self) -> Self {
        Self {
            platform: Arc::clone(&self.platform),
            session: self.session.clone(),
            events: self.events.clone(),
            page_size: self.page_size,
        }
    }
}

impl<P: Platform> Snapfeed<P> {
    /// Handle with a private session store.
    pub fn new(platform: P) -> Self {
        Self::with_session(platform, SessionStore::new())
    }

    /// Handle sharing `session`, e.g. [`SessionStore::global`].
    pub fn with_session(platform: P, session: SessionStore) -> Self {
        Self {
            platform: Arc::new(platform),
            session,
            events: EventBus::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn viewer_id(&self) -> Option<String> {
        self.session.viewer_id()
    }

    pub async fn sign_up(&self, request: &SignUp) -> Result<Session, DataError> {
        self.session.sign_up(self.platform(), request).await
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> Result<Session, DataError> {
        self.session.sign_in(self.platform(), credentials).await
    }

    pub async fn sign_out(&self) -> Result<(), DataError> {
        self.session.sign_out(self.platform()).await
    }

    /// Adopt a session the platform already holds.
    pub async fn restore(&self) -> Result<Option<Session>, DataError> {
        self.session.restore(self.platform()).await
    }

    /// The home feed (all authors).
    pub fn feed(&self) -> FeedView<P> {
        FeedView::new(self.clone(), None)
    }

    /// Feed of a single author.
    pub fn user_feed(&self, user_id: impl Into<String>) -> FeedView<P> {
        FeedView::new(self.clone(), Some(user_id.into()))
    }

    pub fn post_detail(&self, post_id: impl Into<String>) -> PostDetailView<P> {
        PostDetailView::new(self.clone(), post_id.into())
    }

    pub fn comments(&self, post_id: impl Into<String>) -> CommentThread<P> {
        CommentThread::new(self.clone(), post_id.into())
    }

    pub fn profile(&self) -> ProfileView<P> {
        ProfileView::new(self.clone())
    }

    pub fn composer(&self) -> PostComposer<P> {
        PostComposer::new(self.clone())
    }

    /// Editor prefilled from the cached profile of the signed-in account.
    pub fn profile_editor(&self) -> ProfileEditor<P> {
        ProfileEditor::new(self.clone())
    }
}
