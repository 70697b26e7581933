use std::sync::Mutex;

use super::{LoadState, failure_notice, lock};
use crate::{
    client::Snapfeed,
    data::{FeedRequest, get_feed, likes, posts},
    errors::DataError,
    events::{EventReceiver, FeedEvent},
    models::FeedPost,
    platform::Platform,
    toggle::{self, OptimisticToggle, ToggleOutcome},
};

struct FeedEntry {
    post: FeedPost,
    like: OptimisticToggle,
}

impl FeedEntry {
    fn new(post: FeedPost) -> Self {
        let like = OptimisticToggle::new(post.is_liked, post.likes_count);
        Self { post, like }
    }

    fn snapshot(&self) -> FeedPost {
        FeedPost {
            is_liked: self.like.active(),
            likes_count: self.like.count(),
            ..self.post.clone()
        }
    }
}

#[derive(Default)]
struct FeedState {
    entries: Vec<FeedEntry>,
    offset: usize,
    exhausted: bool,
    load: LoadState,
    notice: Option<String>,
    new_posts: usize,
}

impl FeedState {
    fn entry_mut(&mut self, post_id: &str) -> Option<&mut FeedEntry> {
        self.entries.iter_mut().find(|entry| entry.post.id() == post_id)
    }

    /// Replace the shown posts with `page`, carrying over like toggles that
    /// are still in flight.
    fn replace_entries(&mut self, page: Vec<FeedPost>) {
        let mut previous = std::mem::take(&mut self.entries);
        self.entries = page
            .into_iter()
            .map(|post| {
                let mut entry = FeedEntry::new(post);
                if let Some(old) = previous.iter_mut().find(|old| old.post.id() == entry.post.id()) {
                    entry.like = std::mem::take(&mut old.like);
                    entry.like.reload(entry.post.is_liked, entry.post.likes_count);
                }
                entry
            })
            .collect();
    }

    fn remove(&mut self, post_id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.post.id() != post_id);
        let removed = self.entries.len() < before;
        if removed {
            self.offset = self.offset.saturating_sub(1);
        }
        removed
    }
}

/// Paged, newest-first feed with optimistic likes.
pub struct FeedView<P> {
    client: Snapfeed<P>,
    user_id: Option<String>,
    state: Mutex<FeedState>,
    events: Mutex<EventReceiver>,
}

impl<P: Platform> FeedView<P> {
    pub(crate) fn new(client: Snapfeed<P>, user_id: Option<String>) -> Self {
        let events = client.events().subscribe();
        Self {
            client,
            user_id,
            state: Mutex::new(FeedState::default()),
            events: Mutex::new(events),
        }
    }

    fn request(&self, offset: usize) -> FeedRequest {
        let request = FeedRequest::page(self.client.page_size(), offset);
        match &self.user_id {
            Some(user_id) => request.for_user(user_id.as_str()),
            None => request,
        }
    }

    async fn fetch(&self, offset: usize) -> Result<Vec<FeedPost>, DataError> {
        lock(&self.state).load = LoadState::Loading;
        let viewer = self.client.viewer_id();
        let result = get_feed(self.client.platform(), viewer.as_deref(), &self.request(offset)).await;
        if let Err(err) = &result {
            let notice = failure_notice("loading feed", err);
            let mut state = lock(&self.state);
            state.load = LoadState::Failed;
            state.notice = Some(notice);
        }
        result
    }

    /// Reload the first page, replacing what is shown. Returns the number of
    /// posts loaded.
    pub async fn refresh(&self) -> Result<usize, DataError> {
        let page = self.fetch(0).await?;
        let loaded = page.len();
        let mut state = lock(&self.state);
        state.replace_entries(page);
        state.offset = loaded;
        state.exhausted = loaded < self.client.page_size();
        state.load = LoadState::Ready;
        state.notice = None;
        state.new_posts = 0;
        Ok(loaded)
    }

    /// Append the next page. Returns the number of posts added.
    pub async fn load_more(&self) -> Result<usize, DataError> {
        let offset = {
            let state = lock(&self.state);
            if state.exhausted {
                return Ok(0);
            }
            state.offset
        };
        let page = self.fetch(offset).await?;
        let fetched = page.len();
        let mut state = lock(&self.state);
        let mut added = 0;
        for post in page {
            if state.entries.iter().any(|entry| entry.post.id() == post.id()) {
                continue;
            }
            state.entries.push(FeedEntry::new(post));
            added += 1;
        }
        state.offset += fetched;
        state.exhausted = fetched < self.client.page_size();
        state.load = LoadState::Ready;
        Ok(added)
    }

    pub fn posts(&self) -> Vec<FeedPost> {
        lock(&self.state).entries.iter().map(FeedEntry::snapshot).collect()
    }

    pub fn post(&self, post_id: &str) -> Option<FeedPost> {
        lock(&self.state)
            .entries
            .iter()
            .find(|entry| entry.post.id() == post_id)
            .map(FeedEntry::snapshot)
    }

    pub fn is_pending(&self, post_id: &str) -> bool {
        lock(&self.state)
            .entry_mut(post_id)
            .is_some_and(|entry| entry.like.is_pending())
    }

    pub fn load_state(&self) -> LoadState {
        lock(&self.state).load
    }

    pub fn is_exhausted(&self) -> bool {
        lock(&self.state).exhausted
    }

    pub fn notice(&self) -> Option<String> {
        lock(&self.state).notice.clone()
    }

    pub fn clear_notice(&self) {
        lock(&self.state).notice = None;
    }

    /// Like or unlike `post_id`. The heart flips immediately; a failed
    /// mutation puts it back and leaves a notice.
    pub async fn toggle_like(&self, post_id: &str) -> ToggleOutcome {
        let viewer = self.client.viewer_id();
        let platform = self.client.platform();
        let outcome = toggle::drive(
            &self.state,
            |state| state.entry_mut(post_id).map(|entry| &mut entry.like),
            |liked| async move { likes::set_liked(platform, viewer.as_deref(), post_id, liked).await },
        )
        .await;
        if let ToggleOutcome::Reverted(err) = &outcome {
            let notice = failure_notice("like toggle", err);
            lock(&self.state).notice = Some(notice);
        }
        outcome
    }

    /// Delete a post. On failure the post stays and a notice is set; nothing
    /// is retried.
    pub async fn delete_post(&self, post_id: &str) -> Result<(), DataError> {
        match posts::delete_post(self.client.platform(), post_id).await {
            Ok(_) => {
                lock(&self.state).remove(post_id);
                self.client.events().publish(FeedEvent::PostDeleted {
                    post_id: post_id.to_string(),
                });
                Ok(())
            }
            Err(err) => {
                let notice = failure_notice("deleting post", &err);
                lock(&self.state).notice = Some(notice);
                Err(err)
            }
        }
    }

    /// Fold in notifications from other views. Returns how many were applied.
    pub fn apply_events(&self) -> usize {
        let events = lock(&self.events).drain();
        let mut state = lock(&self.state);
        let count = events.len();
        for event in events {
            match event {
                FeedEvent::CommentCountChanged { post_id, delta } => {
                    if let Some(entry) = state.entry_mut(&post_id) {
                        entry.post.comments_count = entry.post.comments_count.saturating_add_signed(delta);
                    }
                }
                FeedEvent::PostDeleted { post_id } => {
                    state.remove(&post_id);
                }
                FeedEvent::PostCreated { .. } => state.new_posts += 1,
            }
        }
        count
    }

    /// Whether posts were created since the last refresh.
    pub fn has_new_posts(&self) -> bool {
        lock(&self.state).new_posts > 0
    }
}
