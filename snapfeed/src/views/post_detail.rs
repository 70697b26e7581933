use std::sync::Mutex;

use super::{CommentThread, LoadState, failure_notice, lock};
use crate::{
    client::Snapfeed,
    data::{get_post, likes, posts},
    errors::DataError,
    events::FeedEvent,
    models::FeedPost,
    platform::Platform,
    toggle::{self, OptimisticToggle, ToggleOutcome},
};

#[derive(Default)]
struct DetailState {
    post: Option<FeedPost>,
    like: OptimisticToggle,
    load: LoadState,
    notice: Option<String>,
}

impl DetailState {
    fn like_mut(&mut self) -> Option<&mut OptimisticToggle> {
        self.post.is_some().then_some(&mut self.like)
    }
}

/// A single post with its comment thread.
pub struct PostDetailView<P> {
    client: Snapfeed<P>,
    post_id: String,
    state: Mutex<DetailState>,
    thread: CommentThread<P>,
}

impl<P: Platform> PostDetailView<P> {
    pub(crate) fn new(client: Snapfeed<P>, post_id: String) -> Self {
        let thread = CommentThread::new(client.clone(), post_id.clone());
        Self {
            client,
            post_id,
            state: Mutex::new(DetailState::default()),
            thread,
        }
    }

    /// Load the post and its comments together. A missing post marks the
    /// view [`LoadState::Gone`].
    pub async fn load(&self) -> Result<(), DataError> {
        lock(&self.state).load = LoadState::Loading;
        let viewer = self.client.viewer_id();
        let (post, thread) = tokio::join!(
            get_post(self.client.platform(), viewer.as_deref(), &self.post_id),
            self.thread.load(),
        );

        let mut state = lock(&self.state);
        match post {
            Ok(post) => {
                state.like.reload(post.is_liked, post.likes_count);
                state.post = Some(post);
                state.load = LoadState::Ready;
                state.notice = None;
            }
            Err(err) => {
                state.notice = Some(failure_notice("loading post", &err));
                if matches!(err, DataError::NotFound { .. }) {
                    state.post = None;
                    state.load = LoadState::Gone;
                } else {
                    state.load = LoadState::Failed;
                }
                return Err(err);
            }
        }
        thread.map(|_| ())
    }

    pub fn post(&self) -> Option<FeedPost> {
        let thread_count = (self.thread.load_state() == LoadState::Ready).then(|| self.thread.len() as u64);
        let state = lock(&self.state);
        state.post.as_ref().map(|post| FeedPost {
            is_liked: state.like.active(),
            likes_count: state.like.count(),
            comments_count: thread_count.unwrap_or(post.comments_count),
            ..post.clone()
        })
    }

    pub fn comments(&self) -> &CommentThread<P> {
        &self.thread
    }

    pub fn load_state(&self) -> LoadState {
        lock(&self.state).load
    }

    pub fn notice(&self) -> Option<String> {
        lock(&self.state).notice.clone()
    }

    pub async fn toggle_like(&self) -> ToggleOutcome {
        let viewer = self.client.viewer_id();
        let platform = self.client.platform();
        let post_id = self.post_id.as_str();
        let outcome = toggle::drive(&self.state, DetailState::like_mut, |liked| async move {
            likes::set_liked(platform, viewer.as_deref(), post_id, liked).await
        })
        .await;
        if let ToggleOutcome::Reverted(err) = &outcome {
            let notice = failure_notice("like toggle", err);
            lock(&self.state).notice = Some(notice);
        }
        outcome
    }

    /// Delete the post. On success the view is `Gone`; on failure it keeps
    /// the post and shows a notice.
    pub async fn delete(&self) -> Result<(), DataError> {
        match posts::delete_post(self.client.platform(), &self.post_id).await {
            Ok(_) => {
                {
                    let mut state = lock(&self.state);
                    state.post = None;
                    state.load = LoadState::Gone;
                }
                self.client.events().publish(FeedEvent::PostDeleted {
                    post_id: self.post_id.clone(),
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
}
