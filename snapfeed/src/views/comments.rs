use std::sync::Mutex;

use super::{LoadState, failure_notice, lock};
use crate::{
    client::Snapfeed,
    data::comments,
    errors::DataError,
    events::FeedEvent,
    models::CommentWithAuthor,
    platform::Platform,
};

#[derive(Default)]
struct ThreadState {
    comments: Vec<CommentWithAuthor>,
    load: LoadState,
    notice: Option<String>,
}

/// Oldest-first comments of one post. Nothing is shown before the platform
/// confirms it: added comments carry the server's id and timestamp.
pub struct CommentThread<P> {
    client: Snapfeed<P>,
    post_id: String,
    state: Mutex<ThreadState>,
}

impl<P: Platform> CommentThread<P> {
    pub(crate) fn new(client: Snapfeed<P>, post_id: String) -> Self {
        Self {
            client,
            post_id,
            state: Mutex::new(ThreadState::default()),
        }
    }

    pub fn post_id(&self) -> &str {
        &self.post_id
    }

    pub async fn load(&self) -> Result<usize, DataError> {
        lock(&self.state).load = LoadState::Loading;
        match comments::list_comments(self.client.platform(), &self.post_id).await {
            Ok(loaded) => {
                let count = loaded.len();
                let mut state = lock(&self.state);
                state.comments = loaded;
                state.load = LoadState::Ready;
                state.notice = None;
                Ok(count)
            }
            Err(err) => {
                let notice = failure_notice("loading comments", &err);
                let mut state = lock(&self.state);
                state.load = LoadState::Failed;
                state.notice = Some(notice);
                Err(err)
            }
        }
    }

    pub fn comments(&self) -> Vec<CommentWithAuthor> {
        lock(&self.state).comments.clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.state).comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn load_state(&self) -> LoadState {
        lock(&self.state).load
    }

    pub fn notice(&self) -> Option<String> {
        lock(&self.state).notice.clone()
    }

    /// Post a comment and append it once created.
    pub async fn add(&self, content: &str) -> Result<CommentWithAuthor, DataError> {
        let viewer = self.client.viewer_id();
        match comments::add_comment(self.client.platform(), viewer.as_deref(), &self.post_id, content).await {
            Ok(comment) => {
                {
                    let mut state = lock(&self.state);
                    state.comments.push(comment.clone());
                    state.notice = None;
                }
                self.client.events().publish(FeedEvent::CommentCountChanged {
                    post_id: self.post_id.clone(),
                    delta: 1,
                });
                Ok(comment)
            }
            Err(err) => {
                let notice = failure_notice("adding comment", &err);
                lock(&self.state).notice = Some(notice);
                Err(err)
            }
        }
    }

    /// Delete a comment; it leaves the list only after the platform confirms.
    pub async fn delete(&self, comment_id: &str) -> Result<(), DataError> {
        match comments::delete_comment(self.client.platform(), comment_id).await {
            Ok(_) => {
                lock(&self.state)
                    .comments
                    .retain(|entry| entry.comment.id != comment_id);
                self.client.events().publish(FeedEvent::CommentCountChanged {
                    post_id: self.post_id.clone(),
                    delta: -1,
                });
                Ok(())
            }
            Err(err) => {
                let notice = failure_notice("deleting comment", &err);
                lock(&self.state).notice = Some(notice);
                Err(err)
            }
        }
    }
}
