use std::sync::Mutex;

use super::{failure_notice, lock};
use crate::{
    client::Snapfeed,
    data::{posts, storage},
    errors::{DataError, ValidationError, ValidationResult},
    events::FeedEvent,
    models::Post,
    platform::Platform,
};

#[derive(Default)]
struct ComposerState {
    file_name: Option<String>,
    bytes: Vec<u8>,
    caption: String,
    /// Bumped whenever the image changes.
    image_version: u64,
    /// Uploader and public URL of the current image once it has been stored.
    uploaded: Option<(String, String)>,
    submitting: bool,
    notice: Option<String>,
}

struct Submission {
    file_name: Option<String>,
    bytes: Vec<u8>,
    caption: String,
    image_version: u64,
    uploaded: Option<(String, String)>,
}

/// New-post form: one image plus an optional caption.
pub struct PostComposer<P> {
    client: Snapfeed<P>,
    state: Mutex<ComposerState>,
}

impl<P: Platform> PostComposer<P> {
    pub(crate) fn new(client: Snapfeed<P>) -> Self {
        Self {
            client,
            state: Mutex::new(ComposerState::default()),
        }
    }

    pub fn set_image(&self, file_name: impl Into<String>, bytes: Vec<u8>) {
        let mut state = lock(&self.state);
        state.file_name = Some(file_name.into());
        state.bytes = bytes;
        state.image_version += 1;
        state.uploaded = None;
    }

    pub fn set_caption(&self, caption: impl Into<String>) {
        lock(&self.state).caption = caption.into();
    }

    pub fn caption(&self) -> String {
        lock(&self.state).caption.clone()
    }

    pub fn has_image(&self) -> bool {
        lock(&self.state).file_name.is_some()
    }

    pub fn is_submitting(&self) -> bool {
        lock(&self.state).submitting
    }

    pub fn notice(&self) -> Option<String> {
        lock(&self.state).notice.clone()
    }

    pub fn clear(&self) {
        *lock(&self.state) = ComposerState::default();
    }

    /// Check the form without submitting it.
    pub fn validate(&self) -> ValidationResult<()> {
        let state = lock(&self.state);
        let Some(file_name) = &state.file_name else {
            return Err(ValidationError::single("image", "validation.required", "Please choose an image."));
        };
        storage::validate_image(file_name, &state.bytes)?;
        posts::normalize_caption(Some(&state.caption))?;
        Ok(())
    }

    /// Upload the image and create the post. Returns `Ok(None)` when a
    /// submission is already in flight. The form is cleared on success and
    /// kept on failure; an image that was stored before the failure is
    /// reused by the next submit.
    pub async fn submit(&self) -> Result<Option<Post>, DataError> {
        let submission = {
            let mut state = lock(&self.state);
            if state.submitting {
                return Ok(None);
            }
            state.submitting = true;
            Submission {
                file_name: state.file_name.clone(),
                bytes: state.bytes.clone(),
                caption: state.caption.clone(),
                image_version: state.image_version,
                uploaded: state.uploaded.clone(),
            }
        };

        let result = self.publish(submission).await;

        let mut state = lock(&self.state);
        match result {
            Ok(post) => {
                *state = ComposerState::default();
                drop(state);
                self.client.events().publish(FeedEvent::PostCreated {
                    post_id: post.id.clone(),
                });
                Ok(Some(post))
            }
            Err(err) => {
                state.submitting = false;
                state.notice = Some(failure_notice("creating post", &err));
                Err(err)
            }
        }
    }

    async fn publish(&self, submission: Submission) -> Result<Post, DataError> {
        let Submission {
            file_name,
            bytes,
            caption,
            image_version,
            uploaded,
        } = submission;
        let viewer_id = self.client.viewer_id();
        let viewer = viewer_id.as_deref();
        let Some(uploader) = viewer else {
            return Err(DataError::Unauthenticated);
        };
        let Some(file_name) = file_name else {
            return Err(ValidationError::single("image", "validation.required", "Please choose an image.").into());
        };
        // Nothing is uploaded for a caption that would be rejected.
        posts::normalize_caption(Some(&caption))?;

        let platform = self.client.platform();
        let image_url = match uploaded {
            Some((owner, image_url)) if owner == uploader => image_url,
            _ => {
                let image_url = storage::upload_post_image(platform, viewer, &file_name, &bytes).await?;
                let mut state = lock(&self.state);
                if state.image_version == image_version {
                    state.uploaded = Some((uploader.to_string(), image_url.clone()));
                }
                image_url
            }
        };
        posts::create_post(platform, viewer, &image_url, Some(&caption))
            .await
            .inspect_err(|err| log::warn!("post image {image_url} is stored without a post: {err}"))
    }
}
