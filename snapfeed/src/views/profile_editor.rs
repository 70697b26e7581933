use std::sync::Mutex;

use super::{failure_notice, lock};
use crate::{
    client::Snapfeed,
    data::{
        profiles::{self, ProfileUpdate},
        storage,
    },
    errors::DataError,
    models::Profile,
    platform::Platform,
};

/// Editable fields of the profile form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileForm {
    pub username: String,
    pub full_name: String,
    pub bio: String,
}

impl From<&Profile> for ProfileForm {
    fn from(profile: &Profile) -> Self {
        Self {
            username: profile.username.clone(),
            full_name: profile.full_name.clone().unwrap_or_default(),
            bio: profile.bio.clone().unwrap_or_default(),
        }
    }
}

#[derive(Default)]
struct EditorState {
    form: ProfileForm,
    avatar: Option<(String, Vec<u8>)>,
    saving: bool,
    notice: Option<String>,
}

pub struct ProfileEditor<P> {
    client: Snapfeed<P>,
    state: Mutex<EditorState>,
}

impl<P: Platform> ProfileEditor<P> {
    pub(crate) fn new(client: Snapfeed<P>) -> Self {
        let form = client.session().profile().as_ref().map(ProfileForm::from).unwrap_or_default();
        Self {
            client,
            state: Mutex::new(EditorState {
                form,
                ..EditorState::default()
            }),
        }
    }

    pub fn form(&self) -> ProfileForm {
        lock(&self.state).form.clone()
    }

    pub fn set_form(&self, form: ProfileForm) {
        lock(&self.state).form = form;
    }

    /// Attach a new avatar image, uploaded on the next save.
    pub fn set_avatar(&self, file_name: impl Into<String>, bytes: Vec<u8>) {
        lock(&self.state).avatar = Some((file_name.into(), bytes));
    }

    pub fn is_saving(&self) -> bool {
        lock(&self.state).saving
    }

    pub fn notice(&self) -> Option<String> {
        lock(&self.state).notice.clone()
    }

    /// Save the form, then refresh the session's cached profile. Returns
    /// `Ok(None)` when a save is already in flight.
    pub async fn save(&self) -> Result<Option<Profile>, DataError> {
        let (form, avatar) = {
            let mut state = lock(&self.state);
            if state.saving {
                return Ok(None);
            }
            state.saving = true;
            (state.form.clone(), state.avatar.clone())
        };

        let result = self.persist(form, avatar).await;

        let mut state = lock(&self.state);
        state.saving = false;
        match result {
            Ok(profile) => {
                state.form = ProfileForm::from(&profile);
                state.avatar = None;
                state.notice = None;
                Ok(Some(profile))
            }
            Err(err) => {
                state.notice = Some(failure_notice("saving profile", &err));
                Err(err)
            }
        }
    }

    async fn persist(&self, form: ProfileForm, avatar: Option<(String, Vec<u8>)>) -> Result<Profile, DataError> {
        let platform = self.client.platform();
        let viewer = self.client.viewer_id();
        let viewer = viewer.as_deref();

        let mut update = ProfileUpdate {
            username: Some(form.username),
            full_name: Some(form.full_name),
            bio: Some(form.bio),
            avatar_url: None,
        };
        profiles::validate_profile_update(&update)?;
        if let Some((file_name, bytes)) = avatar {
            update.avatar_url = Some(storage::upload_avatar(platform, viewer, &file_name, &bytes).await?);
        }

        let profile = profiles::update_profile(platform, viewer, &update).await?;
        self.client.session().refresh_profile(platform).await?;
        Ok(profile)
    }
}
