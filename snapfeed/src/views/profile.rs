use std::sync::Mutex;

use super::{LoadState, failure_notice, lock};
use crate::{
    client::Snapfeed,
    data::{follows, profiles},
    errors::DataError,
    models::ProfileAggregate,
    platform::Platform,
    toggle::{self, OptimisticToggle, ToggleOutcome},
};

#[derive(Default)]
struct ProfileState {
    aggregate: Option<ProfileAggregate>,
    follow: OptimisticToggle,
    load: LoadState,
    notice: Option<String>,
}

impl ProfileState {
    fn shows(&self, profile_id: &str) -> bool {
        self.aggregate.as_ref().is_some_and(|aggregate| aggregate.profile.id == profile_id)
    }

    /// The follow toggle, as long as `profile_id` is still the one shown.
    fn follow_for(&mut self, profile_id: &str) -> Option<&mut OptimisticToggle> {
        self.shows(profile_id).then_some(&mut self.follow)
    }

    fn show(&mut self, aggregate: ProfileAggregate) {
        if self.shows(&aggregate.profile.id) {
            self.follow.reload(aggregate.is_following, aggregate.follower_count);
        } else {
            self.follow = OptimisticToggle::new(aggregate.is_following, aggregate.follower_count);
        }
        self.aggregate = Some(aggregate);
    }
}

/// Profile screen: header counts, the author's first page of posts, and an
/// optimistic follow button.
pub struct ProfileView<P> {
    client: Snapfeed<P>,
    state: Mutex<ProfileState>,
}

impl<P: Platform> ProfileView<P> {
    pub(crate) fn new(client: Snapfeed<P>) -> Self {
        Self {
            client,
            state: Mutex::new(ProfileState::default()),
        }
    }

    /// Load the profile of `username`. An unknown username marks the view
    /// [`LoadState::Gone`].
    pub async fn load(&self, username: &str) -> Result<(), DataError> {
        lock(&self.state).load = LoadState::Loading;
        let viewer = self.client.viewer_id();
        let result = profiles::load_profile_aggregate(
            self.client.platform(),
            viewer.as_deref(),
            username,
            self.client.page_size(),
        )
        .await;

        let mut state = lock(&self.state);
        match result {
            Ok(aggregate) => {
                state.show(aggregate);
                state.load = LoadState::Ready;
                state.notice = None;
                Ok(())
            }
            Err(err) => {
                state.notice = Some(failure_notice("loading profile", &err));
                if matches!(err, DataError::NotFound { .. }) {
                    state.aggregate = None;
                    state.load = LoadState::Gone;
                } else {
                    state.load = LoadState::Failed;
                }
                Err(err)
            }
        }
    }

    /// The loaded profile with the follow button's current state applied.
    pub fn aggregate(&self) -> Option<ProfileAggregate> {
        let state = lock(&self.state);
        state.aggregate.as_ref().map(|aggregate| ProfileAggregate {
            is_following: state.follow.active(),
            follower_count: state.follow.count(),
            ..aggregate.clone()
        })
    }

    pub fn load_state(&self) -> LoadState {
        lock(&self.state).load
    }

    pub fn notice(&self) -> Option<String> {
        lock(&self.state).notice.clone()
    }

    pub fn is_follow_pending(&self) -> bool {
        lock(&self.state).follow.is_pending()
    }

    /// Follow or unfollow the loaded profile. On the viewer's own profile
    /// nothing changes and no request is made.
    pub async fn toggle_follow(&self) -> ToggleOutcome {
        let target = {
            let mut state = lock(&self.state);
            let Some((target, is_own)) = state
                .aggregate
                .as_ref()
                .map(|aggregate| (aggregate.profile.id.clone(), aggregate.is_own))
            else {
                return ToggleOutcome::Ignored;
            };
            if is_own {
                let err = DataError::SelfFollow;
                state.notice = Some(failure_notice("follow toggle", &err));
                return ToggleOutcome::Reverted(err);
            }
            target
        };

        let viewer = self.client.viewer_id();
        let platform = self.client.platform();
        let target = target.as_str();
        let outcome = toggle::drive(
            &self.state,
            |state: &mut ProfileState| state.follow_for(target),
            |following| async move { follows::set_following(platform, viewer.as_deref(), target, following).await },
        )
        .await;
        if let ToggleOutcome::Reverted(err) = &outcome {
            let notice = failure_notice("follow toggle", err);
            lock(&self.state).notice = Some(notice);
        }
        outcome
    }
}
