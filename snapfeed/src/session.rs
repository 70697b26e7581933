//! Client-side session store: the signed-in identity plus its cached profile.

use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{
    data::profiles,
    errors::DataError,
    models::Profile,
    platform::{Credentials, Platform, Session, SignUp},
};

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub session: Option<Session>,
    pub profile: Option<Profile>,
}

/// Shared handle; clones see the same state.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<SessionState>>,
}

static GLOBAL: OnceLock<SessionStore> = OnceLock::new();

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide store.
    pub fn global() -> &'static SessionStore {
        GLOBAL.get_or_init(SessionStore::new)
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> SessionState {
        self.read().clone()
    }

    pub fn session(&self) -> Option<Session> {
        self.read().session.clone()
    }

    pub fn profile(&self) -> Option<Profile> {
        self.read().profile.clone()
    }

    pub fn viewer_id(&self) -> Option<String> {
        self.read().session.as_ref().map(|session| session.user.id.clone())
    }

    pub fn is_signed_in(&self) -> bool {
        self.read().session.is_some()
    }

    pub fn reset(&self) {
        *self.write() = SessionState::default();
    }

    pub(crate) fn set_profile(&self, profile: Option<Profile>) {
        self.write().profile = profile;
    }

    async fn adopt<P: Platform>(&self, platform: &P, session: Session) -> Result<Session, DataError> {
        let profile = profiles::get_profile_by_id(platform, &session.user.id).await?;
        if profile.is_none() {
            log::warn!("account {} has no profile row", session.user.id);
        }
        *self.write() = SessionState {
            session: Some(session.clone()),
            profile,
        };
        Ok(session)
    }

    pub async fn sign_in<P: Platform>(&self, platform: &P, credentials: &Credentials) -> Result<Session, DataError> {
        let session = platform.sign_in(credentials).await?;
        log::info!("signed in as {}", session.user.email);
        self.adopt(platform, session).await
    }

    pub async fn sign_up<P: Platform>(&self, platform: &P, request: &SignUp) -> Result<Session, DataError> {
        let session = platform.sign_up(request).await?;
        log::info!("created account {}", session.user.email);
        self.adopt(platform, session).await
    }

    /// Sign out on the platform, then forget the identity. The local state is
    /// reset even if the platform call fails.
    pub async fn sign_out<P: Platform>(&self, platform: &P) -> Result<(), DataError> {
        let result = platform.sign_out().await;
        self.reset();
        result.map_err(|err| {
            log::warn!("platform sign-out failed: {err}");
            DataError::from(err)
        })
    }

    /// Adopt the platform's current session, if any.
    pub async fn restore<P: Platform>(&self, platform: &P) -> Result<Option<Session>, DataError> {
        match platform.current_session().await? {
            Some(session) => self.adopt(platform, session).await.map(Some),
            None => {
                self.reset();
                Ok(None)
            }
        }
    }

    /// Reload the cached profile of the signed-in account.
    pub async fn refresh_profile<P: Platform>(&self, platform: &P) -> Result<Option<Profile>, DataError> {
        let Some(viewer) = self.viewer_id() else {
            return Ok(None);
        };
        let profile = profiles::get_profile_by_id(platform, &viewer).await?;
        self.set_profile(profile.clone());
        Ok(profile)
    }
}
