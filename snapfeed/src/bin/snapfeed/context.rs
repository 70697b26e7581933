use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use snapfeed::config::SnapfeedConfig;
use snapfeed::platform::Session;
use std::path::{Path, PathBuf};

/// Project context for snapfeed commands
pub struct ProjectContext {
    /// Directory holding `.snapfeed` (or the working directory if none exists yet)
    pub project_root: PathBuf,
    /// Path to .snapfeed directory
    pub snapfeed_dir: PathBuf,
    /// Path to config file
    pub config_path: PathBuf,
    /// Path to the saved session
    pub session_path: PathBuf,
    /// Loaded configuration (defaults when no config file exists)
    pub config: SnapfeedConfig,
}

/// Session saved between invocations in .snapfeed/session.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSession {
    pub access_token: String,
    pub user_id: String,
    pub email: String,
}

impl From<&Session> for SavedSession {
    fn from(session: &Session) -> Self {
        Self {
            access_token: session.access_token.clone(),
            user_id: session.user.id.clone(),
            email: session.user.email.clone(),
        }
    }
}

impl ProjectContext {
    /// Find and load project context from current directory or ancestors
    pub fn find() -> Result<Self> {
        let current_dir = std::env::current_dir().context("Failed to get current directory")?;
        Self::find_from(&current_dir)
    }

    /// Find project context starting from the given directory
    pub fn find_from(start: &Path) -> Result<Self> {
        let project_root = Self::find_project_root(start).unwrap_or_else(|| start.to_path_buf());
        Self::from_root(project_root)
    }

    /// Create context from a known project root
    pub fn from_root(project_root: PathBuf) -> Result<Self> {
        let snapfeed_dir = project_root.join(".snapfeed");
        let config_path = snapfeed_dir.join("config.toml");
        let session_path = snapfeed_dir.join("session.json");

        let config = if config_path.exists() {
            SnapfeedConfig::load(&config_path).context("Failed to load config.toml")?
        } else {
            SnapfeedConfig::default()
        };

        Ok(Self {
            project_root,
            snapfeed_dir,
            config_path,
            session_path,
            config,
        })
    }

    /// Nearest ancestor containing a .snapfeed directory
    fn find_project_root(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            if current.join(".snapfeed").is_dir() {
                return Some(current);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Platform URL with environment variables expanded
    pub fn platform_url(&self) -> Result<String> {
        self.config.platform_url().context("Failed to resolve platform url")
    }

    pub fn load_session(&self) -> Result<Option<SavedSession>> {
        if !self.session_path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.session_path).context("Failed to read session.json")?;
        let saved = serde_json::from_str(&content).context("Failed to parse session.json")?;
        Ok(Some(saved))
    }

    /// Persist `session`, or remove the saved session when `None`.
    pub fn save_session(&self, session: Option<&Session>) -> Result<()> {
        match session {
            Some(session) => {
                std::fs::create_dir_all(&self.snapfeed_dir).context("Failed to create .snapfeed directory")?;
                let content = serde_json::to_string_pretty(&SavedSession::from(session))?;
                std::fs::write(&self.session_path, content).context("Failed to write session.json")?;
            }
            None => {
                if self.session_path.exists() {
                    std::fs::remove_file(&self.session_path).context("Failed to remove session.json")?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use snapfeed::platform::AuthUser;

    fn session() -> Session {
        Session {
            access_token: "token-1".to_string(),
            user: AuthUser {
                id: "u1".to_string(),
                email: "jane@example.com".to_string(),
                created_at: Utc::now(),
            },
            expires_at: Utc::now() + Duration::days(1),
        }
    }

    #[test]
    fn test_defaults_without_config() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ProjectContext::find_from(dir.path()).unwrap();
        assert_eq!(ctx.project_root, dir.path());
        assert_eq!(ctx.config.platform.prefix, "snapfeed");
        assert_eq!(ctx.config.page_size(), 10);
    }

    #[test]
    fn test_finds_config_in_ancestor() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".snapfeed")).unwrap();
        std::fs::write(
            dir.path().join(".snapfeed/config.toml"),
            "[platform]\nbackend = \"memory\"\nprefix = \"demo\"\n\n[feed]\npage_size = 3\n",
        )
        .unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        let ctx = ProjectContext::find_from(&nested).unwrap();
        assert_eq!(ctx.project_root, dir.path());
        assert_eq!(ctx.config.platform.prefix, "demo");
        assert_eq!(ctx.config.page_size(), 3);
    }

    #[test]
    fn test_session_round_trip_and_removal() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ProjectContext::from_root(dir.path().to_path_buf()).unwrap();
        assert!(ctx.load_session().unwrap().is_none());

        ctx.save_session(Some(&session())).unwrap();
        let saved = ctx.load_session().unwrap().unwrap();
        assert_eq!(saved.access_token, "token-1");
        assert_eq!(saved.email, "jane@example.com");

        ctx.save_session(None).unwrap();
        assert!(!ctx.session_path.exists());
    }
}
