//! Anonymous per-client identity, kept in a small JSON file the way a browser
//! would keep it in a cookie: a user id minted once and a nickname the user
//! can change. Nothing here is verified by the server.

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ClientError;

/// Days a stored identity stays valid after its last write.
pub const IDENTITY_LIFETIME_DAYS: i64 = 365;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub user_id: String,
    pub nickname: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredIdentity {
    user_id: String,
    #[serde(default)]
    nickname: Option<String>,
    expires_at: DateTime<Utc>,
}

pub struct IdentityStore {
    path: PathBuf,
}

impl IdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current identity, minting and persisting a fresh user id when none is
    /// stored, the stored one expired, or the file is unreadable.
    pub fn get_user_info(&self) -> Result<UserIdentity, ClientError> {
        self.get_user_info_at(Utc::now())
    }

    pub fn save_nickname(&self, nickname: &str) -> Result<(), ClientError> {
        let now = Utc::now();
        let current = self.get_user_info_at(now)?;
        self.write(&StoredIdentity {
            user_id: current.user_id,
            nickname: Some(nickname.to_string()),
            expires_at: now + TimeDelta::days(IDENTITY_LIFETIME_DAYS),
        })
    }

    fn get_user_info_at(&self, now: DateTime<Utc>) -> Result<UserIdentity, ClientError> {
        if let Some(stored) = self.read()? {
            if stored.expires_at > now {
                return Ok(UserIdentity {
                    user_id: stored.user_id,
                    nickname: stored.nickname.filter(|n| !n.is_empty()),
                });
            }
            info!("Stored identity expired at {}, minting a new one", stored.expires_at);
        }

        let fresh = StoredIdentity {
            user_id: Uuid::new_v4().to_string(),
            nickname: None,
            expires_at: now + TimeDelta::days(IDENTITY_LIFETIME_DAYS),
        };
        self.write(&fresh)?;
        info!("New client identity {}", fresh.user_id);

        Ok(UserIdentity {
            user_id: fresh.user_id,
            nickname: None,
        })
    }

    fn read(&self) -> Result<Option<StoredIdentity>, ClientError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&raw) {
            Ok(stored) => Ok(Some(stored)),
            Err(e) => {
                warn!("Ignoring unreadable identity file {}: {}", self.path.display(), e);
                Ok(None)
            }
        }
    }

    fn write(&self, stored: &StoredIdentity) -> Result<(), ClientError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(stored)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

/// Who this client is, loaded once at startup and handed to the orchestrator.
pub struct ClientContext {
    store: IdentityStore,
    identity: UserIdentity,
}

impl ClientContext {
    pub fn load(store: IdentityStore) -> Result<Self, ClientError> {
        let identity = store.get_user_info()?;
        Ok(Self { store, identity })
    }

    pub fn user_id(&self) -> &str {
        &self.identity.user_id
    }

    pub fn nickname(&self) -> Option<&str> {
        self.identity.nickname.as_deref()
    }

    pub fn identity(&self) -> &UserIdentity {
        &self.identity
    }

    pub fn save_nickname(&mut self, nickname: &str) -> Result<(), ClientError> {
        if self.nickname() == Some(nickname) {
            return Ok(());
        }
        self.store.save_nickname(nickname)?;
        self.identity.nickname = Some(nickname.to_string());
        Ok(())
    }
}
