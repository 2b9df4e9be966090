//! Account type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque account identifier
pub type AccountId = Uuid;

/// Identifier of a stored file (avatars)
pub type FileId = Uuid;

/// Stored account record
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub email: String,

    /// Argon2id PHC string, never the plaintext
    pub password_hash: String,

    /// `true` for externally provisioned accounts
    pub provider: bool,

    /// Weak reference to a `File`; may dangle
    pub avatar_id: Option<FileId>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// File metadata owned by a separate file service
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct File {
    pub id: FileId,
    pub name: String,
    pub path: String,
}

impl File {
    pub fn url(&self, base_url: &str) -> String {
        format!("{}/files/{}", base_url.trim_end_matches('/'), self.path)
    }
}

/// Fields required to insert an account
#[derive(Clone, Debug)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub provider: bool,
    pub avatar_id: Option<FileId>,
}

/// Partial update as persisted; absent fields stay unchanged.
///
/// `avatar_id: Some(None)` clears the reference.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub avatar_id: Option<Option<FileId>>,
}

impl AccountUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.password_hash.is_none()
            && self.avatar_id.is_none()
    }

    /// Apply to a record in place, bumping `updated_at`.
    pub fn apply_to(&self, account: &mut Account) {
        if let Some(name) = &self.name {
            account.name = name.clone();
        }
        if let Some(email) = &self.email {
            account.email = email.clone();
        }
        if let Some(hash) = &self.password_hash {
            account.password_hash = hash.clone();
        }
        if let Some(avatar_id) = self.avatar_id {
            account.avatar_id = avatar_id;
        }
        account.updated_at = Utc::now();
    }
}

/// Projection returned by list and create
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AccountSummary {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub provider: bool,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            provider: account.provider,
        }
    }
}

/// Projection returned by a profile update
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AccountProfile {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub avatar: Option<AvatarView>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AvatarView {
    pub id: FileId,
    pub path: String,
    pub url: String,
}

impl AvatarView {
    pub fn from_file(file: &File, base_url: &str) -> Self {
        Self {
            id: file.id,
            path: file.path.clone(),
            url: file.url(base_url),
        }
    }
}
