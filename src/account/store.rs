//! Account persistence ports and an in-memory backend

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use super::auth::Credentials;
use super::types::{Account, AccountId, AccountUpdate, File, FileId, NewAccount};
use crate::error::{CredentialError, StoreError};

/// Persistence collaborator for accounts.
///
/// `create` and `update` must reject an email owned by another account with
/// `StoreError::Constraint`; that check is the authoritative one.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Account>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError>;
    async fn create(&self, account: NewAccount) -> Result<Account, StoreError>;
    async fn update(&self, id: AccountId, update: AccountUpdate) -> Result<Account, StoreError>;
}

/// Read access to files referenced by accounts.
#[async_trait]
pub trait FileLookup: Send + Sync {
    async fn find_file(&self, id: FileId) -> Result<Option<File>, StoreError>;
}

/// Validated update payload, still holding the plaintext password.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct AccountChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub old_password: Option<String>,
    pub password: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub avatar_id: Option<Option<FileId>>,
}

impl AccountChanges {
    /// Pre-save step: derive the credential so the store never sees plaintext.
    pub fn prepare(&self, credentials: &dyn Credentials) -> Result<AccountUpdate, CredentialError> {
        let password_hash = match &self.password {
            Some(password) => Some(credentials.hash(password)?),
            None => None,
        };

        Ok(AccountUpdate {
            name: self.name.clone(),
            email: self.email.clone(),
            password_hash,
            avatar_id: self.avatar_id,
        })
    }
}

/// Keeps `"avatarId": null` distinct from a missing key.
fn nullable<'de, D>(deserializer: D) -> Result<Option<Option<FileId>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<FileId>::deserialize(deserializer).map(Some)
}

/// Email index key; uniqueness ignores ASCII case.
pub fn email_key(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// In-process store used by tests and the CLI's dry runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    accounts: RwLock<HashMap<AccountId, Account>>,
    files: RwLock<HashMap<FileId, File>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_file(&self, file: File) -> Result<(), StoreError> {
        self.files
            .write()
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .insert(file.id, file);
        Ok(())
    }

    fn email_taken(accounts: &HashMap<AccountId, Account>, email: &str, except: Option<AccountId>) -> bool {
        let key = email_key(email);
        accounts
            .values()
            .any(|a| Some(a.id) != except && email_key(&a.email) == key)
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_all(&self) -> Result<Vec<Account>, StoreError> {
        let accounts = self.accounts.read().map_err(|e| StoreError::Backend(e.to_string()))?;
        let mut all: Vec<Account> = accounts.values().cloned().collect();
        all.sort_by_key(|a| a.created_at);
        Ok(all)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.read().map_err(|e| StoreError::Backend(e.to_string()))?;
        let key = email_key(email);
        Ok(accounts.values().find(|a| email_key(&a.email) == key).cloned())
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.read().map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(accounts.get(&id).cloned())
    }

    async fn create(&self, new: NewAccount) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.write().map_err(|e| StoreError::Backend(e.to_string()))?;

        if Self::email_taken(&accounts, &new.email, None) {
            return Err(StoreError::Constraint(new.email));
        }

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            provider: new.provider,
            avatar_id: new.avatar_id,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(account.id, account.clone());

        Ok(account)
    }

    async fn update(&self, id: AccountId, update: AccountUpdate) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.write().map_err(|e| StoreError::Backend(e.to_string()))?;

        if let Some(email) = &update.email {
            if Self::email_taken(&accounts, email, Some(id)) {
                return Err(StoreError::Constraint(email.clone()));
            }
        }

        let account = accounts.get_mut(&id).ok_or(StoreError::NotFound)?;
        update.apply_to(account);

        Ok(account.clone())
    }
}

#[async_trait]
impl FileLookup for MemoryStore {
    async fn find_file(&self, id: FileId) -> Result<Option<File>, StoreError> {
        let files = self.files.read().map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(files.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::auth::Argon2Credentials;

    fn new_account(name: &str, email: &str) -> NewAccount {
        NewAccount {
            name: name.to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$stub".to_string(),
            provider: false,
            avatar_id: None,
        }
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_email() {
        let store = MemoryStore::new();
        store.create(new_account("Alice", "alice@example.com")).await.unwrap();

        let err = store.create(new_account("Other", "Alice@Example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
        assert_eq!(store.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_rejects_email_of_other_account() {
        let store = MemoryStore::new();
        let alice = store.create(new_account("Alice", "alice@example.com")).await.unwrap();
        store.create(new_account("Bob", "bob@example.com")).await.unwrap();

        let update = AccountUpdate {
            email: Some("bob@example.com".to_string()),
            ..Default::default()
        };
        assert!(store.update(alice.id, update).await.is_err());

        // Keeping your own email is not a conflict
        let update = AccountUpdate {
            email: Some("alice@example.com".to_string()),
            ..Default::default()
        };
        assert!(store.update(alice.id, update).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_unknown_account() {
        let store = MemoryStore::new();
        let err = store.update(Uuid::new_v4(), AccountUpdate::default()).await.unwrap_err();
        assert_eq!(err, StoreError::NotFound);
    }

    #[test]
    fn test_prepare_hashes_password() {
        let changes = AccountChanges {
            password: Some("newpass1".to_string()),
            ..Default::default()
        };
        let update = changes.prepare(&Argon2Credentials).unwrap();
        let hash = update.password_hash.unwrap();

        assert_ne!(hash, "newpass1");
        assert!(Argon2Credentials.verify("newpass1", &hash));
    }

    #[test]
    fn test_changes_distinguish_null_avatar() {
        let cleared: AccountChanges = serde_json::from_str(r#"{"avatarId": null}"#).unwrap();
        assert_eq!(cleared.avatar_id, Some(None));

        let untouched: AccountChanges = serde_json::from_str(r#"{"name": "Alice"}"#).unwrap();
        assert_eq!(untouched.avatar_id, None);
    }
}
