use async_trait::async_trait;
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use sled::transaction::{abort, TransactionError, TransactionResult};
use std::path::Path;
use uuid::Uuid;

use crate::account::store::{email_key, AccountStore, FileLookup};
use crate::account::types::{Account, AccountId, AccountUpdate, File, FileId, NewAccount};
use crate::error::StoreError;

/// Durable account store on a single sled tree.
///
/// Keys:
/// - `account:<id>` -> bincode `Account`
/// - `email:<lowercased email>` -> account id bytes (unique index)
/// - `file:<id>` -> bincode `File`
pub struct Storage {
    db: sled::Db,
}

impl Storage {
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let db = sled::open(Path::new(path)).map_err(backend)?;
        Ok(Storage { db })
    }

    /// Tree that is deleted when dropped.
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open().map_err(backend)?;
        Ok(Storage { db })
    }

    // Generic Helper: Put
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let serialized = encode(value)?;
        self.db.insert(key.as_bytes(), serialized).map_err(backend)?;
        Ok(())
    }

    // Generic Helper: Get
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.db.get(key.as_bytes()).map_err(backend)? {
            Some(data) => Ok(Some(decode(&data)?)),
            None => Ok(None),
        }
    }

    pub fn save_file(&self, file: &File) -> Result<(), StoreError> {
        self.put(&file_key(file.id), file)
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush().map_err(backend)?;
        Ok(())
    }
}

#[async_trait]
impl AccountStore for Storage {
    async fn find_all(&self) -> Result<Vec<Account>, StoreError> {
        let mut accounts = Vec::new();
        for entry in self.db.scan_prefix("account:") {
            let (_, value) = entry.map_err(backend)?;
            accounts.push(decode::<Account>(&value)?);
        }
        accounts.sort_by_key(|a| a.created_at);
        Ok(accounts)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let id = match self.db.get(email_index(email).as_bytes()).map_err(backend)? {
            Some(bytes) => Uuid::from_slice(&bytes).map_err(|e| StoreError::Backend(e.to_string()))?,
            None => return Ok(None),
        };
        self.get(&account_key(id))
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        self.get(&account_key(id))
    }

    async fn create(&self, new: NewAccount) -> Result<Account, StoreError> {
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
        let record = encode(&account)?;
        let index_key = email_index(&account.email);
        let record_key = account_key(account.id);

        let result: TransactionResult<(), StoreError> = self.db.transaction(|tx| {
            if tx.get(index_key.as_bytes())?.is_some() {
                return abort(StoreError::Constraint(account.email.clone()));
            }
            tx.insert(index_key.as_bytes(), account.id.as_bytes().to_vec())?;
            tx.insert(record_key.as_bytes(), record.clone())?;
            Ok(())
        });
        result.map_err(unwrap_tx)?;

        Ok(account)
    }

    async fn update(&self, id: AccountId, update: AccountUpdate) -> Result<Account, StoreError> {
        let record_key = account_key(id);

        let result: TransactionResult<Account, StoreError> = self.db.transaction(|tx| {
            let mut account: Account = match tx.get(record_key.as_bytes())? {
                Some(bytes) => match decode(&bytes) {
                    Ok(account) => account,
                    Err(e) => return abort(e),
                },
                None => return abort(StoreError::NotFound),
            };

            let old_index = email_index(&account.email);
            update.apply_to(&mut account);
            let new_index = email_index(&account.email);

            if new_index != old_index {
                if let Some(owner) = tx.get(new_index.as_bytes())? {
                    if &*owner != id.as_bytes().as_slice() {
                        return abort(StoreError::Constraint(account.email.clone()));
                    }
                }
                tx.remove(old_index.as_bytes())?;
                tx.insert(new_index.as_bytes(), id.as_bytes().to_vec())?;
            }

            let record = match encode(&account) {
                Ok(record) => record,
                Err(e) => return abort(e),
            };
            tx.insert(record_key.as_bytes(), record)?;
            Ok(account)
        });

        result.map_err(unwrap_tx)
    }
}

#[async_trait]
impl FileLookup for Storage {
    async fn find_file(&self, id: FileId) -> Result<Option<File>, StoreError> {
        self.get(&file_key(id))
    }
}

fn account_key(id: AccountId) -> String {
    format!("account:{}", id)
}

fn email_index(email: &str) -> String {
    format!("email:{}", email_key(email))
}

fn file_key(id: FileId) -> String {
    format!("file:{}", id)
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    bincode::serialize(value).map_err(|e| StoreError::Backend(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Backend(e.to_string()))
}

fn backend(err: sled::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn unwrap_tx(err: TransactionError<StoreError>) -> StoreError {
    match err {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => backend(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    async fn test_create_and_find() {
        let storage = Storage::temporary().unwrap();
        let alice = storage.create(new_account("Alice", "alice@example.com")).await.unwrap();

        assert_eq!(storage.find_by_id(alice.id).await.unwrap(), Some(alice.clone()));
        assert_eq!(storage.find_by_email("ALICE@example.com").await.unwrap(), Some(alice.clone()));
        assert_eq!(storage.find_all().await.unwrap(), vec![alice]);
    }

    #[tokio::test]
    async fn test_unique_email_index() {
        let storage = Storage::temporary().unwrap();
        storage.create(new_account("Alice", "alice@example.com")).await.unwrap();

        let err = storage.create(new_account("Alice 2", "alice@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
        assert_eq!(storage.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_moves_email_index() {
        let storage = Storage::temporary().unwrap();
        let alice = storage.create(new_account("Alice", "alice@example.com")).await.unwrap();

        let update = AccountUpdate {
            email: Some("alicia@example.com".to_string()),
            ..Default::default()
        };
        let updated = storage.update(alice.id, update).await.unwrap();
        assert_eq!(updated.email, "alicia@example.com");

        assert_eq!(storage.find_by_email("alice@example.com").await.unwrap(), None);
        assert_eq!(
            storage.find_by_email("alicia@example.com").await.unwrap().map(|a| a.id),
            Some(alice.id)
        );

        // Old address is free again
        assert!(storage.create(new_account("New", "alice@example.com")).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_conflict_leaves_record() {
        let storage = Storage::temporary().unwrap();
        let alice = storage.create(new_account("Alice", "alice@example.com")).await.unwrap();
        storage.create(new_account("Bob", "bob@example.com")).await.unwrap();

        let update = AccountUpdate {
            name: Some("Taken".to_string()),
            email: Some("bob@example.com".to_string()),
            ..Default::default()
        };
        let err = storage.update(alice.id, update).await.unwrap_err();

        assert!(matches!(err, StoreError::Constraint(_)));
        assert_eq!(storage.find_by_id(alice.id).await.unwrap(), Some(alice));
    }

    #[tokio::test]
    async fn test_update_missing_account() {
        let storage = Storage::temporary().unwrap();
        let err = storage.update(Uuid::new_v4(), AccountUpdate::default()).await.unwrap_err();
        assert_eq!(err, StoreError::NotFound);
    }

    #[tokio::test]
    async fn test_file_lookup() {
        let storage = Storage::temporary().unwrap();
        let file = File {
            id: Uuid::new_v4(),
            name: "me.png".to_string(),
            path: "f00d.png".to_string(),
        };
        storage.save_file(&file).unwrap();

        assert_eq!(storage.find_file(file.id).await.unwrap(), Some(file));
        assert_eq!(storage.find_file(Uuid::new_v4()).await.unwrap(), None);
    }
}
