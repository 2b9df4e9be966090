//! Account workflows: list, create and the guarded profile update

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::auth::Credentials;
use super::store::{AccountChanges, AccountStore, FileLookup};
use super::types::{Account, AccountId, AccountProfile, AccountSummary, AvatarView, FileId, NewAccount};
use crate::error::{AccountError, AccountResult};
use crate::validation::Schema;

/// Progress of a single update request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStage {
    Received,
    Validated,
    EmailChecked,
    CredentialChecked,
    Applied,
    Projected,
}

impl fmt::Display for UpdateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Registration payload, deserialized once the create schema passed.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub provider: bool,
    #[serde(default)]
    pub avatar_id: Option<FileId>,
}

pub struct AccountService {
    store: Arc<dyn AccountStore>,
    files: Arc<dyn FileLookup>,
    credentials: Arc<dyn Credentials>,
    files_base_url: String,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn AccountStore>,
        files: Arc<dyn FileLookup>,
        credentials: Arc<dyn Credentials>,
        files_base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            files,
            credentials,
            files_base_url: files_base_url.into(),
        }
    }

    /// List every account as a public summary.
    pub async fn list(&self) -> AccountResult<Vec<AccountSummary>> {
        let accounts = self.store.find_all().await?;
        Ok(accounts.iter().map(AccountSummary::from).collect())
    }

    /// Register a new account.
    pub async fn create(&self, payload: Value) -> AccountResult<AccountSummary> {
        Schema::create_account().validate(&payload).map_err(|e| {
            debug!("Create rejected: {}", e);
            AccountError::from(e)
        })?;
        let request: CreateAccountRequest = serde_json::from_value(payload)
            .map_err(|e| AccountError::Internal(format!("validated payload did not decode: {}", e)))?;

        // Friendly pre-check; the store's unique index has the final word
        if self.store.find_by_email(&request.email).await?.is_some() {
            return Err(AccountError::Conflict);
        }

        let password_hash = self.credentials.hash(&request.password)?;
        let account = self
            .store
            .create(NewAccount {
                name: request.name,
                email: request.email,
                password_hash,
                provider: request.provider,
                avatar_id: request.avatar_id,
            })
            .await?;

        info!("Account created: id={}, email={}", account.id, account.email);
        Ok(AccountSummary::from(&account))
    }

    /// Apply a partial profile update on behalf of `actor`.
    ///
    /// Guards run in order and the first failure ends the request; nothing is
    /// written unless every guard passed.
    pub async fn update(&self, actor: AccountId, payload: Value) -> AccountResult<AccountProfile> {
        let mut stage = UpdateStage::Received;

        let result = self.run_update(actor, payload, &mut stage).await;
        match &result {
            Ok(profile) => info!(
                "Account updated: id={}, name={}, avatar={:?}",
                profile.id,
                profile.name,
                profile.avatar.as_ref().map(|a| a.id)
            ),
            Err(AccountError::Internal(detail)) => {
                warn!("Account update {} failed after {}: {}", actor, stage, detail)
            }
            Err(e) => info!("Account update {} rejected after {}: {:?}", actor, stage, e.kind()),
        }

        result
    }

    async fn run_update(
        &self,
        actor: AccountId,
        payload: Value,
        stage: &mut UpdateStage,
    ) -> AccountResult<AccountProfile> {
        let changes = validate_update(payload)?;
        advance(stage, UpdateStage::Validated);

        let account = self.store.find_by_id(actor).await?.ok_or(AccountError::NotFound)?;

        self.check_email(&account, changes.email.as_deref()).await?;
        advance(stage, UpdateStage::EmailChecked);

        self.check_credential(&account, changes.old_password.as_deref())?;
        advance(stage, UpdateStage::CredentialChecked);

        let update = changes.prepare(self.credentials.as_ref())?;
        if !update.is_empty() {
            self.store.update(account.id, update).await?;
        }
        advance(stage, UpdateStage::Applied);

        let profile = self.profile(actor).await?;
        advance(stage, UpdateStage::Projected);

        Ok(profile)
    }

    /// Uniqueness guard: only a changed email is looked up.
    async fn check_email(&self, account: &Account, email: Option<&str>) -> AccountResult<()> {
        let email = match email {
            Some(email) if email != account.email => email,
            _ => return Ok(()),
        };

        match self.store.find_by_email(email).await? {
            Some(owner) if owner.id != account.id => Err(AccountError::Conflict),
            _ => Ok(()),
        }
    }

    /// Credential guard: the current password must verify before it may change.
    fn check_credential(&self, account: &Account, old_password: Option<&str>) -> AccountResult<()> {
        match old_password {
            Some(password) if !self.credentials.verify(password, &account.password_hash) => {
                Err(AccountError::Authentication)
            }
            _ => Ok(()),
        }
    }

    /// Re-read the account and resolve its avatar reference.
    pub async fn profile(&self, id: AccountId) -> AccountResult<AccountProfile> {
        let account = self.store.find_by_id(id).await?.ok_or(AccountError::NotFound)?;

        let avatar = match account.avatar_id {
            Some(file_id) => self.files.find_file(file_id).await?.map(|file| {
                AvatarView::from_file(&file, &self.files_base_url)
            }),
            None => None,
        };
        if account.avatar_id.is_some() && avatar.is_none() {
            debug!("Account {} references missing avatar {:?}", account.id, account.avatar_id);
        }

        Ok(AccountProfile {
            id: account.id,
            name: account.name,
            email: account.email,
            avatar,
        })
    }
}

fn validate_update(payload: Value) -> AccountResult<AccountChanges> {
    Schema::update_account().validate(&payload).map_err(|e| {
        debug!("Update rejected: {}", e);
        AccountError::from(e)
    })?;

    serde_json::from_value(payload)
        .map_err(|e| AccountError::Internal(format!("validated payload did not decode: {}", e)))
}

fn advance(stage: &mut UpdateStage, next: UpdateStage) {
    debug!("Account update: {} -> {}", stage, next);
    *stage = next;
}
