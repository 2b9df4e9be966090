//! Account management
//!
//! - Account records and their public projections
//! - Argon2 password credentials
//! - Persistence ports with an in-memory backend
//! - List, create and guarded update workflows

pub mod auth;
pub mod service;
pub mod store;
pub mod types;

pub use auth::{Argon2Credentials, Credentials};
pub use service::{AccountService, CreateAccountRequest, UpdateStage};
pub use store::{AccountChanges, AccountStore, FileLookup, MemoryStore};
pub use types::{Account, AccountId, AccountProfile, AccountSummary, AvatarView, File, FileId};
