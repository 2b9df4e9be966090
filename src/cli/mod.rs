pub mod account;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::account::{AccountService, Argon2Credentials};
use crate::config::ServiceConfig;
use crate::error::StoreError;
use crate::storage::Storage;

#[derive(Parser)]
#[command(name = "accounts")]
#[command(about = "User account service", long_about = None)]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(long, default_value = "accounts.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the JSON-RPC server (default)
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Account management against the local store
    Account {
        #[command(subcommand)]
        cmd: account::AccountCommands,
    },
}

/// Open the configured store and wire the account service on top of it.
pub fn build_service(config: &ServiceConfig) -> Result<Arc<AccountService>, StoreError> {
    let storage = if config.storage.temporary {
        Storage::temporary()?
    } else {
        Storage::open(&config.storage.db_path)?
    };
    let storage = Arc::new(storage);

    Ok(Arc::new(AccountService::new(
        storage.clone(),
        storage,
        Arc::new(Argon2Credentials),
        config.files.base_url.clone(),
    )))
}
