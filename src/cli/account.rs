use crate::account::{AccountId, AccountService};
use clap::Subcommand;
use serde_json::{json, Map, Value};

#[derive(Subcommand)]
pub enum AccountCommands {
    /// List all accounts
    List,
    /// Register a new account
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Mark the account as externally provisioned
        #[arg(long, default_value = "false")]
        provider: bool,
    },
    /// Update name, email or password of an account
    Update {
        #[arg(long)]
        id: AccountId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        old_password: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        confirm_password: Option<String>,
    },
}

pub async fn handle_account_command(service: &AccountService, cmd: AccountCommands) {
    match cmd {
        AccountCommands::List => match service.list().await {
            Ok(accounts) => {
                for a in accounts {
                    println!("{}\t{}\t{}\tprovider={}", a.id, a.name, a.email, a.provider);
                }
            }
            Err(e) => println!("Failed to list accounts: {}", e),
        },
        AccountCommands::Create {
            name,
            email,
            password,
            provider,
        } => {
            let payload = json!({
                "name": name,
                "email": email,
                "password": password,
                "provider": provider,
            });
            match service.create(payload).await {
                Ok(account) => println!("Account '{}' created with id {}", account.name, account.id),
                Err(e) => println!("Failed to create account: {}", e),
            }
        }
        AccountCommands::Update {
            id,
            name,
            email,
            old_password,
            password,
            confirm_password,
        } => {
            let mut changes = Map::new();
            for (key, value) in [
                ("name", name),
                ("email", email),
                ("oldPassword", old_password),
                ("password", password),
                ("confirmPassword", confirm_password),
            ] {
                if let Some(value) = value {
                    changes.insert(key.to_string(), Value::String(value));
                }
            }

            match service.update(id, Value::Object(changes)).await {
                Ok(profile) => println!("Account {} updated: {} <{}>", profile.id, profile.name, profile.email),
                Err(e) => println!("Failed to update account: {}", e),
            }
        }
    }
}
