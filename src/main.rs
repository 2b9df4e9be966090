use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rust_accounts::cli::{self, Cli, Commands};
use rust_accounts::config::ServiceConfig;
use rust_accounts::rpc::RpcServer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = ServiceConfig::load_or_default(&cli.config);

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let service = cli::build_service(&config)?;

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            let mut config = config;
            if let Some(port) = port {
                config.server.rpc_port = port;
            }
            info!("Account service starting (db: {})", config.storage.db_path);
            RpcServer::new(service, config.listen_addr()).start().await?;
        }
        Commands::Account { cmd } => {
            cli::account::handle_account_command(&service, cmd).await;
        }
    }

    Ok(())
}
