use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cardbar::{
    AppState, Config, Ledger, backup,
    db::init_pool,
    handlers,
    nfc::{NfcReader, NoHardware},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cardbar=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse configuration
    let config = Arc::new(Config::parse());
    let policy = config.ledger_policy()?;

    // Initialize database
    let pool = init_pool(&config.database_url).await?;
    let ledger = Ledger::new(pool.clone(), policy);

    let provisioned = ledger.provision_master_keys().await?;
    if provisioned > 0 {
        tracing::info!("Provisioned {} master key card(s)", provisioned);
    }
    tracing::info!(
        "Minimum balance: {}, master keys: {}",
        ledger.policy().min_balance,
        ledger.policy().master_keys.len()
    );

    // No reader driver is bundled; scans arrive through the CardSource trait
    let nfc = Arc::new(NfcReader::new(Arc::new(NoHardware), config.nfc_poll_interval()));
    let scan = nfc.start_continuous(|card_id| tracing::info!("Card presented: {}", card_id));

    let backups = config
        .backup_dir
        .clone()
        .map(|dir| backup::spawn_backups(pool.clone(), dir, config.backup_interval()));

    // Create shared state
    let state = AppState {
        ledger,
        config: config.clone(),
        nfc: nfc.clone(),
    };

    let app = handlers::router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.socket_addr()).await?;

    tracing::info!("Server running on {}", config.socket_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    tracing::info!("Shutting down");
    nfc.stop(scan).await;
    if let Some(task) = backups {
        task.abort();
    }
    pool.close().await;

    Ok(())
}
