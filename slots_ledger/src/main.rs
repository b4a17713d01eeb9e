use std::sync::Arc;

use slots_ledger::{connect, init_db, router, LedgerState, DEFAULT_STARTING_BALANCE};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let db = connect(
        &std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://slots_ledger.db".to_string()),
    )
    .await?;
    init_db(&db).await?;

    let starting_balance = match std::env::var("STARTING_BALANCE") {
        Ok(v) => v.parse()?,
        Err(_) => DEFAULT_STARTING_BALANCE,
    };
    let state = Arc::new(LedgerState {
        db,
        starting_balance,
    });

    let addr = std::env::var("BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(starting_balance, "ledger listening on {addr}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
