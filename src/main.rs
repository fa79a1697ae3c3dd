use std::{fs::File, io::BufWriter, sync::Arc};

use clap::Parser;
use sheetledger::{
    api::{self, AppState},
    config::{CliArgs, Command, Config},
    error::AppError,
    render, telemetry,
};
use sheetledger_core::{export, CredentialVerifier, LedgerStore};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = CliArgs::parse();
    let config = Config::load(&cli)?;
    telemetry::init_tracing(&config.logging);

    let store = Arc::new(LedgerStore::new(config.storage.open()?));

    match cli.command.clone().unwrap_or(Command::Serve) {
        Command::Serve => serve(&config, store).await,
        Command::List { owner } => {
            let ledger = store.open_or_create(&owner)?;
            render::entries_table(&store.list_entries(&ledger)?)?.printstd();
            Ok(())
        }
        Command::Report { owner } => {
            let ledger = store.open_or_create(&owner)?;
            render::report_table(&store.monthly_report(&ledger)?).printstd();
            Ok(())
        }
        Command::Export { owner, output } => {
            let ledger = store.open_or_create(&owner)?;
            let entries = store.list_entries(&ledger)?;
            let path = output.unwrap_or_else(|| export::export_file_name(&owner).into());
            export::write_csv(&entries, BufWriter::new(File::create(&path)?))?;
            tracing::info!(owner = %owner, path = %path.display(), rows = entries.len(), "Ledger exported");
            Ok(())
        }
    }
}

async fn serve(config: &Config, store: Arc<LedgerStore>) -> Result<(), AppError> {
    let metrics = telemetry::install_metrics()?;

    let credentials = config.credentials();
    if credentials.is_empty() {
        tracing::warn!("No users configured; every ledger request will be rejected");
    } else {
        tracing::info!(users = credentials.len(), "Credentials loaded");
    }
    let verifier: Arc<dyn CredentialVerifier> = Arc::new(credentials);

    let state = AppState::new(store, config.ledger_scope(), Some(metrics));
    let app = api::router(state, verifier);

    let addr = config.listen_addr()?;
    tracing::info!(%addr, "SheetLedger API listening");

    axum::Server::try_bind(&addr)
        .map_err(|e| AppError::Server(e.to_string()))?
        .serve(app.into_make_service())
        .await
        .map_err(|e| AppError::Server(e.to_string()))
}
