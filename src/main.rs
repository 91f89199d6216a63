use std::process;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use cryptoping::error::StoreError;
use cryptoping::services::alert_monitor::spawn_price_alert_monitor;
use cryptoping::services::alert_store::AlertStore;
use cryptoping::services::coingecko::CoinGeckoClient;
use cryptoping::services::portfolio_service::PortfolioStore;
use cryptoping::services::telegram::TelegramClient;
use cryptoping::{AppState, bot, config};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let settings = config::load();

    if settings.telegram_bot_token.trim().is_empty() {
        error!("TELEGRAM_BOT_TOKEN is missing (set it in .env)");
        process::exit(1);
    }

    let store = load_alert_store(&settings);

    let portfolio = PortfolioStore::load(&settings.portfolio_file).unwrap_or_else(|e| {
        error!("cannot load portfolio state: {e}");
        process::exit(1);
    });

    let state = AppState {
        gecko: CoinGeckoClient::new(settings.coingecko_api_key.clone()),
        telegram: TelegramClient::new(settings.telegram_bot_token.clone()),
        store: Arc::new(Mutex::new(store)),
        portfolio: Arc::new(Mutex::new(portfolio)),
        tick_gate: Arc::new(Mutex::new(())),
        settings,
    };

    info!(
        interval_secs = state.settings.poll_interval_secs,
        state_file = %state.settings.state_file,
        "starting price alert monitor"
    );
    spawn_price_alert_monitor(state.clone());

    bot::run_bot(state).await;
}

/// Corrupt alert state is fatal unless START_FRESH is set, in which case the
/// bad file is moved aside (never deleted) and the bot starts empty.
fn load_alert_store(settings: &config::Settings) -> AlertStore {
    match AlertStore::load(&settings.state_file) {
        Ok(store) => store,
        Err(e @ StoreError::CorruptState { .. }) if settings.start_fresh => {
            let aside = format!("{}.corrupt", settings.state_file);
            warn!("{e}; START_FRESH is set, moving it to {aside}");

            if let Err(e) = std::fs::rename(&settings.state_file, &aside) {
                error!("could not move corrupt state file aside: {e}");
                process::exit(1);
            }

            AlertStore::load(&settings.state_file).unwrap_or_else(|e| {
                error!("cannot start with a fresh alert store: {e}");
                process::exit(1);
            })
        }
        Err(e) => {
            error!("cannot load alert state: {e} (set START_FRESH=1 to start over)");
            process::exit(1);
        }
    }
}
