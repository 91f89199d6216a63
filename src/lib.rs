//! Library entrypoint for cryptoping.
//!
//! Exists mainly so the integration tests under `tests/` can drive the store
//! and the evaluator directly, without a Telegram token or network access.

use std::sync::Arc;

use tokio::sync::Mutex;

pub mod bot;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

use services::alert_store::AlertStore;
use services::coingecko::CoinGeckoClient;
use services::portfolio_service::PortfolioStore;
use services::telegram::TelegramClient;

#[derive(Clone)]
pub struct AppState {
    pub settings: config::Settings,

    /// Single-writer discipline: bot commands and monitor ticks both go
    /// through this lock before touching the state file.
    pub store: Arc<Mutex<AlertStore>>,
    pub portfolio: Arc<Mutex<PortfolioStore>>,

    pub gecko: CoinGeckoClient,
    pub telegram: TelegramClient,

    /// Held for the duration of one evaluator tick (single-flight).
    pub tick_gate: Arc<Mutex<()>>,
}
