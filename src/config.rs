use std::env;

#[derive(Debug, Clone)]
pub struct Settings {
    pub telegram_bot_token: String,
    pub coingecko_api_key: Option<String>,
    pub vs_currency: String,

    pub state_file: String,
    pub portfolio_file: String,

    pub poll_interval_secs: u64,

    /// When the state file is corrupt at startup, move it aside and start
    /// with an empty store instead of exiting.
    pub start_fresh: bool,
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let telegram_bot_token = env::var("TELEGRAM_BOT_TOKEN").unwrap_or_default();

    let coingecko_api_key = env::var("COINGECKO_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty());

    let vs_currency = env::var("VS_CURRENCY").unwrap_or_else(|_| "usd".to_string());

    let state_file = env::var("STATE_FILE").unwrap_or_else(|_| "alerts.json".to_string());

    let portfolio_file =
        env::var("PORTFOLIO_FILE").unwrap_or_else(|_| "portfolio.json".to_string());

    let poll_interval_secs = env::var("POLL_INTERVAL_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|&secs| secs > 0)
        .unwrap_or(60);

    let start_fresh = env::var("START_FRESH")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    Settings {
        telegram_bot_token,
        coingecko_api_key,
        vs_currency,
        state_file,
        portfolio_file,
        poll_interval_secs,
        start_fresh,
    }
}
