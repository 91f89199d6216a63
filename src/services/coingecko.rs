use std::collections::HashMap;

use reqwest::Client;

use crate::error::PriceFetchError;

const SIMPLE_PRICE_URL: &str = "https://api.coingecko.com/api/v3/simple/price";

/// Batched spot price map as CoinGecko returns it:
/// coin id -> { currency -> value }, e.g. `{"bitcoin": {"usd": 91000.0}}`.
pub type PriceMap = HashMap<String, HashMap<String, f64>>;

/// Human-facing name for a CoinGecko coin id. The well-known ids from the
/// bot's quick-pick menu get their ticker names; anything else is the id
/// with the first letter upcased.
pub fn display_name(coin_id: &str) -> String {
    match coin_id {
        "the-open-network" => "TON".to_string(),
        "bitcoin" => "Bitcoin".to_string(),
        "sui" => "SUI".to_string(),
        "binance-peg-xrp" => "XRP".to_string(),
        other => {
            let mut chars = other.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        }
    }
}

#[derive(Clone)]
pub struct CoinGeckoClient {
    http: Client,
    api_key: Option<String>,
}

impl CoinGeckoClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: Client::new(),
            api_key,
        }
    }

    /// Fetches current prices for all of `ids` in one request. `ids` should
    /// already be deduplicated; coins CoinGecko does not know are simply
    /// absent from the response, not an error.
    pub async fn simple_price(
        &self,
        ids: &[String],
        vs_currency: &str,
    ) -> Result<PriceMap, PriceFetchError> {
        let joined = ids.join(",");

        let mut req = self
            .http
            .get(SIMPLE_PRICE_URL)
            .query(&[("ids", joined.as_str()), ("vs_currencies", vs_currency)])
            .header("accept", "application/json");

        if let Some(key) = &self.api_key {
            req = req.header("x-cg-api-key", key);
        }

        let res = req.send().await?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(PriceFetchError::Status { status, body });
        }

        res.json::<PriceMap>()
            .await
            .map_err(|e| PriceFetchError::Body(e.to_string()))
    }

    /// Single-coin convenience for the `/price` command.
    pub async fn spot_price(
        &self,
        id: &str,
        vs_currency: &str,
    ) -> Result<Option<f64>, PriceFetchError> {
        let prices = self
            .simple_price(&[id.to_string()], vs_currency)
            .await?;

        Ok(prices
            .get(id)
            .and_then(|by_currency| by_currency.get(vs_currency))
            .copied())
    }
}
