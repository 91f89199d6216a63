use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time;
use tracing::{error, info, warn};

use crate::error::{DeliveryError, PriceFetchError};
use crate::models::Alert;
use crate::services::coingecko::{self, CoinGeckoClient, PriceMap};
use crate::services::telegram::TelegramClient;
use crate::services::alert_store::AlertStore;
use crate::AppState;

/// Seam over the quote API so ticks can run against a canned source in tests.
#[allow(async_fn_in_trait)]
pub trait PriceSource {
    async fn fetch_prices(
        &self,
        ids: &[String],
        vs_currency: &str,
    ) -> Result<PriceMap, PriceFetchError>;
}

impl PriceSource for CoinGeckoClient {
    async fn fetch_prices(
        &self,
        ids: &[String],
        vs_currency: &str,
    ) -> Result<PriceMap, PriceFetchError> {
        self.simple_price(ids, vs_currency).await
    }
}

/// Seam over message delivery, same idea.
#[allow(async_fn_in_trait)]
pub trait Notifier {
    async fn send(&self, chat_id: &str, text: &str) -> Result<(), DeliveryError>;
}

impl Notifier for TelegramClient {
    async fn send(&self, chat_id: &str, text: &str) -> Result<(), DeliveryError> {
        self.send_message(chat_id, text).await
    }
}

/// A threshold whose condition was observed this tick, with the price that
/// tripped it.
#[derive(Debug, Clone)]
pub struct Fired {
    pub chat_id: String,
    pub alert: Alert,
    pub price: f64,
}

pub fn spawn_price_alert_monitor(state: AppState) {
    tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_secs(state.settings.poll_interval_secs));

        loop {
            interval.tick().await;

            // Single-flight: at most one tick in flight per process. The
            // awaited loop body already guarantees that here, but the guard
            // keeps the invariant explicit if ticks ever move off this task.
            let Ok(_running) = state.tick_gate.try_lock() else {
                warn!("previous alert tick still running, skipping this one");
                continue;
            };

            if let Err(e) = run_tick(
                &state.store,
                &state.gecko,
                &state.telegram,
                &state.settings.vs_currency,
            )
            .await
            {
                // Transient by contract: skip this tick, retry at the next
                // scheduled interval. No threshold was touched.
                warn!("price fetch failed, skipping tick: {e}");
            }
        }
    });
}

/// One complete evaluation cycle: snapshot -> fetch -> compare -> notify.
///
/// Fetch completes fully before any comparison; all comparisons complete
/// before the first notification goes out. A `PriceFetchError` aborts the
/// whole tick with the store untouched; delivery and persistence failures
/// are logged per threshold and never stop the rest.
pub async fn run_tick<P: PriceSource, N: Notifier>(
    store: &Mutex<AlertStore>,
    prices: &P,
    notifier: &N,
    vs_currency: &str,
) -> Result<(), PriceFetchError> {
    let snapshot = store.lock().await.list_all();
    if snapshot.is_empty() {
        // Nothing to evaluate; don't burn an API call.
        return Ok(());
    }

    let mut ids: Vec<String> = snapshot
        .values()
        .flatten()
        .map(|a| a.coin.clone())
        .collect();
    ids.sort();
    ids.dedup();

    let price_map = prices.fetch_prices(&ids, vs_currency).await?;

    // The logfilter utility parses exactly this line; keep the shape stable.
    info!(
        "Prices updated at {} UTC -> {}",
        Utc::now().format("%Y-%m-%d %H:%M:%S"),
        serde_json::to_string(&price_map).unwrap_or_default()
    );

    let current = flatten_prices(&price_map, vs_currency);
    let fired = evaluate(&snapshot, &current);

    for f in &fired {
        let msg = format!(
            "{} price is {} ${:.2}: Current price is ${:.2}",
            coingecko::display_name(&f.alert.coin),
            f.alert.direction,
            f.alert.target_price,
            f.price
        );

        if let Err(e) = notifier.send(&f.chat_id, &msg).await {
            warn!(chat_id = %f.chat_id, "alert delivery failed: {e}");
        }

        // A fired threshold is used up whether or not delivery worked: a
        // missed notification beats re-sending it every tick.
        if let Err(e) = store.lock().await.remove(&f.chat_id, &f.alert) {
            error!(chat_id = %f.chat_id, "failed to persist alert removal: {e}");
        }
    }

    Ok(())
}

/// Pure comparison pass. Thresholds whose coin is missing from `current`
/// (partial fetch) are skipped untouched; everything else fires on
/// `>=` / `<=` per direction. Users are visited in sorted order, each
/// user's alerts in store insertion order.
pub fn evaluate(
    snapshot: &HashMap<String, Vec<Alert>>,
    current: &HashMap<String, f64>,
) -> Vec<Fired> {
    let mut chat_ids: Vec<&String> = snapshot.keys().collect();
    chat_ids.sort();

    let mut fired = Vec::new();
    for chat_id in chat_ids {
        for alert in &snapshot[chat_id] {
            let Some(&price) = current.get(&alert.coin) else {
                continue;
            };

            if alert.fires(price) {
                fired.push(Fired {
                    chat_id: chat_id.clone(),
                    alert: alert.clone(),
                    price,
                });
            }
        }
    }

    fired
}

/// Reduces the nested CoinGecko response to coin -> price in the reference
/// currency. Coins quoted without that currency, or with a non-finite or
/// non-positive quote (delisted coins report 0.0), count as missing so their
/// thresholds are left alone.
pub fn flatten_prices(map: &PriceMap, vs_currency: &str) -> HashMap<String, f64> {
    map.iter()
        .filter_map(|(coin, by_currency)| {
            by_currency
                .get(vs_currency)
                .filter(|&&price| price.is_finite() && price > 0.0)
                .map(|&price| (coin.clone(), price))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Direction;

    fn snapshot_with(chat_id: &str, alerts: Vec<Alert>) -> HashMap<String, Vec<Alert>> {
        let mut map = HashMap::new();
        map.insert(chat_id.to_string(), alerts);
        map
    }

    #[test]
    fn missing_coin_is_skipped() {
        let snapshot = snapshot_with(
            "1",
            vec![Alert::new("bitcoin", Direction::Above, 100.0)],
        );
        let current = HashMap::from([("sui".to_string(), 5.0)]);

        assert!(evaluate(&snapshot, &current).is_empty());
    }

    #[test]
    fn above_and_below_fire_independently_same_tick() {
        let snapshot = snapshot_with(
            "1",
            vec![
                Alert::new("bitcoin", Direction::Above, 90_000.0),
                Alert::new("bitcoin", Direction::Below, 95_000.0),
            ],
        );
        let current = HashMap::from([("bitcoin".to_string(), 91_000.0)]);

        let fired = evaluate(&snapshot, &current);
        assert_eq!(fired.len(), 2);
        assert_eq!(fired[0].alert.direction, Direction::Above);
        assert_eq!(fired[1].alert.direction, Direction::Below);
    }

    #[test]
    fn duplicate_thresholds_each_fire() {
        let snapshot = snapshot_with(
            "1",
            vec![
                Alert::new("sui", Direction::Below, 3.0),
                Alert::new("sui", Direction::Below, 3.0),
            ],
        );
        let current = HashMap::from([("sui".to_string(), 2.5)]);

        assert_eq!(evaluate(&snapshot, &current).len(), 2);
    }

    #[test]
    fn zero_quote_does_not_fire_below_thresholds() {
        let snapshot = snapshot_with(
            "1",
            vec![Alert::new("bitcoin", Direction::Below, 50_000.0)],
        );

        // A delisted coin comes back as 0.0; treat it as missing, not as a
        // price that satisfies every below threshold.
        let map: PriceMap = HashMap::from([(
            "bitcoin".to_string(),
            HashMap::from([("usd".to_string(), 0.0)]),
        )]);

        let current = flatten_prices(&map, "usd");
        assert!(!current.contains_key("bitcoin"));
        assert!(evaluate(&snapshot, &current).is_empty());
    }

    #[test]
    fn non_finite_quotes_are_dropped() {
        let map: PriceMap = HashMap::from([(
            "bitcoin".to_string(),
            HashMap::from([("usd".to_string(), f64::NAN)]),
        )]);

        assert!(flatten_prices(&map, "usd").is_empty());
    }

    #[test]
    fn flatten_drops_other_currencies() {
        let map: PriceMap = HashMap::from([
            (
                "bitcoin".to_string(),
                HashMap::from([("usd".to_string(), 91_000.0)]),
            ),
            (
                "sui".to_string(),
                HashMap::from([("eur".to_string(), 2.0)]),
            ),
        ]);

        let flat = flatten_prices(&map, "usd");
        assert_eq!(flat.get("bitcoin"), Some(&91_000.0));
        assert!(!flat.contains_key("sui"));
    }
}
