use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use thiserror::Error;

use crate::error::StoreError;
use crate::models::Lot;

#[derive(Debug, Error)]
pub enum SellError {
    #[error("not enough to sell: {available:.4} available")]
    NotEnough { available: f64 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct SellResult {
    pub sold: f64,
    pub remaining: f64,
}

/// Purchase diary: chat id -> recorded buy lots, persisted to its own JSON
/// file next to the alert state. Sells consume lots oldest-first.
#[derive(Debug)]
pub struct PortfolioStore {
    path: PathBuf,
    lots: HashMap<String, Vec<Lot>>,
}

impl PortfolioStore {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        if !path.exists() {
            return Ok(Self {
                path,
                lots: HashMap::new(),
            });
        }

        let raw = fs::read_to_string(&path)?;
        if raw.trim().is_empty() {
            return Ok(Self {
                path,
                lots: HashMap::new(),
            });
        }

        let lots = serde_json::from_str::<HashMap<String, Vec<Lot>>>(&raw).map_err(|e| {
            StoreError::CorruptState {
                path: path.clone(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self { path, lots })
    }

    pub fn record_buy(
        &mut self,
        chat_id: &str,
        coin: &str,
        amount_usd: f64,
        price_per_coin: f64,
    ) -> Result<Lot, StoreError> {
        let lot = Lot {
            coin: coin.to_lowercase(),
            amount_usd,
            price_per_coin,
            quantity: amount_usd / price_per_coin,
            created_at: Utc::now().timestamp(),
        };

        self.lots
            .entry(chat_id.to_string())
            .or_default()
            .push(lot.clone());
        self.persist()?;

        Ok(lot)
    }

    /// Sells `quantity` of `coin` (or everything, when `None`), consuming
    /// lots FIFO. Rejects oversell before touching anything.
    pub fn record_sell(
        &mut self,
        chat_id: &str,
        coin: &str,
        quantity: Option<f64>,
    ) -> Result<SellResult, SellError> {
        let coin = coin.to_lowercase();
        let available = self.total_quantity(chat_id, &coin);
        let wanted = quantity.unwrap_or(available);

        if available <= 0.0 || wanted > available {
            return Err(SellError::NotEnough { available });
        }

        let Some(user_lots) = self.lots.get_mut(chat_id) else {
            return Err(SellError::NotEnough { available: 0.0 });
        };

        let mut remaining_to_sell = wanted;
        user_lots.retain_mut(|lot| {
            if lot.coin != coin || remaining_to_sell <= 0.0 {
                return true;
            }

            if remaining_to_sell >= lot.quantity {
                remaining_to_sell -= lot.quantity;
                false
            } else {
                lot.quantity -= remaining_to_sell;
                remaining_to_sell = 0.0;
                true
            }
        });

        if user_lots.is_empty() {
            self.lots.remove(chat_id);
        }

        self.persist().map_err(SellError::Store)?;

        Ok(SellResult {
            sold: wanted,
            remaining: self.total_quantity(chat_id, &coin),
        })
    }

    pub fn history(&self, chat_id: &str) -> Vec<Lot> {
        self.lots.get(chat_id).cloned().unwrap_or_default()
    }

    /// Per-coin holdings summary, sorted by coin id.
    pub fn holdings(&self, chat_id: &str) -> Vec<(String, f64)> {
        let mut by_coin: HashMap<String, f64> = HashMap::new();
        for lot in self.lots.get(chat_id).into_iter().flatten() {
            *by_coin.entry(lot.coin.clone()).or_default() += lot.quantity;
        }

        let mut out: Vec<(String, f64)> = by_coin.into_iter().collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    pub fn total_quantity(&self, chat_id: &str, coin: &str) -> f64 {
        self.lots
            .get(chat_id)
            .into_iter()
            .flatten()
            .filter(|l| l.coin == coin)
            .map(|l| l.quantity)
            .sum()
    }

    fn persist(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&self.lots)?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(name: &str) -> PortfolioStore {
        let path = std::env::temp_dir().join(format!(
            "cryptoping-portfolio-{name}-{}.json",
            std::process::id()
        ));
        let _ = fs::remove_file(&path);
        PortfolioStore::load(path).unwrap()
    }

    #[test]
    fn empty_file_loads_as_empty_portfolio() {
        let path = std::env::temp_dir().join(format!(
            "cryptoping-portfolio-emptyfile-{}.json",
            std::process::id()
        ));
        fs::write(&path, "").unwrap();

        let store = PortfolioStore::load(&path).unwrap();
        assert!(store.history("1").is_empty());
    }

    #[test]
    fn sell_consumes_lots_fifo() {
        let mut store = temp_store("fifo");
        store.record_buy("1", "bitcoin", 100.0, 50.0).unwrap(); // 2.0
        store.record_buy("1", "bitcoin", 300.0, 100.0).unwrap(); // 3.0

        let res = store.record_sell("1", "bitcoin", Some(2.5)).unwrap();
        assert_eq!(res.sold, 2.5);
        assert!((res.remaining - 2.5).abs() < 1e-9);

        // First lot gone, second partially consumed.
        let lots = store.history("1");
        assert_eq!(lots.len(), 1);
        assert_eq!(lots[0].price_per_coin, 100.0);
        assert!((lots[0].quantity - 2.5).abs() < 1e-9);
    }

    #[test]
    fn oversell_is_rejected_without_mutation() {
        let mut store = temp_store("oversell");
        store.record_buy("1", "sui", 10.0, 2.0).unwrap(); // 5.0

        let err = store.record_sell("1", "sui", Some(6.0)).unwrap_err();
        assert!(matches!(err, SellError::NotEnough { .. }));
        assert_eq!(store.total_quantity("1", "sui"), 5.0);
    }

    #[test]
    fn sell_max_empties_the_coin() {
        let mut store = temp_store("max");
        store.record_buy("1", "sui", 10.0, 2.0).unwrap();
        store.record_buy("1", "bitcoin", 100.0, 50.0).unwrap();

        let res = store.record_sell("1", "sui", None).unwrap();
        assert_eq!(res.remaining, 0.0);
        assert_eq!(store.total_quantity("1", "bitcoin"), 2.0);
    }
}
