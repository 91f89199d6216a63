use serde::{Deserialize, Serialize};

/// Which way the price has to cross the target before the alert fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Above,
    Below,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Above => "above",
            Direction::Below => "below",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pending price threshold for one chat. Immutable once created; it is
/// removed from the store the moment its condition is observed, or when the
/// user cancels it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub coin: String,
    pub direction: Direction,
    pub target_price: f64,

    pub created_at: i64,
}

impl Alert {
    pub fn new(coin: &str, direction: Direction, target_price: f64) -> Self {
        Self {
            coin: coin.to_lowercase(),
            direction,
            target_price,
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    /// True when `price` satisfies the threshold. Boundary equality counts:
    /// `above` fires at `price >= target`, `below` at `price <= target`.
    pub fn fires(&self, price: f64) -> bool {
        match self.direction {
            Direction::Above => price >= self.target_price,
            Direction::Below => price <= self.target_price,
        }
    }

    /// Identity match used for removal: coin + direction + exact target.
    pub fn same_threshold(&self, other: &Alert) -> bool {
        self.coin == other.coin
            && self.direction == other.direction
            && self.target_price == other.target_price
    }
}
