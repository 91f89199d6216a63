use serde::{Deserialize, Serialize};

/// One recorded purchase in the portfolio diary. Sells consume lots FIFO,
/// oldest first; a fully consumed lot is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    pub coin: String,

    pub amount_usd: f64,
    pub price_per_coin: f64,
    pub quantity: f64,

    pub created_at: i64,
}
