//! Telegram command interface. Thin glue: each command parses into a
//! [`Command`] and ends up as store calls; all the alerting logic lives in
//! the services.

use std::time::Duration;

use tracing::{info, warn};

use crate::models::{Alert, Direction};
use crate::services::coingecko::display_name;
use crate::services::portfolio_service::SellError;
use crate::AppState;

const USAGE: &str = "Commands:\n\
    /price <coin> - current price\n\
    /above <coin> <price> - alert when the price rises to <price>\n\
    /below <coin> <price> - alert when the price drops to <price>\n\
    /alerts - list your active alerts\n\
    /cancel <coin> <above|below> <price> - remove an alert\n\
    /buy <coin> <amount_usd> - log a purchase\n\
    /sell <coin> <quantity|max> - log a sale\n\
    /history - your purchase diary\n\
    \n\
    Coins are CoinGecko ids, e.g. bitcoin, sui, the-open-network.";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Price { coin: String },
    SetAlert { coin: String, direction: Direction, target: f64 },
    ListAlerts,
    Cancel { coin: String, direction: Direction, target: f64 },
    Buy { coin: String, amount_usd: f64 },
    /// `quantity: None` means "max": sell everything.
    Sell { coin: String, quantity: Option<f64> },
    History,
}

/// Parses one message into a command. `Err` carries the reply text for the
/// user; the bot never treats bad input as an internal error.
pub fn parse_command(text: &str) -> Result<Command, String> {
    let mut parts = text.split_whitespace();
    let head = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    match head {
        "/start" | "/help" => Ok(Command::Start),
        "/price" => match args.as_slice() {
            &[coin] => Ok(Command::Price { coin: coin.to_lowercase() }),
            _ => Err("Usage: /price <coin>\nExample: /price bitcoin".to_string()),
        },
        "/above" | "/below" => {
            let direction = if head == "/above" {
                Direction::Above
            } else {
                Direction::Below
            };
            match args.as_slice() {
                &[coin, price] => {
                    let target = parse_price(price)?;
                    Ok(Command::SetAlert {
                        coin: coin.to_lowercase(),
                        direction,
                        target,
                    })
                }
                _ => Err(format!(
                    "Usage: {head} <coin> <price>\nExample: {head} bitcoin 90000"
                )),
            }
        }
        "/alerts" => Ok(Command::ListAlerts),
        "/cancel" => match args.as_slice() {
            &[coin, direction, price] => {
                let direction = match direction {
                    "above" => Direction::Above,
                    "below" => Direction::Below,
                    _ => return Err("Direction must be 'above' or 'below'.".to_string()),
                };
                let target = parse_price(price)?;
                Ok(Command::Cancel {
                    coin: coin.to_lowercase(),
                    direction,
                    target,
                })
            }
            _ => Err("Usage: /cancel <coin> <above|below> <price>".to_string()),
        },
        "/buy" => match args.as_slice() {
            &[coin, amount] => {
                let amount_usd = parse_price(amount)?;
                Ok(Command::Buy {
                    coin: coin.to_lowercase(),
                    amount_usd,
                })
            }
            _ => Err("Usage: /buy <coin> <amount_usd>\nExample: /buy bitcoin 100".to_string()),
        },
        "/sell" => match args.as_slice() {
            &[coin, qty] => {
                let quantity = if qty.eq_ignore_ascii_case("max") {
                    None
                } else {
                    Some(parse_price(qty)?)
                };
                Ok(Command::Sell {
                    coin: coin.to_lowercase(),
                    quantity,
                })
            }
            _ => Err("Usage: /sell <coin> <quantity|max>\nExample: /sell bitcoin 0.5".to_string()),
        },
        "/history" => Ok(Command::History),
        _ => Err(USAGE.to_string()),
    }
}

fn parse_price(raw: &str) -> Result<f64, String> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Ok(v),
        _ => Err("Invalid price. Please enter a valid positive number.".to_string()),
    }
}

/// Long-poll loop: fetch updates, dispatch each message, reply. Errors are
/// logged and the loop keeps going.
pub async fn run_bot(state: AppState) {
    info!("bot command loop started");
    let mut offset: i64 = 0;

    loop {
        let updates = match state.telegram.get_updates(offset, 30).await {
            Ok(u) => u,
            Err(e) => {
                warn!("getUpdates failed: {e}");
                tokio::time::sleep(Duration::from_secs(5)).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);

            let Some(message) = update.message else { continue };
            let Some(text) = message.text else { continue };
            let chat_id = message.chat.id.to_string();

            let reply = match parse_command(&text) {
                Ok(cmd) => handle_command(&state, &chat_id, cmd).await,
                Err(reply) => reply,
            };

            if let Err(e) = state.telegram.send_message(&chat_id, &reply).await {
                warn!(chat_id = %chat_id, "reply delivery failed: {e}");
            }
        }
    }
}

async fn handle_command(state: &AppState, chat_id: &str, cmd: Command) -> String {
    match cmd {
        Command::Start => USAGE.to_string(),

        Command::Price { coin } => match state
            .gecko
            .spot_price(&coin, &state.settings.vs_currency)
            .await
        {
            Ok(Some(price)) => format!("{} price: ${price:.2} USD", display_name(&coin)),
            Ok(None) => format!("Unknown coin '{coin}'. Use a CoinGecko id, e.g. bitcoin."),
            Err(e) => {
                warn!("price lookup failed: {e}");
                format!("Failed to retrieve the {} price.", display_name(&coin))
            }
        },

        Command::SetAlert { coin, direction, target } => {
            let alert = Alert::new(&coin, direction, target);
            match state.store.lock().await.add(chat_id, alert) {
                Ok(()) => format!(
                    "You will be notified if the {} price goes {} ${:.2}",
                    display_name(&coin),
                    direction,
                    target
                ),
                Err(e) => {
                    warn!(chat_id = %chat_id, "failed to save alert: {e}");
                    "Could not save your alert, please try again.".to_string()
                }
            }
        }

        Command::ListAlerts => {
            let alerts = state.store.lock().await.alerts_for(chat_id);
            if alerts.is_empty() {
                return "You have no active alerts.".to_string();
            }

            let mut out = String::from("Your active alerts:\n");
            for a in alerts {
                out.push_str(&format!(
                    "- {} {} ${:.2}\n",
                    display_name(&a.coin),
                    a.direction,
                    a.target_price
                ));
            }
            out
        }

        Command::Cancel { coin, direction, target } => {
            let alert = Alert::new(&coin, direction, target);
            match state.store.lock().await.remove(chat_id, &alert) {
                Ok(true) => format!(
                    "Removed the {} {} ${:.2} alert.",
                    display_name(&coin),
                    direction,
                    target
                ),
                Ok(false) => "No matching alert found.".to_string(),
                Err(e) => {
                    warn!(chat_id = %chat_id, "failed to remove alert: {e}");
                    "Could not remove your alert, please try again.".to_string()
                }
            }
        }

        Command::Buy { coin, amount_usd } => {
            let price = match state
                .gecko
                .spot_price(&coin, &state.settings.vs_currency)
                .await
            {
                Ok(Some(p)) => p,
                Ok(None) => {
                    return format!("Unknown coin '{coin}'. Use a CoinGecko id, e.g. bitcoin.");
                }
                Err(e) => {
                    warn!("price lookup failed: {e}");
                    return format!("Failed to fetch the current {} price.", display_name(&coin));
                }
            };

            match state
                .portfolio
                .lock()
                .await
                .record_buy(chat_id, &coin, amount_usd, price)
            {
                Ok(lot) => format!(
                    "✅ Logged Buy:\nCoin: {}\nAmount: ${:.2}\nPrice: ${:.2}\nQuantity: {:.4}",
                    display_name(&coin),
                    lot.amount_usd,
                    lot.price_per_coin,
                    lot.quantity
                ),
                Err(e) => {
                    warn!(chat_id = %chat_id, "failed to record buy: {e}");
                    "Could not record your purchase, please try again.".to_string()
                }
            }
        }

        Command::Sell { coin, quantity } => {
            let price = match state
                .gecko
                .spot_price(&coin, &state.settings.vs_currency)
                .await
            {
                Ok(Some(p)) => p,
                Ok(None) => {
                    return format!("Unknown coin '{coin}'. Use a CoinGecko id, e.g. bitcoin.");
                }
                Err(e) => {
                    warn!("price lookup failed: {e}");
                    return "❌ Failed to retrieve the current price. Try again later.".to_string();
                }
            };

            match state
                .portfolio
                .lock()
                .await
                .record_sell(chat_id, &coin, quantity)
            {
                Ok(res) => format!(
                    "🔴 Sold {:.4} {}\nAt price: ${:.2} per coin\nTotal: ${:.2}\nRemaining: {:.4}",
                    res.sold,
                    display_name(&coin),
                    price,
                    res.sold * price,
                    res.remaining
                ),
                Err(SellError::NotEnough { available }) => format!(
                    "❌ You don't have enough {}. You have {available:.4}.",
                    display_name(&coin)
                ),
                Err(SellError::Store(e)) => {
                    warn!(chat_id = %chat_id, "failed to record sell: {e}");
                    "Could not record your sale, please try again.".to_string()
                }
            }
        }

        Command::History => {
            let portfolio = state.portfolio.lock().await;
            let lots = portfolio.history(chat_id);
            if lots.is_empty() {
                return "🗒 Your purchase diary is empty.".to_string();
            }

            let mut out = String::from("📗 Your Purchase Diary:\n\n");
            for lot in &lots {
                out.push_str(&format!(
                    "Coin: {}\nBought for: ${:.2}\nPrice per coin: ${:.2}\nQuantity: {:.4}\n\n",
                    display_name(&lot.coin),
                    lot.amount_usd,
                    lot.price_per_coin,
                    lot.quantity
                ));
            }

            out.push_str("📊 Current Holdings:\n");
            for (coin, qty) in portfolio.holdings(chat_id) {
                out.push_str(&format!("{}: {qty:.4}\n", display_name(&coin)));
            }
            out
        }
    }
}
