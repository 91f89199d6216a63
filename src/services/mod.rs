pub mod coingecko;
pub mod telegram;

pub mod alert_store;
pub mod alert_monitor;
pub mod portfolio_service;
