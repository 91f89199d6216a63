use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::error::StoreError;
use crate::models::Alert;

/// Durable mapping of chat id -> active alerts, backed by one JSON file.
///
/// The store is the sole owner of that file. Share it behind a
/// `tokio::sync::Mutex` so bot commands and the monitor tick never write
/// concurrently.
#[derive(Debug)]
pub struct AlertStore {
    path: PathBuf,
    alerts: HashMap<String, Vec<Alert>>,
}

impl AlertStore {
    /// Reads the persisted mapping. A missing or empty file means a fresh
    /// install and yields an empty store; a file with content that does not
    /// parse is `StoreError::CorruptState`, never silently dropped.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        if !path.exists() {
            return Ok(Self {
                path,
                alerts: HashMap::new(),
            });
        }

        let raw = fs::read_to_string(&path)?;
        if raw.trim().is_empty() {
            return Ok(Self {
                path,
                alerts: HashMap::new(),
            });
        }

        let alerts = serde_json::from_str::<HashMap<String, Vec<Alert>>>(&raw).map_err(|e| {
            StoreError::CorruptState {
                path: path.clone(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self { path, alerts })
    }

    /// Appends a threshold to the user's set and persists.
    pub fn add(&mut self, chat_id: &str, alert: Alert) -> Result<(), StoreError> {
        self.alerts
            .entry(chat_id.to_string())
            .or_default()
            .push(alert);
        self.persist()
    }

    /// Removes one threshold instance matched by identity (coin + direction +
    /// target). Returns whether anything was removed; removing an absent
    /// threshold is a no-op, not an error, so a double-fire race cannot blow
    /// up the tick.
    pub fn remove(&mut self, chat_id: &str, alert: &Alert) -> Result<bool, StoreError> {
        let Some(user_alerts) = self.alerts.get_mut(chat_id) else {
            return Ok(false);
        };

        let Some(idx) = user_alerts.iter().position(|a| a.same_threshold(alert)) else {
            return Ok(false);
        };

        user_alerts.remove(idx);
        if user_alerts.is_empty() {
            self.alerts.remove(chat_id);
        }

        self.persist()?;
        Ok(true)
    }

    /// Snapshot copy of the full mapping for the evaluator. Mutating the
    /// returned map never touches stored state.
    pub fn list_all(&self) -> HashMap<String, Vec<Alert>> {
        self.alerts.clone()
    }

    /// Snapshot of one user's alerts, insertion order preserved.
    pub fn alerts_for(&self, chat_id: &str) -> Vec<Alert> {
        self.alerts.get(chat_id).cloned().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    /// Write-to-temp-then-rename so a crash mid-write can never leave a
    /// half-written state file behind.
    fn persist(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&self.alerts)?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        Ok(())
    }
}
