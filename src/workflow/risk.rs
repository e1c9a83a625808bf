//! Risk/lock gate consulted at workflow entry points.
//!
//! The gate only stores the flag. Deciding when to lock is left to whoever
//! mutates it (pause/resume commands or a manual override).

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Elevated,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskState {
    pub level: RiskLevel,
    /// Account reputation estimate, 0..=100.
    pub reputation: u8,
    pub locked: bool,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for RiskState {
    fn default() -> Self {
        Self {
            level: RiskLevel::Low,
            reputation: 100,
            locked: false,
            reason: None,
            updated_at: None,
        }
    }
}

impl RiskState {
    pub fn lock(&mut self, reason: &str) {
        self.locked = true;
        self.reason = Some(reason.to_string());
        self.updated_at = Some(Utc::now());
    }

    pub fn unlock(&mut self) {
        self.locked = false;
        self.reason = None;
        self.updated_at = Some(Utc::now());
    }

    pub fn block_reason(&self) -> Option<String> {
        self.locked.then(|| {
            self.reason
                .clone()
                .unwrap_or_else(|| format!("risk level {:?}", self.level).to_lowercase())
        })
    }
}

/// Shared, externally mutated [`RiskState`].
#[derive(Debug, Default)]
pub struct RiskGate {
    state: RwLock<RiskState>,
}

impl RiskGate {
    pub fn new(state: RiskState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    /// `Err(reason)` when new runs must not start.
    pub fn check(&self) -> Result<(), String> {
        match self.snapshot().block_reason() {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }

    pub fn snapshot(&self) -> RiskState {
        self.state
            .read()
            .map(|s| s.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn update(&self, f: impl FnOnce(&mut RiskState)) -> RiskState {
        let mut guard = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard);
        guard.clone()
    }

    pub fn lock(&self, reason: &str) -> RiskState {
        self.update(|s| s.lock(reason))
    }

    pub fn unlock(&self) -> RiskState {
        self.update(RiskState::unlock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_gate_is_open() {
        let gate = RiskGate::default();
        assert!(gate.check().is_ok());
        assert_eq!(gate.snapshot().reputation, 100);
    }

    #[test]
    fn lock_and_unlock() {
        let gate = RiskGate::default();
        gate.lock("captcha wall detected");
        assert_eq!(gate.check().unwrap_err(), "captcha wall detected");

        let state = gate.unlock();
        assert!(!state.locked);
        assert!(state.reason.is_none());
        assert!(gate.check().is_ok());
    }

    #[test]
    fn locked_without_reason_reports_level() {
        let gate = RiskGate::new(RiskState {
            level: RiskLevel::High,
            locked: true,
            ..Default::default()
        });
        assert_eq!(gate.check().unwrap_err(), "risk level high");
    }

    #[test]
    fn risk_state_json_shape() {
        let json = serde_json::to_value(RiskState::default()).unwrap();
        assert_eq!(json["level"], "low");
        assert_eq!(json["locked"], false);
    }
}
