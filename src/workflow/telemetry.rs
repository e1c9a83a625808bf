use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TelemetryLevel {
    Info,
    Warning,
    Error,
}

/// One human-readable log line of the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEntry {
    pub at: DateTime<Utc>,
    pub level: TelemetryLevel,
    pub message: String,
}

impl TelemetryEntry {
    pub fn new(level: TelemetryLevel, message: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
            level,
            message: message.into(),
        }
    }

    /// Forward the line to `tracing` at the matching level.
    pub fn trace(&self) {
        match self.level {
            TelemetryLevel::Info => tracing::info!("{}", self.message),
            TelemetryLevel::Warning => tracing::warn!("{}", self.message),
            TelemetryLevel::Error => tracing::error!("{}", self.message),
        }
    }
}

impl fmt::Display for TelemetryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            TelemetryLevel::Info => "INFO",
            TelemetryLevel::Warning => "WARN",
            TelemetryLevel::Error => "ERROR",
        };
        write!(f, "[{}] {level} {}", self.at.format("%H:%M:%S"), self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn display_has_timestamp_and_level() {
        let entry = TelemetryEntry {
            at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 5, 7).unwrap(),
            level: TelemetryLevel::Warning,
            message: "profile not persisted".into(),
        };
        assert_eq!(entry.to_string(), "[09:05:07] WARN profile not persisted");
    }

    #[test]
    fn levels_order_by_severity() {
        assert!(TelemetryLevel::Error > TelemetryLevel::Warning);
        assert!(TelemetryLevel::Warning > TelemetryLevel::Info);
    }
}
