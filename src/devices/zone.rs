// MIT License - Copyright (c) 2026 Peter Wright
// Zone status model

use serde::{Deserialize, Serialize};

/// The status dimension a zone message reports on.
///
/// Only [`Open`](Self::Open), [`Alarm`](Self::Alarm) and
/// [`Bypassed`](Self::Bypassed) are stored in a [`ZoneStatus`]; the others
/// are surfaced as notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneStatusType {
    Open,
    Alarm,
    Bypassed,
    BatteryLow,
    Trouble,
    SensorWatchAlarm,
    SuperviseAlarm,
}

impl ZoneStatusType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Alarm => "alarm",
            Self::Bypassed => "bypassed",
            Self::BatteryLow => "battery_low",
            Self::Trouble => "trouble",
            Self::SensorWatchAlarm => "sensor_watch_alarm",
            Self::SuperviseAlarm => "supervise_alarm",
        }
    }

    /// Whether this status type is kept in the zone snapshot.
    pub fn is_tracked(&self) -> bool {
        matches!(self, Self::Open | Self::Alarm | Self::Bypassed)
    }
}

/// Sensor kind of a configured zone. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    #[default]
    Motion,
    GarageDoor,
    Door,
}

/// Stored status of a single zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ZoneStatus {
    pub open: bool,
    pub alarm: bool,
    pub bypassed: bool,
}

impl ZoneStatus {
    /// Set one field. Returns `false` for status types that are not stored.
    pub fn set(&mut self, status_type: ZoneStatusType, value: bool) -> bool {
        match status_type {
            ZoneStatusType::Open => self.open = value,
            ZoneStatusType::Alarm => self.alarm = value,
            ZoneStatusType::Bypassed => self.bypassed = value,
            _ => return false,
        }
        true
    }

    /// Reset every field to `false`.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_clear(&self) -> bool {
        !self.open && !self.alarm && !self.bypassed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_touches_only_named_field() {
        let mut status = ZoneStatus {
            open: false,
            alarm: true,
            bypassed: false,
        };
        assert!(status.set(ZoneStatusType::Open, true));
        assert_eq!(
            status,
            ZoneStatus {
                open: true,
                alarm: true,
                bypassed: false
            }
        );
    }

    #[test]
    fn test_set_ignores_untracked_types() {
        let mut status = ZoneStatus::default();
        assert!(!status.set(ZoneStatusType::BatteryLow, true));
        assert!(!status.set(ZoneStatusType::Trouble, true));
        assert!(status.is_clear());
    }

    #[test]
    fn test_clear() {
        let mut status = ZoneStatus {
            open: true,
            alarm: true,
            bypassed: true,
        };
        status.clear();
        assert!(status.is_clear());
    }

    #[test]
    fn test_tracked_types() {
        assert!(ZoneStatusType::Open.is_tracked());
        assert!(ZoneStatusType::Alarm.is_tracked());
        assert!(ZoneStatusType::Bypassed.is_tracked());
        assert!(!ZoneStatusType::SuperviseAlarm.is_tracked());
        assert_eq!(ZoneStatusType::SensorWatchAlarm.as_str(), "sensor_watch_alarm");
    }
}
