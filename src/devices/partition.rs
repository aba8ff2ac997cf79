// MIT License - Copyright (c) 2026 Peter Wright
// Partition status model

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Partition (area) status as reported by the panel.
///
/// Exactly one value is tracked at a time; the panel's two-letter codes are
/// mapped by [`from_code`](Self::from_code).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionStatus {
    /// D
    Disarmed,
    /// A
    AwayArmed,
    /// S
    StayArmed,
    /// AA
    InAlarm,
    /// AR
    AlarmRestored,
    /// EA
    ExitAwayTiming,
    /// ES
    ExitStayTiming,
    /// RO - all zones sealed
    Ready,
    /// NR - at least one zone unsealed
    NotReady,
    /// OO
    OutputOn,
    /// OR
    OutputReady,
}

impl PartitionStatus {
    /// Parse a partition message prefix (e.g. `"EA"`).
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "A" => Some(Self::AwayArmed),
            "AA" => Some(Self::InAlarm),
            "AR" => Some(Self::AlarmRestored),
            "D" => Some(Self::Disarmed),
            "EA" => Some(Self::ExitAwayTiming),
            "ES" => Some(Self::ExitStayTiming),
            "NR" => Some(Self::NotReady),
            "RO" => Some(Self::Ready),
            "S" => Some(Self::StayArmed),
            "OO" => Some(Self::OutputOn),
            "OR" => Some(Self::OutputReady),
            _ => None,
        }
    }

    /// The wire prefix for this status.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Disarmed => "D",
            Self::AwayArmed => "A",
            Self::StayArmed => "S",
            Self::InAlarm => "AA",
            Self::AlarmRestored => "AR",
            Self::ExitAwayTiming => "EA",
            Self::ExitStayTiming => "ES",
            Self::Ready => "RO",
            Self::NotReady => "NR",
            Self::OutputOn => "OO",
            Self::OutputReady => "OR",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disarmed => "disarmed",
            Self::AwayArmed => "away_armed",
            Self::StayArmed => "stay_armed",
            Self::InAlarm => "in_alarm",
            Self::AlarmRestored => "alarm_restored",
            Self::ExitAwayTiming => "exit_away_timing",
            Self::ExitStayTiming => "exit_stay_timing",
            Self::Ready => "ready",
            Self::NotReady => "not_ready",
            Self::OutputOn => "output_on",
            Self::OutputReady => "output_ready",
        }
    }

    /// Armed, arming, or in alarm. Statuses in this family are shielded from
    /// benign chatter.
    pub fn is_armed_family(&self) -> bool {
        matches!(
            self,
            Self::AwayArmed
                | Self::StayArmed
                | Self::InAlarm
                | Self::ExitAwayTiming
                | Self::ExitStayTiming
        )
    }

    /// Statuses discarded while the partition is in the armed family.
    pub fn default_shielded() -> HashSet<Self> {
        HashSet::from([
            Self::Ready,
            Self::AlarmRestored,
            Self::NotReady,
            Self::OutputOn,
            Self::OutputReady,
        ])
    }

    /// Collapse the panel status into a host-facing arming state.
    ///
    /// `Ready`, `NotReady` and `AlarmRestored` mean the panel is idle, so they
    /// read as disarmed. Output statuses carry no arming information.
    pub fn arming_state(&self) -> Option<ArmingState> {
        match self {
            Self::AwayArmed => Some(ArmingState::ArmedAway),
            Self::StayArmed => Some(ArmingState::ArmedHome),
            Self::Disarmed | Self::Ready | Self::NotReady | Self::AlarmRestored => {
                Some(ArmingState::Disarmed)
            }
            Self::InAlarm => Some(ArmingState::Triggered),
            Self::ExitAwayTiming | Self::ExitStayTiming => Some(ArmingState::Arming),
            Self::OutputOn | Self::OutputReady => None,
        }
    }
}

impl std::fmt::Display for PartitionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arming state as an alarm control panel would present it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmingState {
    Disarmed,
    ArmedAway,
    ArmedHome,
    Arming,
    Triggered,
}
