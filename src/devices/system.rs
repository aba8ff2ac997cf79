// MIT License - Copyright (c) 2026 Peter Wright
// Panel-wide system conditions

use serde::{Deserialize, Serialize};

/// A panel-wide condition reported by a system message.
///
/// These never affect the zone/partition snapshot; they are forwarded to
/// subscribers as notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemCondition {
    /// BF
    BatteryLow,
    /// BR
    BatteryRestored,
    /// CAL
    CommsStarted,
    /// CLF
    CommsFinished,
    /// DF
    DialerFailed,
    /// DR
    DialerRestored,
    /// FF
    FuseFault,
    /// FR
    FuseRestored,
    /// LF
    LineFault,
    /// LR
    LineRestored,
    /// MF
    MainsFailure,
    /// MR
    MainsRestored,
    /// RIF
    ReceiverFault,
    /// RIR
    ReceiverRestored,
    /// PBF - takes a pendant number
    PendantBatteryLow,
    /// PBR - takes a pendant number
    PendantBatteryRestored,
}

impl SystemCondition {
    /// Parse a bare system code (no numeric suffix).
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "BF" => Some(Self::BatteryLow),
            "BR" => Some(Self::BatteryRestored),
            "CAL" => Some(Self::CommsStarted),
            "CLF" => Some(Self::CommsFinished),
            "DF" => Some(Self::DialerFailed),
            "DR" => Some(Self::DialerRestored),
            "FF" => Some(Self::FuseFault),
            "FR" => Some(Self::FuseRestored),
            "LF" => Some(Self::LineFault),
            "LR" => Some(Self::LineRestored),
            "MF" => Some(Self::MainsFailure),
            "MR" => Some(Self::MainsRestored),
            "RIF" => Some(Self::ReceiverFault),
            "RIR" => Some(Self::ReceiverRestored),
            _ => None,
        }
    }

    /// Parse a pendant code prefix (followed by a pendant number on the wire).
    pub fn from_pendant_code(code: &str) -> Option<Self> {
        match code {
            "PBF" => Some(Self::PendantBatteryLow),
            "PBR" => Some(Self::PendantBatteryRestored),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::BatteryLow => "System battery low or missing",
            Self::BatteryRestored => "System battery restored",
            Self::CommsStarted => "Communication to monitoring station started",
            Self::CommsFinished => "Communication to monitoring station finished",
            Self::DialerFailed => "Dialer failed",
            Self::DialerRestored => "Dialer restored",
            Self::FuseFault => "System fuse fault",
            Self::FuseRestored => "System fuse restored",
            Self::LineFault => "Dialer line fault",
            Self::LineRestored => "Dialer line restored",
            Self::MainsFailure => "Mains power failure",
            Self::MainsRestored => "Mains power restored",
            Self::ReceiverFault => "Receiver fault",
            Self::ReceiverRestored => "Receiver restored",
            Self::PendantBatteryLow => "Pendant battery low",
            Self::PendantBatteryRestored => "Pendant battery restored",
        }
    }

    /// Whether this condition reports a fault (as opposed to a restore or
    /// informational message).
    pub fn is_fault(&self) -> bool {
        matches!(
            self,
            Self::BatteryLow
                | Self::DialerFailed
                | Self::FuseFault
                | Self::LineFault
                | Self::MainsFailure
                | Self::ReceiverFault
                | Self::PendantBatteryLow
        )
    }
}
