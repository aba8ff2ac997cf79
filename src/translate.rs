// MIT License - Copyright (c) 2026 Peter Wright
// Inbound frame classification

use crate::constants::{zone_code_for, KNOWN_ACK_VERBS};
use crate::devices::partition::PartitionStatus;
use crate::devices::system::SystemCondition;
use crate::devices::zone::ZoneStatusType;
use crate::error::PanelErrorCode;

/// A typed message translated from one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelMessage {
    /// `OK STATUS` - the panel is about to dump its full state.
    SyncStart,
    /// `OK <verb>` or `ERR <code>`.
    CommandResponse(CommandResponse),
    /// `Z<letters><zone>`, e.g. `ZO5`, `ZBYR12`.
    Zone(ZoneUpdate),
    /// `<letters><number>`, e.g. `RO1`, `EA1`, `OO2`.
    Partition(PartitionUpdate),
    /// Bare system codes such as `MF`, or pendant codes such as `PBF3`.
    System(SystemUpdate),
    /// Anything else. Dropped by the reconciler.
    Unrecognized(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResponse {
    Success { command: String },
    Failure { code: PanelErrorCode },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneUpdate {
    pub zone_id: u32,
    pub status_type: ZoneStatusType,
    /// `true` activates the status, `false` restores it.
    pub action: bool,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionUpdate {
    /// Partition number, or output number for `OO`/`OR`.
    pub number: u32,
    pub status: PartitionStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemUpdate {
    pub condition: SystemCondition,
    pub pendant: Option<u32>,
}

/// Translate a raw frame into a [`PanelMessage`].
///
/// Rules are evaluated in priority order: sync marker, command success,
/// command failure, zone, partition, system. Stateless.
pub fn translate(frame: &str) -> PanelMessage {
    let message = frame.trim().to_ascii_uppercase();

    if message == "OK STATUS" {
        return PanelMessage::SyncStart;
    }

    if let Some(rest) = message.strip_prefix("OK ") {
        let verb = rest.split_whitespace().next().unwrap_or_default();
        if KNOWN_ACK_VERBS.iter().any(|known| verb.starts_with(known)) {
            return PanelMessage::CommandResponse(CommandResponse::Success {
                command: rest.trim().to_string(),
            });
        }
    }

    let mut tokens = message.split_whitespace();
    if tokens.next() == Some("ERR") {
        let code = tokens.next().and_then(|t| t.parse::<u32>().ok()).unwrap_or(0);
        return PanelMessage::CommandResponse(CommandResponse::Failure {
            code: PanelErrorCode::from_code(code),
        });
    }

    if let Some((prefix, number)) = split_code(&message) {
        if prefix.starts_with('Z')
            && (2..=4).contains(&prefix.len())
            && let Some(code) = zone_code_for(prefix)
        {
            return PanelMessage::Zone(ZoneUpdate {
                zone_id: number,
                status_type: code.status_type,
                action: code.action,
                description: code.description,
            });
        }

        if prefix.len() <= 2
            && let Some(status) = PartitionStatus::from_code(prefix)
        {
            return PanelMessage::Partition(PartitionUpdate { number, status });
        }

        if let Some(condition) = SystemCondition::from_pendant_code(prefix) {
            return PanelMessage::System(SystemUpdate {
                condition,
                pendant: Some(number),
            });
        }
    }

    if let Some(condition) = SystemCondition::from_code(&message) {
        return PanelMessage::System(SystemUpdate {
            condition,
            pendant: None,
        });
    }

    PanelMessage::Unrecognized(message)
}

/// Split `<UPPERCASE LETTERS><1-2 DIGITS>` into its parts.
///
/// Returns `None` unless the whole string matches that shape.
fn split_code(message: &str) -> Option<(&str, u32)> {
    let letters = message
        .bytes()
        .take_while(|b| b.is_ascii_uppercase())
        .count();
    let (prefix, digits) = message.split_at(letters);
    if prefix.is_empty()
        || !(1..=2).contains(&digits.len())
        || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    digits.parse().ok().map(|n| (prefix, n))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(frame: &str) -> ZoneUpdate {
        match translate(frame) {
            PanelMessage::Zone(update) => update,
            other => panic!("expected zone update for {frame:?}, got {other:?}"),
        }
    }

    fn partition(frame: &str) -> PartitionUpdate {
        match translate(frame) {
            PanelMessage::Partition(update) => update,
            other => panic!("expected partition update for {frame:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_sync_start_is_case_insensitive() {
        assert_eq!(translate("OK STATUS"), PanelMessage::SyncStart);
        assert_eq!(translate("  ok status \r"), PanelMessage::SyncStart);
    }

    #[test]
    fn test_command_success() {
        assert_eq!(
            translate("OK ARMAWAY 1"),
            PanelMessage::CommandResponse(CommandResponse::Success {
                command: "ARMAWAY 1".to_string()
            })
        );
        assert_eq!(
            translate("OK MODE 2"),
            PanelMessage::CommandResponse(CommandResponse::Success {
                command: "MODE 2".to_string()
            })
        );
        assert!(matches!(
            translate("OK P1E5"),
            PanelMessage::CommandResponse(CommandResponse::Success { .. })
        ));
    }

    #[test]
    fn test_unknown_ok_text_is_unrecognized() {
        assert!(matches!(translate("OK BANANA"), PanelMessage::Unrecognized(_)));
        assert!(matches!(translate("OK"), PanelMessage::Unrecognized(_)));
    }

    #[test]
    fn test_command_failure_code() {
        assert_eq!(
            translate("ERR 2"),
            PanelMessage::CommandResponse(CommandResponse::Failure {
                code: PanelErrorCode::InvalidParameter
            })
        );
    }

    #[test]
    fn test_command_failure_unparseable_code_defaults_to_zero() {
        assert_eq!(
            translate("ERR x"),
            PanelMessage::CommandResponse(CommandResponse::Failure {
                code: PanelErrorCode::Other(0)
            })
        );
        assert_eq!(
            translate("ERR"),
            PanelMessage::CommandResponse(CommandResponse::Failure {
                code: PanelErrorCode::Other(0)
            })
        );
    }

    #[test]
    fn test_zone_messages() {
        let update = zone("ZO5");
        assert_eq!(update.zone_id, 5);
        assert_eq!(update.status_type, ZoneStatusType::Open);
        assert!(update.action);

        let update = zone("ZC5");
        assert_eq!(update.status_type, ZoneStatusType::Open);
        assert!(!update.action);

        let update = zone("ZA12");
        assert_eq!(update.zone_id, 12);
        assert_eq!(update.status_type, ZoneStatusType::Alarm);

        let update = zone("ZBYR1");
        assert_eq!(update.zone_id, 1);
        assert_eq!(update.status_type, ZoneStatusType::Bypassed);
        assert!(!update.action);

        let update = zone("zby7");
        assert_eq!(update.status_type, ZoneStatusType::Bypassed);
        assert!(update.action);
    }

    #[test]
    fn test_untracked_zone_types_still_translate() {
        let update = zone("ZBL3");
        assert_eq!(update.status_type, ZoneStatusType::BatteryLow);
        let update = zone("ZSR3");
        assert_eq!(update.status_type, ZoneStatusType::SuperviseAlarm);
        assert!(!update.action);
    }

    #[test]
    fn test_zone_number_limits() {
        assert!(matches!(translate("ZO123"), PanelMessage::Unrecognized(_)));
        assert!(matches!(translate("ZO"), PanelMessage::Unrecognized(_)));
        assert!(matches!(translate("ZXYZ1"), PanelMessage::Unrecognized(_)));
    }

    #[test]
    fn test_partition_messages() {
        assert_eq!(partition("RO1").status, PartitionStatus::Ready);
        assert_eq!(partition("A1").status, PartitionStatus::AwayArmed);
        assert_eq!(partition("AA1").status, PartitionStatus::InAlarm);
        assert_eq!(partition("EA1").status, PartitionStatus::ExitAwayTiming);
        assert_eq!(partition("NR1").status, PartitionStatus::NotReady);

        let update = partition("OO2");
        assert_eq!(update.status, PartitionStatus::OutputOn);
        assert_eq!(update.number, 2);
    }

    #[test]
    fn test_system_messages() {
        assert_eq!(
            translate("MF"),
            PanelMessage::System(SystemUpdate {
                condition: SystemCondition::MainsFailure,
                pendant: None
            })
        );
        assert_eq!(
            translate("PBF3"),
            PanelMessage::System(SystemUpdate {
                condition: SystemCondition::PendantBatteryLow,
                pendant: Some(3)
            })
        );
    }

    #[test]
    fn test_unrecognized() {
        assert!(matches!(translate(""), PanelMessage::Unrecognized(_)));
        assert!(matches!(translate("HELLO"), PanelMessage::Unrecognized(_)));
        assert!(matches!(translate("QQ1"), PanelMessage::Unrecognized(_)));
    }

    #[test]
    fn test_split_code() {
        assert_eq!(split_code("ZBYR12"), Some(("ZBYR", 12)));
        assert_eq!(split_code("A1"), Some(("A", 1)));
        assert_eq!(split_code("12"), None);
        assert_eq!(split_code("A1B"), None);
        assert_eq!(split_code("A123"), None);
    }
}
