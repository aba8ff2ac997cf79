// MIT License - Copyright (c) 2026 Peter Wright
// Arrowhead panel protocol constants

use crate::devices::zone::ZoneStatusType;

/// Canonical line delimiter. Every accepted inbound delimiter is rewritten to this.
pub const CANONICAL_DELIMITER: u8 = b'\n';

/// Inbound delimiter variants, longest first so two-byte forms are matched
/// before their single-byte prefixes.
pub const INBOUND_DELIMITERS: [&[u8]; 4] = [b"\n\r", b"\r\n", b"\n", b"\r"];

/// Acknowledgment written back for every received frame (modes 2 and 3).
pub const FRAME_ACK: &[u8] = b"OK\n";

/// Working buffer limit. An unterminated frame larger than this is an overflow.
pub const MAX_BUFFER_BYTES: usize = 8192;

/// The panel never sends more than this in a single chunk.
pub const READ_CHUNK_BYTES: usize = 512;

/// Communication modes accepted by `MODE <n>`.
pub const MODES: [u8; 3] = [1, 2, 3];

/// Mode the bridge negotiates on every refresh.
pub const DEFAULT_MODE: u8 = 2;

// Parameter limits
pub const MAX_ZONES: u32 = 64;
pub const MAX_PARTITIONS_AREAS: u32 = 32;
pub const MAX_OUTPUTS: u32 = 32;
/// User numbers accepted by `set_user` are `1..MAX_USER_EXCLUSIVE`.
pub const MAX_USER_EXCLUSIVE: u32 = 100;

// Remote-to-panel command verbs
pub const CMD_MODE: &str = "MODE";
pub const CMD_ARMAWAY: &str = "ARMAWAY";
pub const CMD_ARMSTAY: &str = "ARMSTAY";
pub const CMD_DISARM: &str = "DISARM";
pub const CMD_BYPASS: &str = "BYPASS";
pub const CMD_UNBYPASS: &str = "UNBYPASS";
pub const CMD_OUTPUT_ON: &str = "OUTPUTON";
pub const CMD_OUTPUT_OFF: &str = "OUTPUTOFF";
pub const CMD_STATUS: &str = "STATUS";
pub const CMD_VERSION: &str = "VERSION";
pub const CMD_SET_USER: &str = "P1E";

/// Verbs the panel echoes back after `OK ` when a command succeeds.
///
/// `STATUS` is deliberately absent: `OK STATUS` opens a status dump.
pub const KNOWN_ACK_VERBS: [&str; 10] = [
    CMD_ARMAWAY,
    CMD_ARMSTAY,
    CMD_DISARM,
    CMD_BYPASS,
    CMD_UNBYPASS,
    CMD_OUTPUT_ON,
    CMD_OUTPUT_OFF,
    CMD_MODE,
    CMD_VERSION,
    CMD_SET_USER,
];

/// One row of the zone message table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneCode {
    pub prefix: &'static str,
    pub status_type: ZoneStatusType,
    /// `true` activates the status, `false` restores it.
    pub action: bool,
    pub description: &'static str,
}

const fn zone_code(
    prefix: &'static str,
    status_type: ZoneStatusType,
    action: bool,
    description: &'static str,
) -> ZoneCode {
    ZoneCode {
        prefix,
        status_type,
        action,
        description,
    }
}

/// Zone message prefixes. `ZC` restores `ZO`, `ZR` restores `ZA`.
pub static ZONE_STATUS_TABLE: [ZoneCode; 14] = [
    zone_code("ZA", ZoneStatusType::Alarm, true, "Zone is in alarm"),
    zone_code("ZBL", ZoneStatusType::BatteryLow, true, "Radio zone battery is low"),
    zone_code("ZBY", ZoneStatusType::Bypassed, true, "Zone is bypassed"),
    zone_code("ZIA", ZoneStatusType::SensorWatchAlarm, true, "Sensor watch alarm active"),
    zone_code("ZO", ZoneStatusType::Open, true, "Zone is open (un-sealed)"),
    zone_code("ZT", ZoneStatusType::Trouble, true, "Trouble alarm active"),
    zone_code("ZSA", ZoneStatusType::SuperviseAlarm, true, "Supervise alarm active"),
    zone_code("ZBR", ZoneStatusType::BatteryLow, false, "Radio zone battery restored"),
    zone_code("ZBYR", ZoneStatusType::Bypassed, false, "Zone bypass removed (un-bypassed)"),
    zone_code("ZC", ZoneStatusType::Open, false, "Zone is closed (sealed)"),
    zone_code("ZIR", ZoneStatusType::SensorWatchAlarm, false, "Sensor watch alarm restored"),
    zone_code("ZR", ZoneStatusType::Alarm, false, "Zone alarm restored"),
    zone_code("ZTR", ZoneStatusType::Trouble, false, "Trouble alarm restored"),
    zone_code("ZSR", ZoneStatusType::SuperviseAlarm, false, "Supervise alarm restored"),
];

/// Look up a zone message prefix (e.g. `"ZBYR"`).
pub fn zone_code_for(prefix: &str) -> Option<&'static ZoneCode> {
    ZONE_STATUS_TABLE.iter().find(|c| c.prefix == prefix)
}
