// MIT License - Copyright (c) 2026 Peter Wright
// Outbound command grammar

use serde::{Deserialize, Serialize};

use crate::constants::{
    CMD_ARMAWAY, CMD_ARMSTAY, CMD_BYPASS, CMD_DISARM, CMD_MODE, CMD_OUTPUT_OFF, CMD_OUTPUT_ON,
    CMD_SET_USER, CMD_STATUS, CMD_UNBYPASS, CMD_VERSION, MAX_OUTPUTS, MAX_PARTITIONS_AREAS,
    MAX_USER_EXCLUSIVE, MAX_ZONES, MODES,
};
use crate::error::{AlarmError, Result};

/// Line ending appended to an outbound command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delimiter {
    /// `\n` - modes 2 and 3
    #[default]
    Lf,
    /// `\n\r` - mode 1
    LfCr,
    /// `\r\n` - mode 1
    CrLf,
}

impl Delimiter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::LfCr => "\n\r",
            Self::CrLf => "\r\n",
        }
    }
}

/// Commands that can be sent to the panel.
///
/// All commands are fire-and-forget: the panel answers asynchronously with
/// `OK <verb>` or `ERR <code>`, which arrive through the inbound pipeline.
///
/// # Wire format
///
/// `<VERB>[ <arg>...]` followed by a [`Delimiter`]. `MODE` is the one command
/// that overrides the caller's delimiter: it is sent with `\r\n`, which a panel
/// still in mode 1 also understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `MODE <1|2|3>` - set handshake and message mode.
    SetMode { mode: u8 },
    /// `ARMAWAY <area>`
    ArmAway { area: u32 },
    /// `ARMSTAY <area>`
    ArmStay { area: u32 },
    /// `DISARM <area> <pin>`
    Disarm { area: u32, pin: String },
    /// `BYPASS <zone>`
    Bypass { zone: u32 },
    /// `UNBYPASS <zone>`
    Unbypass { zone: u32 },
    /// `OUTPUTON <output>`
    OutputOn { output: u32 },
    /// `OUTPUTOFF <output>`
    OutputOff { output: u32 },
    /// `STATUS` - request a full status dump, answered by `OK STATUS`.
    Status,
    /// `VERSION`
    Version,
    /// `P1E<user>=<pin>` - bind a user number to a PIN for this connection.
    SetUser { user: u32, pin: String },
}

impl Command {
    /// Convert the command to its wire string, without delimiter.
    pub fn to_wire_string(&self) -> String {
        match self {
            Command::SetMode { mode } => format!("{CMD_MODE} {mode}"),
            Command::ArmAway { area } => format!("{CMD_ARMAWAY} {area}"),
            Command::ArmStay { area } => format!("{CMD_ARMSTAY} {area}"),
            Command::Disarm { area, pin } => format!("{CMD_DISARM} {area} {pin}"),
            Command::Bypass { zone } => format!("{CMD_BYPASS} {zone}"),
            Command::Unbypass { zone } => format!("{CMD_UNBYPASS} {zone}"),
            Command::OutputOn { output } => format!("{CMD_OUTPUT_ON} {output}"),
            Command::OutputOff { output } => format!("{CMD_OUTPUT_OFF} {output}"),
            Command::Status => CMD_STATUS.to_string(),
            Command::Version => CMD_VERSION.to_string(),
            Command::SetUser { user, pin } => format!("{CMD_SET_USER}{user}={pin}"),
        }
    }

    /// The command verb, safe to log (never includes a PIN).
    pub fn verb(&self) -> &'static str {
        match self {
            Command::SetMode { .. } => CMD_MODE,
            Command::ArmAway { .. } => CMD_ARMAWAY,
            Command::ArmStay { .. } => CMD_ARMSTAY,
            Command::Disarm { .. } => CMD_DISARM,
            Command::Bypass { .. } => CMD_BYPASS,
            Command::Unbypass { .. } => CMD_UNBYPASS,
            Command::OutputOn { .. } => CMD_OUTPUT_ON,
            Command::OutputOff { .. } => CMD_OUTPUT_OFF,
            Command::Status => CMD_STATUS,
            Command::Version => CMD_VERSION,
            Command::SetUser { .. } => CMD_SET_USER,
        }
    }

    /// The delimiter this command is sent with, given the caller's default.
    pub fn delimiter(&self, default: Delimiter) -> Delimiter {
        match self {
            Command::SetMode { .. } => Delimiter::CrLf,
            _ => default,
        }
    }

    /// Full wire bytes: command text plus delimiter.
    pub fn encode(&self, default: Delimiter) -> String {
        let mut wire = self.to_wire_string();
        wire.push_str(self.delimiter(default).as_str());
        wire
    }

    /// Check numeric ranges and PIN format before anything is written.
    pub fn validate(&self) -> Result<()> {
        match self {
            Command::SetMode { mode } => {
                if !MODES.contains(mode) {
                    return Err(AlarmError::InvalidParameter {
                        name: "mode",
                        value: u32::from(*mode),
                        min: 1,
                        max: 3,
                    });
                }
                Ok(())
            }
            Command::ArmAway { area } | Command::ArmStay { area } => check_range("area", *area, MAX_PARTITIONS_AREAS),
            Command::Disarm { area, pin } => {
                check_range("area", *area, MAX_PARTITIONS_AREAS)?;
                check_pin(pin)
            }
            Command::Bypass { zone } | Command::Unbypass { zone } => check_range("zone", *zone, MAX_ZONES),
            Command::OutputOn { output } | Command::OutputOff { output } => {
                check_range("output", *output, MAX_OUTPUTS)
            }
            Command::Status | Command::Version => Ok(()),
            Command::SetUser { user, pin } => {
                check_range("user", *user, MAX_USER_EXCLUSIVE - 1)?;
                check_pin(pin)
            }
        }
    }
}

fn check_range(name: &'static str, value: u32, max: u32) -> Result<()> {
    if value == 0 || value > max {
        return Err(AlarmError::InvalidParameter {
            name,
            value,
            min: 1,
            max,
        });
    }
    Ok(())
}

/// PINs are passed through untouched, but must not be able to smuggle a
/// delimiter or extra arguments onto the wire.
fn check_pin(pin: &str) -> Result<()> {
    if pin.is_empty() || !pin.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AlarmError::InvalidPin);
    }
    Ok(())
}
