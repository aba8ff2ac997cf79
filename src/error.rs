// MIT License - Copyright (c) 2026 Peter Wright
// Error types

use std::fmt;

use serde::Serialize;

/// Error codes returned by the panel as `ERR <code>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PanelErrorCode {
    /// ERR 1
    CommandNotUnderstood,
    /// ERR 2
    InvalidParameter,
    /// ERR 3
    NotAllowed,
    /// ERR 4
    RxBufferOverflow,
    /// ERR 5
    TxBufferOverflow,
    /// ERR 6
    XmodemFailed,
    /// Any code the panel documentation does not list, including the `0`
    /// used when the code could not be parsed.
    Other(u32),
}

impl PanelErrorCode {
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => Self::CommandNotUnderstood,
            2 => Self::InvalidParameter,
            3 => Self::NotAllowed,
            4 => Self::RxBufferOverflow,
            5 => Self::TxBufferOverflow,
            6 => Self::XmodemFailed,
            other => Self::Other(other),
        }
    }

    /// The numeric code as sent on the wire.
    pub fn code(&self) -> u32 {
        match self {
            Self::CommandNotUnderstood => 1,
            Self::InvalidParameter => 2,
            Self::NotAllowed => 3,
            Self::RxBufferOverflow => 4,
            Self::TxBufferOverflow => 5,
            Self::XmodemFailed => 6,
            Self::Other(code) => *code,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::CommandNotUnderstood => "Command not understood",
            Self::InvalidParameter => "Invalid parameter",
            Self::NotAllowed => "Not allowed",
            Self::RxBufferOverflow => "Receive buffer overflow",
            Self::TxBufferOverflow => "Transmit buffer overflow",
            Self::XmodemFailed => "XMODEM transfer failed",
            Self::Other(_) => "Unknown error",
        }
    }
}

impl fmt::Display for PanelErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ERR {}: {}", self.code(), self.description())
    }
}

/// All errors that can occur in the arrowhead-bridge library.
#[derive(Debug, thiserror::Error)]
pub enum AlarmError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not connected to the alarm panel")]
    NotConnected,

    #[error("Connection timeout")]
    ConnectTimeout,

    #[error("Refresh cycle timed out after {timeout_ms}ms")]
    RefreshTimeout { timeout_ms: u64 },

    #[error("Receive buffer exceeded {limit} bytes without a frame delimiter")]
    BufferOverflow { limit: usize },

    #[error("Invalid {name}: {value} (allowed {min}..={max})")]
    InvalidParameter {
        name: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    #[error("Invalid PIN: must be a non-empty string of digits")]
    InvalidPin,

    #[error("Channel closed")]
    ChannelClosed,
}

impl AlarmError {
    /// Whether this error is transient and the next refresh cycle should retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AlarmError::Io(_)
                | AlarmError::NotConnected
                | AlarmError::ConnectTimeout
                | AlarmError::RefreshTimeout { .. }
                | AlarmError::BufferOverflow { .. }
                | AlarmError::ChannelClosed
        )
    }
}

pub type Result<T> = std::result::Result<T, AlarmError>;
