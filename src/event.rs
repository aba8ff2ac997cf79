// MIT License - Copyright (c) 2026 Peter Wright
// Notifications broadcast to subscribers

use std::sync::Arc;

use crate::devices::{SystemCondition, ZoneStatusType};
use crate::error::PanelErrorCode;
use crate::state::Snapshot;

/// All events that can be emitted by the panel.
///
/// Users subscribe via `panel.events()` to receive a
/// `tokio::sync::broadcast::Receiver<PanelEvent>`. Snapshot changes are also
/// available, without lag, through `panel.subscribe()`.
#[derive(Debug, Clone)]
pub enum PanelEvent {
    /// TCP connection to panel established
    Connected,
    /// Connection closed, either by `disconnect()` or by the panel
    Disconnected,
    /// Connection dropped because of an error (overflow, I/O)
    ConnectionLost { reason: String },
    /// A new snapshot was published
    SnapshotUpdated(Arc<Snapshot>),
    /// The panel answered `OK STATUS` and is dumping its state
    SyncStarted,
    /// The status dump ended and unseen zones were reset
    SyncCompleted,
    /// `OK <command>`
    CommandSucceeded { command: String },
    /// `ERR <code>`
    CommandFailed { code: PanelErrorCode },
    /// A zone status that is not stored in the snapshot (battery, trouble, ...)
    ZoneCondition {
        zone_id: u32,
        status_type: ZoneStatusType,
        active: bool,
    },
    /// Panel-wide condition such as mains failure
    SystemCondition {
        condition: SystemCondition,
        pendant: Option<u32>,
    },
}

/// Type alias for the broadcast sender.
pub type EventSender = tokio::sync::broadcast::Sender<PanelEvent>;

/// Type alias for the broadcast receiver.
pub type EventReceiver = tokio::sync::broadcast::Receiver<PanelEvent>;

/// Create a new event channel with the given capacity.
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    tokio::sync::broadcast::channel(capacity)
}
