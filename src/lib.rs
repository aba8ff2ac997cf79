// MIT License - Copyright (c) 2026 Peter Wright
// arrowhead-bridge library
//
//! # arrowhead-bridge
//!
//! Client for the line-oriented ASCII protocol spoken by Arrowhead alarm
//! panels over TCP (usually through a serial-to-IP adapter).
//!
//! Inbound bytes are split into frames, acknowledged with `OK`, translated
//! into typed messages and reconciled into one consistent [`Snapshot`] of
//! partition status and per-zone open/alarm/bypass flags. Commands (arm,
//! disarm, bypass, outputs, status) are validated and written on the same
//! connection.
//!
//! ## Quick Start
//!
//! ```no_run
//! use arrowhead_bridge::{ArrowheadPanel, PanelConfig, PanelEvent, ZoneKind};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = PanelConfig::builder()
//!         .host("192.168.0.50")
//!         .port(9000)
//!         .zone(1, "Front door", ZoneKind::Door)
//!         .build();
//!
//!     let panel = ArrowheadPanel::new(config)?;
//!
//!     let mut events = panel.events();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             if let PanelEvent::SnapshotUpdated(snapshot) = event {
//!                 println!("{:?}", snapshot.arming_state());
//!             }
//!         }
//!     });
//!
//!     let snapshot = panel.refresh().await?;
//!     println!("ready to arm: {}", snapshot.ready_to_arm());
//!     panel.arm_away(1).await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     panel.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod constants;
pub mod devices;
pub mod error;
pub mod event;
pub mod panel;
pub mod protocol;
pub mod state;
pub mod translate;
pub mod transport;

// Re-exports for convenience
pub use config::{OutputConfig, PanelConfig, PanelConfigBuilder, ReconcilePolicy, ZoneConfig};
pub use devices::{ArmingState, PartitionStatus, SystemCondition, ZoneKind, ZoneStatus, ZoneStatusType};
pub use error::{AlarmError, PanelErrorCode, Result};
pub use event::{EventReceiver, PanelEvent};
pub use panel::ArrowheadPanel;
pub use protocol::{Command, Delimiter};
pub use state::{Reconciler, Snapshot};
pub use translate::{translate, PanelMessage};
pub use transport::probe_mode;
