// MIT License - Copyright (c) 2026 Peter Wright
// Device status models

pub mod partition;
pub mod system;
pub mod zone;

pub use partition::{ArmingState, PartitionStatus};
pub use system::SystemCondition;
pub use zone::{ZoneKind, ZoneStatus, ZoneStatusType};
