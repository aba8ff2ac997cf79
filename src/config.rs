// MIT License - Copyright (c) 2026 Peter Wright
// Panel connection and reconciliation configuration

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tokio::time::Duration;

use crate::constants::{DEFAULT_MODE, MAX_OUTPUTS, MAX_ZONES, MODES};
use crate::devices::partition::PartitionStatus;
use crate::devices::zone::ZoneKind;
use crate::error::{AlarmError, Result};
use crate::protocol::Delimiter;

/// A zone the host wants tracked.
///
/// Events for zones not listed in [`PanelConfig::zones`] are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub number: u32,
    pub name: String,
    #[serde(default)]
    pub kind: ZoneKind,
}

/// A panel output the host can switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub number: u32,
    pub name: String,
}

/// Rules the reconciler applies to partition events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilePolicy {
    /// Move the partition to `in_alarm` when any zone reports an alarm, and
    /// back to `disarmed` when the last alarmed zone restores.
    pub derive_partition_alarm: bool,
    /// Statuses discarded while the partition is armed, arming or in alarm.
    pub shielded_statuses: HashSet<PartitionStatus>,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            derive_partition_alarm: false,
            shielded_statuses: PartitionStatus::default_shielded(),
        }
    }
}

/// Configuration for connecting to an Arrowhead panel.
#[derive(Debug, Clone)]
pub struct PanelConfig {
    /// Panel (or serial-to-IP adapter) host name or address
    pub host: String,
    /// Panel TCP port (default: 9000)
    pub port: u16,
    /// Zones to track
    pub zones: Vec<ZoneConfig>,
    /// Outputs exposed to the host
    pub outputs: Vec<OutputConfig>,
    /// Mode set on every refresh (default: 2)
    pub mode: u8,
    /// Interval between refresh cycles in milliseconds (default: 60000)
    pub scan_interval_ms: u64,
    /// Upper bound on one refresh cycle in milliseconds (default: 10000)
    pub refresh_timeout_ms: u64,
    /// TCP connect timeout in milliseconds (default: 5000)
    pub connect_timeout_ms: u64,
    /// Line ending for outbound commands other than `MODE`
    pub delimiter: Delimiter,
    pub policy: ReconcilePolicy,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            host: "192.168.0.100".to_string(),
            port: 9000,
            zones: Vec::new(),
            outputs: Vec::new(),
            mode: DEFAULT_MODE,
            scan_interval_ms: 60_000,
            refresh_timeout_ms: 10_000,
            connect_timeout_ms: 5_000,
            delimiter: Delimiter::default(),
            policy: ReconcilePolicy::default(),
        }
    }
}

impl PanelConfig {
    /// Create a new config builder starting from defaults.
    pub fn builder() -> PanelConfigBuilder {
        PanelConfigBuilder::default()
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_millis(self.refresh_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn zone_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.zones.iter().map(|z| z.number)
    }

    pub fn zone(&self, number: u32) -> Option<&ZoneConfig> {
        self.zones.iter().find(|z| z.number == number)
    }

    pub fn output(&self, number: u32) -> Option<&OutputConfig> {
        self.outputs.iter().find(|o| o.number == number)
    }

    /// Reject a mode or device number the panel could never accept, and
    /// intervals that would stall the refresh loop.
    pub fn validate(&self) -> Result<()> {
        if !MODES.contains(&self.mode) {
            return Err(AlarmError::InvalidParameter {
                name: "mode",
                value: u32::from(self.mode),
                min: 1,
                max: 3,
            });
        }
        if self.scan_interval_ms == 0 {
            return Err(AlarmError::InvalidParameter {
                name: "scan_interval_ms",
                value: 0,
                min: 1,
                max: u32::MAX,
            });
        }
        if self.refresh_timeout_ms == 0 {
            return Err(AlarmError::InvalidParameter {
                name: "refresh_timeout_ms",
                value: 0,
                min: 1,
                max: u32::MAX,
            });
        }
        for zone in &self.zones {
            if zone.number == 0 || zone.number > MAX_ZONES {
                return Err(AlarmError::InvalidParameter {
                    name: "zone",
                    value: zone.number,
                    min: 1,
                    max: MAX_ZONES,
                });
            }
        }
        for output in &self.outputs {
            if output.number == 0 || output.number > MAX_OUTPUTS {
                return Err(AlarmError::InvalidParameter {
                    name: "output",
                    value: output.number,
                    min: 1,
                    max: MAX_OUTPUTS,
                });
            }
        }
        Ok(())
    }
}

/// Builder for PanelConfig.
#[derive(Debug, Clone, Default)]
pub struct PanelConfigBuilder {
    config: PanelConfig,
}

impl PanelConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn zone(mut self, number: u32, name: impl Into<String>, kind: ZoneKind) -> Self {
        self.config.zones.push(ZoneConfig {
            number,
            name: name.into(),
            kind,
        });
        self
    }

    pub fn zones(mut self, zones: Vec<ZoneConfig>) -> Self {
        self.config.zones = zones;
        self
    }

    pub fn output(mut self, number: u32, name: impl Into<String>) -> Self {
        self.config.outputs.push(OutputConfig {
            number,
            name: name.into(),
        });
        self
    }

    pub fn outputs(mut self, outputs: Vec<OutputConfig>) -> Self {
        self.config.outputs = outputs;
        self
    }

    pub fn mode(mut self, mode: u8) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn scan_interval_ms(mut self, ms: u64) -> Self {
        self.config.scan_interval_ms = ms;
        self
    }

    pub fn refresh_timeout_ms(mut self, ms: u64) -> Self {
        self.config.refresh_timeout_ms = ms;
        self
    }

    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    pub fn delimiter(mut self, delimiter: Delimiter) -> Self {
        self.config.delimiter = delimiter;
        self
    }

    pub fn policy(mut self, policy: ReconcilePolicy) -> Self {
        self.config.policy = policy;
        self
    }

    pub fn derive_partition_alarm(mut self, derive: bool) -> Self {
        self.config.policy.derive_partition_alarm = derive;
        self
    }

    pub fn build(self) -> PanelConfig {
        self.config
    }
}
