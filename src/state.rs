// MIT License - Copyright (c) 2026 Peter Wright
// Canonical panel state and the reconciler that maintains it

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::ReconcilePolicy;
use crate::devices::partition::{ArmingState, PartitionStatus};
use crate::devices::zone::{ZoneStatus, ZoneStatusType};
use crate::translate::{PanelMessage, PartitionUpdate, ZoneUpdate};

/// Point-in-time view of the panel.
///
/// Snapshots are shared as `Arc<Snapshot>` and never mutated once published;
/// every accepted event produces a new one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub partition_status: PartitionStatus,
    pub zones: BTreeMap<u32, ZoneStatus>,
    pub updated_at: DateTime<Utc>,
}

impl Snapshot {
    /// Startup state: partition disarmed, every configured zone clear.
    pub fn initial(zone_numbers: impl IntoIterator<Item = u32>) -> Self {
        Self {
            partition_status: PartitionStatus::Disarmed,
            zones: zone_numbers
                .into_iter()
                .map(|id| (id, ZoneStatus::default()))
                .collect(),
            updated_at: Utc::now(),
        }
    }

    pub fn zone(&self, zone_id: u32) -> Option<&ZoneStatus> {
        self.zones.get(&zone_id)
    }

    pub fn arming_state(&self) -> Option<ArmingState> {
        self.partition_status.arming_state()
    }

    /// All zones sealed and the panel reports ready.
    pub fn ready_to_arm(&self) -> bool {
        self.partition_status == PartitionStatus::Ready
    }

    pub fn open_zones(&self) -> Vec<u32> {
        self.zones_where(|z| z.open)
    }

    pub fn alarmed_zones(&self) -> Vec<u32> {
        self.zones_where(|z| z.alarm)
    }

    pub fn bypassed_zones(&self) -> Vec<u32> {
        self.zones_where(|z| z.bypassed)
    }

    fn zones_where(&self, predicate: impl Fn(&ZoneStatus) -> bool) -> Vec<u32> {
        self.zones
            .iter()
            .filter(|(_, status)| predicate(*status))
            .map(|(id, _)| *id)
            .collect()
    }
}

/// Bookkeeping for an in-flight status dump.
#[derive(Debug, Clone, Default)]
pub struct SyncSession {
    pub in_progress: bool,
    pub seen_zone_ids: HashSet<u32>,
}

/// Applies translated messages to the canonical snapshot.
///
/// Owned by exactly one task. Rules:
/// - zone events update one field of a configured zone;
/// - partition events are discarded while the partition is armed, arming or
///   in alarm and the incoming status is shielded by the policy;
/// - `OK STATUS` opens a sync session, and the `RO` that closes it resets
///   every configured zone the dump did not mention;
/// - command responses, system messages and unrecognized frames never mutate.
#[derive(Debug)]
pub struct Reconciler {
    current: Arc<Snapshot>,
    sync: SyncSession,
    policy: ReconcilePolicy,
}

impl Reconciler {
    pub fn new(zone_numbers: impl IntoIterator<Item = u32>, policy: ReconcilePolicy) -> Self {
        Self::resume(Arc::new(Snapshot::initial(zone_numbers)), policy)
    }

    /// Continue from a previously published snapshot, e.g. after a reconnect.
    /// Any sync session of the old connection is forgotten.
    pub fn resume(current: Arc<Snapshot>, policy: ReconcilePolicy) -> Self {
        Self {
            current,
            sync: SyncSession::default(),
            policy,
        }
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current)
    }

    pub fn sync_in_progress(&self) -> bool {
        self.sync.in_progress
    }

    /// Apply one message. Returns the new snapshot if one was published.
    pub fn apply(&mut self, message: &PanelMessage) -> Option<Arc<Snapshot>> {
        match message {
            PanelMessage::SyncStart => {
                debug!("Status dump started");
                self.sync.in_progress = true;
                self.sync.seen_zone_ids.clear();
                None
            }
            PanelMessage::Zone(update) => self.apply_zone(update),
            PanelMessage::Partition(update) => self.apply_partition(update),
            PanelMessage::CommandResponse(_)
            | PanelMessage::System(_)
            | PanelMessage::Unrecognized(_) => None,
        }
    }

    fn apply_zone(&mut self, update: &ZoneUpdate) -> Option<Arc<Snapshot>> {
        if self.sync.in_progress {
            self.sync.seen_zone_ids.insert(update.zone_id);
        }

        if !update.status_type.is_tracked() {
            return None;
        }
        if !self.current.zones.contains_key(&update.zone_id) {
            debug!("Ignoring event for unconfigured zone {}", update.zone_id);
            return None;
        }

        let mut zones = self.current.zones.clone();
        if let Some(status) = zones.get_mut(&update.zone_id) {
            status.set(update.status_type, update.action);
        }

        let mut partition_status = self.current.partition_status;
        if self.policy.derive_partition_alarm && update.status_type == ZoneStatusType::Alarm {
            if update.action {
                partition_status = PartitionStatus::InAlarm;
            } else if partition_status == PartitionStatus::InAlarm
                && !zones.values().any(|z| z.alarm)
            {
                partition_status = PartitionStatus::Disarmed;
            }
        }

        Some(self.publish(partition_status, zones))
    }

    fn apply_partition(&mut self, update: &PartitionUpdate) -> Option<Arc<Snapshot>> {
        let current = self.current.partition_status;
        let shielded = current.is_armed_family()
            && self.policy.shielded_statuses.contains(&update.status);

        let partition_status = if shielded {
            debug!(
                "Shielding armed state '{}' from incoming '{}'",
                current, update.status
            );
            current
        } else {
            update.status
        };

        let mut zones = None;
        if update.status == PartitionStatus::Ready && self.sync.in_progress {
            zones = Some(self.finish_sync());
        }

        if shielded && zones.is_none() {
            return None;
        }
        let zones = zones.unwrap_or_else(|| self.current.zones.clone());
        Some(self.publish(partition_status, zones))
    }

    /// End the sync session, clearing every configured zone the dump skipped.
    fn finish_sync(&mut self) -> BTreeMap<u32, ZoneStatus> {
        let mut zones = self.current.zones.clone();
        let mut reset = 0;
        for (id, status) in zones.iter_mut() {
            if !self.sync.seen_zone_ids.contains(id) {
                status.clear();
                reset += 1;
            }
        }
        info!(
            seen = self.sync.seen_zone_ids.len(),
            reset, "Status dump complete"
        );
        self.sync = SyncSession::default();
        zones
    }

    fn publish(
        &mut self,
        partition_status: PartitionStatus,
        zones: BTreeMap<u32, ZoneStatus>,
    ) -> Arc<Snapshot> {
        self.current = Arc::new(Snapshot {
            partition_status,
            zones,
            updated_at: Utc::now(),
        });
        self.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::translate;

    fn reconciler(zones: &[u32]) -> Reconciler {
        Reconciler::new(zones.iter().copied(), ReconcilePolicy::default())
    }

    fn feed(reconciler: &mut Reconciler, frames: &[&str]) {
        for frame in frames {
            reconciler.apply(&translate(frame));
        }
    }

    #[test]
    fn test_initial_snapshot() {
        let r = reconciler(&[1, 2, 3]);
        let snap = r.snapshot();
        assert_eq!(snap.partition_status, PartitionStatus::Disarmed);
        assert_eq!(snap.zones.len(), 3);
        assert!(snap.zones.values().all(ZoneStatus::is_clear));
        assert_eq!(snap.arming_state(), Some(ArmingState::Disarmed));
    }

    #[test]
    fn test_last_write_wins_per_field() {
        let mut r = reconciler(&[5]);
        feed(&mut r, &["ZO5", "ZC5", "ZO5"]);
        assert!(r.snapshot().zone(5).map(|z| z.open).unwrap_or(false));

        feed(&mut r, &["ZBY5", "ZC5"]);
        let zone = r.snapshot().zone(5).copied().unwrap_or_default();
        assert!(!zone.open);
        assert!(zone.bypassed);
    }

    #[test]
    fn test_every_accepted_event_publishes_new_snapshot() {
        let mut r = reconciler(&[5]);
        let before = r.snapshot();
        let after = r.apply(&translate("ZO5")).unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert!(before.zone(5).map(|z| !z.open).unwrap_or(false));
        assert!(after.zone(5).map(|z| z.open).unwrap_or(false));
    }

    #[test]
    fn test_unconfigured_zone_ignored() {
        let mut r = reconciler(&[1]);
        assert!(r.apply(&translate("ZO9")).is_none());
        assert!(r.snapshot().zone(9).is_none());
    }

    #[test]
    fn test_untracked_zone_status_does_not_publish() {
        let mut r = reconciler(&[1]);
        assert!(r.apply(&translate("ZBL1")).is_none());
        assert!(r.snapshot().zone(1).map(ZoneStatus::is_clear).unwrap_or(false));
    }

    #[test]
    fn test_shielding_while_armed() {
        let mut r = reconciler(&[1]);
        feed(&mut r, &["A1"]);
        assert_eq!(r.snapshot().partition_status, PartitionStatus::AwayArmed);

        for frame in ["RO1", "NR1", "AR1", "OO1", "OR1"] {
            assert!(r.apply(&translate(frame)).is_none(), "{frame} should be shielded");
            assert_eq!(r.snapshot().partition_status, PartitionStatus::AwayArmed);
        }

        feed(&mut r, &["D1"]);
        assert_eq!(r.snapshot().partition_status, PartitionStatus::Disarmed);
    }

    #[test]
    fn test_shielding_covers_exit_timing_and_alarm() {
        let mut r = reconciler(&[1]);
        feed(&mut r, &["EA1", "RO1"]);
        assert_eq!(r.snapshot().partition_status, PartitionStatus::ExitAwayTiming);
        feed(&mut r, &["AA1", "NR1"]);
        assert_eq!(r.snapshot().partition_status, PartitionStatus::InAlarm);
        assert_eq!(r.snapshot().arming_state(), Some(ArmingState::Triggered));
    }

    #[test]
    fn test_no_shielding_when_disarmed() {
        let mut r = reconciler(&[1]);
        feed(&mut r, &["RO1"]);
        assert_eq!(r.snapshot().partition_status, PartitionStatus::Ready);
        assert!(r.snapshot().ready_to_arm());
        feed(&mut r, &["NR1"]);
        assert_eq!(r.snapshot().partition_status, PartitionStatus::NotReady);
    }

    #[test]
    fn test_custom_shielded_set() {
        let policy = ReconcilePolicy {
            derive_partition_alarm: false,
            shielded_statuses: HashSet::from([PartitionStatus::NotReady]),
        };
        let mut r = Reconciler::new([1], policy);
        feed(&mut r, &["S1", "NR1"]);
        assert_eq!(r.snapshot().partition_status, PartitionStatus::StayArmed);
        feed(&mut r, &["RO1"]);
        assert_eq!(r.snapshot().partition_status, PartitionStatus::Ready);
    }

    #[test]
    fn test_resync_resets_unseen_zones() {
        let mut r = reconciler(&[1, 2, 3]);
        feed(&mut r, &["ZO2", "ZA2", "ZBY1"]);

        feed(&mut r, &["OK STATUS", "ZO1", "ZBY3"]);
        assert!(r.sync_in_progress());
        feed(&mut r, &["RO1"]);
        assert!(!r.sync_in_progress());

        let snap = r.snapshot();
        assert!(snap.zone(2).map(ZoneStatus::is_clear).unwrap_or(false));
        assert_eq!(
            snap.zone(1).copied(),
            Some(ZoneStatus {
                open: true,
                alarm: false,
                bypassed: true
            })
        );
        assert_eq!(
            snap.zone(3).copied(),
            Some(ZoneStatus {
                open: false,
                alarm: false,
                bypassed: true
            })
        );
        assert_eq!(snap.partition_status, PartitionStatus::Ready);
    }

    #[test]
    fn test_resync_reset_applies_even_when_ready_is_shielded() {
        let mut r = reconciler(&[1, 2]);
        feed(&mut r, &["ZO1", "ZO2", "A1", "OK STATUS", "ZO1"]);

        let snap = r.apply(&translate("RO1")).expect("sync reset publishes");
        assert_eq!(snap.partition_status, PartitionStatus::AwayArmed);
        assert!(snap.zone(1).map(|z| z.open).unwrap_or(false));
        assert!(snap.zone(2).map(ZoneStatus::is_clear).unwrap_or(false));
        assert!(!r.sync_in_progress());
    }

    #[test]
    fn test_sync_start_does_not_publish() {
        let mut r = reconciler(&[1]);
        assert!(r.apply(&translate("OK STATUS")).is_none());
        assert!(r.sync_in_progress());
    }

    #[test]
    fn test_ready_outside_sync_keeps_zones() {
        let mut r = reconciler(&[1, 2]);
        feed(&mut r, &["ZO2", "RO1"]);
        assert!(r.snapshot().zone(2).map(|z| z.open).unwrap_or(false));
    }

    #[test]
    fn test_command_response_never_mutates() {
        let mut r = reconciler(&[1]);
        let before = r.snapshot();
        assert!(r.apply(&translate("ERR 2")).is_none());
        assert!(r.apply(&translate("OK ARMAWAY 1")).is_none());
        assert!(r.apply(&translate("MF")).is_none());
        assert!(r.apply(&translate("GARBAGE")).is_none());
        assert!(Arc::ptr_eq(&before, &r.snapshot()));
    }

    #[test]
    fn test_alarm_derivation_off_by_default() {
        let mut r = reconciler(&[1]);
        feed(&mut r, &["ZA1"]);
        assert_eq!(r.snapshot().partition_status, PartitionStatus::Disarmed);
        assert_eq!(r.snapshot().alarmed_zones(), vec![1]);
    }

    #[test]
    fn test_alarm_derivation_when_enabled() {
        let policy = ReconcilePolicy {
            derive_partition_alarm: true,
            ..ReconcilePolicy::default()
        };
        let mut r = Reconciler::new([1, 2], policy);

        feed(&mut r, &["ZA1", "ZA2"]);
        assert_eq!(r.snapshot().partition_status, PartitionStatus::InAlarm);

        feed(&mut r, &["ZR1"]);
        assert_eq!(r.snapshot().partition_status, PartitionStatus::InAlarm);

        feed(&mut r, &["ZR2"]);
        assert_eq!(r.snapshot().partition_status, PartitionStatus::Disarmed);
    }

    #[test]
    fn test_zone_lists() {
        let mut r = reconciler(&[1, 2, 3, 4]);
        feed(&mut r, &["ZO3", "ZO1", "ZBY4", "ZA2"]);
        let snap = r.snapshot();
        assert_eq!(snap.open_zones(), vec![1, 3]);
        assert_eq!(snap.bypassed_zones(), vec![4]);
        assert_eq!(snap.alarmed_zones(), vec![2]);
    }

    #[test]
    fn test_resume_keeps_state_and_drops_sync() {
        let mut r = reconciler(&[1]);
        feed(&mut r, &["ZO1", "OK STATUS"]);
        let r = Reconciler::resume(r.snapshot(), ReconcilePolicy::default());
        assert!(!r.sync_in_progress());
        assert!(r.snapshot().zone(1).map(|z| z.open).unwrap_or(false));
    }

    #[test]
    fn test_snapshot_serializes() {
        let r = reconciler(&[1]);
        let json = serde_json::to_value(&*r.snapshot()).unwrap();
        assert_eq!(json["partition_status"], "disarmed");
        assert_eq!(json["zones"]["1"]["open"], false);
    }
}
