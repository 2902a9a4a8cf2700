//! # Telemetry Scheduler
//!
//! One timer per telemetry group. Once per tick the active driver asks which
//! group, if any, is due:
//!
//! 1. Groups forced by a health mask change go first, regardless of timers.
//! 2. Otherwise, among groups whose interval has elapsed, the one with the
//!    largest overrun wins. Ties go to the higher priority group.
//!
//! Selecting a group resets its timer to the current time.

use tracing::trace;

use crate::frsky::protocol::data_id;

/// Category of telemetry sharing one timer
///
/// Declaration order is the tie-break priority, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TelemetryGroup {
    AutopilotStatus,
    GpsPosition,
    GpsStatus,
    Battery,
    Vfas,
    AttitudeRange,
    VelocityYaw,
    Home,
    Vario,
    BaroAltitude,
    Parameters,
}

impl TelemetryGroup {
    /// Every group, highest priority first
    pub const ALL: [TelemetryGroup; 11] = [
        TelemetryGroup::AutopilotStatus,
        TelemetryGroup::GpsPosition,
        TelemetryGroup::GpsStatus,
        TelemetryGroup::Battery,
        TelemetryGroup::Vfas,
        TelemetryGroup::AttitudeRange,
        TelemetryGroup::VelocityYaw,
        TelemetryGroup::Home,
        TelemetryGroup::Vario,
        TelemetryGroup::BaroAltitude,
        TelemetryGroup::Parameters,
    ];

    /// S.Port data id the group's word is sent under
    pub fn data_id(self) -> u16 {
        match self {
            TelemetryGroup::AutopilotStatus => data_id::DIY_FIRST + 1,
            TelemetryGroup::GpsStatus => data_id::DIY_FIRST + 2,
            TelemetryGroup::Battery => data_id::DIY_FIRST + 3,
            TelemetryGroup::Home => data_id::DIY_FIRST + 4,
            TelemetryGroup::VelocityYaw => data_id::DIY_FIRST + 5,
            TelemetryGroup::AttitudeRange => data_id::DIY_FIRST + 6,
            TelemetryGroup::Parameters => data_id::DIY_FIRST + 7,
            TelemetryGroup::GpsPosition => data_id::GPS_LONG_LATI_FIRST,
            TelemetryGroup::Vario => data_id::VARIO_FIRST,
            TelemetryGroup::BaroAltitude => data_id::ALT_FIRST,
            TelemetryGroup::Vfas => data_id::VFAS_FIRST,
        }
    }
}

/// Where a group stands relative to its timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    /// Interval not yet elapsed
    Idle,
    /// Eligible for selection
    Due,
    /// Selected during the current tick
    Sent,
}

/// Timer of one group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupTimer {
    pub group: TelemetryGroup,
    pub interval_ms: u64,
    /// `None` until first sent; a never-sent group is due immediately
    pub last_sent_ms: Option<u64>,
    /// Bypasses the timer on the next selection
    pub forced: bool,
}

impl GroupTimer {
    pub fn new(group: TelemetryGroup, interval_ms: u64) -> Self {
        Self {
            group,
            interval_ms,
            last_sent_ms: None,
            forced: false,
        }
    }

    pub fn state(&self, now_ms: u64) -> GroupState {
        match self.last_sent_ms {
            Some(last) if last == now_ms => GroupState::Sent,
            _ if self.forced => GroupState::Due,
            Some(last) if now_ms.saturating_sub(last) < self.interval_ms => GroupState::Idle,
            _ => GroupState::Due,
        }
    }

    /// How far past its deadline the group is; `None` while not due
    fn overrun(&self, now_ms: u64) -> Option<u64> {
        match self.last_sent_ms {
            None => Some(u64::MAX),
            Some(last) => now_ms
                .saturating_sub(last)
                .checked_sub(self.interval_ms),
        }
    }
}

/// Per-group timers and the selection policy
#[derive(Debug, Clone)]
pub struct TelemetryScheduler {
    timers: Vec<GroupTimer>,
    health_mask: u32,
}

impl TelemetryScheduler {
    /// Create a scheduler over the given `(group, interval)` pairs
    ///
    /// Groups left out are never selected.
    pub fn new(intervals: impl IntoIterator<Item = (TelemetryGroup, u64)>) -> Self {
        let mut timers: Vec<GroupTimer> = intervals
            .into_iter()
            .map(|(group, interval_ms)| GroupTimer::new(group, interval_ms))
            .collect();
        timers.sort_by_key(|timer| timer.group);
        timers.dedup_by_key(|timer| timer.group);

        Self {
            timers,
            health_mask: 0,
        }
    }

    pub fn timer(&self, group: TelemetryGroup) -> Option<&GroupTimer> {
        self.timers.iter().find(|timer| timer.group == group)
    }

    pub fn state(&self, group: TelemetryGroup, now_ms: u64) -> Option<GroupState> {
        self.timer(group).map(|timer| timer.state(now_ms))
    }

    /// Make a group bypass its timer on the next selection
    pub fn force(&mut self, group: TelemetryGroup) {
        if let Some(timer) = self.timers.iter_mut().find(|timer| timer.group == group) {
            timer.forced = true;
        }
    }

    /// Whether a forced group is waiting
    pub fn has_forced(&self) -> bool {
        self.timers.iter().any(|timer| timer.forced)
    }

    /// Compare the health mask with the previous one; a change forces the
    /// autopilot status group
    pub fn observe_health(&mut self, mask: u32) {
        if mask != self.health_mask {
            trace!(
                "Health mask changed 0x{:08X} -> 0x{:08X}",
                self.health_mask,
                mask
            );
            self.health_mask = mask;
            self.force(TelemetryGroup::AutopilotStatus);
        }
    }

    /// Pick the group to send now and mark it sent
    pub fn select(&mut self, now_ms: u64) -> Option<TelemetryGroup> {
        let index = self
            .timers
            .iter()
            .position(|timer| timer.forced)
            .or_else(|| {
                self.timers
                    .iter()
                    .enumerate()
                    .filter_map(|(i, timer)| timer.overrun(now_ms).map(|overrun| (i, overrun)))
                    // timers are in priority order: keep the first of equal overruns
                    .fold(None, |best: Option<(usize, u64)>, (i, overrun)| match best {
                        Some((_, best_overrun)) if best_overrun >= overrun => best,
                        _ => Some((i, overrun)),
                    })
                    .map(|(i, _)| i)
            })?;

        let timer = &mut self.timers[index];
        timer.last_sent_ms = Some(now_ms);
        timer.forced = false;
        Some(timer.group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn count_selections(
        scheduler: &mut TelemetryScheduler,
        window: std::ops::Range<u64>,
    ) -> HashMap<TelemetryGroup, usize> {
        let mut counts = HashMap::new();
        for now in window {
            if let Some(group) = scheduler.select(now) {
                *counts.entry(group).or_insert(0) += 1;
            }
        }
        counts
    }

    #[test]
    fn test_fairness_over_one_second() {
        let mut scheduler = TelemetryScheduler::new([
            (TelemetryGroup::GpsPosition, 200),
            (TelemetryGroup::Battery, 200),
            (TelemetryGroup::Parameters, 1000),
        ]);

        let counts = count_selections(&mut scheduler, 0..1000);
        assert_eq!(counts[&TelemetryGroup::GpsPosition], 5);
        assert_eq!(counts[&TelemetryGroup::Battery], 5);
        assert_eq!(counts[&TelemetryGroup::Parameters], 1);
    }

    #[test]
    fn test_never_sent_groups_due_in_priority_order() {
        let mut scheduler = TelemetryScheduler::new([
            (TelemetryGroup::Parameters, 1000),
            (TelemetryGroup::Battery, 1000),
            (TelemetryGroup::GpsPosition, 1000),
        ]);

        assert_eq!(scheduler.select(0), Some(TelemetryGroup::GpsPosition));
        assert_eq!(scheduler.select(1), Some(TelemetryGroup::Battery));
        assert_eq!(scheduler.select(2), Some(TelemetryGroup::Parameters));
        assert_eq!(scheduler.select(3), None);
    }

    #[test]
    fn test_largest_overrun_wins() {
        let mut scheduler = TelemetryScheduler::new([
            (TelemetryGroup::GpsPosition, 100),
            (TelemetryGroup::Home, 100),
        ]);
        scheduler.select(0); // GpsPosition at 0
        scheduler.select(10); // Home at 10

        // At 150 GPS overruns by 50 and Home by 40
        assert_eq!(scheduler.select(150), Some(TelemetryGroup::GpsPosition));
        // At 160 Home overruns by 50, GPS not due
        assert_eq!(scheduler.select(160), Some(TelemetryGroup::Home));
    }

    #[test]
    fn test_lower_priority_with_larger_overrun_wins() {
        let mut scheduler = TelemetryScheduler::new([
            (TelemetryGroup::GpsPosition, 100),
            (TelemetryGroup::Parameters, 50),
        ]);
        scheduler.select(0);
        scheduler.select(1);

        // GPS overruns by 20, Parameters by 69
        assert_eq!(scheduler.select(120), Some(TelemetryGroup::Parameters));
    }

    #[test]
    fn test_health_change_preempts_timer() {
        let mut scheduler = TelemetryScheduler::new([
            (TelemetryGroup::AutopilotStatus, 500),
            (TelemetryGroup::GpsPosition, 10),
        ]);
        assert_eq!(scheduler.select(0), Some(TelemetryGroup::AutopilotStatus));
        assert_eq!(scheduler.select(1), Some(TelemetryGroup::GpsPosition));

        scheduler.observe_health(0x00);
        assert_eq!(scheduler.select(20), Some(TelemetryGroup::GpsPosition));

        scheduler.observe_health(0x04);
        assert!(scheduler.has_forced());
        assert_eq!(scheduler.state(TelemetryGroup::AutopilotStatus, 21), Some(GroupState::Due));
        assert_eq!(scheduler.select(21), Some(TelemetryGroup::AutopilotStatus));
        assert!(!scheduler.has_forced());

        // Same mask again: no preemption
        scheduler.observe_health(0x04);
        assert_eq!(scheduler.select(40), Some(TelemetryGroup::GpsPosition));
    }

    #[test]
    fn test_group_states() {
        let mut scheduler = TelemetryScheduler::new([(TelemetryGroup::Battery, 100)]);
        assert_eq!(scheduler.state(TelemetryGroup::Battery, 0), Some(GroupState::Due));

        scheduler.select(0);
        assert_eq!(scheduler.state(TelemetryGroup::Battery, 0), Some(GroupState::Sent));
        assert_eq!(scheduler.state(TelemetryGroup::Battery, 99), Some(GroupState::Idle));
        assert_eq!(scheduler.state(TelemetryGroup::Battery, 100), Some(GroupState::Due));
        assert_eq!(scheduler.state(TelemetryGroup::Home, 100), None);
    }

    #[test]
    fn test_clock_going_backwards_is_not_due() {
        let mut scheduler = TelemetryScheduler::new([(TelemetryGroup::Battery, 100)]);
        scheduler.select(1_000);
        assert_eq!(scheduler.select(500), None);
    }

    #[test]
    fn test_data_ids() {
        assert_eq!(TelemetryGroup::AutopilotStatus.data_id(), 0x5001);
        assert_eq!(TelemetryGroup::Parameters.data_id(), 0x5007);
        assert_eq!(TelemetryGroup::GpsPosition.data_id(), 0x0800);
        assert_eq!(TelemetryGroup::Vfas.data_id(), 0x0210);
    }

    #[test]
    fn test_duplicate_groups_collapse() {
        let scheduler = TelemetryScheduler::new([
            (TelemetryGroup::Battery, 100),
            (TelemetryGroup::Battery, 200),
        ]);
        assert_eq!(scheduler.timer(TelemetryGroup::Battery).unwrap().interval_ms, 100);
    }
}
