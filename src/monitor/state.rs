use serde::Serialize;

use crate::error::MonitorError;
use crate::models::ClassificationResult;

use super::counter::{InactivityCounter, Observation};

/// Label shown before the first classification completes.
pub const INITIAL_STATUS: &str = "active";

const DEFAULT_NOTIFICATION: &str = "Inactivity notification sent";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum MonitorPhase {
    #[default]
    Idle,
    Capturing,
    Classifying,
    Reacting,
    Stopped,
}

impl MonitorPhase {
    /// Any phase between tick acceptance and cycle completion.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            MonitorPhase::Capturing | MonitorPhase::Classifying | MonitorPhase::Reacting
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CycleStats {
    pub completed: u64,
    /// Cycles abandoned because the device produced no frame.
    pub skipped: u64,
    /// Cycles whose classification failed or timed out.
    pub failed: u64,
    /// Ticks that arrived while a cycle was in flight.
    pub dropped_ticks: u64,
}

/// What the UI layer sees, published once per state change.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStatus {
    pub status: String,
    pub inactivity_count: u8,
    pub notification: Option<String>,
    pub is_processing: bool,
    pub error: Option<String>,
    pub phase: MonitorPhase,
    pub stats: CycleStats,
}

impl Default for MonitorStatus {
    fn default() -> Self {
        Self {
            status: INITIAL_STATUS.to_string(),
            inactivity_count: 0,
            notification: None,
            is_processing: false,
            error: None,
            phase: MonitorPhase::Idle,
            stats: CycleStats::default(),
        }
    }
}

/// Loop-owned state. Only the monitor loop holds one.
#[derive(Debug, Clone)]
pub struct MonitorState {
    pub status: String,
    pub counter: InactivityCounter,
    pub notification: Option<String>,
    pub error: Option<String>,
    pub phase: MonitorPhase,
    pub stats: CycleStats,
}

impl Default for MonitorState {
    fn default() -> Self {
        Self {
            status: INITIAL_STATUS.to_string(),
            counter: InactivityCounter::new(),
            notification: None,
            error: None,
            phase: MonitorPhase::Idle,
            stats: CycleStats::default(),
        }
    }
}

impl MonitorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.phase.is_busy()
    }

    pub fn begin_capture(&mut self) {
        self.phase = MonitorPhase::Capturing;
    }

    pub fn begin_classify(&mut self) {
        self.phase = MonitorPhase::Classifying;
    }

    pub fn drop_tick(&mut self) {
        self.stats.dropped_ticks += 1;
    }

    /// Applies a successful classification. Returns the counter observation so
    /// the caller can schedule the notification auto-clear.
    pub fn apply_result(&mut self, result: &ClassificationResult) -> Observation {
        self.phase = MonitorPhase::Reacting;
        self.status = result.label.clone();
        self.error = None;

        let observation = self.counter.observe(result);
        if observation.threshold_crossed {
            self.notification = Some(
                result
                    .notification_text
                    .clone()
                    .unwrap_or_else(|| DEFAULT_NOTIFICATION.to_string()),
            );
        } else if !result.is_inactive() {
            self.notification = None;
        }

        self.stats.completed += 1;
        self.phase = MonitorPhase::Idle;
        observation
    }

    /// Capture produced nothing: surface it, leave everything else alone.
    pub fn apply_capture_failure(&mut self, err: &MonitorError) {
        self.error = Some(err.user_message());
        self.stats.skipped += 1;
        self.phase = MonitorPhase::Idle;
    }

    /// Classification failed: surface it; counter and status stay unchanged.
    pub fn apply_classify_failure(&mut self, err: &MonitorError) {
        self.error = Some(err.user_message());
        self.stats.failed += 1;
        self.phase = MonitorPhase::Idle;
    }

    pub fn clear_notification(&mut self) {
        self.notification = None;
    }

    pub fn snapshot(&self) -> MonitorStatus {
        MonitorStatus {
            status: self.status.clone(),
            inactivity_count: self.counter.count(),
            notification: self.notification.clone(),
            is_processing: self.is_busy(),
            error: self.error.clone(),
            phase: self.phase,
            stats: self.stats,
        }
    }

    /// Status published at teardown: reset, stopped.
    pub fn stopped_snapshot(&self) -> MonitorStatus {
        MonitorStatus {
            phase: MonitorPhase::Stopped,
            stats: self.stats,
            ..MonitorStatus::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(label: &str, triggered: bool, text: Option<&str>) -> ClassificationResult {
        ClassificationResult {
            label: label.into(),
            notification_triggered: triggered,
            notification_text: text.map(str::to_string),
        }
    }

    #[test]
    fn snapshot_reports_processing_while_busy() {
        let mut state = MonitorState::new();
        state.begin_capture();
        assert!(state.snapshot().is_processing);
        state.begin_classify();
        assert_eq!(state.snapshot().phase, MonitorPhase::Classifying);
        state.apply_result(&result("active", false, None));
        assert!(!state.snapshot().is_processing);
    }

    #[test]
    fn classify_failure_leaves_counter_and_status() {
        let mut state = MonitorState::new();
        state.apply_result(&result("inactive", false, None));
        state.apply_result(&result("inactive", false, None));

        state.apply_classify_failure(&MonitorError::Service("Analysis failed".into()));
        let snapshot = state.snapshot();
        assert_eq!(snapshot.status, "inactive");
        assert_eq!(snapshot.inactivity_count, 2);
        assert_eq!(snapshot.error.as_deref(), Some("Analysis failed"));
        assert_eq!(snapshot.stats.failed, 1);
    }

    #[test]
    fn success_clears_previous_error() {
        let mut state = MonitorState::new();
        state.apply_capture_failure(&MonitorError::Capture("none".into()));
        assert!(state.error.is_some());
        state.apply_result(&result("active", false, None));
        assert!(state.error.is_none());
        assert_eq!(state.stats.skipped, 1);
    }

    #[test]
    fn notification_set_on_trigger_and_cleared_by_other_label() {
        let mut state = MonitorState::new();
        state.apply_result(&result("inactive", true, Some("Alert SMS sent to mentor")));
        assert_eq!(state.notification.as_deref(), Some("Alert SMS sent to mentor"));
        assert_eq!(state.counter.count(), 0);

        // An inactive label without a trigger keeps the notification on screen.
        state.apply_result(&result("inactive", false, None));
        assert!(state.notification.is_some());

        state.apply_result(&result("active", false, None));
        assert!(state.notification.is_none());
    }

    #[test]
    fn stopped_snapshot_is_reset() {
        let mut state = MonitorState::new();
        state.apply_result(&result("inactive", false, None));
        let stopped = state.stopped_snapshot();
        assert_eq!(stopped.phase, MonitorPhase::Stopped);
        assert_eq!(stopped.inactivity_count, 0);
        assert_eq!(stopped.status, INITIAL_STATUS);
        assert_eq!(stopped.stats.completed, 1);
    }
}
