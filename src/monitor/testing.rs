//! In-memory collaborators for loop and controller tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{NaiveDate, Utc};

use crate::api::{AuditLogApi, BoxFuture, Classifier, SessionDirectory};
use crate::capture::Frame;
use crate::error::{MonitorError, Result};
use crate::models::{AuditLogEntry, ClassificationResult, Identity, Session, TeacherIdentity};

pub fn frame() -> Frame {
    Frame {
        jpeg: vec![0xFF, 0xD8, 0xFF, 0xD9],
        width: 4,
        height: 4,
        captured_at: Utc::now(),
    }
}

/// Answers from a script, "active" once the script runs dry.
#[derive(Default)]
pub struct ScriptedClassifier {
    script: Mutex<VecDeque<Result<ClassificationResult>>>,
    latency: Mutex<Duration>,
    counts: Mutex<Vec<u8>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    pub fn push_label(&self, label: &str, triggered: bool) {
        self.push_result(Ok(ClassificationResult {
            label: label.into(),
            notification_triggered: triggered,
            notification_text: None,
        }));
    }

    pub fn push_notification(&self, label: &str, text: &str) {
        self.push_result(Ok(ClassificationResult {
            label: label.into(),
            notification_triggered: true,
            notification_text: Some(text.into()),
        }));
    }

    pub fn push_error(&self, err: MonitorError) {
        self.push_result(Err(err));
    }

    pub fn push_result(&self, result: Result<ClassificationResult>) {
        self.script.lock().unwrap().push_back(result);
    }

    pub fn seen_counts(&self) -> Vec<u8> {
        self.counts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Classifier for ScriptedClassifier {
    fn classify_frame(
        &self,
        _frame: Frame,
        _identity: Identity,
        inactivity_count: u8,
    ) -> BoxFuture<'_, Result<ClassificationResult>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.counts.lock().unwrap().push(inactivity_count);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            let _guard = InFlight(&self.in_flight);

            let latency = *self.latency.lock().unwrap();
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }

            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Ok(ClassificationResult {
                        label: "active".into(),
                        notification_triggered: false,
                        notification_text: None,
                    })
                })
        })
    }
}

/// Serves scripted lookups first, then the fallback forever.
#[derive(Default)]
pub struct ScriptedSessions {
    script: Mutex<VecDeque<Result<Option<Session>>>>,
    fallback: Mutex<Option<Session>>,
    calls: AtomicUsize,
}

impl ScriptedSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallback(session: Option<Session>) -> Self {
        let sessions = Self::new();
        sessions.set_fallback(session);
        sessions
    }

    pub fn push(&self, outcome: Result<Option<Session>>) {
        self.script.lock().unwrap().push_back(outcome);
    }

    pub fn set_fallback(&self, session: Option<Session>) {
        *self.fallback.lock().unwrap() = session;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SessionDirectory for ScriptedSessions {
    fn current_session(&self, _identity: Identity) -> BoxFuture<'_, Result<Option<Session>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.lock().unwrap().clone()));
        Box::pin(async move { outcome })
    }
}

#[derive(Default)]
pub struct RecordingAudit {
    entries: Mutex<Vec<AuditLogEntry>>,
    fail: bool,
}

impl RecordingAudit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the attempt, then fails every write.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn entries(&self) -> Vec<AuditLogEntry> {
        self.entries.lock().unwrap().clone()
    }
}

impl AuditLogApi for RecordingAudit {
    fn append_audit_log(&self, entry: AuditLogEntry) -> BoxFuture<'_, Result<()>> {
        self.entries.lock().unwrap().push(entry);
        let outcome = if self.fail {
            Err(MonitorError::Transport("connection refused".into()))
        } else {
            Ok(())
        };
        Box::pin(async move { outcome })
    }

    fn list_audit_log(
        &self,
        student_id: i64,
        subject_id: i64,
        date: NaiveDate,
        _teacher: TeacherIdentity,
    ) -> BoxFuture<'_, Result<Vec<AuditLogEntry>>> {
        let mut rows: Vec<AuditLogEntry> = self
            .entries()
            .into_iter()
            .filter(|entry| {
                entry.student_id == student_id
                    && entry.subject_id == subject_id
                    && entry.timestamp.date_naive() == date
            })
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Box::pin(async move { Ok(rows) })
    }
}
