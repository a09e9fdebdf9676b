use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::NaiveDate;

use crate::api::{AttendanceApi, BoxFuture};
use crate::error::{MonitorError, Result};
use crate::models::{Decision, Identity, ReviewEntry, SessionKey, TeacherIdentity};

/// Records every call; optionally refuses them with a service error.
pub struct RecordingAttendance {
    pub created: Mutex<Vec<(Identity, SessionKey)>>,
    pub responses: Mutex<Vec<(i64, Decision, TeacherIdentity)>>,
    pub listing: Mutex<Vec<ReviewEntry>>,
    pub refuse: Mutex<Option<String>>,
    next_id: AtomicI64,
    calls: AtomicUsize,
}

impl Default for RecordingAttendance {
    fn default() -> Self {
        Self {
            created: Mutex::default(),
            responses: Mutex::default(),
            listing: Mutex::default(),
            refuse: Mutex::default(),
            next_id: AtomicI64::new(100),
            calls: AtomicUsize::new(0),
        }
    }
}

impl RecordingAttendance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refuse_with(&self, message: &str) {
        *self.refuse.lock().unwrap() = Some(message.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.refuse.lock().unwrap().clone() {
            Some(message) => Err(MonitorError::Service(message)),
            None => Ok(()),
        }
    }
}

impl AttendanceApi for RecordingAttendance {
    fn create_attendance_request(
        &self,
        identity: Identity,
        key: SessionKey,
    ) -> BoxFuture<'_, Result<Option<i64>>> {
        let outcome = self.check().map(|()| {
            self.created.lock().unwrap().push((identity, key));
            Some(self.next_id.fetch_add(1, Ordering::SeqCst))
        });
        Box::pin(async move { outcome })
    }

    fn respond_to_attendance_request(
        &self,
        request_id: i64,
        decision: Decision,
        teacher: TeacherIdentity,
    ) -> BoxFuture<'_, Result<()>> {
        let outcome = self.check().map(|()| {
            self.responses
                .lock()
                .unwrap()
                .push((request_id, decision, teacher));
        });
        Box::pin(async move { outcome })
    }

    fn list_attendance_requests(
        &self,
        teacher: TeacherIdentity,
        _date: NaiveDate,
    ) -> BoxFuture<'_, Result<Vec<ReviewEntry>>> {
        let outcome = self.check().map(|()| {
            self.listing
                .lock()
                .unwrap()
                .iter()
                .filter(|entry| entry.request.teacher_id == teacher.teacher_id)
                .cloned()
                .collect()
        });
        Box::pin(async move { outcome })
    }
}
