//! Collaborator contracts consumed by the monitor loop and the attendance workflow.
//!
//! Every call takes the identity/session it acts for explicitly; nothing here reads
//! ambient user state. `HttpApi` implements all four traits over the REST routes.

use std::future::Future;
use std::pin::Pin;

use chrono::NaiveDate;

use crate::capture::Frame;
use crate::error::Result;
use crate::models::{
    AuditLogEntry, ClassificationResult, Decision, Identity, ReviewEntry, Session, SessionKey,
    TeacherIdentity,
};

mod http;
mod payloads;

pub use http::HttpApi;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Current-class lookup.
pub trait SessionDirectory: Send + Sync {
    /// `Ok(None)` when no class is meeting right now.
    fn current_session(&self, identity: Identity) -> BoxFuture<'_, Result<Option<Session>>>;
}

/// Frame classification. The count is advisory input; the service decides when to notify.
pub trait Classifier: Send + Sync {
    fn classify_frame(
        &self,
        frame: Frame,
        identity: Identity,
        inactivity_count: u8,
    ) -> BoxFuture<'_, Result<ClassificationResult>>;
}

/// Durable class monitoring log.
pub trait AuditLogApi: Send + Sync {
    fn append_audit_log(&self, entry: AuditLogEntry) -> BoxFuture<'_, Result<()>>;

    /// Entries for one student and subject on `date`, newest first.
    fn list_audit_log(
        &self,
        student_id: i64,
        subject_id: i64,
        date: NaiveDate,
        teacher: TeacherIdentity,
    ) -> BoxFuture<'_, Result<Vec<AuditLogEntry>>>;
}

pub trait AttendanceApi: Send + Sync {
    /// Returns the server's request id when it reports one.
    fn create_attendance_request(
        &self,
        identity: Identity,
        key: SessionKey,
    ) -> BoxFuture<'_, Result<Option<i64>>>;

    fn respond_to_attendance_request(
        &self,
        request_id: i64,
        decision: Decision,
        teacher: TeacherIdentity,
    ) -> BoxFuture<'_, Result<()>>;

    fn list_attendance_requests(
        &self,
        teacher: TeacherIdentity,
        date: NaiveDate,
    ) -> BoxFuture<'_, Result<Vec<ReviewEntry>>>;
}
