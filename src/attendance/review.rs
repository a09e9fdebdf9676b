use std::sync::Arc;

use chrono::NaiveDate;
use log::info;

use crate::api::{AttendanceApi, AuditLogApi};
use crate::error::{MonitorError, Result};
use crate::models::{AuditLogEntry, Decision, RequestStatus, ReviewEntry, TeacherIdentity};

/// Teacher-side view of the day's attendance requests.
///
/// Holds the last listing only as a cache; every `refresh` replaces it with
/// whatever the server reports.
pub struct AttendanceReview {
    teacher: TeacherIdentity,
    requests: Arc<dyn AttendanceApi>,
    logs: Arc<dyn AuditLogApi>,
    listing: Vec<ReviewEntry>,
}

impl AttendanceReview {
    pub fn new(
        teacher: TeacherIdentity,
        requests: Arc<dyn AttendanceApi>,
        logs: Arc<dyn AuditLogApi>,
    ) -> Self {
        Self {
            teacher,
            requests,
            logs,
            listing: Vec::new(),
        }
    }

    pub async fn refresh(&mut self, date: NaiveDate) -> Result<&[ReviewEntry]> {
        self.listing = self
            .requests
            .list_attendance_requests(self.teacher, date)
            .await?;
        Ok(self.listing.as_slice())
    }

    pub fn entries(&self) -> &[ReviewEntry] {
        &self.listing
    }

    pub fn pending(&self) -> impl Iterator<Item = &ReviewEntry> {
        self.listing
            .iter()
            .filter(|entry| entry.request.status == RequestStatus::Pending)
    }

    /// Answers one request from the last listing. Only pending requests can be answered.
    pub async fn respond(&mut self, request_id: i64, decision: Decision) -> Result<()> {
        let entry = self
            .listing
            .iter_mut()
            .find(|entry| entry.request.request_id == Some(request_id))
            .ok_or_else(|| {
                MonitorError::Validation(format!("Unknown attendance request {request_id}"))
            })?;

        if entry.request.status != RequestStatus::Pending {
            return Err(MonitorError::Validation(format!(
                "Request {request_id} is already {}",
                entry.request.status.as_str()
            )));
        }

        self.requests
            .respond_to_attendance_request(request_id, decision, self.teacher)
            .await?;
        entry.request.status = decision.into();
        info!(
            "attendance request {request_id} {} by teacher {}",
            decision.as_str(),
            self.teacher.teacher_id
        );
        Ok(())
    }

    /// The monitoring log of one student in one subject on `date`, newest first.
    pub async fn monitoring_log(
        &self,
        student_id: i64,
        subject_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<AuditLogEntry>> {
        self.logs
            .list_audit_log(student_id, subject_id, date, self.teacher)
            .await
    }
}
