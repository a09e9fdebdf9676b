//! Wire shapes of the REST routes and their conversion into domain models.

use chrono::{DateTime, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};
use crate::models::{
    AttendanceRequest, AuditLogEntry, ClassificationResult, RequestStatus, ReviewEntry, Session,
};

pub(crate) const STATUS_SUCCESS: &str = "success";

/// `{ "status": "success" | "error", "message"?, "data"? }`
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub status: String,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }

    /// Payload of a success envelope, or the server's message as a service error.
    pub fn into_data(self, fallback: &str) -> Result<Option<T>> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(MonitorError::Service(
                self.message.unwrap_or_else(|| fallback.to_string()),
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CurrentClassData {
    pub subject_id: Option<i64>,
    pub subject_name: Option<String>,
    pub subject_code: Option<String>,
    pub teacher_id: Option<i64>,
    pub teacher_name: Option<String>,
    pub formatted_start_time: Option<String>,
    pub formatted_end_time: Option<String>,
    #[serde(default)]
    pub is_present: bool,
    pub attendance_status: Option<String>,
}

impl From<CurrentClassData> for Session {
    fn from(data: CurrentClassData) -> Self {
        Session {
            subject_id: data.subject_id,
            teacher_id: data.teacher_id,
            subject_name: data.subject_name,
            subject_code: data.subject_code,
            teacher_name: data.teacher_name,
            start_time: data.formatted_start_time.as_deref().and_then(parse_clock_time),
            end_time: data.formatted_end_time.as_deref().and_then(parse_clock_time),
            is_present: data.is_present,
            attendance_status: RequestStatus::from_server(data.attendance_status.as_deref()),
        }
    }
}

/// `analyze-stream` answers without a `data` wrapper.
#[derive(Debug, Deserialize)]
pub(crate) struct AnalyzeResponse {
    pub status: String,
    pub expression: Option<String>,
    pub message: Option<String>,
    #[serde(default)]
    pub notification_sent: bool,
    pub notification_message: Option<String>,
}

impl AnalyzeResponse {
    pub fn into_result(self) -> Result<ClassificationResult> {
        if self.status != STATUS_SUCCESS {
            return Err(MonitorError::Service(
                self.message.unwrap_or_else(|| "Analysis failed".to_string()),
            ));
        }
        let label = self
            .expression
            .filter(|label| !label.is_empty())
            .ok_or_else(|| MonitorError::Service("Analysis returned no label".to_string()))?;
        Ok(ClassificationResult {
            label,
            notification_triggered: self.notification_sent,
            notification_text: self.notification_message.filter(|text| !text.is_empty()),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedRequest {
    pub request_id: Option<i64>,
    pub id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RequestRow {
    pub id: i64,
    pub student_id: i64,
    pub subject_id: i64,
    pub status: Option<String>,
    pub request_time: Option<String>,
    pub student_name: Option<String>,
    pub subject_name: Option<String>,
}

impl RequestRow {
    pub fn into_entry(self, teacher_id: i64) -> ReviewEntry {
        ReviewEntry {
            request: AttendanceRequest {
                request_id: Some(self.id),
                student_id: self.student_id,
                subject_id: self.subject_id,
                teacher_id,
                status: RequestStatus::from_server(self.status.as_deref()),
                requested_at: self.request_time.as_deref().and_then(parse_server_timestamp),
            },
            student_name: self.student_name,
            subject_name: self.subject_name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct LogRow {
    pub id: Option<i64>,
    pub status: String,
    pub timestamp: Option<String>,
}

impl LogRow {
    /// Rows without a parseable timestamp are dropped.
    pub fn into_entry(self, student_id: i64, subject_id: i64) -> Option<AuditLogEntry> {
        let timestamp = self.timestamp.as_deref().and_then(parse_server_timestamp)?;
        Some(AuditLogEntry {
            id: self.id,
            student_id,
            subject_id,
            timestamp,
            label: self.status,
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StoreLogBody<'a> {
    pub student_id: i64,
    pub subject_id: i64,
    pub status: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttendanceRequestBody {
    pub student_id: i64,
    pub subject_id: i64,
    pub teacher_id: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct RespondBody<'a> {
    pub request_id: i64,
    pub status: &'a str,
    pub teacher_id: i64,
}

/// Parses "10:00 AM" style schedule times.
fn parse_clock_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%I:%M %p")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

/// Accepts RFC 2822 (Flask's default datetime encoding), RFC 3339, and
/// `YYYY-MM-DD HH:MM:SS`, the last read as UTC.
pub(crate) fn parse_server_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc2822(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
