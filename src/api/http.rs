use std::time::Duration;

use chrono::NaiveDate;
use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::capture::Frame;
use crate::error::{MonitorError, Result};
use crate::models::{
    AuditLogEntry, ClassificationResult, Decision, Identity, ReviewEntry, Session, SessionKey,
    TeacherIdentity,
};

use super::payloads::{
    AnalyzeResponse, AttendanceRequestBody, CreatedRequest, CurrentClassData, Envelope, LogRow,
    RequestRow, RespondBody, StoreLogBody,
};
use super::{AttendanceApi, AuditLogApi, BoxFuture, Classifier, SessionDirectory};

const CONNECT_TIMEOUT_SECS: u64 = 10;
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// REST client for the class-monitoring backend.
#[derive(Clone)]
pub struct HttpApi {
    http: Client,
    base_url: String,
    classify_timeout: Duration,
}

impl HttpApi {
    pub fn new(base_url: &str, classify_timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|err| MonitorError::Transport(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            classify_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn fetch_current_session(&self, identity: Identity) -> Result<Option<Session>> {
        let resp = self
            .http
            .get(self.url("/current-class"))
            .query(&[("student_id", identity.student_id)])
            .send()
            .await
            .map_err(|err| send_error(err, REQUEST_TIMEOUT_SECS * 1000))?;

        // 404 is how the backend says "no ongoing class".
        if resp.status() == StatusCode::NOT_FOUND {
            debug!("no ongoing class for student {}", identity.student_id);
            return Ok(None);
        }

        let envelope: Envelope<CurrentClassData> = parse_body(resp).await?;
        Ok(envelope
            .into_data("Failed to fetch current class")?
            .map(Session::from))
    }

    async fn post_frame(
        &self,
        frame: Frame,
        identity: Identity,
        inactivity_count: u8,
    ) -> Result<ClassificationResult> {
        let image = Part::bytes(frame.jpeg)
            .file_name("capture.jpg")
            .mime_str("image/jpeg")?;
        let form = Form::new()
            .part("image", image)
            .text("student_id", identity.student_id.to_string())
            .text("inactivity_count", inactivity_count.to_string());

        let timeout_ms = self.classify_timeout.as_millis() as u64;
        let resp = self
            .http
            .post(self.url("/analyze-stream"))
            .multipart(form)
            .timeout(self.classify_timeout)
            .send()
            .await
            .map_err(|err| send_error(err, timeout_ms))?;

        let response: AnalyzeResponse = parse_body(resp).await?;
        response.into_result()
    }

    async fn post_audit_log(&self, entry: AuditLogEntry) -> Result<()> {
        let body = StoreLogBody {
            student_id: entry.student_id,
            subject_id: entry.subject_id,
            status: &entry.label,
        };
        let resp = self
            .http
            .post(self.url("/store-monitoring-log"))
            .json(&body)
            .send()
            .await
            .map_err(|err| send_error(err, REQUEST_TIMEOUT_SECS * 1000))?;

        let envelope: Envelope<serde_json::Value> = parse_body(resp).await?;
        envelope.into_data("Failed to store monitoring log")?;
        Ok(())
    }

    async fn fetch_audit_log(
        &self,
        student_id: i64,
        subject_id: i64,
        date: NaiveDate,
        teacher: TeacherIdentity,
    ) -> Result<Vec<AuditLogEntry>> {
        let date = date.format("%Y-%m-%d").to_string();
        let resp = self
            .http
            .get(self.url("/teacher/monitoring-logs"))
            .query(&[
                ("student_id", student_id.to_string()),
                ("subject_id", subject_id.to_string()),
                ("date", date),
                ("teacher_id", teacher.teacher_id.to_string()),
            ])
            .send()
            .await
            .map_err(|err| send_error(err, REQUEST_TIMEOUT_SECS * 1000))?;

        let envelope: Envelope<Vec<LogRow>> = parse_body(resp).await?;
        let rows = envelope
            .into_data("Failed to fetch monitoring logs")?
            .unwrap_or_default();
        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_entry(student_id, subject_id))
            .collect())
    }

    async fn post_attendance_request(
        &self,
        identity: Identity,
        key: SessionKey,
    ) -> Result<Option<i64>> {
        let body = AttendanceRequestBody {
            student_id: identity.student_id,
            subject_id: key.subject_id,
            teacher_id: key.teacher_id,
        };
        let resp = self
            .http
            .post(self.url("/attendance/request"))
            .json(&body)
            .send()
            .await
            .map_err(|err| send_error(err, REQUEST_TIMEOUT_SECS * 1000))?;

        let envelope: Envelope<CreatedRequest> = parse_body(resp).await?;
        let created = envelope.into_data("Failed to request attendance")?;
        debug!(
            "attendance request submitted: student={} subject={} teacher={}",
            identity.student_id, key.subject_id, key.teacher_id
        );
        Ok(created.and_then(|data| data.request_id.or(data.id)))
    }

    async fn post_response(
        &self,
        request_id: i64,
        decision: Decision,
        teacher: TeacherIdentity,
    ) -> Result<()> {
        let body = RespondBody {
            request_id,
            status: decision.as_str(),
            teacher_id: teacher.teacher_id,
        };
        let resp = self
            .http
            .post(self.url("/teacher/respond-attendance"))
            .json(&body)
            .send()
            .await
            .map_err(|err| send_error(err, REQUEST_TIMEOUT_SECS * 1000))?;

        let envelope: Envelope<serde_json::Value> = parse_body(resp).await?;
        envelope.into_data("Failed to respond to attendance request")?;
        Ok(())
    }

    async fn fetch_attendance_requests(
        &self,
        teacher: TeacherIdentity,
        date: NaiveDate,
    ) -> Result<Vec<ReviewEntry>> {
        let resp = self
            .http
            .get(self.url("/teacher/attendance-requests"))
            .query(&[
                ("teacher_id", teacher.teacher_id.to_string()),
                ("date", date.format("%Y-%m-%d").to_string()),
            ])
            .send()
            .await
            .map_err(|err| send_error(err, REQUEST_TIMEOUT_SECS * 1000))?;

        let envelope: Envelope<Vec<RequestRow>> = parse_body(resp).await?;
        let rows = envelope
            .into_data("Failed to fetch attendance requests")?
            .unwrap_or_default();
        Ok(rows
            .into_iter()
            .map(|row| row.into_entry(teacher.teacher_id))
            .collect())
    }
}

impl SessionDirectory for HttpApi {
    fn current_session(&self, identity: Identity) -> BoxFuture<'_, Result<Option<Session>>> {
        Box::pin(self.fetch_current_session(identity))
    }
}

impl Classifier for HttpApi {
    fn classify_frame(
        &self,
        frame: Frame,
        identity: Identity,
        inactivity_count: u8,
    ) -> BoxFuture<'_, Result<ClassificationResult>> {
        Box::pin(self.post_frame(frame, identity, inactivity_count))
    }
}

impl AuditLogApi for HttpApi {
    fn append_audit_log(&self, entry: AuditLogEntry) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.post_audit_log(entry))
    }

    fn list_audit_log(
        &self,
        student_id: i64,
        subject_id: i64,
        date: NaiveDate,
        teacher: TeacherIdentity,
    ) -> BoxFuture<'_, Result<Vec<AuditLogEntry>>> {
        Box::pin(self.fetch_audit_log(student_id, subject_id, date, teacher))
    }
}

impl AttendanceApi for HttpApi {
    fn create_attendance_request(
        &self,
        identity: Identity,
        key: SessionKey,
    ) -> BoxFuture<'_, Result<Option<i64>>> {
        Box::pin(self.post_attendance_request(identity, key))
    }

    fn respond_to_attendance_request(
        &self,
        request_id: i64,
        decision: Decision,
        teacher: TeacherIdentity,
    ) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.post_response(request_id, decision, teacher))
    }

    fn list_attendance_requests(
        &self,
        teacher: TeacherIdentity,
        date: NaiveDate,
    ) -> BoxFuture<'_, Result<Vec<ReviewEntry>>> {
        Box::pin(self.fetch_attendance_requests(teacher, date))
    }
}

fn send_error(err: reqwest::Error, timeout_ms: u64) -> MonitorError {
    if err.is_timeout() {
        MonitorError::Timeout(timeout_ms)
    } else {
        err.into()
    }
}

/// Decodes a JSON body. Error statuses with a JSON envelope are left to the
/// envelope's `status`; anything else becomes a service error with the raw body.
async fn parse_body<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let status = resp.status();
    let body = resp.text().await?;
    match serde_json::from_str::<T>(&body) {
        Ok(parsed) => Ok(parsed),
        Err(err) if status.is_success() => Err(err.into()),
        Err(_) => Err(MonitorError::Service(format!("{status} - {}", body.trim()))),
    }
}
