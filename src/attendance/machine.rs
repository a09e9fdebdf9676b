use chrono::Utc;
use log::{info, warn};
use serde::Serialize;

use crate::api::AttendanceApi;
use crate::error::{MonitorError, Result};
use crate::models::{AttendanceRequest, Identity, RequestStatus, Session, SessionKey};

/// What a `request_attendance` call did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum RequestOutcome {
    /// A new request went out and is now pending.
    Submitted { request: AttendanceRequest },
    /// The student is already marked present; nothing was sent.
    AlreadyActive,
    /// A request already exists for this session; nothing was sent.
    Unchanged { status: RequestStatus },
}

/// Student-side "request attendance" state for one class session.
///
/// `none -> pending -> approved | rejected`, back to `none` whenever the
/// subject/teacher pairing changes or the session goes away. Local `pending`
/// is a hint until the server reports the request; it is dropped once the
/// server has reported no request on consecutive polls.
#[derive(Debug, Clone)]
pub struct AttendanceRequestMachine {
    identity: Identity,
    key: Option<SessionKey>,
    request: Option<AttendanceRequest>,
    is_present: bool,
    unconfirmed_polls: u8,
}

impl AttendanceRequestMachine {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            key: None,
            request: None,
            is_present: false,
            unconfirmed_polls: 0,
        }
    }

    pub fn status(&self) -> RequestStatus {
        self.request
            .as_ref()
            .map(|request| request.status)
            .unwrap_or_default()
    }

    pub fn request(&self) -> Option<&AttendanceRequest> {
        self.request.as_ref()
    }

    pub fn is_present(&self) -> bool {
        self.is_present
    }

    /// Reconciles with a freshly polled session and returns the resulting status.
    pub fn observe_session(&mut self, session: Option<&Session>) -> RequestStatus {
        let next_key = session.and_then(Session::key);
        if next_key != self.key {
            if self.request.is_some() {
                info!("class changed; attendance request state reset");
            }
            self.key = next_key;
            self.request = None;
            self.is_present = false;
            self.unconfirmed_polls = 0;
        }

        let (Some(session), Some(key)) = (session, next_key) else {
            return self.status();
        };

        self.is_present = session.is_present;
        let server = session.attendance_status;
        let local = self.status();
        if local == RequestStatus::Pending && server == RequestStatus::None {
            self.unconfirmed_polls = self.unconfirmed_polls.saturating_add(1);
        } else {
            self.unconfirmed_polls = 0;
        }
        if server == local {
            return local;
        }

        if !accepts(local, server, self.unconfirmed_polls) {
            if self.unconfirmed_polls == 0 {
                warn!(
                    "ignoring server attendance status '{}' over local '{}'",
                    server.as_str(),
                    local.as_str()
                );
            }
        } else if server == RequestStatus::None {
            info!("server has no record of the attendance request; cleared");
            self.request = None;
            self.unconfirmed_polls = 0;
        } else {
            match self.request.as_mut() {
                Some(request) => request.status = server,
                None => {
                    self.request = Some(AttendanceRequest {
                        request_id: None,
                        student_id: self.identity.student_id,
                        subject_id: key.subject_id,
                        teacher_id: key.teacher_id,
                        status: server,
                        requested_at: None,
                    })
                }
            }
        }
        self.status()
    }

    /// Sends a request for the given session, unless one is already out or the
    /// student is already present.
    pub async fn request_attendance(
        &mut self,
        session: Option<&Session>,
        api: &dyn AttendanceApi,
    ) -> Result<RequestOutcome> {
        self.observe_session(session);

        if session.is_none() {
            return Err(MonitorError::Validation("No class is currently in session".into()));
        }
        let key = self.key.ok_or_else(|| {
            MonitorError::Validation("Missing class or teacher information".into())
        })?;

        if self.is_present {
            return Ok(RequestOutcome::AlreadyActive);
        }
        let status = self.status();
        if status != RequestStatus::None {
            return Ok(RequestOutcome::Unchanged { status });
        }

        let request_id = api.create_attendance_request(self.identity, key).await?;
        let request = AttendanceRequest {
            request_id,
            student_id: self.identity.student_id,
            subject_id: key.subject_id,
            teacher_id: key.teacher_id,
            status: RequestStatus::Pending,
            requested_at: Some(Utc::now()),
        };
        info!(
            "attendance requested: student={} subject={} teacher={}",
            request.student_id, request.subject_id, request.teacher_id
        );
        self.request = Some(request.clone());
        self.unconfirmed_polls = 0;
        Ok(RequestOutcome::Submitted { request })
    }
}

/// Consecutive "no request" polls after which a local pending request is dropped.
/// One poll can race the request that created it.
const UNCONFIRMED_POLL_LIMIT: u8 = 2;

/// Server reports that may replace local state within one session. A terminal
/// status never goes back.
fn accepts(local: RequestStatus, server: RequestStatus, unconfirmed_polls: u8) -> bool {
    match local {
        RequestStatus::None => true,
        RequestStatus::Pending => {
            server.is_terminal()
                || (server == RequestStatus::None && unconfirmed_polls >= UNCONFIRMED_POLL_LIMIT)
        }
        RequestStatus::Approved | RequestStatus::Rejected => false,
    }
}
