mod attendance;
mod audit;
mod classification;
mod session;

pub use attendance::{AttendanceRequest, Decision, RequestStatus, ReviewEntry};
pub use audit::AuditLogEntry;
pub use classification::{ClassificationResult, INACTIVE_LABEL};
pub use session::{Identity, Session, SessionKey, TeacherIdentity};

#[cfg(test)]
pub(crate) use session::sample_session;
