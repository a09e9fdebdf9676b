use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::RequestStatus;

/// The student a monitoring view or attendance action acts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub student_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherIdentity {
    pub teacher_id: i64,
}

/// Subject/teacher pairing that identifies one class meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionKey {
    pub subject_id: i64,
    pub teacher_id: i64,
}

/// The class currently meeting for a student, as reported by the current-class lookup.
///
/// Immutable once fetched; the slower session poll replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub subject_id: Option<i64>,
    pub teacher_id: Option<i64>,
    pub subject_name: Option<String>,
    pub subject_code: Option<String>,
    pub teacher_name: Option<String>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    /// Server-confirmed presence for today's meeting.
    pub is_present: bool,
    /// Server-side status of today's attendance request, if one exists.
    pub attendance_status: RequestStatus,
}

impl Session {
    pub fn key(&self) -> Option<SessionKey> {
        match (self.subject_id, self.teacher_id) {
            (Some(subject_id), Some(teacher_id)) => Some(SessionKey {
                subject_id,
                teacher_id,
            }),
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        let subject = self
            .subject_name
            .as_deref()
            .or(self.subject_code.as_deref())
            .unwrap_or("unknown subject");
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => format!(
                "{subject} ({} - {})",
                start.format("%I:%M %p"),
                end.format("%I:%M %p")
            ),
            _ => subject.to_string(),
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_session(subject_id: i64, teacher_id: i64) -> Session {
    Session {
        subject_id: Some(subject_id),
        teacher_id: Some(teacher_id),
        subject_name: Some("Operating Systems".into()),
        subject_code: Some("CS501".into()),
        teacher_name: Some("R. Rao".into()),
        start_time: NaiveTime::from_hms_opt(10, 0, 0),
        end_time: NaiveTime::from_hms_opt(11, 0, 0),
        is_present: false,
        attendance_status: RequestStatus::None,
    }
}
