use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One classification result written to the class monitoring log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: Option<i64>,
    pub student_id: i64,
    pub subject_id: i64,
    pub timestamp: DateTime<Utc>,
    pub label: String,
}
