//! Fire-and-forget writer for the class monitoring log.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;

use crate::api::AuditLogApi;
use crate::models::{AuditLogEntry, Identity};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

/// Appends one entry per classified cycle while a class is in session.
///
/// Writes run on their own task; failures are logged and counted, never
/// reported back to the monitoring view.
#[derive(Clone)]
pub struct AuditLogSink {
    api: Arc<dyn AuditLogApi>,
    written: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
}

impl AuditLogSink {
    pub fn new(api: Arc<dyn AuditLogApi>) -> Self {
        Self {
            api,
            written: Arc::new(AtomicU64::new(0)),
            failed: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn record(&self, identity: Identity, subject_id: i64, label: &str) -> AuditLogEntry {
        let entry = AuditLogEntry {
            id: None,
            student_id: identity.student_id,
            subject_id,
            timestamp: Utc::now(),
            label: label.to_string(),
        };

        let api = Arc::clone(&self.api);
        let written = Arc::clone(&self.written);
        let failed = Arc::clone(&self.failed);
        let pending = entry.clone();
        tokio::spawn(async move {
            match api.append_audit_log(pending).await {
                Ok(()) => {
                    written.fetch_add(1, Ordering::Relaxed);
                }
                Err(err) => {
                    failed.fetch_add(1, Ordering::Relaxed);
                    log_error!(
                        "monitoring log write failed (student {}, subject {}): {err}",
                        identity.student_id,
                        subject_id
                    );
                }
            }
        });

        log_info!(
            "monitoring log queued: student={} subject={} label={}",
            entry.student_id,
            entry.subject_id,
            entry.label
        );
        entry
    }

    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}
