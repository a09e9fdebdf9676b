use std::sync::Arc;

use anyhow::Context;
use log::info;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::api::{AuditLogApi, Classifier, HttpApi, SessionDirectory};
use crate::audit::AuditLogSink;
use crate::capture::{CaptureHandle, CaptureSource};
use crate::error::{MonitorError, Result};
use crate::models::Identity;
use crate::settings::MonitorSettings;

use super::classify::ClassificationClient;
use super::loop_worker::{monitor_loop, LoopTiming, MonitorContext};
use super::session::SessionTracker;
use super::state::MonitorStatus;

/// Collaborators the monitor loop talks to.
#[derive(Clone)]
pub struct MonitorServices {
    pub sessions: Arc<dyn SessionDirectory>,
    pub classifier: Arc<dyn Classifier>,
    pub audit: Arc<dyn AuditLogApi>,
}

impl MonitorServices {
    pub fn from_http(api: Arc<HttpApi>) -> Self {
        Self {
            sessions: api.clone(),
            classifier: api.clone(),
            audit: api,
        }
    }
}

/// Owns one monitoring view: the loop task, its cancellation, and the device.
pub struct MonitorController {
    view_id: Option<Uuid>,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    capture: Option<CaptureHandle>,
    status_rx: Option<watch::Receiver<MonitorStatus>>,
    audit: Option<AuditLogSink>,
}

impl Default for MonitorController {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorController {
    pub fn new() -> Self {
        Self {
            view_id: None,
            handle: None,
            cancel_token: None,
            capture: None,
            status_rx: None,
            audit: None,
        }
    }

    /// Acquires the camera and spawns the loop.
    ///
    /// A `MonitorError::Device` here is terminal for the view; it is never retried.
    pub fn start(
        &mut self,
        identity: Identity,
        source: &dyn CaptureSource,
        services: MonitorServices,
        tracker: SessionTracker,
        settings: &MonitorSettings,
    ) -> Result<watch::Receiver<MonitorStatus>> {
        if self.handle.is_some() {
            return Err(MonitorError::Validation("monitoring already active".into()));
        }
        settings.validate()?;

        let capture =
            CaptureHandle::acquire(source, settings.jpeg_quality, settings.capture_timeout())?;

        let audit = AuditLogSink::new(services.audit);
        let ctx = MonitorContext {
            identity,
            capture: capture.clone(),
            classifier: ClassificationClient::new(services.classifier, settings.classify_timeout()),
            sessions: services.sessions,
            tracker,
            audit: audit.clone(),
            timing: LoopTiming::from(settings),
        };

        let cancel_token = CancellationToken::new();
        let (status_tx, status_rx) = watch::channel(MonitorStatus::default());
        let handle = tokio::spawn(monitor_loop(ctx, status_tx, cancel_token.clone()));

        let view_id = Uuid::new_v4();
        info!(
            "monitoring view {view_id} started for student {}",
            identity.student_id
        );
        self.view_id = Some(view_id);
        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        self.capture = Some(capture);
        self.status_rx = Some(status_rx.clone());
        self.audit = Some(audit);
        Ok(status_rx)
    }

    /// Cancels both cadences, waits for the loop, and makes sure the device is released.
    /// Safe to call when nothing is running.
    pub async fn stop(&mut self) -> anyhow::Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        let joined = match self.handle.take() {
            Some(handle) => handle
                .await
                .context("monitor loop task failed to join")
                .map(|_| ()),
            None => Ok(()),
        };

        if let Some(capture) = self.capture.take() {
            capture.release();
        }
        if let (Some(view_id), Some(audit)) = (self.view_id.take(), self.audit.take()) {
            info!(
                "monitoring view {view_id} stopped ({} log writes ok, {} failed)",
                audit.written(),
                audit.failed()
            );
        }
        joined
    }

    /// Id of the running view, for correlating log lines.
    pub fn view_id(&self) -> Option<Uuid> {
        self.view_id
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn status(&self) -> Option<watch::Receiver<MonitorStatus>> {
        self.status_rx.clone()
    }
}

impl Drop for MonitorController {
    fn drop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }
}
