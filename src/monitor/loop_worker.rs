use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::api::SessionDirectory;
use crate::audit::AuditLogSink;
use crate::capture::{CaptureHandle, Frame};
use crate::error::Result;
use crate::models::{ClassificationResult, Identity, Session};
use crate::settings::MonitorSettings;

use super::classify::ClassificationClient;
use super::session::SessionTracker;
use super::state::{MonitorState, MonitorStatus};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

type Task<T> = Pin<Box<dyn Future<Output = T> + Send>>;

#[derive(Debug, Clone, Copy)]
pub struct LoopTiming {
    pub capture_interval: Duration,
    pub session_refresh: Duration,
    pub notification_clear: Duration,
}

impl From<&MonitorSettings> for LoopTiming {
    fn from(settings: &MonitorSettings) -> Self {
        Self {
            capture_interval: settings.capture_interval(),
            session_refresh: settings.session_refresh(),
            notification_clear: settings.notification_clear(),
        }
    }
}

/// Everything one monitoring view owns while it is open.
pub struct MonitorContext {
    pub identity: Identity,
    pub capture: CaptureHandle,
    pub classifier: ClassificationClient,
    pub sessions: Arc<dyn SessionDirectory>,
    pub tracker: SessionTracker,
    pub audit: AuditLogSink,
    pub timing: LoopTiming,
}

/// The two suspension points of a cycle.
enum Step {
    Captured {
        frame: Result<Frame>,
        subject_id: Option<i64>,
        elapsed: Duration,
    },
    Classified {
        result: Result<ClassificationResult>,
        subject_id: Option<i64>,
        elapsed: Duration,
    },
}

/// Runs capture → classify → react on a fixed cadence and refreshes the session
/// on a slower one, both on this single task.
///
/// At most one cycle is in flight: a cadence tick that lands while a cycle is
/// still running is dropped, not queued. Cancelling the token drops whatever is
/// in flight without applying it and releases the capture device.
pub async fn monitor_loop(
    ctx: MonitorContext,
    status_tx: watch::Sender<MonitorStatus>,
    cancel_token: CancellationToken,
) {
    let MonitorContext {
        identity,
        capture,
        classifier,
        sessions,
        tracker,
        audit,
        timing,
    } = ctx;

    let mut state = MonitorState::new();

    let mut capture_ticker = time::interval_at(
        Instant::now() + timing.capture_interval,
        timing.capture_interval,
    );
    capture_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick fires immediately so the session is known before the first capture.
    let mut session_ticker = time::interval(timing.session_refresh);
    session_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut cycle: Option<Task<Step>> = None;
    let mut refresh: Option<Task<Result<Option<Session>>>> = None;
    let mut notification_timer: Option<Task<()>> = None;

    status_tx.send_replace(state.snapshot());
    log_info!("monitor loop started for student {}", identity.student_id);

    loop {
        tokio::select! {
            biased;

            _ = cancel_token.cancelled() => {
                log_info!("monitor loop shutting down");
                break;
            }

            step = run(&mut cycle), if cycle.is_some() => {
                cycle = None;
                match step {
                    Step::Captured { frame: Ok(frame), subject_id, elapsed } => {
                        log_info!(
                            "frame captured: {} bytes {}x{} in {}ms",
                            frame.jpeg.len(), frame.width, frame.height, elapsed.as_millis()
                        );
                        state.begin_classify();
                        let client = classifier.clone();
                        let count = state.counter.count();
                        cycle = Some(Box::pin(async move {
                            let started = Instant::now();
                            let result = client.classify(frame, identity, count).await;
                            Step::Classified { result, subject_id, elapsed: started.elapsed() }
                        }));
                    }
                    Step::Captured { frame: Err(err), elapsed, .. } => {
                        log_warn!("capture skipped after {}ms: {err}", elapsed.as_millis());
                        state.apply_capture_failure(&err);
                    }
                    Step::Classified { result: Ok(result), subject_id, elapsed } => {
                        let observation = state.apply_result(&result);
                        if let Some(subject_id) = subject_id {
                            audit.record(identity, subject_id, &result.label);
                        }
                        if observation.threshold_crossed {
                            let clear = time::sleep(timing.notification_clear);
                            notification_timer = Some(Box::pin(clear));
                        } else if state.notification.is_none() {
                            notification_timer = None;
                        }
                        log_info!(
                            "classified '{}' in {}ms (count={}, notified={})",
                            result.label,
                            elapsed.as_millis(),
                            observation.count,
                            observation.threshold_crossed
                        );
                    }
                    Step::Classified { result: Err(err), elapsed, .. } => {
                        log_warn!("classification failed after {}ms: {err}", elapsed.as_millis());
                        state.apply_classify_failure(&err);
                    }
                }
                status_tx.send_replace(state.snapshot());
            }

            _ = capture_ticker.tick() => {
                if cycle.is_some() {
                    state.drop_tick();
                    log::debug!("cadence tick dropped: previous cycle still in flight");
                    continue;
                }

                let subject_id = tracker.current().and_then(|session| session.subject_id);
                let handle = capture.clone();
                state.begin_capture();
                cycle = Some(Box::pin(async move {
                    let started = Instant::now();
                    let frame = handle.capture_frame().await;
                    Step::Captured { frame, subject_id, elapsed: started.elapsed() }
                }));
                status_tx.send_replace(state.snapshot());
            }

            outcome = run(&mut refresh), if refresh.is_some() => {
                refresh = None;
                let next = match outcome {
                    Ok(session) => session,
                    Err(err) => {
                        log_warn!("current class lookup failed: {err}");
                        None
                    }
                };
                let description = next.as_ref().map(Session::describe);
                if tracker.publish(next) {
                    match description {
                        Some(description) => log_info!("current class: {description}"),
                        None => log_info!("no class in session"),
                    }
                }
            }

            _ = session_ticker.tick() => {
                if refresh.is_some() {
                    continue;
                }
                let directory = Arc::clone(&sessions);
                refresh = Some(Box::pin(async move {
                    directory.current_session(identity).await
                }));
            }

            _ = run(&mut notification_timer), if notification_timer.is_some() => {
                notification_timer = None;
                state.clear_notification();
                status_tx.send_replace(state.snapshot());
            }
        }
    }

    // Anything still in flight is discarded unapplied.
    drop(cycle);
    drop(refresh);
    capture.release();
    status_tx.send_replace(state.stopped_snapshot());
}

async fn run<T>(slot: &mut Option<Task<T>>) -> T {
    match slot.as_mut() {
        Some(task) => task.await,
        None => std::future::pending().await,
    }
}
