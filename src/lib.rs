pub mod api;
pub mod attendance;
pub mod audit;
pub mod capture;
pub mod error;
pub mod models;
pub mod monitor;
pub mod settings;
mod utils;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use log::{info, warn};

use api::HttpApi;
use attendance::AttendanceRequestMachine;
use capture::DirectoryCamera;
use error::MonitorError;
use models::Identity;
use monitor::{MonitorController, MonitorServices, MonitorStatus, SessionTracker};
use settings::{MonitorSettings, SettingsStore};

const DEFAULT_SETTINGS_FILE: &str = "classwatch.json";

/// Runs one monitoring view until Ctrl-C.
///
/// The settings file is the first argument, `classwatch.json` otherwise.
pub fn run() -> anyhow::Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("classwatch starting up...");

    let settings_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));
    let store = SettingsStore::new(settings_path)?;
    info!("settings loaded from {}", store.path().display());
    let mut settings = store.settings();
    settings.apply_env()?;
    settings.validate().context("invalid monitor settings")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(run_view(settings))
}

async fn run_view(settings: MonitorSettings) -> anyhow::Result<()> {
    let api = Arc::new(HttpApi::new(&settings.api_base_url, settings.classify_timeout())?);
    info!("using backend at {}", api.base_url());

    let identity = Identity {
        student_id: settings.student_id,
    };
    let tracker = SessionTracker::new();
    let camera = DirectoryCamera::new(settings.frames_dir.clone());

    let mut controller = MonitorController::new();
    let mut status_rx = match controller.start(
        identity,
        &camera,
        MonitorServices::from_http(api),
        tracker.clone(),
        &settings,
    ) {
        Ok(rx) => rx,
        Err(err @ MonitorError::Device(_)) => {
            eprintln!("{}", err.user_message());
            return Err(err).context("capture device unavailable");
        }
        Err(err) => return Err(err).context("failed to start monitoring"),
    };

    let mut session_rx = tracker.subscribe();
    let mut attendance = AttendanceRequestMachine::new(identity);
    let mut last_printed: Option<MonitorStatus> = None;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, stopping");
                break;
            }
            changed = status_rx.changed() => {
                if changed.is_err() {
                    warn!("monitor loop exited");
                    break;
                }
                let status = status_rx.borrow_and_update().clone();
                if should_print(last_printed.as_ref(), &status) {
                    print_status(&status);
                }
                last_printed = Some(status);
            }
            changed = session_rx.changed() => {
                if changed.is_err() {
                    continue;
                }
                let session = session_rx.borrow_and_update().clone();
                let before = attendance.status();
                let after = attendance.observe_session(session.as_ref());
                match &session {
                    Some(session) => println!("class: {}", session.describe()),
                    None => println!("class: none in session"),
                }
                if before != after {
                    println!("attendance request: {}", after.as_str());
                }
            }
        }
    }

    controller.stop().await
}

/// Skips snapshots that only move the loop between its internal phases.
fn should_print(previous: Option<&MonitorStatus>, next: &MonitorStatus) -> bool {
    match previous {
        None => true,
        Some(prev) => {
            prev.status != next.status
                || prev.inactivity_count != next.inactivity_count
                || prev.notification != next.notification
                || prev.error != next.error
                || (prev.phase != next.phase && !next.phase.is_busy() && !prev.phase.is_busy())
        }
    }
}

fn print_status(status: &MonitorStatus) {
    println!(
        "status={} inactivity={}/{}{}{}",
        status.status,
        status.inactivity_count,
        monitor::INACTIVITY_CAP,
        status
            .notification
            .as_deref()
            .map(|text| format!(" notification=\"{text}\""))
            .unwrap_or_default(),
        status
            .error
            .as_deref()
            .map(|text| format!(" error=\"{text}\""))
            .unwrap_or_default(),
    );
}
