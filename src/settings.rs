use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard},
    time::Duration,
};

use crate::error::MonitorError;

pub const ENV_API_URL: &str = "CLASSWATCH_API_URL";
pub const ENV_STUDENT_ID: &str = "CLASSWATCH_STUDENT_ID";
pub const ENV_FRAMES_DIR: &str = "CLASSWATCH_FRAMES_DIR";
pub const ENV_DEBUG: &str = "CLASSWATCH_DEBUG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub api_base_url: String,
    pub student_id: i64,
    pub capture_interval_ms: u64,
    pub session_refresh_ms: u64,
    pub classify_timeout_ms: u64,
    pub capture_timeout_ms: u64,
    pub notification_clear_ms: u64,
    pub jpeg_quality: u8,
    pub frames_dir: PathBuf,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000".into(),
            student_id: 0,
            capture_interval_ms: 5_000,
            session_refresh_ms: 60_000,
            classify_timeout_ms: 10_000,
            capture_timeout_ms: 3_000,
            notification_clear_ms: 3_000,
            jpeg_quality: 95,
            frames_dir: PathBuf::from("frames"),
        }
    }
}

impl MonitorSettings {
    pub fn capture_interval(&self) -> Duration {
        Duration::from_millis(self.capture_interval_ms)
    }

    pub fn session_refresh(&self) -> Duration {
        Duration::from_millis(self.session_refresh_ms)
    }

    pub fn classify_timeout(&self) -> Duration {
        Duration::from_millis(self.classify_timeout_ms)
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }

    pub fn notification_clear(&self) -> Duration {
        Duration::from_millis(self.notification_clear_ms)
    }

    pub fn validate(&self) -> std::result::Result<(), MonitorError> {
        if self.student_id <= 0 {
            return Err(MonitorError::Settings(
                "student_id must be set to a positive id".into(),
            ));
        }
        let durations = [
            ("capture_interval_ms", self.capture_interval_ms),
            ("session_refresh_ms", self.session_refresh_ms),
            ("classify_timeout_ms", self.classify_timeout_ms),
            ("capture_timeout_ms", self.capture_timeout_ms),
            ("notification_clear_ms", self.notification_clear_ms),
        ];
        if let Some((name, _)) = durations.iter().find(|(_, value)| *value == 0) {
            return Err(MonitorError::Settings(format!("{name} must be greater than zero")));
        }
        if self.api_base_url.trim().is_empty() {
            return Err(MonitorError::Settings("api_base_url is empty".into()));
        }
        Ok(())
    }

    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api_base_url = url;
        }
        if let Some(raw) = lookup(ENV_STUDENT_ID) {
            self.student_id = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_STUDENT_ID} is not an integer: {raw}"))?;
        }
        if let Some(dir) = lookup(ENV_FRAMES_DIR) {
            self.frames_dir = PathBuf::from(dir);
        }

        let debug_mode = lookup(ENV_DEBUG)
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if debug_mode {
            self.capture_interval_ms = 1_000;
            self.session_refresh_ms = 10_000;
        }
        Ok(())
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<MonitorSettings>,
}

impl SettingsStore {
    /// Loads `path` if it exists, defaults otherwise.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Invalid settings in {}", path.display()))?
        } else {
            MonitorSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn settings(&self) -> MonitorSettings {
        self.read().clone()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> RwLockReadGuard<'_, MonitorSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
