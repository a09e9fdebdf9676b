//! Error taxonomy shared by the monitor loop and the attendance workflow.

/// Result alias for collaborator and workflow calls.
pub type Result<T> = std::result::Result<T, MonitorError>;

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Camera permission denied or no device. Fatal for the monitoring view.
    #[error("Device error: {0}")]
    Device(String),

    /// The device produced no frame this cycle.
    #[error("Capture error: {0}")]
    Capture(String),

    /// A collaborator call exceeded its deadline.
    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    /// The collaborator answered with a non-success response.
    #[error("Service error: {0}")]
    Service(String),

    /// The action was rejected locally; no network call was made.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Connection or decoding failure below the service contract.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

impl MonitorError {
    /// Message shown to the student for a transient failure.
    pub fn user_message(&self) -> String {
        match self {
            MonitorError::Service(message) => message.clone(),
            MonitorError::Timeout(_) => "Failed to analyze activity: request timed out".to_string(),
            MonitorError::Capture(_) => "Camera produced no frame; retrying".to_string(),
            MonitorError::Device(_) => {
                "Failed to access camera. Please check camera permissions.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for MonitorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            MonitorError::Transport(format!("invalid response body: {err}"))
        } else {
            MonitorError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        MonitorError::Transport(format!("invalid JSON: {err}"))
    }
}
