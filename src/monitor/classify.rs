use std::sync::Arc;
use std::time::Duration;

use crate::api::Classifier;
use crate::capture::Frame;
use crate::error::{MonitorError, Result};
use crate::models::{ClassificationResult, Identity};

/// Timeout-bounded front for a [`Classifier`]. Holds no local state.
#[derive(Clone)]
pub struct ClassificationClient {
    classifier: Arc<dyn Classifier>,
    timeout: Duration,
}

impl ClassificationClient {
    pub fn new(classifier: Arc<dyn Classifier>, timeout: Duration) -> Self {
        Self {
            classifier,
            timeout,
        }
    }

    pub async fn classify(
        &self,
        frame: Frame,
        identity: Identity,
        inactivity_count: u8,
    ) -> Result<ClassificationResult> {
        let call = self
            .classifier
            .classify_frame(frame, identity, inactivity_count);
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(MonitorError::Timeout(self.timeout.as_millis() as u64)),
        }
    }
}
