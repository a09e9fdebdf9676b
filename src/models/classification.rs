use serde::{Deserialize, Serialize};

pub const INACTIVE_LABEL: &str = "inactive";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub label: String,
    /// Set by the classifier when it decided to notify; the client never derives it.
    pub notification_triggered: bool,
    pub notification_text: Option<String>,
}

impl ClassificationResult {
    pub fn is_inactive(&self) -> bool {
        self.label == INACTIVE_LABEL
    }
}
