use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Envelope for mutating endpoints and for every error body.
///
/// Listing endpoints return bare arrays; everything else answers with a
/// `message` and, on success, the affected record under `data`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ApiResponse<T> {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }
}
