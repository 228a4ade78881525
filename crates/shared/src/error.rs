use serde::{Deserialize, Serialize};

/// JSON error body the persons service returns on rejected requests,
/// e.g. `{"error": "number must be longer than 8 characters"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
