//! Response envelope shared by every control API route

use serde::Serialize;
use serde_json::Value;

/// `{success, message?, data?, error?}` wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    /// Successful response with a data payload
    pub fn ok(data: impl Serialize) -> Self {
        Self {
            success: true,
            message: None,
            data: serde_json::to_value(data).ok(),
            error: None,
        }
    }

    /// Successful response with a message and no payload
    pub fn ok_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            error: None,
        }
    }

    /// Failed response carrying an error string
    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            data: None,
            error: Some(error.into()),
        }
    }
}
