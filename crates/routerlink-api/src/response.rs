use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Outcome of one control-plane operation that reached the device.
///
/// `data` is meaningful when `success` is `true`, `error` otherwise.
/// Non-2xx replies land here instead of being raised, so callers must
/// check [`success`](Self::success) (or use [`into_result`](Self::into_result)).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub status: u16,
}

impl<T> ApiResponse<T> {
    /// 2xx with a parsed body.
    pub fn ok(status: u16, data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            status,
        }
    }

    /// 2xx with an empty body.
    pub fn empty(status: u16) -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            status,
        }
    }

    /// Non-2xx reply.
    pub fn failure(status: u16, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            status,
        }
    }

    /// Transform the payload, keeping status and error untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            success: self.success,
            data: self.data.map(f),
            error: self.error,
            status: self.status,
        }
    }

    /// Re-type a failed envelope (its `data` is always `None`).
    pub fn cast_failure<U>(self) -> ApiResponse<U> {
        ApiResponse {
            success: self.success,
            data: None,
            error: self.error,
            status: self.status,
        }
    }

    /// Convert into `Ok(data)` or `Err(Error::Api)`.
    ///
    /// A successful empty reply yields `Ok(None)`.
    pub fn into_result(self) -> Result<Option<T>, Error> {
        if self.success {
            Ok(self.data)
        } else {
            Err(Error::Api {
                status: self.status,
                message: self
                    .error
                    .unwrap_or_else(|| format!("HTTP {}", self.status)),
            })
        }
    }
}

/// Pull the most useful message out of a non-2xx body.
///
/// Prefers a string `message` field, then `error` (string or number),
/// then the raw text. An empty body falls back to the status reason.
pub(crate) fn extract_error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        let field = |key: &str| match map.get(key) {
            Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        if let Some(msg) = field("message").or_else(|| field("error")) {
            return msg;
        }
    }

    if body.trim().is_empty() {
        status
            .canonical_reason()
            .map_or_else(|| format!("HTTP {}", status.as_u16()), String::from)
    } else {
        body.to_owned()
    }
}
