use super::INTERNAL_ERROR_CODE;
use serde::{Deserialize, Serialize};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Data structure representing error response params.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorData {
    /// Error code.
    pub code: i32,

    /// Error message.
    pub message: String,

    /// Error data, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ErrorData {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), data: None }
    }

    /// The shape `sendAsync` reports every failure with.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(INTERNAL_ERROR_CODE, message)
    }

    /// Builds error data out of the loosely typed fields of a rejected JS
    /// promise. Both a numeric `code` and a `message` must be present.
    pub fn from_parts(
        code: Option<f64>,
        message: Option<String>,
        data: Option<serde_json::Value>,
    ) -> Option<Self> {
        let code = code.filter(|code| code.fract() == 0.0)?;
        let message = message?;
        if code < i32::MIN as f64 || code > i32::MAX as f64 {
            return None;
        }

        Some(Self { code: code as i32, message, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_parts_requires_code_and_message() {
        assert_eq!(
            ErrorData::from_parts(Some(4001.0), Some("User rejected".into()), None),
            Some(ErrorData::new(4001, "User rejected"))
        );
        assert_eq!(ErrorData::from_parts(None, Some("boom".into()), None), None);
        assert_eq!(ErrorData::from_parts(Some(4001.0), None, None), None);
        assert_eq!(ErrorData::from_parts(Some(1.5), Some("boom".into()), None), None);
        assert_eq!(ErrorData::from_parts(Some(1e12), Some("boom".into()), None), None);
    }

    #[test]
    fn data_is_skipped_when_absent() {
        let json = serde_json::to_value(ErrorData::internal("boom")).unwrap();
        assert_eq!(json, serde_json::json!({ "code": -32000, "message": "boom" }));
    }
}
