use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, PluginError};

/// Outcome of one scaffold phase or a manifest registration.
///
/// `partial_success` with `success == false` means some effects landed but the
/// manifest was not updated. With `success == true` it is only used by content
/// generation: some optional files failed, enough succeeded to proceed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaffoldResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl ScaffoldResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            partial_success: None,
            error: None,
            error_kind: None,
        }
    }

    pub fn failed(err: &PluginError) -> Self {
        Self {
            success: false,
            partial_success: None,
            error: Some(err.to_string()),
            error_kind: Some(err.kind()),
        }
    }

    /// Some work was done; `success` says whether the caller may proceed.
    pub fn partial(success: bool, message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            success,
            partial_success: Some(true),
            error: Some(message.into()),
            error_kind: Some(kind),
        }
    }

    pub fn is_partial(&self) -> bool {
        self.partial_success == Some(true)
    }
}

impl From<PluginError> for ScaffoldResult {
    fn from(err: PluginError) -> Self {
        Self::failed(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_omits_optional_fields() {
        let json = serde_json::to_value(ScaffoldResult::ok()).unwrap();
        assert_eq!(json, serde_json::json!({ "success": true }));
    }

    #[test]
    fn partial_carries_kind() {
        let result = ScaffoldResult::partial(true, "README.md: disk full", ErrorKind::Io);
        assert!(result.is_partial());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["partialSuccess"], true);
        assert_eq!(json["errorKind"], "io");
    }
}
