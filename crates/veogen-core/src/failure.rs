//! Mapping job errors to user-facing failure records.

use serde_json::Value;

use crate::error::Error;
use crate::events::{FailureKind, FailureRecord};
use crate::task::TaskId;

pub const BALANCE_MESSAGE: &str =
    "API balance is exhausted. Check your balance on the fal.ai dashboard.";
pub const INVALID_PARAMETERS_MESSAGE: &str = "The provider rejected the request parameters.";
pub const GENERIC_MESSAGE: &str = "Video generation failed";

/// Known provider failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayFailureClass {
    InsufficientBalance,
    InvalidParameters,
    Other,
}

/// Classify a provider rejection by status code and detail payload.
pub fn classify(status: Option<u16>, detail: Option<&Value>) -> GatewayFailureClass {
    match status {
        Some(403) if detail.is_some_and(mentions_exhausted_balance) => {
            GatewayFailureClass::InsufficientBalance
        }
        Some(422) => GatewayFailureClass::InvalidParameters,
        _ => GatewayFailureClass::Other,
    }
}

fn mentions_exhausted_balance(detail: &Value) -> bool {
    match detail {
        Value::String(s) => s.contains("Exhausted balance"),
        other => other.to_string().contains("Exhausted balance"),
    }
}

/// Message shown to the user for a provider rejection. Unclassified
/// rejections pass the provider's own message through.
pub fn gateway_message(status: Option<u16>, message: &str, detail: Option<&Value>) -> String {
    match classify(status, detail) {
        GatewayFailureClass::InsufficientBalance => BALANCE_MESSAGE.to_string(),
        GatewayFailureClass::InvalidParameters => INVALID_PARAMETERS_MESSAGE.to_string(),
        GatewayFailureClass::Other if message.trim().is_empty() => GENERIC_MESSAGE.to_string(),
        GatewayFailureClass::Other => message.to_string(),
    }
}

impl FailureRecord {
    /// Convert a job-level error into the task's terminal failure record.
    pub fn from_error(task_id: &TaskId, err: &Error) -> Self {
        let (kind, message, provider_status_code, provider_detail) = match err {
            Error::Validation(msg) => (FailureKind::Validation, msg.clone(), None, None),
            Error::ResponseShape { keys } => (
                FailureKind::ResponseShape,
                err.to_string(),
                None,
                Some(serde_json::json!({ "keys": keys })),
            ),
            Error::Gateway {
                message,
                status,
                detail,
            } => (
                FailureKind::Gateway,
                gateway_message(*status, message, detail.as_ref()),
                *status,
                detail.clone(),
            ),
            Error::Timeout(_) => (FailureKind::Timeout, err.to_string(), None, None),
            Error::Io(_) => (FailureKind::Io, err.to_string(), None, None),
            Error::Json(_) => (FailureKind::ResponseShape, err.to_string(), None, None),
            Error::Config(_) => (FailureKind::Config, err.to_string(), None, None),
            Error::Aborted(_) => (FailureKind::Aborted, err.to_string(), None, None),
        };

        Self {
            task_id: task_id.clone(),
            kind,
            message,
            provider_status_code,
            provider_detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    fn task() -> TaskId {
        TaskId::from("task-1")
    }

    #[test]
    fn exhausted_balance_maps_to_balance_message() {
        let err = Error::Gateway {
            message: "Forbidden".into(),
            status: Some(403),
            detail: Some(json!("Exhausted balance")),
        };
        let record = FailureRecord::from_error(&task(), &err);
        assert_eq!(record.kind, FailureKind::Gateway);
        assert_eq!(record.message, BALANCE_MESSAGE);
        assert_eq!(record.provider_status_code, Some(403));
        assert_eq!(record.provider_detail, Some(json!("Exhausted balance")));
    }

    #[test]
    fn balance_detected_inside_structured_detail() {
        let detail = json!([{"msg": "User is locked. Reason: Exhausted balance."}]);
        assert_eq!(
            classify(Some(403), Some(&detail)),
            GatewayFailureClass::InsufficientBalance
        );
    }

    #[test]
    fn plain_forbidden_passes_through() {
        let message = gateway_message(Some(403), "Invalid key", Some(&json!("Bad credentials")));
        assert_eq!(message, "Invalid key");
    }

    #[test]
    fn unprocessable_entity_maps_to_parameter_message() {
        let detail = json!([{"loc": ["body", "aspect_ratio"], "msg": "bad"}]);
        assert_eq!(
            gateway_message(Some(422), "Unprocessable Entity", Some(&detail)),
            INVALID_PARAMETERS_MESSAGE
        );
    }

    #[test]
    fn empty_provider_message_gets_generic_text() {
        assert_eq!(gateway_message(Some(500), " ", None), GENERIC_MESSAGE);
        assert_eq!(gateway_message(None, "", None), GENERIC_MESSAGE);
    }

    #[test]
    fn response_shape_failure_carries_keys() {
        let err = Error::ResponseShape {
            keys: vec!["request_id".into()],
        };
        let record = FailureRecord::from_error(&task(), &err);
        assert_eq!(record.kind, FailureKind::ResponseShape);
        assert!(record.message.contains("request_id"));
        assert_eq!(record.provider_detail, Some(json!({"keys": ["request_id"]})));
    }

    #[test]
    fn timeout_and_io_kinds() {
        let timeout = FailureRecord::from_error(&task(), &Error::Timeout(Duration::from_secs(5)));
        assert_eq!(timeout.kind, FailureKind::Timeout);
        assert!(timeout.message.contains("5s"));

        let io = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(FailureRecord::from_error(&task(), &io).kind, FailureKind::Io);
    }

    #[test]
    fn missing_credential_is_config_failure() {
        let err = Error::Config("FAL_KEY (or FAL_API_KEY) is not set".into());
        let record = FailureRecord::from_error(&task(), &err);
        assert_eq!(record.kind, FailureKind::Config);
        assert!(record.message.contains("FAL_KEY"));
        assert_eq!(record.provider_status_code, None);
    }

    #[test]
    fn aborted_job_keeps_cause() {
        let err = Error::Aborted("gateway task panicked".into());
        let record = FailureRecord::from_error(&task(), &err);
        assert_eq!(record.kind, FailureKind::Aborted);
        assert_eq!(record.message, "Video generation aborted: gateway task panicked");
    }
}
