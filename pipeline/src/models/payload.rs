use serde::{Deserialize, Serialize};

use super::record::ReasonCode;

/// Body accepted by the HTTP front door and by the validate stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TupleRequest {
    pub tuple: String,
}

/// Payload carried from one stage to the next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagePayload {
    pub success: bool,
    pub reason: ReasonCode,
    pub transaction_id: u64,
    #[serde(default)]
    pub tuple: String,
}

impl StagePayload {
    pub fn accepted(transaction_id: u64, tuple: String) -> Self {
        Self {
            success: true,
            reason: ReasonCode::None,
            transaction_id,
            tuple,
        }
    }

    pub fn rejected(transaction_id: u64, reason: ReasonCode, tuple: String) -> Self {
        Self {
            success: false,
            reason,
            transaction_id,
            tuple,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    #[serde(rename = "Error")]
    pub error: String,
}

/// Input of a failure flagger: the failed stage's payload, plus the error
/// type when the stage raised instead of rejecting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagRequest {
    pub transaction_id: u64,
    #[serde(default)]
    pub reason: ReasonCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl FlagRequest {
    pub fn with_reason(transaction_id: u64, reason: ReasonCode) -> Self {
        Self {
            transaction_id,
            reason,
            error: None,
        }
    }

    pub fn with_error_type(transaction_id: u64, error_type: &str) -> Self {
        Self {
            transaction_id,
            reason: ReasonCode::None,
            error: Some(ErrorInfo {
                error: error_type.to_string(),
            }),
        }
    }

    /// A non-zero reason wins; otherwise the error type decides.
    pub fn resolved_reason(&self) -> ReasonCode {
        if !self.reason.is_none() {
            return self.reason;
        }
        ReasonCode::from_error_type(self.error.as_ref().map(|e| e.error.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stage_payload_wire_shape() {
        let payload = StagePayload::rejected(7, ReasonCode::TransformationFailed, "a,b".into());
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({
                "success": false,
                "reason": 2,
                "transactionId": 7,
                "tuple": "a,b"
            })
        );
    }

    #[test]
    fn test_flag_request_from_state_machine_error() {
        let request: FlagRequest = serde_json::from_str(
            r#"{"transactionId": 99, "reason": 0, "error": {"Error": "StoreError"}}"#,
        )
        .unwrap();
        assert_eq!(request.resolved_reason(), ReasonCode::StoreFailed);
    }

    #[test]
    fn test_flag_request_reason_hint_wins_over_error_type() {
        let mut request = FlagRequest::with_error_type(5, "StoreError");
        request.reason = ReasonCode::ValidationFailed;
        assert_eq!(request.resolved_reason(), ReasonCode::ValidationFailed);
    }

    #[test]
    fn test_flag_request_without_hint_or_error_is_unknown() {
        let request: FlagRequest = serde_json::from_str(r#"{"transactionId": 3}"#).unwrap();
        assert_eq!(request.resolved_reason(), ReasonCode::Unknown);
    }
}
