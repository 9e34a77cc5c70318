use std::time::Duration;

/// Coarse classification of [`SdkError`], for callers that branch on the kind of failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Signature,
    ContractCall,
    Network,
    Api,
    Timeout,
    Configuration,
    InvariantViolation,
    NotFound,
}

#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("signature error: {0}")]
    Signature(String),

    #[error("{reason}")]
    ContractCall { reason: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("timed out after {elapsed:?}: {what}")]
    Timeout { what: String, elapsed: Duration },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl SdkError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn signer_required() -> Self {
        Self::Signature("signer required".to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Signature(_) => ErrorKind::Signature,
            Self::ContractCall { .. } => ErrorKind::ContractCall,
            Self::Network(_) => ErrorKind::Network,
            Self::Api { .. } => ErrorKind::Api,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::InvariantViolation(_) => ErrorKind::InvariantViolation,
            Self::NotFound(_) => ErrorKind::NotFound,
        }
    }

    /// Name of the offending input field for validation failures.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_call_displays_reason_verbatim() {
        let err = SdkError::ContractCall {
            reason: "iExecV5-matchOrders-0x60".to_string(),
        };
        assert_eq!(err.to_string(), "iExecV5-matchOrders-0x60");
        assert_eq!(err.kind(), ErrorKind::ContractCall);
    }

    #[test]
    fn validation_names_field() {
        let err = SdkError::validation("volume", "must be a non-negative integer");
        assert_eq!(err.field(), Some("volume"));
        assert_eq!(err.to_string(), "invalid volume: must be a non-negative integer");
    }
}
