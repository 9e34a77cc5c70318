use iexec_core::{SdkError, TxHash};

#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("invalid {field}: {message}")]
    InvalidArgument { field: String, message: String },

    /// The chain rejected the call; `reason` is the revert string as emitted.
    #[error("{reason}")]
    Reverted { reason: String },

    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    #[error("contract call failed: {0}")]
    CallFailed(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("signer required")]
    SignerRequired,

    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("event {event} not found in mined transaction {tx_hash}")]
    EventNotFound { event: &'static str, tx_hash: TxHash },

    #[error("failed to decode {0}")]
    Decode(String),

    #[error("network does not support ENS")]
    EnsUnsupported,

    #[error("{0}")]
    Rejected(String),

    #[error("{0} not found")]
    NotFound(String),
}

impl From<ContractError> for SdkError {
    fn from(err: ContractError) -> Self {
        match err {
            ContractError::Reverted { reason } => SdkError::ContractCall { reason },
            ContractError::Rejected(reason) => SdkError::ContractCall { reason },
            ContractError::InvalidArgument { field, message } => {
                SdkError::Validation { field, message }
            }
            ContractError::TransactionFailed(msg) | ContractError::CallFailed(msg) => {
                SdkError::Network(msg)
            }
            ContractError::InvalidConfig(msg) => SdkError::Configuration(msg),
            ContractError::EnsUnsupported => SdkError::Configuration(err.to_string()),
            ContractError::SignerRequired => SdkError::signer_required(),
            ContractError::SigningFailed(msg) => SdkError::Signature(msg),
            ContractError::EventNotFound { .. } | ContractError::Decode(_) => {
                SdkError::InvariantViolation(err.to_string())
            }
            ContractError::NotFound(what) => SdkError::NotFound(what),
        }
    }
}

#[cfg(test)]
mod tests {
    use iexec_core::ErrorKind;

    use super::*;

    #[test]
    fn revert_maps_to_contract_call_verbatim() {
        let err: SdkError = ContractError::Reverted {
            reason: "iExecV5-matchOrders-0x60".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::ContractCall);
        assert_eq!(err.to_string(), "iExecV5-matchOrders-0x60");
    }

    #[test]
    fn missing_event_is_an_invariant_violation() {
        let err: SdkError = ContractError::EventNotFound {
            event: "OrdersMatched",
            tx_hash: TxHash::new([1; 32]),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::InvariantViolation);
    }

    #[test]
    fn ens_unsupported_is_configuration() {
        let err: SdkError = ContractError::EnsUnsupported.into();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
