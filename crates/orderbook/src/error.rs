use contract_client::ContractError;
use iexec_core::SdkError;

#[derive(Debug, thiserror::Error)]
pub enum OrderbookError {
    #[error("request to {url} failed: {message}")]
    Http { url: String, message: String },

    /// The marketplace answered with `{ ok: false, error }` or a non-2xx status.
    #[error("marketplace API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("unexpected marketplace response: {0}")]
    Decode(String),

    #[error("failed to get authorization: {0}")]
    Authorization(String),

    #[error(transparent)]
    Hub(#[from] ContractError),
}

impl From<OrderbookError> for SdkError {
    fn from(err: OrderbookError) -> Self {
        match err {
            OrderbookError::Http { .. } => SdkError::Network(err.to_string()),
            OrderbookError::Api { status, message } => SdkError::Api { status, message },
            OrderbookError::Decode(msg) => SdkError::Network(msg),
            OrderbookError::Authorization(msg) => SdkError::Signature(msg),
            OrderbookError::Hub(inner) => inner.into(),
        }
    }
}
