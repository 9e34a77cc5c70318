use contract_client::ContractError;
use iexec_core::SdkError;

#[derive(Debug, thiserror::Error)]
pub enum SmsError {
    #[error("request to {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("SMS answered {status}: {message}")]
    Api { status: u16, message: String },

    #[error("secret {name} already exists for {owner}")]
    SecretExists { name: String, owner: String },

    #[error("invalid {field}: {message}")]
    InvalidInput { field: &'static str, message: String },

    #[error(transparent)]
    Hub(#[from] ContractError),
}

impl From<SmsError> for SdkError {
    fn from(err: SmsError) -> Self {
        match err {
            SmsError::Http { .. } => SdkError::Network(err.to_string()),
            SmsError::Api { status, message } => SdkError::Api { status, message },
            SmsError::SecretExists { .. } => SdkError::validation("secretName", err.to_string()),
            SmsError::InvalidInput { field, message } => SdkError::validation(field, message),
            SmsError::Hub(inner) => inner.into(),
        }
    }
}
