use iexec_core::SdkError;

/// Failures talking to off-chain HTTP services (workerpool API, IPFS gateway).
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("request to {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("{url} answered {status}: {message}")]
    Api {
        url: String,
        status: u16,
        message: String,
    },

    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl From<TrackerError> for SdkError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::Http { .. } | TrackerError::Decode { .. } => {
                SdkError::Network(err.to_string())
            }
            TrackerError::Api { status, .. } => SdkError::Api {
                status,
                message: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use iexec_core::ErrorKind;

    use super::*;

    #[test]
    fn api_errors_keep_their_status() {
        let err: SdkError = TrackerError::Api {
            url: "http://pool/tasks/0x01".to_string(),
            status: 404,
            message: "not found".to_string(),
        }
        .into();
        assert!(matches!(err, SdkError::Api { status: 404, .. }));
        assert!(err.to_string().contains("http://pool/tasks/0x01"));
    }

    #[test]
    fn transport_errors_are_network_errors() {
        let err: SdkError = TrackerError::Http {
            url: "http://pool".to_string(),
            message: "connection refused".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Network);
    }
}
