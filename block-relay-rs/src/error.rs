use crate::types::BlockVersion;
use axum::{
    extract::Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ethereum_consensus::primitives::Hash32;
use thiserror::Error;

/// The body of every error response of the builder API.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ApiError {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid {name} `{value}`: {reason}")]
    InvalidParameter { name: &'static str, value: String, reason: String },
    #[error("missing Eth-Consensus-Version header")]
    MissingVersion,
    #[error("unknown block version {0}")]
    UnknownBlockVersion(String),
    #[error("unsupported content type {0}")]
    UnsupportedContentType(String),
    #[error("could not decode {version} data: {reason}")]
    Decode { version: BlockVersion, reason: String },
    #[error("could not encode {version} data: {reason}")]
    Encode { version: BlockVersion, reason: String },
    #[error("expected data for version {expected} but {provided} was provided")]
    VersionMismatch { expected: BlockVersion, provided: BlockVersion },
    #[error("invalid options: {0}")]
    InvalidOptions(String),
    #[error("execution payload with block hash {provided:?} does not match the committed block hash {expected:?}")]
    InvalidExecutionPayload { expected: Hash32, provided: Hash32 },
    #[error("blobs bundle does not match the block's kzg commitments")]
    InvalidBlobsBundle,
    #[error("could not unblind block: {}", .0.join(";"))]
    UnblindFailed(Vec<String>),
    #[error("no bid providers are configured")]
    NoProviders,
    #[error("request was cancelled")]
    Cancelled,
    #[error("request to {0} timed out")]
    Timeout(String),
    #[error("invalid input: {0}")]
    InvalidRegistrations(String),
    #[error("{}", .0.join(";"))]
    RegistrationErrors(Vec<String>),
    #[error("Request not supported by service")]
    RegistrationUnsupported,
    #[error("could not load config: {0}")]
    Config(String),
    #[error("relay responded with {code}: {message}")]
    Api { code: u16, message: String },
    #[error(transparent)]
    Url(#[from] url::ParseError),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Metrics(#[from] prometheus::Error),
    #[error("internal server error: {0}")]
    Internal(String),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidParameter { .. } |
            Self::MissingVersion |
            Self::UnknownBlockVersion(..) |
            Self::Decode { .. } |
            Self::InvalidOptions(..) |
            Self::InvalidRegistrations(..) |
            Self::RegistrationErrors(..) => StatusCode::BAD_REQUEST,
            Self::UnsupportedContentType(..) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        Self::Api { code: err.code, message: err.message }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let code = self.status_code();
        let message = self.to_string();
        if code.is_server_error() {
            tracing::error!(%code, %message, "failed to serve request");
        } else {
            tracing::debug!(%code, %message, "rejected request");
        }
        (code, Json(ApiError { code: code.as_u16(), message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_errors_to_status_codes() {
        assert_eq!(Error::MissingVersion.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::UnsupportedContentType("text/plain".into()).status_code(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(Error::InvalidOptions("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::Encode { version: BlockVersion::Deneb, reason: "x".into() }.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(Error::RegistrationUnsupported.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let err = Error::UnblindFailed(vec!["r1: timed out".into()]);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn joins_registration_errors() {
        let err = Error::RegistrationErrors(vec!["bad signature".into(), "stale".into()]);
        assert_eq!(err.to_string(), "bad signature;stale");
    }
}
