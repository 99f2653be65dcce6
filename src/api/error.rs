use std::path::PathBuf;

use thiserror::Error;

use crate::domain::failure::SourceError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} answered HTTP {status}")]
    HttpStatus {
        endpoint: String,
        status: u16,
        message: Option<String>,
    },
    #[error("session expired or not logged in")]
    Unauthorized,
    #[error("{endpoint} refused the request: {}", .message.as_deref().unwrap_or("no reason given"))]
    Rejected {
        endpoint: String,
        message: Option<String>,
    },
    #[error("malformed response from {endpoint}: {detail}")]
    MalformedPayload { endpoint: String, detail: String },
    #[error("invalid backend url {url}: {source}")]
    InvalidEndpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    #[error("failed to access cookie jar at {path}: {source}")]
    CookieJar {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<ApiError> for SourceError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Unauthorized => SourceError::Unauthorized,
            ApiError::Rejected { message, .. } => SourceError::Rejected { message },
            ApiError::HttpStatus {
                status,
                message: Some(message),
                ..
            } => SourceError::Unavailable {
                detail: format!("HTTP {status}: {message}"),
            },
            ApiError::MalformedPayload { detail, .. } => SourceError::InvalidData { detail },
            other => SourceError::Unavailable {
                detail: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_maps_to_session_expiry() {
        assert_eq!(
            SourceError::from(ApiError::Unauthorized),
            SourceError::Unauthorized
        );
    }

    #[test]
    fn rejection_keeps_backend_message() {
        let error = ApiError::Rejected {
            endpoint: "api/add-website".to_owned(),
            message: Some("Website đã tồn tại".to_owned()),
        };

        assert_eq!(
            SourceError::from(error),
            SourceError::Rejected {
                message: Some("Website đã tồn tại".to_owned())
            }
        );
    }

    #[test]
    fn http_status_becomes_unavailable() {
        let error = ApiError::HttpStatus {
            endpoint: "api/get-stats".to_owned(),
            status: 502,
            message: None,
        };

        assert_eq!(
            SourceError::from(error),
            SourceError::Unavailable {
                detail: "api/get-stats answered HTTP 502".to_owned()
            }
        );
    }
}
