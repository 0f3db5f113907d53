use reqwest::StatusCode;

/// Failure talking to the groundwater service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("timeout")]
    Timeout,

    #[error("{0}")]
    Network(String),

    #[error("server responded with status {0}")]
    Status(StatusCode),

    #[error("invalid response body: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid backend URL: {0}")]
    InvalidUrl(String),

    #[error("could not save report: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_decode() {
            ClientError::Network(format!("could not read response: {}", err))
        } else if let Some(status) = err.status() {
            ClientError::Status(status)
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Why the position could not be determined.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeolocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("position unavailable: {0}")]
    PositionUnavailable(String),

    #[error("location request timed out")]
    Timeout,
}

impl From<reqwest::Error> for GeolocationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GeolocationError::Timeout
        } else {
            GeolocationError::PositionUnavailable(err.to_string())
        }
    }
}
