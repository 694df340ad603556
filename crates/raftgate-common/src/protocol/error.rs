use hyper::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("no service available")]
    NoAvailableService,

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed request: {0}")]
    Malformed(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Redirected to {0}")]
    Redirect(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<hyper::http::Error> for GatewayError {
    fn from(err: hyper::http::Error) -> Self {
        GatewayError::Transport(format!("Failed to build request: {}", err))
    }
}

impl GatewayError {
    /// HTTP status a gateway answers with when this error ends a request.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Malformed(_) => StatusCode::BAD_REQUEST,
            GatewayError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Redirect(_) => StatusCode::TEMPORARY_REDIRECT,
            GatewayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::NoAvailableService
            | GatewayError::Internal(_)
            | GatewayError::Transport(_)
            | GatewayError::Json(_)
            | GatewayError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
