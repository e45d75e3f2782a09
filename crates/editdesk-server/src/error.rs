use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use editdesk_contracts::ErrorBody;
use thiserror::Error;
use tracing::error;

pub const MISSING_CREDENTIAL: &str =
    "Server misconfiguration: OPENROUTER_API_KEY (or OPENAI_API_KEY) not set.";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    Validation(String),
    #[error("invalid JSON body: {0}")]
    MalformedBody(String),
    #[error("{}", MISSING_CREDENTIAL)]
    Configuration,
    #[error("Upstream error")]
    Upstream { status: u16, detail: String },
    #[error("Upstream unavailable")]
    UpstreamUnavailable(String),
    #[error("Upstream returned an unreadable response")]
    MalformedEnvelope(String),
    #[error("internal error")]
    Internal(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Validation(_) | GatewayError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            GatewayError::Configuration | GatewayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            // Only error statuses are forwarded; anything else from a failed
            // call is reported as a bad gateway.
            GatewayError::Upstream { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            GatewayError::UpstreamUnavailable(_) | GatewayError::MalformedEnvelope(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    pub fn body(&self) -> ErrorBody {
        let body = ErrorBody::new(self.to_string());
        match self {
            GatewayError::Upstream { detail, .. }
            | GatewayError::UpstreamUnavailable(detail)
            | GatewayError::MalformedEnvelope(detail) => body.with_detail(detail.clone()),
            _ => body,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        if let GatewayError::Internal(detail) = &self {
            error!(%detail, "request failed with an internal error");
        }
        (self.status(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_status_is_forwarded() {
        let err = GatewayError::Upstream {
            status: 429,
            detail: "slow down".to_string(),
        };
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
        let body = err.body();
        assert_eq!(body.error, "Upstream error");
        assert_eq!(body.detail.as_deref(), Some("slow down"));
    }

    #[test]
    fn odd_upstream_status_becomes_bad_gateway() {
        let err = GatewayError::Upstream {
            status: 304,
            detail: String::new(),
        };
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let err = GatewayError::Internal("thread 'x' panicked at src/lib.rs:1".to_string());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = err.body();
        assert_eq!(body.error, "internal error");
        assert!(body.detail.is_none());
    }

    #[test]
    fn configuration_error_names_the_variables() {
        let body = GatewayError::Configuration.body();
        assert!(!body.ok);
        assert!(body.error.contains("OPENROUTER_API_KEY"));
        assert_eq!(GatewayError::Configuration.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
