use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sitebridge_core::error::BridgeError;

/// Unified error type for HTTP responses.
///
/// Domain errors surface as 400, IO and serialization failures as 500;
/// anything else in the `anyhow` chain is a 500. The body is always
/// `{"error": "..."}`.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if let Some(e) = self.0.downcast_ref::<BridgeError>() {
            match e {
                BridgeError::NotInitialized
                | BridgeError::InvalidSiteStatus(_)
                | BridgeError::InvalidSiteAction(_)
                | BridgeError::InvalidUpstream(_) => StatusCode::BAD_REQUEST,
                BridgeError::Io(_) | BridgeError::Yaml(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_initialized_maps_to_400() {
        let err = AppError(BridgeError::NotInitialized.into());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn invalid_upstream_maps_to_400() {
        let err = AppError(BridgeError::InvalidUpstream("ftp://x".into()).into());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn io_error_maps_to_500() {
        let io_err = std::io::Error::other("disk full");
        let err = AppError(BridgeError::Io(io_err).into());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn plain_anyhow_maps_to_500() {
        let err = AppError(anyhow::anyhow!("something unexpected"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn response_body_is_json() {
        let err = AppError(BridgeError::NotInitialized.into());
        let response = err.into_response();
        let ct = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .expect("should have content-type");
        assert!(ct.to_str().unwrap().contains("application/json"));
    }
}
