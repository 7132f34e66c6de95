//! Types for reporting errors that happened during a request.
//!
//! Handlers return an [`ApiResult`]. Domain errors convert into an
//! [`ApiError`] with `?`, which decides the status code and body.

use crate::feature::{asset::asset_store::AssetError, item::item_error::ItemError};
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{PathRejection, QueryRejection},
    },
    http::HeaderValue,
    response::{IntoResponse, Response},
    BoxError, Json,
};
use chrono::{DateTime, Utc};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tower_http::catch_panic::ResponseForPanic;
use utoipa::ToSchema;

/// A standard error response body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// A description of the error.
    message: String,
    /// When the error happened.
    timestamp: DateTime<Utc>,
}

impl ErrorBody {
    pub(crate) fn new(message: String) -> Self {
        Self {
            message,
            timestamp: Utc::now(),
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        self.message.as_ref()
    }

    /// When the error happened.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// A message-only response body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MessageBody {
    /// What happened.
    #[schema(example = "Item deleted successfully")]
    pub message: String,
}

/// An error from our API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// An error caused by the client.
    #[error("{0}")]
    ClientError(#[from] ClientError),
    /// An internal error.
    #[error("{0}")]
    InternalError(#[from] InternalError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::ClientError(e) => e.into_response(),
            ApiError::InternalError(e) => {
                tracing::error!("internal error: {}", e);
                e.into_response()
            }
        }
    }
}

/// The result of calling API-related functions.
pub type ApiResult<T> = Result<T, ApiError>;

impl From<ItemError> for ApiError {
    fn from(e: ItemError) -> Self {
        match e {
            ItemError::Validation(message) => ClientError::BadRequest(message).into(),
            e @ ItemError::NotFound => {
                ClientError::Custom(StatusCode::NOT_FOUND, e.to_string()).into()
            }
            ItemError::AssetWrite(e @ (AssetError::Transform(_) | AssetError::Unsupported(_))) => {
                ClientError::BadRequest(e.to_string()).into()
            }
            ItemError::AssetWrite(e) => InternalError::Asset(e).into(),
            ItemError::Store(e) => InternalError::Store(e).into(),
        }
    }
}

/// Errors caused by the client.
/// The client can do something to fix these.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Input validation failed, or some illegal operation was attempted.
    #[error("{0}")]
    BadRequest(String),
    /// The resource was not found.
    #[error("not found")]
    NotFound,
    /// An extractor rejected the request.
    #[error("{1}")]
    Custom(StatusCode, String),
}

impl Default for ClientError {
    fn default() -> Self {
        Self::NotFound
    }
}

impl From<QueryRejection> for ClientError {
    fn from(value: QueryRejection) -> Self {
        ClientError::Custom(value.status(), value.body_text())
    }
}

impl From<PathRejection> for ClientError {
    fn from(value: PathRejection) -> Self {
        ClientError::Custom(value.status(), value.body_text())
    }
}

impl From<MultipartRejection> for ClientError {
    fn from(value: MultipartRejection) -> Self {
        ClientError::Custom(value.status(), value.body_text())
    }
}

impl From<MultipartError> for ClientError {
    fn from(value: MultipartError) -> Self {
        ClientError::Custom(value.status(), value.body_text())
    }
}

impl IntoResponse for ClientError {
    fn into_response(self) -> Response {
        let msg = self.to_string();
        let status = match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Custom(status, _) => status,
        };
        (status, Json(ErrorBody::new(msg))).into_response()
    }
}

/// An internal error.
/// The client cannot do anything about this.
#[derive(Debug, thiserror::Error)]
pub enum InternalError {
    /// The item store failed.
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
    /// The asset store failed.
    #[error("asset error: {0}")]
    Asset(#[from] AssetError),
    /// The server is at its concurrency limit.
    #[error("overloaded")]
    Overloaded,
    /// Other miscellaneous errors.
    #[error("{0}")]
    Other(String),
}

impl IntoResponse for InternalError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::Overloaded => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let mut response =
            (status, Json(ErrorBody::new("internal error".to_string()))).into_response();
        response
            .headers_mut()
            .insert("Retry-After", HeaderValue::from_static("5"));
        response
    }
}

/// Maps errors from fallible tower middleware to responses.
pub(crate) async fn handle_middleware_error(e: BoxError) -> Response {
    if e.is::<tower::load_shed::error::Overloaded>() {
        ApiError::InternalError(InternalError::Overloaded).into_response()
    } else {
        ApiError::InternalError(InternalError::Other(format!("Tower middleware failed: {e}")))
            .into_response()
    }
}

/// A handler for converting panics into proper responses for the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PanicHandler;

impl ResponseForPanic for PanicHandler {
    type ResponseBody = axum::body::Body;

    fn response_for_panic(
        &mut self,
        _: Box<dyn std::any::Any + Send + 'static>,
    ) -> http::Response<Self::ResponseBody> {
        ApiError::InternalError(InternalError::Other("Panic".to_string())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(e: ItemError) -> StatusCode {
        ApiError::from(e).into_response().status()
    }

    #[test]
    fn item_errors_map_to_statuses() {
        assert_eq!(
            StatusCode::BAD_REQUEST,
            status_of(ItemError::Validation("title is required".to_string()))
        );
        assert_eq!(StatusCode::NOT_FOUND, status_of(ItemError::NotFound));
        assert_eq!(
            StatusCode::INTERNAL_SERVER_ERROR,
            status_of(ItemError::Store(sqlx::Error::PoolTimedOut))
        );
        assert_eq!(
            StatusCode::INTERNAL_SERVER_ERROR,
            status_of(ItemError::AssetWrite(AssetError::Io(
                std::io::ErrorKind::PermissionDenied.into()
            )))
        );
    }

    #[tokio::test]
    async fn missing_items_name_the_item() {
        let before = Utc::now();
        let response = ApiError::from(ItemError::NotFound).into_response();
        assert_eq!(StatusCode::NOT_FOUND, response.status());

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!("Item not found", body.message());
        assert!(body.timestamp() >= before);
    }

    #[test]
    fn bad_images_are_the_clients_fault() {
        assert_eq!(
            StatusCode::BAD_REQUEST,
            status_of(ItemError::AssetWrite(AssetError::Unsupported(
                "html".to_string()
            )))
        );
        let e = image::load_from_memory(b"nope").unwrap_err();
        assert_eq!(
            StatusCode::BAD_REQUEST,
            status_of(ItemError::AssetWrite(AssetError::Transform(e)))
        );
    }

    #[test]
    fn internal_errors_ask_to_retry() {
        let response = InternalError::Other("boom".to_string()).into_response();
        assert_eq!("5", response.headers()["Retry-After"]);
    }

    #[tokio::test]
    async fn overload_is_service_unavailable() {
        let response =
            handle_middleware_error(Box::new(tower::load_shed::error::Overloaded::new())).await;
        assert_eq!(StatusCode::SERVICE_UNAVAILABLE, response.status());
    }
}
