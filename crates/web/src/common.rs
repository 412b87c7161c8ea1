use axum::{
    extract::{rejection::JsonRejection, OriginalUri, Request},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::MethodFilter,
    Json,
};
use dispatch::{DispatchError, ErrorKind};
use schemars::{schema_for, JsonSchema};
use serde::Serialize;

pub type RouteResult<O> = Result<O, RouteErrorResponse>;

/// A `MethodFilter` that matches all http methods.
pub(crate) const METHOD_FILTER_ALL: MethodFilter = MethodFilter::GET
    .or(MethodFilter::POST)
    .or(MethodFilter::PATCH)
    .or(MethodFilter::PUT)
    .or(MethodFilter::DELETE);

// - Services returning commonly used responses -

pub(crate) async fn schema<T: JsonSchema>() -> impl IntoResponse {
    Json(schema_for!(T))
}

pub(crate) async fn route_not_found(
    OriginalUri(original_uri): OriginalUri,
    req: Request,
) -> impl IntoResponse {
    RouteErrorResponse::not_found(req.method(), original_uri.path())
}

// - Commonly used responeses -

#[derive(Debug, Clone, Serialize)]
pub struct RouteErrorResponse {
    #[serde(skip)]
    pub status_code: StatusCode,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_uri: Option<String>,
}

impl RouteErrorResponse {
    pub fn new(status_code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status_code,
            error: None,
            message: message.into(),
            http_method: None,
            requested_uri: None,
        }
    }

    pub fn not_found(method: &Method, uri: impl Into<String>) -> Self {
        let status_code = StatusCode::NOT_FOUND;
        Self::new(
            status_code,
            status_code.canonical_reason().unwrap_or("Not Found"),
        )
        .with_method(method)
        .with_uri(uri)
    }

    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.error = Some(kind);
        self
    }

    pub fn with_method(mut self, method: &Method) -> Self {
        self.http_method = Some(method.to_string());
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.requested_uri = Some(uri.into());
        self
    }
}

/// Storage failures are the server's fault, everything else is a rejection of
/// the request.
impl From<DispatchError> for RouteErrorResponse {
    fn from(value: DispatchError) -> Self {
        let status_code = if value.is_internal() {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::BAD_REQUEST
        };
        Self::new(status_code, value.public_message()).with_kind(value.kind())
    }
}

impl From<JsonRejection> for RouteErrorResponse {
    fn from(value: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, value.body_text())
            .with_kind(ErrorKind::ValidationError)
    }
}

impl IntoResponse for RouteErrorResponse {
    fn into_response(self) -> axum::response::Response {
        (self.status_code, Json(self)).into_response()
    }
}
