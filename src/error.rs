use crate::provider::ProviderError;
use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::{Request, Response};
use rocket_okapi::okapi::openapi3::{RefOr, Response as OpenApiResponse, Responses};
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::response::OpenApiResponderInner;
use serde::Serialize;
use std::io::Cursor;

#[derive(Debug)]
pub enum ApiError {
    /// Transport-level failure talking to the mail provider. Distinct from
    /// per-item failures, which are recorded as `ItemResult`s instead.
    Upstream(ProviderError),
    /// The session's provider credentials are no longer accepted.
    SessionExpired,
    NotFound(String),
    BadRequest(String),
    InternalError(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let (status, error_type, message) = match self {
            ApiError::Upstream(e) => {
                log::error!("upstream provider error: {}", e);
                (Status::BadGateway, "UpstreamUnavailable", e.to_string())
            }
            ApiError::SessionExpired => {
                log::debug!("rejecting request with expired session");
                (
                    Status::Unauthorized,
                    "auth-expired",
                    "Session has expired, please sign in again".to_string(),
                )
            }
            ApiError::NotFound(msg) => {
                log::debug!("not found: {}", msg);
                (Status::NotFound, "NotFound", msg)
            }
            ApiError::BadRequest(msg) => {
                log::debug!("bad request: {}", msg);
                (Status::BadRequest, "BadRequest", msg)
            }
            ApiError::InternalError(msg) => {
                log::error!("internal error: {}", msg);
                (Status::InternalServerError, "InternalError", msg)
            }
        };

        let error_response = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        let json = serde_json::to_string(&error_response).unwrap_or_else(|_| {
            r#"{"error":"SerializationError","message":"Failed to serialize error"}"#.to_string()
        });

        Response::build()
            .status(status)
            .header(rocket::http::ContentType::JSON)
            .sized_body(json.len(), Cursor::new(json))
            .ok()
    }
}

// Lets `Result<Json<T>, ApiError>` handlers carry `#[openapi]` annotations;
// lists the error statuses the responder above can produce.
impl OpenApiResponderInner for ApiError {
    fn responses(_gen: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        let mut responses = Responses::default();
        for (status, description) in [
            ("400", "Malformed or unacceptable request parameters."),
            ("401", "Missing, invalid or expired session token."),
            ("404", "No resource under the requested identifier."),
            ("500", "Unexpected internal error."),
            ("502", "The upstream mail provider failed or was unreachable."),
        ] {
            responses.responses.insert(
                status.to_string(),
                RefOr::Object(OpenApiResponse {
                    description: description.to_string(),
                    ..Default::default()
                }),
            );
        }
        Ok(responses)
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::AuthExpired => ApiError::SessionExpired,
            other => ApiError::Upstream(other),
        }
    }
}

// JSON catchers so guard rejections and unknown paths match the error
// envelope produced by ApiError.

#[rocket::catch(401)]
pub fn unauthorized(req: &Request<'_>) -> rocket::serde::json::Json<serde_json::Value> {
    // The session guard records why it rejected the request; default to the
    // generic not-authenticated error when no guard ran.
    let rejection = req.local_cache(crate::auth::AuthRejection::default);
    let (error, message) = match rejection {
        crate::auth::AuthRejection::Expired => {
            ("auth-expired", "Session has expired, please sign in again")
        }
        crate::auth::AuthRejection::NotAuthenticated => {
            ("not-authenticated", "A valid session token is required")
        }
    };
    rocket::serde::json::Json(serde_json::json!({
        "error": error,
        "message": message,
    }))
}

#[rocket::catch(404)]
pub fn not_found(req: &Request<'_>) -> rocket::serde::json::Json<serde_json::Value> {
    rocket::serde::json::Json(serde_json::json!({
        "error": "NotFound",
        "message": format!("No route or resource at '{}'", req.uri()),
    }))
}

#[rocket::catch(500)]
pub fn internal_error() -> rocket::serde::json::Json<serde_json::Value> {
    rocket::serde::json::Json(serde_json::json!({
        "error": "InternalError",
        "message": "Unexpected internal error",
    }))
}
