use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Header carrying the acting administrator's id.
pub const ADMIN_ID_HEADER: &str = "x-admin-id";

/// Extractor for the administrator performing the request.
///
/// The id is trusted as given; it only attributes audit and activity entries.
pub struct RequireAdmin(pub String);

#[derive(Debug)]
pub enum AuthError {
    MissingAdmin,
    InvalidHeader,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingAdmin => "Thiếu thông tin quản trị viên",
            AuthError::InvalidHeader => "Mã quản trị viên không hợp lệ",
        };

        let body = json!({ "data": null, "error": message });
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequireAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(ADMIN_ID_HEADER)
            .ok_or(AuthError::MissingAdmin)?;
        let admin_id = value
            .to_str()
            .map_err(|_| AuthError::InvalidHeader)?
            .trim();

        if admin_id.is_empty() {
            return Err(AuthError::MissingAdmin);
        }

        Ok(RequireAdmin(admin_id.to_string()))
    }
}
