use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::header;
use axum::Form;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Request body read as JSON or as an urlencoded form, depending on the
/// content type. Anything that is not a form is parsed as JSON whatever its
/// declared type; an empty body counts as `{}`. Every rejection is a 400.
pub struct FormOrJson<T>(pub T);

fn is_form(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

impl<S, T> FromRequest<S> for FormOrJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_form(&req) {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            return Ok(FormOrJson(value));
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        let body: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &bytes
        };
        serde_json::from_slice(body)
            .map(FormOrJson)
            .map_err(|e| ApiError::BadRequest(format!("JSON parse error - {}", e)))
    }
}
