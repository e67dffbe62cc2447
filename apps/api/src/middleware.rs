use axum::extract::Request;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use fieldgate_core::{AppError, CallerIdentity};

use crate::error::ApiResult;

/// Header carrying the authenticated subject.
pub const SUBJECT_HEADER: &str = "x-fieldgate-subject";

/// Header carrying the caller's comma-separated role names.
pub const ROLES_HEADER: &str = "x-fieldgate-roles";

/// Attaches the caller identity asserted by the upstream authenticator.
pub async fn require_identity(mut request: Request, next: Next) -> ApiResult<Response> {
    let identity = identity_from_headers(request.headers())?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

fn identity_from_headers(headers: &HeaderMap) -> Result<CallerIdentity, AppError> {
    let subject = headers
        .get(SUBJECT_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;

    let mut roles: Vec<String> = Vec::new();
    for value in headers.get_all(ROLES_HEADER) {
        let Ok(value) = value.to_str() else {
            tracing::debug!(subject, "ignoring non-ascii roles header");
            continue;
        };
        for role in value.split(',').map(str::trim).filter(|role| !role.is_empty()) {
            if !roles.iter().any(|existing| existing == role) {
                roles.push(role.to_owned());
            }
        }
    }

    Ok(CallerIdentity::new(subject, roles))
}
