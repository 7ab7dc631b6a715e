use axum::{extract::Request, http::header, middleware::Next, response::Response};

use crate::{app_error::AppError, config};

/// Gates the `/admin` routes behind the `ADMIN_API_TOKEN` bearer token.
///
/// When no token is configured every admin request is rejected, so a fresh
/// deployment fails closed rather than open.
pub async fn admin_authorization(req: Request, next: Next) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match (provided, config::admin_api_token()) {
        (Some(provided), Some(expected)) if provided == expected => Ok(next.run(req).await),
        _ => Err(AppError::Unauthorized),
    }
}
