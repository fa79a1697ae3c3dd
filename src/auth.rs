use std::sync::Arc;

use axum::{
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension, Json,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Serialize;
use sheetledger_core::{access, CredentialVerifier};

#[derive(Serialize)]
struct AuthError {
    success: bool,
    error: String,
}

/// Splits an `Authorization: Basic <base64(username:password)>` value.
pub fn parse_basic_credentials(value: &str) -> Option<(String, String)> {
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Basic realm=\"sheetledger\"")],
        Json(AuthError {
            success: false,
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// Checks the request's Basic credentials and hands the authenticated
/// `CallerIdentity` to the handler through request extensions.
pub async fn auth_middleware<B>(
    Extension(verifier): Extension<Arc<dyn CredentialVerifier>>,
    mut req: Request<B>,
    next: Next<B>,
) -> Response {
    let credentials = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_basic_credentials);

    match credentials {
        Some((username, password)) => match access::require(verifier.as_ref(), &username, &password) {
            Ok(caller) => {
                tracing::debug!(caller = %caller.username, "Authenticated request");
                req.extensions_mut().insert(caller);
                next.run(req).await
            }
            Err(_) => {
                tracing::warn!(username = %username, "Invalid username or password");
                unauthorized("Invalid username or password")
            }
        },
        None => unauthorized("Missing credentials. Provide Authorization: Basic <base64(username:password)>"),
    }
}
