//! Request log middleware
//!
//! Stores every mutating request (`POST`, `PUT`, `PATCH`, `DELETE`) with its
//! sanitized payload and the response it produced.

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{header, HeaderMap, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value as Json;

use super::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::handlers::audit::service::{log_request, RequestEntry};
use crate::state::AppState;

/// Keys never written to the log
const HIDDEN_KEYS: [&str; 3] = ["password", "password_confirmation", "token"];

/// Stored response bodies are cut to this many bytes
const MAX_LOGGED_BODY: usize = 64 * 1024;

fn is_logged(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/"))
}

/// First address of `X-Forwarded-For`, then `X-Real-IP`
fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Drop secrets from a JSON payload
fn sanitize(mut payload: Json) -> Json {
    if let Json::Object(map) = &mut payload {
        for key in HIDDEN_KEYS {
            map.remove(key);
        }
    }
    payload
}

/// Replace secret values anywhere in a JSON response with `***`
fn mask_secrets(value: &mut Json) {
    match value {
        Json::Object(map) => {
            for (key, inner) in map.iter_mut() {
                if HIDDEN_KEYS.contains(&key.as_str()) {
                    *inner = Json::String("***".to_string());
                } else {
                    mask_secrets(inner);
                }
            }
        }
        Json::Array(items) => items.iter_mut().for_each(mask_secrets),
        _ => {}
    }
}

/// Response body as stored in the log; JSON bodies are masked first
fn logged_body(body: &[u8]) -> String {
    match serde_json::from_slice::<Json>(body) {
        Ok(mut value) => {
            mask_secrets(&mut value);
            truncate(value.to_string().as_bytes())
        }
        Err(_) => truncate(body),
    }
}

fn truncate(body: &[u8]) -> String {
    let end = body.len().min(MAX_LOGGED_BODY);
    String::from_utf8_lossy(&body[..end]).into_owned()
}

pub async fn request_log_layer(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !is_logged(request.method()) {
        return next.run(request).await;
    }

    let (parts, body) = request.into_parts();
    let method = parts.method.to_string();
    let url = parts.uri.to_string();
    let ip = client_ip(&parts.headers);
    let user_agent = parts
        .headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    // File uploads are passed through untouched and logged without payload
    let (payload, request) = if is_multipart(&parts.headers) {
        (None, Request::from_parts(parts, body))
    } else {
        let bytes = match to_bytes(body, state.config.max_upload_size).await {
            Ok(bytes) => bytes,
            Err(_) => {
                return AppError::PayloadTooLarge("Ukuran request terlalu besar".to_string())
                    .into_response()
            }
        };
        let payload = serde_json::from_slice::<Json>(&bytes).ok().map(sanitize);
        (payload, Request::from_parts(parts, Body::from(bytes)))
    };

    let response = next.run(request).await;
    let user_id = response.extensions().get::<AuthenticatedUser>().map(|u| u.0);
    let response_code = response.status().as_u16() as i32;

    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("Failed to buffer response for request log: {}", e);
            return AppError::Internal(e.to_string()).into_response();
        }
    };

    log_request(RequestEntry {
        method,
        url,
        ip,
        user_agent,
        payload,
        user_id,
        response_code,
        response_body: Some(logged_body(&bytes)),
    });

    Response::from_parts(parts, Body::from(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde_json::json;

    #[test]
    fn test_sanitize_removes_secrets() {
        let payload = sanitize(json!({
            "email": "guru@sekolah.test",
            "password": "rahasia",
            "password_confirmation": "rahasia",
            "token": "1|abc"
        }));
        assert_eq!(payload, json!({ "email": "guru@sekolah.test" }));
    }

    #[test]
    fn test_login_token_masked_in_logged_response() {
        let body = json!({
            "message": "Login berhasil",
            "data": { "user": { "id": 1, "name": "Admin" }, "token": "1|s3cr3t" }
        });
        let logged = logged_body(body.to_string().as_bytes());
        assert!(!logged.contains("s3cr3t"));
        let logged: Json = serde_json::from_str(&logged).unwrap();
        assert_eq!(logged["data"]["token"], "***");
        assert_eq!(logged["data"]["user"]["name"], "Admin");

        assert_eq!(logged_body(b"not json"), "not json");
    }

    #[test]
    fn test_client_ip() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers), None);
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(client_ip(&headers).as_deref(), Some("10.0.0.2"));
        headers.insert("x-forwarded-for", HeaderValue::from_static("192.168.1.5, 10.0.0.1"));
        assert_eq!(client_ip(&headers).as_deref(), Some("192.168.1.5"));
    }

    #[test]
    fn test_logged_methods() {
        assert!(is_logged(&Method::DELETE));
        assert!(is_logged(&Method::PATCH));
        assert!(!is_logged(&Method::GET));
    }
}
