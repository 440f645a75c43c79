use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use crate::errors::{AppError, ErrorCode};
use crate::middleware::bearer_claims;
use crate::request_log::{NewRequestLog, RequestLogSink};

/// Bodies above this size are rejected before they reach a handler.
pub const MAX_LOGGED_BODY: usize = 64 * 1024;

pub type SharedLogSink = Arc<dyn RequestLogSink>;

/// Records ip, time, caller name and raw body of every request, then hands
/// the rebuilt request to the next layer. Binary bodies are logged as "".
pub async fn request_log_middleware(
    State(sink): State<SharedLogSink>,
    req: Request,
    next: Next,
) -> Response {
    let (parts, body) = req.into_parts();

    let (body, logged_body) = if is_text_body(&parts.headers) {
        match to_bytes(body, MAX_LOGGED_BODY).await {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes).into_owned();
                (Body::from(bytes), text)
            }
            Err(e) => {
                return AppError::new(ErrorCode::PayloadTooLarge, format!("request body rejected: {e}"))
                    .into_response();
            }
        }
    } else {
        (body, String::new())
    };

    let entry = NewRequestLog {
        ip_address: client_ip(&parts.headers, parts.extensions.get::<ConnectInfo<SocketAddr>>()),
        request_timestamp: Utc::now(),
        username: bearer_claims(&parts.headers).map(|c| c.name).unwrap_or_default(),
        request_body: logged_body,
    };

    let path = parts.uri.path().to_string();
    match tokio::task::spawn_blocking(move || sink.record(entry)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, path = %path, "failed to persist request log"),
        Err(e) => tracing::warn!(error = %e, path = %path, "request log task panicked"),
    }

    next.run(Request::from_parts(parts, body)).await
}

fn is_text_body(headers: &HeaderMap) -> bool {
    match headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
        None => true,
        Some(ct) => {
            let ct = ct.to_ascii_lowercase();
            ct.starts_with("application/json")
                || ct.starts_with("text/")
                || ct.starts_with("application/x-www-form-urlencoded")
        }
    }
}

fn client_ip(headers: &HeaderMap, connect_info: Option<&ConnectInfo<SocketAddr>>) -> String {
    if let Some(ConnectInfo(addr)) = connect_info {
        return addr.ip().to_string();
    }
    headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppResult;
    use crate::middleware::jwt_secret;
    use crate::types::auth::Claims;
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use http_body_util::BodyExt;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::sync::Mutex;
    use tower::ServiceExt;
    use uuid::Uuid;

    #[derive(Default)]
    struct RecordingSink {
        entries: Mutex<Vec<NewRequestLog>>,
    }

    impl RequestLogSink for RecordingSink {
        fn record(&self, entry: NewRequestLog) -> AppResult<()> {
            self.entries.lock().unwrap().push(entry);
            Ok(())
        }
    }

    struct FailingSink;

    impl RequestLogSink for FailingSink {
        fn record(&self, _entry: NewRequestLog) -> AppResult<()> {
            Err(AppError::internal("store offline"))
        }
    }

    fn app(sink: SharedLogSink) -> Router {
        Router::new()
            .route("/echo", post(|body: String| async move { body }))
            .layer(axum::middleware::from_fn_with_state(sink, request_log_middleware))
    }

    #[tokio::test]
    async fn logs_body_ip_and_caller_and_keeps_body_for_handler() {
        let sink = Arc::new(RecordingSink::default());
        let claims = Claims::new(Uuid::new_v4(), "Linus", "linus@example.com", 300);
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(jwt_secret().as_bytes())).unwrap();

        let response = app(sink.clone())
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/echo")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header("Authorization", format!("Bearer {token}"))
                    .header("X-Forwarded-For", "203.0.113.9, 10.0.0.1")
                    .body(Body::from(r#"{"content":"hi"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let echoed = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&echoed[..], br#"{"content":"hi"}"#);

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].ip_address, "203.0.113.9");
        assert_eq!(entries[0].username, "Linus");
        assert_eq!(entries[0].request_body, r#"{"content":"hi"}"#);
    }

    #[tokio::test]
    async fn anonymous_requests_log_an_empty_username() {
        let sink = Arc::new(RecordingSink::default());
        app(sink.clone())
            .oneshot(HttpRequest::builder().method("POST").uri("/echo").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].username, "");
        assert_eq!(entries[0].ip_address, "");
    }

    #[tokio::test]
    async fn multipart_bodies_are_not_buffered() {
        let sink = Arc::new(RecordingSink::default());
        app(sink.clone())
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/echo")
                    .header(header::CONTENT_TYPE, "multipart/form-data; boundary=x")
                    .body(Body::from("binary"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(sink.entries.lock().unwrap()[0].request_body, "");
    }

    #[tokio::test]
    async fn sink_failure_does_not_fail_the_request() {
        let response = app(Arc::new(FailingSink))
            .oneshot(HttpRequest::builder().method("POST").uri("/echo").body(Body::from("x")).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
