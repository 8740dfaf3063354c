use crate::auth::{bearer_token, resolve_upstream_token};
use crate::config::ProxyConfig;
use crate::logging::{LogLevel, SharedLogger};
use crate::proxy::{self, ProxyResult};
use crate::translate::openai_types::{ChatCompletionRequest, ChatErrorResponse, ModelList};
use crate::upstream::{advertised_models, PUBLIC_MODEL_ID};

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: ProxyConfig,
    pub client: reqwest::Client,
    pub logger: SharedLogger,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/v1/chat/completions", post(handle_chat_completions))
        .route("/v1/models", get(handle_models))
        .route("/health", get(handle_health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_chat_completions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(client_key) = bearer_token(&headers) else {
        state.logger.warn("server", "Rejected request without bearer token");
        return error_response(
            StatusCode::UNAUTHORIZED,
            ChatErrorResponse::authentication("Missing Authorization header."),
        );
    };

    let upstream_token = match resolve_upstream_token(&state.config.auth, client_key) {
        Ok(token) => token,
        Err(e) => {
            state.logger.warn("server", format!("{}", e));
            return error_response(
                StatusCode::UNAUTHORIZED,
                ChatErrorResponse::authentication("Invalid API key."),
            );
        }
    };

    let req: ChatCompletionRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            state
                .logger
                .error("server", format!("Failed to parse request: {}", e));
            return error_response(
                StatusCode::BAD_REQUEST,
                ChatErrorResponse::invalid_request(format!("Invalid JSON: {}", e)),
            );
        }
    };

    let is_streaming = req.stream.unwrap_or(state.config.default_stream);
    let model = if req.model.is_empty() {
        PUBLIC_MODEL_ID.to_string()
    } else {
        req.model.clone()
    };

    state.logger.log_with_context(
        LogLevel::Info,
        "server",
        "Chat completion request",
        serde_json::json!({
            "model": model,
            "streaming": is_streaming,
            "messages": req.messages.len(),
        }),
    );

    if is_streaming {
        handle_streaming(state, &req, &model, &upstream_token).await
    } else {
        handle_non_streaming(state, &req, &model, &upstream_token).await
    }
}

async fn handle_non_streaming(
    state: Arc<AppState>,
    req: &ChatCompletionRequest,
    model: &str,
    upstream_token: &str,
) -> Response {
    match proxy::proxy_non_streaming(
        req,
        model,
        upstream_token,
        &state.config,
        &state.client,
        &state.logger,
    )
    .await
    {
        Ok(ProxyResult::Success(resp)) => Json(resp).into_response(),
        Ok(ProxyResult::UpstreamError { status, body }) => upstream_error_response(status, body),
        Err(e) => {
            state.logger.error("server", format!("Proxy error: {}", e));
            error_response(
                StatusCode::BAD_GATEWAY,
                ChatErrorResponse::api_error(format!("Proxy error: {}", e)),
            )
        }
    }
}

async fn handle_streaming(
    state: Arc<AppState>,
    req: &ChatCompletionRequest,
    model: &str,
    upstream_token: &str,
) -> Response {
    let sse_stream = match proxy::proxy_streaming(
        req,
        model,
        upstream_token,
        &state.config,
        &state.client,
        &state.logger,
    )
    .await
    {
        Ok(ProxyResult::Success(s)) => s,
        Ok(ProxyResult::UpstreamError { status, body }) => {
            return upstream_error_response(status, body);
        }
        Err(e) => {
            state
                .logger
                .error("server", format!("Streaming setup error: {}", e));
            return error_response(
                StatusCode::BAD_GATEWAY,
                ChatErrorResponse::api_error(format!("Streaming error: {}", e)),
            );
        }
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(sse_stream))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

/// Relay an upstream failure with its own status and body.
fn upstream_error_response(status: u16, body: String) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
    (status, body).into_response()
}

fn error_response(status: StatusCode, err: ChatErrorResponse) -> Response {
    (status, Json(err)).into_response()
}

async fn handle_models() -> Json<ModelList> {
    Json(advertised_models())
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
