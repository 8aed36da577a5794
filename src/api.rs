//! Webhook HTTP server
//!
//! Receives Twilio WhatsApp webhooks (form-encoded) or direct JSON test
//! payloads on a single endpoint, runs them through the agent, and answers
//! with a TwiML envelope. Every response carries CORS headers; an OPTIONS
//! preflight gets an empty 200 without touching any business logic.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::agent::ExpenseAgent;
use crate::models::IncomingMessage;

const CORS_ALLOW_HEADERS: &str =
    "Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Amz-Security-Token";
const CORS_ALLOW_METHODS: &str = "GET,POST,OPTIONS";

#[derive(Clone)]
pub struct ApiState {
    pub agent: Arc<ExpenseAgent>,
}

//
// ================= Payload Parsing =================
//

/// Direct structured payload, used for non-gateway invocation and tests.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DirectPayload {
    texto: String,
    from: String,
    profile_name: String,
    media_url: Option<String>,
    media_content_type: Option<String>,
    num_media: u32,
}

/// Parse the inbound body: a Twilio form-encoded webhook or a direct JSON
/// test payload, keyed off the Content-Type header.
pub fn parse_webhook_body(content_type: &str, body: &str) -> IncomingMessage {
    if content_type.contains("application/json") {
        let payload: DirectPayload = serde_json::from_str(body).unwrap_or_default();
        return IncomingMessage {
            text: payload.texto,
            from: payload.from,
            profile_name: payload.profile_name,
            media_url: payload.media_url.filter(|url| !url.is_empty()),
            media_content_type: payload.media_content_type.filter(|ct| !ct.is_empty()),
            num_media: payload.num_media,
        };
    }

    let mut message = IncomingMessage::default();
    for (key, value) in url::form_urlencoded::parse(body.as_bytes()) {
        match key.as_ref() {
            "Body" => message.text = value.into_owned(),
            "From" => message.from = value.into_owned(),
            "ProfileName" => message.profile_name = value.into_owned(),
            "MediaUrl0" if !value.is_empty() => message.media_url = Some(value.into_owned()),
            "MediaContentType0" if !value.is_empty() => {
                message.media_content_type = Some(value.into_owned())
            }
            "NumMedia" => message.num_media = value.parse().unwrap_or(0),
            _ => {}
        }
    }
    message
}

//
// ================= Responses =================
//

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// TwiML envelope with CORS headers, as the gateway expects.
pub fn twiml_response(message: &str) -> Response {
    let body = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response>\n    <Message>{}</Message>\n</Response>",
        xml_escape(message)
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/xml")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", CORS_ALLOW_HEADERS)
        .header("Access-Control-Allow-Methods", CORS_ALLOW_METHODS)
        .body(Body::from(body))
        .expect("static response headers are valid")
}

//
// ================= Handlers =================
//

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// CORS preflight: empty 200, same headers, no business logic.
async fn preflight() -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", CORS_ALLOW_HEADERS)
        .header("Access-Control-Allow-Methods", CORS_ALLOW_METHODS)
        .body(Body::empty())
        .expect("static response headers are valid")
}

async fn webhook(State(state): State<ApiState>, headers: HeaderMap, body: String) -> Response {
    let request_id = Uuid::new_v4();

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    let message = parse_webhook_body(content_type, &body);
    info!(
        %request_id,
        from = %message.from,
        num_media = message.num_media,
        "Webhook message received"
    );

    let reply = state.agent.handle_message(message).await;
    info!(%request_id, "Replying with {} chars", reply.chars().count());

    twiml_response(&reply)
}

//
// ================= Router / Server Startup =================
//

pub fn create_router(agent: Arc<ExpenseAgent>) -> Router {
    let state = ApiState { agent };

    Router::new()
        .route("/", post(webhook).options(preflight))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn start_server(
    agent: Arc<ExpenseAgent>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(agent);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("Webhook server listening on http://0.0.0.0:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
