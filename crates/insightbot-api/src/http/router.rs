//! Axum router configuration with middleware.
//!
//! Routes: `POST /api/messages` (Bot Framework webhook) and `GET /health`.
//! Middleware: CORS, request tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/messages", post(handlers::messages::receive_activity))
        .route("/health", get(handlers::health::health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::{ChannelRecorder, spawn_app, spawn_channel};
    use insightbot_core::turn::handler::{FALLBACK_APOLOGY, WELCOME_MESSAGE};
    use serde_json::json;

    #[tokio::test]
    async fn test_health_is_healthy() {
        let base = spawn_app().await;
        let response = reqwest::get(format!("{base}/health")).await.unwrap();
        assert_eq!(response.status(), 200);

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "insightbot");
        assert!(chrono::DateTime::parse_from_rfc3339(body["timestamp"].as_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_health_repeated_calls_stay_healthy() {
        let base = spawn_app().await;
        for _ in 0..3 {
            let body: serde_json::Value = reqwest::get(format!("{base}/health"))
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            assert_eq!(body["status"], "healthy");
        }
    }

    #[tokio::test]
    async fn test_malformed_activity_is_400() {
        let base = spawn_app().await;
        let response = reqwest::Client::new()
            .post(format!("{base}/api/messages"))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["errors"][0]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_members_added_get_welcome() {
        let channel = ChannelRecorder::default();
        let service_url = spawn_channel(channel.clone()).await;
        let base = spawn_app().await;

        let activity = json!({
            "type": "conversationUpdate",
            "id": "upd-1",
            "serviceUrl": service_url,
            "conversation": {"id": "conv-1"},
            "recipient": {"id": "bot-1"},
            "membersAdded": [{"id": "user-1"}, {"id": "bot-1"}, {"id": "user-2"}]
        });
        let response = reqwest::Client::new()
            .post(format!("{base}/api/messages"))
            .json(&activity)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let delivered = channel.delivered();
        assert_eq!(delivered.len(), 2);
        assert!(delivered.iter().all(|a| a["text"] == WELCOME_MESSAGE));
        assert_eq!(delivered[0]["recipient"]["id"], "user-1");
        assert_eq!(delivered[1]["recipient"]["id"], "user-2");
    }

    #[tokio::test]
    async fn test_message_without_llm_gets_fallback_reply() {
        let channel = ChannelRecorder::default();
        let service_url = spawn_channel(channel.clone()).await;
        let base = spawn_app().await;

        let activity = json!({
            "type": "message",
            "id": "msg-1",
            "serviceUrl": service_url,
            "from": {"id": "user-1"},
            "conversation": {"id": "conv-1"},
            "recipient": {"id": "bot-1"},
            "text": "Show me details for customer C123"
        });
        let response = reqwest::Client::new()
            .post(format!("{base}/api/messages"))
            .json(&activity)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let delivered = channel.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0]["text"], FALLBACK_APOLOGY);
        assert_eq!(delivered[0]["replyToId"], "msg-1");
    }

    #[tokio::test]
    async fn test_unreachable_channel_still_200() {
        let base = spawn_app().await;
        let activity = json!({
            "type": "conversationUpdate",
            "serviceUrl": "http://127.0.0.1:9",
            "conversation": {"id": "conv-1"},
            "recipient": {"id": "bot-1"},
            "membersAdded": [{"id": "user-1"}]
        });
        let response = reqwest::Client::new()
            .post(format!("{base}/api/messages"))
            .json(&activity)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }
}
