//! Test servers: the app itself and a fake channel connector.

use std::sync::{Arc, Mutex};

use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::routing::post;

use insightbot_types::config::{BotSettings, ServiceConfig};

use crate::http::router::build_router;
use crate::state::AppState;

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// The full router with no data API, no LLM and no app credentials.
pub(crate) async fn spawn_app() -> String {
    let state = AppState::from_parts(ServiceConfig::default(), BotSettings::default()).unwrap();
    serve(build_router(state)).await
}

/// Activities the fake connector received.
#[derive(Clone, Default)]
pub(crate) struct ChannelRecorder {
    activities: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl ChannelRecorder {
    pub(crate) fn delivered(&self) -> Vec<serde_json::Value> {
        self.activities.lock().unwrap().clone()
    }
}

/// A Bot Connector stand-in accepting replies on both activity routes.
pub(crate) async fn spawn_channel(recorder: ChannelRecorder) -> String {
    let accept = move |Json(activity): Json<serde_json::Value>| {
        let recorder = recorder.clone();
        async move {
            recorder.activities.lock().unwrap().push(activity);
            StatusCode::OK
        }
    };
    let router = Router::new()
        .route(
            "/v3/conversations/{conv}/activities/{reply}",
            post(accept.clone()),
        )
        .route("/v3/conversations/{conv}/activities", post(accept));
    serve(router).await
}
