//! Bot Framework messaging endpoint.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;

use insightbot_types::activity::Activity;

use crate::http::error::AppError;
use crate::state::AppState;

/// POST /api/messages - Run one turn for an inbound activity.
///
/// Responds once the turn has run and its replies were handed to the Bot
/// Connector. Delivery failures are logged; they never fail the request,
/// since the channel would only redeliver the same activity.
pub async fn receive_activity(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let activity: Activity = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(error = %e, "rejected malformed activity");
        AppError::from(e)
    })?;

    let outcome = state.turns.handle(&activity).await;
    tracing::debug!(
        state = ?outcome.state,
        replies = outcome.replies.len(),
        "turn finished"
    );

    for reply in &outcome.replies {
        if let Err(e) = state.connector.send(reply).await {
            tracing::error!(
                error = %e,
                conversation_id = %reply.conversation.id,
                "failed to deliver reply"
            );
        }
    }

    Ok(StatusCode::OK)
}
