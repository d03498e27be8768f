//! Run a single message turn locally, without a channel.

use anyhow::Result;
use console::style;
use uuid::Uuid;

use insightbot_core::turn::TurnState;
use insightbot_types::activity::{Activity, ActivityType, ChannelAccount, ConversationAccount};

use crate::state::AppState;

const LOCAL_USER: &str = "local-operator";
const LOCAL_BOT: &str = "insightbot";

/// A message activity as the channel would deliver it, in a fresh conversation.
fn local_activity(question: &str) -> Activity {
    Activity {
        activity_type: ActivityType::Message,
        id: Some(Uuid::now_v7().to_string()),
        timestamp: Some(chrono::Utc::now().to_rfc3339()),
        service_url: None,
        channel_id: Some("cli".to_string()),
        from: ChannelAccount {
            id: LOCAL_USER.to_string(),
            name: None,
        },
        conversation: ConversationAccount {
            id: Uuid::now_v7().to_string(),
            ..Default::default()
        },
        recipient: ChannelAccount {
            id: LOCAL_BOT.to_string(),
            name: None,
        },
        text: Some(question.to_string()),
        text_format: None,
        locale: None,
        members_added: Vec::new(),
        reply_to_id: None,
    }
}

/// Ask one question and print every reply the turn produced.
pub async fn ask(state: &AppState, question: &str, json: bool) -> Result<()> {
    let activity = local_activity(question);
    let outcome = state.turns.handle(&activity).await;
    let answers: Vec<&str> = outcome
        .replies
        .iter()
        .filter_map(|reply| reply.text.as_deref())
        .collect();

    if json {
        let body = serde_json::json!({
            "question": question,
            "conversation_id": activity.conversation.id,
            "failed": outcome.state == TurnState::Failed,
            "answers": answers,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!();
    for answer in answers {
        let label = if outcome.state == TurnState::Failed {
            style("insightbot (error)").red().bold()
        } else {
            style("insightbot").cyan().bold()
        };
        println!("  {label}");
        for line in answer.lines() {
            println!("  {line}");
        }
        println!();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_activity_is_a_message() {
        let activity = local_activity("  Who are my top customers?  ");
        assert_eq!(activity.activity_type, ActivityType::Message);
        assert_eq!(activity.trimmed_text(), Some("Who are my top customers?"));
        assert_eq!(activity.from.id, LOCAL_USER);
        assert!(!activity.conversation.id.is_empty());
        assert!(activity.service_url.is_none());
    }

    #[test]
    fn test_local_activities_get_fresh_conversations() {
        let a = local_activity("one");
        let b = local_activity("two");
        assert_ne!(a.conversation.id, b.conversation.id);
    }
}
