//! Bot Framework activity schema (the subset the bot reads and writes).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Activity type discriminator.
///
/// Unknown types deserialize into `Other` so that new channel events never
/// fail request parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityType {
    Message,
    ConversationUpdate,
    Typing,
    EndOfConversation,
    #[serde(other)]
    Other,
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityType::Message => write!(f, "message"),
            ActivityType::ConversationUpdate => write!(f, "conversationUpdate"),
            ActivityType::Typing => write!(f, "typing"),
            ActivityType::EndOfConversation => write!(f, "endOfConversation"),
            ActivityType::Other => write!(f, "other"),
        }
    }
}

/// A participant (user or bot) in a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAccount {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// The conversation an activity belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationAccount {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_group: Option<bool>,
}

/// A single inbound or outbound conversational event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub from: ChannelAccount,
    #[serde(default)]
    pub conversation: ConversationAccount,
    #[serde(default)]
    pub recipient: ChannelAccount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members_added: Vec<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,
}

impl Activity {
    /// Build a text reply addressed back to the sender of `self`.
    pub fn reply_text(&self, text: impl Into<String>) -> Activity {
        self.reply_to(self.from.clone(), text)
    }

    /// Build a text reply in the same conversation addressed to `recipient`.
    pub fn reply_to(&self, recipient: ChannelAccount, text: impl Into<String>) -> Activity {
        Activity {
            activity_type: ActivityType::Message,
            id: None,
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
            service_url: self.service_url.clone(),
            channel_id: self.channel_id.clone(),
            from: self.recipient.clone(),
            conversation: self.conversation.clone(),
            recipient,
            text: Some(text.into()),
            text_format: Some("plain".to_string()),
            locale: self.locale.clone(),
            members_added: Vec::new(),
            reply_to_id: self.id.clone(),
        }
    }

    /// The message text with surrounding whitespace removed, if any.
    pub fn trimmed_text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}
