use serde::{Deserialize, Serialize};

/// A chat message as relayed to every connected client and kept in history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub message: String,
    pub timestamp: String,
}

/// The shape clients send; the sender is taken from the connection, never the payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timestamp: String,
}

impl InboundMessage {
    pub fn attribute_to(self, user_id: &str) -> ChatMessage {
        ChatMessage {
            user_id: user_id.to_string(),
            message: self.message,
            timestamp: self.timestamp,
        }
    }
}
