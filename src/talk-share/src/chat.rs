//! Talk chat messages.

use reqwest::{Method, StatusCode};
use serde::Serialize;
use tracing::{debug, error};

use crate::error::{ShareError, ShareResult};
use crate::session::TalkSession;

/// A chat message as the Talk chat endpoint accepts it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub message: String,
    pub actor_type: String,
    pub actor_id: String,
    pub object_type: String,
    pub object_id: String,
    pub verb: String,
}

impl ChatMessage {
    /// A comment by `actor_id` in `conversation_token` that renders the
    /// shared file inline.
    pub fn file_reference(
        file_id: &str,
        actor_id: impl Into<String>,
        conversation_token: impl Into<String>,
    ) -> Self {
        Self {
            message: format!("image:{}", file_id),
            actor_type: "users".to_string(),
            actor_id: actor_id.into(),
            object_type: "chat".to_string(),
            object_id: conversation_token.into(),
            verb: "comment".to_string(),
        }
    }
}

/// Post a message to a conversation.
///
/// Only `200 OK` and `201 Created` count as delivered.
pub async fn send_chat_message(
    session: &TalkSession,
    conversation_token: &str,
    message: &ChatMessage,
) -> ShareResult<()> {
    let url = session.chat_url(conversation_token)?;
    debug!("Posting chat message to conversation {}", conversation_token);

    let request = session.ocs_request(Method::POST, url).json(message);
    let response = session.send("chat POST", request).await?;

    let status = response.status();
    if status != StatusCode::OK && status != StatusCode::CREATED {
        let body = response.text().await.unwrap_or_default();
        error!("Failed to post chat message: {} - {}", status, body);
        return Err(ShareError::MessagePost {
            status: status.as_u16(),
        });
    }

    debug!("Chat message posted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_file_reference_serializes_camel_case() {
        let message = ChatMessage::file_reference("42", "alice", "room-token");

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "message": "image:42",
                "actorType": "users",
                "actorId": "alice",
                "objectType": "chat",
                "objectId": "room-token",
                "verb": "comment"
            })
        );
    }
}
