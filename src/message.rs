//! Chat history types
//!
//! The log a session accumulates is separate from the wire format: it keeps
//! what the user saw, in order, with timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::llm::types::{Content, Part};

/// Role of the message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A displayable piece of a chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePart {
    Text { text: String },
    /// Base64-encoded image with its media type
    Image { mime_type: String, data: String },
    /// Code the model chose to run
    Code { language: String, code: String },
    /// Output from running model-emitted code
    CodeResult { outcome: String, output: String },
}

impl MessagePart {
    /// Convert an API response part into its display form
    pub fn from_response_part(part: &Part) -> Self {
        match part {
            Part::Text { text } => Self::Text { text: text.clone() },
            Part::InlineData { inline_data } => Self::Image {
                mime_type: inline_data.mime_type.clone(),
                data: inline_data.data.clone(),
            },
            Part::ExecutableCode { executable_code } => Self::Code {
                language: executable_code.language.clone(),
                code: executable_code.code.clone(),
            },
            Part::CodeExecutionResult {
                code_execution_result,
            } => Self::CodeResult {
                outcome: code_execution_result.outcome.clone(),
                output: code_execution_result.output.clone(),
            },
        }
    }

    /// Convert back into a wire part for history replay
    pub fn to_wire_part(&self) -> Part {
        match self {
            Self::Text { text } => Part::text(text.clone()),
            Self::Image { mime_type, data } => Part::inline_data(mime_type.clone(), data.clone()),
            Self::Code { language, code } => Part::ExecutableCode {
                executable_code: crate::llm::types::ExecutableCode {
                    language: language.clone(),
                    code: code.clone(),
                },
            },
            Self::CodeResult { outcome, output } => Part::CodeExecutionResult {
                code_execution_result: crate::llm::types::CodeExecutionResult {
                    outcome: outcome.clone(),
                    output: output.clone(),
                },
            },
        }
    }
}

/// One entry in the append-only message log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub parts: Vec<MessagePart>,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(parts: Vec<MessagePart>) -> Self {
        Self {
            role: Role::User,
            parts,
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(parts: Vec<MessagePart>) -> Self {
        Self {
            role: Role::Assistant,
            parts,
            timestamp: Utc::now(),
        }
    }

    /// Concatenated text parts of this message
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                MessagePart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// Wire content for replaying this message in a request
    pub fn to_content(&self) -> Content {
        let parts = self.parts.iter().map(MessagePart::to_wire_part).collect();
        match self.role {
            Role::User => Content::user_parts(parts),
            Role::Assistant => Content::model(parts),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::ContentRole;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_message_text() {
        let msg = ChatMessage::user(vec![
            MessagePart::Text { text: "look at ".into() },
            MessagePart::Image {
                mime_type: "image/png".into(),
                data: "aGk=".into(),
            },
            MessagePart::Text { text: "this".into() },
        ]);
        assert_eq!(msg.text(), "look at this");
    }

    #[test]
    fn test_roles_map_to_wire_roles() {
        let user = ChatMessage::user(vec![MessagePart::Text { text: "hi".into() }]);
        assert_eq!(user.to_content().role, Some(ContentRole::User));

        let assistant = ChatMessage::assistant(vec![MessagePart::Text { text: "hello".into() }]);
        assert_eq!(assistant.to_content().role, Some(ContentRole::Model));
    }

    #[test]
    fn test_response_part_round_trip() {
        let wire = Part::inline_data("image/jpeg", "ZGF0YQ==");
        let display = MessagePart::from_response_part(&wire);
        match &display {
            MessagePart::Image { mime_type, .. } => assert_eq!(mime_type, "image/jpeg"),
            other => panic!("expected image part, got {:?}", other),
        }
    }
}
