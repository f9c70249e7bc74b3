use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::utils::time::now_millis;

/// Agent tag carried by every assistant message produced by the RAG path.
pub const RAG_AGENT_TAG: &str = "rag";

/// Content of the synthesized assistant message shown when a query fails.
pub const ERROR_NOTICE: &str =
    "Lo siento, ha ocurrido un error al procesar tu consulta. Por favor, intenta nuevamente.";

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person typing questions.
    User,
    /// The assistant answering them.
    Assistant,
}

impl Role {
    /// The wire representation, also used as the display CSS class.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A document fragment cited by a RAG answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Backend identifier of the cited document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,

    /// File name of the cited document.
    #[serde(default)]
    pub filename: Option<String>,

    /// Index of the cited chunk within the document.
    #[serde(default)]
    pub chunk_index: Option<u32>,

    /// Retrieval similarity in `[0, 1]`.
    pub score: f64,
}

impl SourceRef {
    /// Creates a new source reference.
    pub fn new(filename: impl Into<String>, chunk_index: u32, score: f64) -> Self {
        Self {
            document_id: None,
            filename: Some(filename.into()),
            chunk_index: Some(chunk_index),
            score,
        }
    }
}

/// One entry in a session's message log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Who wrote the message.
    pub role: Role,

    /// Text with the light markup subset understood by the renderer.
    pub content: String,

    /// Sources backing a RAG answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceRef>>,

    /// Creation time.
    #[serde(with = "crate::utils::time")]
    pub timestamp: OffsetDateTime,

    /// Agent tag; [`RAG_AGENT_TAG`] for RAG answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,

    /// Marks a synthesized failure notice.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl Message {
    /// A message typed by the user.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            sources: None,
            timestamp: now_millis(),
            agent: None,
            is_error: false,
        }
    }

    /// An answer returned by the RAG backend.
    pub fn rag_answer(answer: impl Into<String>, sources: Vec<SourceRef>) -> Self {
        Self {
            role: Role::Assistant,
            content: answer.into(),
            sources: Some(sources),
            timestamp: now_millis(),
            agent: Some(RAG_AGENT_TAG.to_string()),
            is_error: false,
        }
    }

    /// The apology shown in place of an answer when a query fails.
    pub fn error_notice() -> Self {
        Self {
            role: Role::Assistant,
            content: ERROR_NOTICE.to_string(),
            sources: None,
            timestamp: now_millis(),
            agent: None,
            is_error: true,
        }
    }

    /// Sources attached to this message, empty when there are none.
    pub fn sources(&self) -> &[SourceRef] {
        self.sources.as_deref().unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn user_message_serialization() {
        let mut message = Message::user("Hola");
        message.timestamp = datetime!(2024-01-01 0:00:00 UTC);
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "role": "user",
                "content": "Hola",
                "timestamp": 1704067200000i64
            })
        );
    }

    #[test]
    fn error_notice_serializes_flag() {
        let mut message = Message::error_notice();
        message.timestamp = datetime!(2024-01-01 0:00:00 UTC);
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["isError"], serde_json::json!(true));
        assert_eq!(json["role"], serde_json::json!("assistant"));
        assert!(json.get("sources").is_none());
    }

    #[test]
    fn rag_answer_deserialization() {
        let json = r#"{
            "role": "assistant",
            "content": "Respuesta",
            "sources": [{"filename": "a.pdf", "chunk_index": 2, "score": 0.91}],
            "timestamp": 1704067200000,
            "agent": "rag"
        }"#;
        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message.agent.as_deref(), Some(RAG_AGENT_TAG));
        assert!(!message.is_error);
        assert_eq!(message.sources(), &[SourceRef::new("a.pdf", 2, 0.91)]);
    }

    #[test]
    fn source_with_null_fields() {
        let json = r#"{"document_id": "d1", "filename": null, "chunk_index": null, "score": 0.5}"#;
        let source: SourceRef = serde_json::from_str(json).unwrap();
        assert_eq!(source.document_id.as_deref(), Some("d1"));
        assert!(source.filename.is_none());
        assert!(source.chunk_index.is_none());
    }
}
