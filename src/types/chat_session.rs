use rand::Rng;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::{AgentKey, Message};
use crate::utils::time::unix_millis;

/// Title given to a session before its first message.
pub const DEFAULT_TITLE: &str = "Nueva conversación";

/// Longest title, in characters, kept before truncation.
pub const MAX_TITLE_CHARS: usize = 50;

const ID_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Persisted summary of one chat thread.
///
/// Only the summary is stored; the message log of a session lives in
/// memory while it is current.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    /// Opaque unique identifier.
    pub id: String,

    /// Human-readable label.
    pub title: String,

    /// Last-activity time.
    #[serde(with = "crate::utils::time")]
    pub timestamp: OffsetDateTime,

    /// Agent selected when the session was created.
    pub agent: AgentKey,

    /// Most recently persisted message, for history previews.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<Message>,
}

impl ChatSession {
    /// Creates an untitled session.
    pub fn new(id: impl Into<String>, agent: AgentKey, timestamp: OffsetDateTime) -> Self {
        Self {
            id: id.into(),
            title: DEFAULT_TITLE.to_string(),
            timestamp,
            agent,
            last_message: None,
        }
    }
}

/// Generates a session id of the form `chat_<unix millis>_<9 base36 chars>`.
pub fn generate_session_id(now: &OffsetDateTime) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("chat_{}_{}", unix_millis(now), suffix)
}

/// Derives a session title from the first user message.
///
/// Messages longer than [`MAX_TITLE_CHARS`] characters keep their first
/// [`MAX_TITLE_CHARS`] characters followed by `...`.
pub fn derive_title(first_message: &str) -> String {
    match first_message.char_indices().nth(MAX_TITLE_CHARS) {
        Some((cut, _)) => format!("{}...", &first_message[..cut]),
        None => first_message.to_string(),
    }
}
