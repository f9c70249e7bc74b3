// Public modules
pub mod agent;
pub mod ask;
pub mod chat_session;
pub mod document;
pub mod message;

// Re-exports
pub use agent::{AGENTS, Agent, AgentKey};
pub use ask::{AskRequest, AskResponse, DEFAULT_TOP_K};
pub use chat_session::{ChatSession, DEFAULT_TITLE, MAX_TITLE_CHARS, derive_title, generate_session_id};
pub use document::{
    Document, DocumentFilter, DocumentMetadata, UNTITLED_DOCUMENT, format_file_size, status_icon,
    status_label,
};
pub use message::{ERROR_NOTICE, Message, RAG_AGENT_TAG, Role, SourceRef};
