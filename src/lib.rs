//! Client library for the Apex AI RAG assistant backend.
//!
//! The chat side asks questions through a [`Retriever`] and keeps a list
//! of conversations in a [`ChatStore`]; the document side manages the files
//! the backend indexes.

// Public modules
pub mod chat;
pub mod client;
pub mod documents;
pub mod error;
pub mod observability;
pub mod render;
pub mod retriever;
pub mod storage;
pub mod types;
pub mod utils;

// Re-exports
pub use client::{API_URL_ENV, DEFAULT_API_URL, RagClient, resolve_api_base_url};
pub use documents::DocumentClient;
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use render::{ChatView, HtmlView, format_content};
pub use retriever::{Retriever, StubRetriever};
pub use storage::{ChatStore, FileChatStore, MemoryChatStore};
pub use types::*;
