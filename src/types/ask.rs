use serde::{Deserialize, Serialize};

use crate::types::SourceRef;

/// Number of chunks requested when the caller does not say otherwise.
pub const DEFAULT_TOP_K: u32 = 5;

/// Body of `POST /ask`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskRequest {
    /// The user's question.
    pub question: String,

    /// How many chunks the backend should retrieve.
    pub top_k: u32,
}

impl AskRequest {
    /// Creates a new request.
    pub fn new(question: impl Into<String>, top_k: u32) -> Self {
        Self {
            question: question.into(),
            top_k,
        }
    }
}

/// Successful response of `POST /ask`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    /// Generated answer.
    pub answer: String,

    /// Chunks that supported the answer, best first.
    #[serde(default)]
    pub sources: Vec<SourceRef>,
}
