use biometrics::{Collector, Counter, Moments};

pub(crate) static RAG_REQUESTS: Counter = Counter::new("apex_rag.client.requests");
pub(crate) static RAG_REQUEST_ERRORS: Counter = Counter::new("apex_rag.client.request_errors");
pub(crate) static RAG_REQUEST_DURATION: Moments =
    Moments::new("apex_rag.client.request_duration_seconds");
pub(crate) static STUB_QUERIES: Counter = Counter::new("apex_rag.stub.queries");

pub(crate) static STORE_LOADS: Counter = Counter::new("apex_rag.store.loads");
pub(crate) static STORE_SAVES: Counter = Counter::new("apex_rag.store.saves");
pub(crate) static STORE_ERRORS: Counter = Counter::new("apex_rag.store.errors");

pub(crate) static CHAT_MESSAGES: Counter = Counter::new("apex_rag.chat.messages");
pub(crate) static CHAT_FAILED_EXCHANGES: Counter = Counter::new("apex_rag.chat.failed_exchanges");
pub(crate) static CHAT_SESSIONS_CREATED: Counter = Counter::new("apex_rag.chat.sessions_created");

pub(crate) static DOCUMENT_REQUESTS: Counter = Counter::new("apex_rag.documents.requests");
pub(crate) static DOCUMENT_REQUEST_ERRORS: Counter =
    Counter::new("apex_rag.documents.request_errors");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&RAG_REQUESTS);
    collector.register_counter(&RAG_REQUEST_ERRORS);
    collector.register_moments(&RAG_REQUEST_DURATION);
    collector.register_counter(&STUB_QUERIES);

    collector.register_counter(&STORE_LOADS);
    collector.register_counter(&STORE_SAVES);
    collector.register_counter(&STORE_ERRORS);

    collector.register_counter(&CHAT_MESSAGES);
    collector.register_counter(&CHAT_FAILED_EXCHANGES);
    collector.register_counter(&CHAT_SESSIONS_CREATED);

    collector.register_counter(&DOCUMENT_REQUESTS);
    collector.register_counter(&DOCUMENT_REQUEST_ERRORS);
}
