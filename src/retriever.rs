//! The query contract used by the chat controller.
//!
//! [`RagClient`] answers from the live backend. [`StubRetriever`] returns
//! canned per-agent answers after a fixed delay, for working on the chat
//! front end without a backend.

use std::time::Duration;

use crate::client::RagClient;
use crate::error::Result;
use crate::observability::STUB_QUERIES;
use crate::types::{AgentKey, AskRequest, AskResponse, SourceRef};

/// Delay applied by [`StubRetriever`] before answering.
pub const DEFAULT_STUB_DELAY: Duration = Duration::from_millis(1500);

/// Answers questions for the chat controller.
#[async_trait::async_trait]
pub trait Retriever: Send + Sync {
    /// Answer `question` for the currently selected `agent`.
    async fn query(&self, question: &str, agent: AgentKey, top_k: u32) -> Result<AskResponse>;
}

#[async_trait::async_trait]
impl Retriever for RagClient {
    async fn query(&self, question: &str, _agent: AgentKey, top_k: u32) -> Result<AskResponse> {
        self.ask(&AskRequest::new(question, top_k)).await
    }
}

/// Deterministic stand-in for the backend.
#[derive(Debug, Clone)]
pub struct StubRetriever {
    delay: Duration,
}

impl StubRetriever {
    /// Creates a stub that answers after [`DEFAULT_STUB_DELAY`].
    pub fn new() -> Self {
        Self::with_delay(DEFAULT_STUB_DELAY)
    }

    /// Creates a stub with a custom delay.
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }

    /// The delay applied before each answer.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for StubRetriever {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Retriever for StubRetriever {
    async fn query(&self, question: &str, agent: AgentKey, _top_k: u32) -> Result<AskResponse> {
        STUB_QUERIES.click();
        tracing::debug!(%agent, "answering from the stub retriever");
        tokio::time::sleep(self.delay).await;
        Ok(canned_response(question, agent))
    }
}

/// The canned answer for `agent`.
pub fn canned_response(question: &str, agent: AgentKey) -> AskResponse {
    match agent {
        AgentKey::General => AskResponse {
            answer: format!(
                "He analizado tu consulta \"{question}\" en la base de conocimiento. Basándome en los documentos indexados, puedo proporcionarte la siguiente información:\n\nLa documentación muestra varios puntos relevantes sobre este tema. Los sistemas RAG (Retrieval-Augmented Generation) permiten combinar la búsqueda semántica con la generación de respuestas, lo que mejora significativamente la precisión y relevancia de las respuestas.\n\n¿Hay algún aspecto específico sobre el que quieras más detalles?"
            ),
            sources: vec![
                SourceRef::new("Introducción a sistemas RAG", 1, 0.92),
                SourceRef::new("Best practices RAG", 3, 0.87),
            ],
        },
        AgentKey::Hr => AskResponse {
            answer: "Según la documentación de Recursos Humanos y la legislación laboral chilena:\n\nLa Ley Karin (Ley 21.643) establece requisitos específicos para la prevención, investigación y sanción del acoso laboral, sexual y violencia en el trabajo. Las empresas deben implementar protocolos de prevención y contar con canales de denuncia confidenciales.\n\nLos puntos clave incluyen:\n- Capacitación obligatoria para todo el personal\n- Implementación de protocolos de actuación\n- Canales de denuncia seguros\n- Medidas preventivas y correctivas\n\n¿Necesitas información más específica sobre alguno de estos aspectos?".to_string(),
            sources: vec![
                SourceRef::new("Ley Karin - Normativa completa", 2, 0.95),
                SourceRef::new("Protocolo de prevención de acoso", 1, 0.89),
                SourceRef::new("Capacitación Ley Karin", 4, 0.84),
            ],
        },
        AgentKey::Legal => AskResponse {
            answer: "En base a la documentación legal disponible:\n\nEl marco normativo chileno establece requisitos claros de cumplimiento. Las organizaciones deben mantener registros actualizados y procedimientos documentados que demuestren el cumplimiento de las normativas aplicables.\n\nLos aspectos principales incluyen:\n- Documentación de procesos\n- Auditorías periódicas\n- Capacitación del personal\n- Actualización normativa continua\n\n¿Requieres información sobre alguna normativa específica?".to_string(),
            sources: vec![
                SourceRef::new("Marco legal empresarial Chile", 5, 0.91),
                SourceRef::new("Compliance y auditoría", 2, 0.86),
            ],
        },
        AgentKey::Technical => AskResponse {
            answer: "Revisando la documentación técnica disponible:\n\nLos sistemas RAG modernos utilizan modelos de embeddings avanzados para convertir documentos en representaciones vectoriales que pueden buscarse semánticamente. Esto permite encontrar información relevante incluso cuando no hay coincidencia exacta de palabras clave.\n\nLa arquitectura típica incluye:\n- Base de datos vectorial (Pinecone, Weaviate, ChromaDB)\n- Modelo de embeddings (OpenAI, Cohere, local)\n- LLM para generación de respuestas\n- Sistema de ranking y reranking\n\n¿Necesitas detalles sobre algún componente específico?".to_string(),
            sources: vec![
                SourceRef::new("Arquitectura RAG", 1, 0.94),
                SourceRef::new("Bases de datos vectoriales", 2, 0.88),
            ],
        },
        AgentKey::Training => AskResponse {
            answer: "Según los materiales de capacitación disponibles:\n\nLos programas de formación efectivos deben incluir objetivos claros, contenido estructurado y evaluaciones que permitan medir el aprendizaje. La modalidad e-learning con plataformas como Moodle facilita el seguimiento y certificación.\n\nElementos clave de un buen programa:\n- Objetivos de aprendizaje medibles\n- Contenido multimedia e interactivo\n- Evaluaciones formativas y sumativas\n- Certificación y seguimiento\n- Integración con SENCE cuando aplique\n\n¿Te gustaría explorar algún aspecto específico de diseño instruccional?".to_string(),
            sources: vec![
                SourceRef::new("Diseño instruccional avanzado", 4, 0.93),
                SourceRef::new("Evaluación de aprendizaje", 3, 0.87),
                SourceRef::new("Plataformas LMS", 1, 0.82),
            ],
        },
    }
}

/// The canned answer for a raw agent key, falling back to `general`.
pub fn canned_response_for_key(question: &str, agent_key: &str) -> AskResponse {
    let agent = agent_key.parse().unwrap_or(AgentKey::General);
    canned_response(question, agent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn stub_waits_then_answers() {
        let stub = StubRetriever::new();
        let started = tokio::time::Instant::now();
        let response = stub
            .query("¿Qué dice la Ley Karin?", AgentKey::Hr, 5)
            .await
            .unwrap();
        assert!(started.elapsed() >= DEFAULT_STUB_DELAY);
        assert!(response.answer.contains("Ley Karin"));
        assert_eq!(response.sources.len(), 3);
    }

    #[test]
    fn general_answer_quotes_question() {
        let response = canned_response("vacaciones", AgentKey::General);
        assert!(response.answer.contains("\"vacaciones\""));
        assert_eq!(response.sources[0].filename.as_deref(), Some("Introducción a sistemas RAG"));
    }

    #[test]
    fn unknown_key_falls_back_to_general() {
        let fallback = canned_response_for_key("hola", "finance");
        assert_eq!(fallback, canned_response("hola", AgentKey::General));
    }

    #[test]
    fn every_agent_has_sources() {
        for agent in AgentKey::ALL {
            assert!(!canned_response("q", agent).sources.is_empty());
        }
    }
}
