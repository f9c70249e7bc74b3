//! Chat session state machine.
//!
//! [`ChatController`] owns the session list, the current session's message
//! log and the selected agent. Its transitions are plain methods that
//! return [`RenderCommand`]s; nothing here touches a display directly.
//! [`ChatController::send_message`] is the one async entry point: it runs
//! [`ChatController::begin_send`], awaits the retriever, then runs
//! [`ChatController::complete_send`], applying each batch of commands to a
//! [`ChatView`].

use crate::chat::config::ChatConfig;
use crate::error::{Error, Result};
use crate::observability::{CHAT_FAILED_EXCHANGES, CHAT_MESSAGES, CHAT_SESSIONS_CREATED};
use crate::render::ChatView;
use crate::retriever::Retriever;
use crate::storage::ChatStore;
use crate::types::{
    AgentKey, AskResponse, ChatSession, DEFAULT_TITLE, Message, derive_title, generate_session_id,
};
use crate::utils::time::now_millis;

/// A display update produced by a controller transition.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    /// Clear the transcript and show the welcome screen.
    ShowWelcome,
    /// Hide the welcome screen.
    ShowConversation,
    /// Append a message to the transcript.
    RenderMessage(Message),
    /// Show the "thinking" placeholder for an agent.
    ShowLoading {
        /// Display name shown on the placeholder.
        agent_name: String,
    },
    /// Remove the placeholder if one is shown.
    RemoveLoading,
    /// Redraw the session list.
    RefreshHistory {
        /// Sessions, most recent first.
        sessions: Vec<ChatSession>,
        /// Id of the highlighted session.
        current: Option<String>,
    },
    /// Bring the newest message into view.
    ScrollToBottom,
}

impl RenderCommand {
    /// Performs this command on `view`.
    pub fn apply(&self, view: &mut dyn ChatView) {
        match self {
            RenderCommand::ShowWelcome => view.show_welcome(),
            RenderCommand::ShowConversation => view.show_conversation(),
            RenderCommand::RenderMessage(message) => view.render_message(message),
            RenderCommand::ShowLoading { agent_name } => view.show_loading(agent_name),
            RenderCommand::RemoveLoading => view.remove_loading(),
            RenderCommand::RefreshHistory { sessions, current } => {
                view.refresh_history(sessions, current.as_deref())
            }
            RenderCommand::ScrollToBottom => view.scroll_to_bottom(),
        }
    }
}

/// Performs `commands` on `view` in order.
pub fn apply_all(commands: &[RenderCommand], view: &mut dyn ChatView) {
    for command in commands {
        command.apply(view);
    }
}

/// Where the controller is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    /// Nothing has been started or loaded yet.
    #[default]
    NoActiveSession,
    /// A session is current.
    Active {
        /// Id of the current session.
        session_id: String,
        /// In-memory log of the current session.
        messages: Vec<Message>,
    },
}

/// A question that has been recorded and is waiting for an answer.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingQuery {
    /// Session the question was asked in.
    pub session_id: String,
    /// The trimmed question text.
    pub question: String,
    /// Agent selected when the question was asked.
    pub agent: AgentKey,
    /// Chunks to retrieve.
    pub top_k: u32,
}

/// Drives one chat front end.
///
/// Configuration is fixed at construction. Controllers share nothing, so
/// several can run side by side against different stores.
pub struct ChatController<S: ChatStore> {
    config: ChatConfig,
    store: S,
    sessions: Vec<ChatSession>,
    state: SessionState,
    selected_agent: AgentKey,
    read_only: bool,
}

impl<S: ChatStore> ChatController<S> {
    /// Creates a controller, reading the session list from `store`.
    ///
    /// A list that cannot be read is logged and replaced by an empty one.
    /// The controller then never saves, so the unreadable list is left as
    /// it was found.
    pub fn new(config: ChatConfig, store: S) -> Self {
        let (sessions, read_only) = match store.load() {
            Ok(sessions) => (sessions, false),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "could not load saved chats; starting empty and not saving this run"
                );
                (Vec::new(), true)
            }
        };
        tracing::debug!(count = sessions.len(), "loaded chat sessions");
        let selected_agent = config.default_agent;
        Self {
            config,
            store,
            sessions,
            state: SessionState::NoActiveSession,
            selected_agent,
            read_only,
        }
    }

    /// True when the stored list could not be read and saves are skipped.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// The configuration this controller was built with.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// All known sessions, most recent first.
    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    /// The lifecycle state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Id of the current session.
    pub fn current_session_id(&self) -> Option<&str> {
        match &self.state {
            SessionState::NoActiveSession => None,
            SessionState::Active { session_id, .. } => Some(session_id),
        }
    }

    /// Summary of the current session, if it is in the list.
    pub fn current_session(&self) -> Option<&ChatSession> {
        let id = self.current_session_id()?;
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Message log of the current session.
    pub fn messages(&self) -> &[Message] {
        match &self.state {
            SessionState::NoActiveSession => &[],
            SessionState::Active { messages, .. } => messages,
        }
    }

    /// The agent used for new sessions and the loading label.
    pub fn selected_agent(&self) -> AgentKey {
        self.selected_agent
    }

    /// Changes the selected agent. Existing sessions keep their agent.
    pub fn select_agent(&mut self, agent: AgentKey) {
        tracing::debug!(%agent, "agent selected");
        self.selected_agent = agent;
    }

    /// Starts a fresh session and makes it current.
    pub fn new_session(&mut self) -> Vec<RenderCommand> {
        let now = now_millis();
        let id = generate_session_id(&now);
        tracing::info!(session_id = %id, agent = %self.selected_agent, "new chat session");
        self.sessions
            .insert(0, ChatSession::new(id.clone(), self.selected_agent, now));
        self.state = SessionState::Active {
            session_id: id,
            messages: Vec::new(),
        };
        CHAT_SESSIONS_CREATED.click();
        self.persist();
        vec![self.refresh_history(), RenderCommand::ShowWelcome]
    }

    /// Makes `session_id` current with an empty transcript.
    ///
    /// Only summaries are stored, so prior messages are not restored. Ids
    /// that are not in the list are accepted as-is.
    pub fn load_session(&mut self, session_id: &str) -> Vec<RenderCommand> {
        if !self.sessions.iter().any(|s| s.id == session_id) {
            tracing::debug!(session_id, "loading a session that is not in the list");
        }
        self.state = SessionState::Active {
            session_id: session_id.to_string(),
            messages: Vec::new(),
        };
        vec![self.refresh_history(), RenderCommand::ShowWelcome]
    }

    /// Records a user question and returns the query to run.
    ///
    /// Returns `None` when `text` is blank. Starts a session when none is
    /// current. The first message of an untitled session becomes its title.
    pub fn begin_send(&mut self, text: &str) -> Option<(PendingQuery, Vec<RenderCommand>)> {
        let question = text.trim();
        if question.is_empty() {
            return None;
        }
        let mut commands = Vec::new();
        if matches!(self.state, SessionState::NoActiveSession) {
            commands.extend(self.new_session());
        }
        let SessionState::Active {
            session_id,
            messages,
        } = &mut self.state
        else {
            return None;
        };
        let session_id = session_id.clone();

        let message = Message::user(question);
        messages.push(message.clone());
        let first_message = messages.len() == 1;
        CHAT_MESSAGES.click();
        commands.push(RenderCommand::ShowConversation);
        commands.push(RenderCommand::RenderMessage(message));

        if first_message
            && let Some(session) = self
                .sessions
                .iter_mut()
                .find(|s| s.id == session_id && s.title == DEFAULT_TITLE)
        {
            session.title = derive_title(question);
            self.persist();
            commands.push(self.refresh_history());
        }

        commands.push(RenderCommand::ShowLoading {
            agent_name: self.selected_agent.agent().display_name.to_string(),
        });
        let pending = PendingQuery {
            session_id,
            question: question.to_string(),
            agent: self.selected_agent,
            top_k: self.config.top_k,
        };
        Some((pending, commands))
    }

    /// Records the outcome of a query started by [`Self::begin_send`].
    ///
    /// The answer goes to whatever session is current now. A successful
    /// answer is persisted as the session's last message; a failure is
    /// shown as an apology and the stored list is left untouched.
    pub fn complete_send(
        &mut self,
        pending: PendingQuery,
        result: Result<AskResponse>,
    ) -> Vec<RenderCommand> {
        let mut commands = vec![RenderCommand::RemoveLoading];
        let succeeded = result.is_ok();
        let message = match result {
            Ok(response) => Message::rag_answer(response.answer, response.sources),
            Err(err) => {
                CHAT_FAILED_EXCHANGES.click();
                tracing::error!(
                    error = %err,
                    session_id = %pending.session_id,
                    "error querying RAG backend"
                );
                Message::error_notice()
            }
        };
        if let SessionState::Active { messages, .. } = &mut self.state {
            messages.push(message.clone());
        }
        commands.push(RenderCommand::RenderMessage(message.clone()));

        if succeeded {
            self.record_last_message(message);
            commands.push(self.refresh_history());
        }
        commands.push(RenderCommand::ScrollToBottom);
        commands
    }

    /// Sends `text` through `retriever`, updating `view` as it goes.
    ///
    /// Returns false when `text` was blank and nothing was sent.
    pub async fn send_message(
        &mut self,
        text: &str,
        retriever: &dyn Retriever,
        view: &mut dyn ChatView,
    ) -> bool {
        let Some((pending, commands)) = self.begin_send(text) else {
            return false;
        };
        apply_all(&commands, view);
        let result = retriever
            .query(&pending.question, pending.agent, pending.top_k)
            .await;
        let commands = self.complete_send(pending, result);
        apply_all(&commands, view);
        true
    }

    /// Resolves a `/load` argument: a session id or a 1-based list position.
    pub fn resolve_session(&self, reference: &str) -> Result<String> {
        if let Some(session) = self.sessions.iter().find(|s| s.id == reference) {
            return Ok(session.id.clone());
        }
        match reference.parse::<usize>() {
            Ok(index) if (1..=self.sessions.len()).contains(&index) => {
                Ok(self.sessions[index - 1].id.clone())
            }
            Ok(_) => Err(Error::not_found(
                format!("no session at position {}", reference),
                Some(reference.to_string()),
            )),
            Err(_) => Ok(reference.to_string()),
        }
    }

    fn record_last_message(&mut self, message: Message) {
        let Some(id) = self.current_session_id().map(str::to_string) else {
            return;
        };
        if let Some(session) = self.sessions.iter_mut().find(|s| s.id == id) {
            session.timestamp = now_millis();
            session.last_message = Some(message);
            self.persist();
        }
    }

    fn refresh_history(&self) -> RenderCommand {
        RenderCommand::RefreshHistory {
            sessions: self.sessions.clone(),
            current: self.current_session_id().map(str::to_string),
        }
    }

    fn persist(&self) {
        if self.read_only {
            tracing::debug!("store is read-only for this run; skipping save");
            return;
        }
        if let Err(err) = self.store.save(&self.sessions) {
            tracing::warn!(error = %err, "could not save chats");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::render::HtmlView;
    use crate::storage::MemoryChatStore;
    use crate::types::{ERROR_NOTICE, RAG_AGENT_TAG, Role, SourceRef};

    struct FixedRetriever {
        calls: AtomicUsize,
        outcome: Mutex<Option<Result<AskResponse>>>,
    }

    impl FixedRetriever {
        fn answering(answer: &str, sources: Vec<SourceRef>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                outcome: Mutex::new(Some(Ok(AskResponse {
                    answer: answer.to_string(),
                    sources,
                }))),
            }
        }

        fn failing(err: Error) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                outcome: Mutex::new(Some(Err(err))),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Retriever for FixedRetriever {
        async fn query(&self, _: &str, _: AgentKey, _: u32) -> Result<AskResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome
                .lock()
                .unwrap()
                .take()
                .expect("retriever queried more than once")
        }
    }

    struct BrokenStore;

    impl ChatStore for BrokenStore {
        fn load(&self) -> Result<Vec<ChatSession>> {
            Err(Error::persistence("disk gone", None))
        }

        fn save(&self, _: &[ChatSession]) -> Result<()> {
            Err(Error::persistence("disk gone", None))
        }
    }

    fn controller() -> ChatController<MemoryChatStore> {
        ChatController::new(ChatConfig::new(), MemoryChatStore::new())
    }

    #[tokio::test]
    async fn send_appends_trimmed_user_message() {
        let mut chat = controller();
        let retriever = FixedRetriever::answering("ok", vec![]);
        let mut view = HtmlView::new();
        assert!(chat.send_message("  hola  ", &retriever, &mut view).await);
        let users: Vec<_> = chat
            .messages()
            .iter()
            .filter(|m| m.role == Role::User)
            .collect();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].content, "hola");
    }

    #[tokio::test]
    async fn blank_input_is_a_no_op() {
        let mut chat = controller();
        let retriever = FixedRetriever::answering("ok", vec![]);
        let mut view = HtmlView::new();
        assert!(!chat.send_message("", &retriever, &mut view).await);
        assert!(!chat.send_message("   ", &retriever, &mut view).await);
        assert_eq!(retriever.calls(), 0);
        assert!(chat.messages().is_empty());
        assert!(chat.current_session_id().is_none());
        assert!(!chat.store().is_populated());
    }

    #[test]
    fn first_message_sets_title() {
        let mut chat = controller();
        let (pending, _) = chat.begin_send("¿Qué es la Ley Karin?").unwrap();
        chat.complete_send(pending, Ok(AskResponse::default()));
        let (pending, _) = chat.begin_send("Y sus sanciones").unwrap();
        chat.complete_send(pending, Ok(AskResponse::default()));
        assert_eq!(chat.sessions()[0].title, "¿Qué es la Ley Karin?");
        assert_eq!(chat.store().load().unwrap()[0].title, "¿Qué es la Ley Karin?");
    }

    #[test]
    fn long_first_message_is_truncated() {
        let mut chat = controller();
        let text = "a".repeat(51);
        chat.begin_send(&text).unwrap();
        assert_eq!(chat.sessions()[0].title, format!("{}...", "a".repeat(50)));

        let mut chat = controller();
        let text = "b".repeat(50);
        chat.begin_send(&text).unwrap();
        assert_eq!(chat.sessions()[0].title, text);
    }

    #[tokio::test]
    async fn success_appends_rag_answer_and_persists() {
        let mut chat = controller();
        let sources = vec![
            SourceRef::new("ley_karin.pdf", 2, 0.95),
            SourceRef::new("protocolo.pdf", 1, 0.89),
        ];
        let retriever = FixedRetriever::answering("La Ley Karin...", sources.clone());
        let mut view = HtmlView::new();
        chat.send_message("Ley Karin", &retriever, &mut view).await;

        let assistant: Vec<_> = chat
            .messages()
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .collect();
        assert_eq!(assistant.len(), 1);
        assert_eq!(assistant[0].agent.as_deref(), Some(RAG_AGENT_TAG));
        assert_eq!(assistant[0].sources(), sources.as_slice());

        let stored = chat.store().load().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].last_message.as_ref(), Some(assistant[0]));
        assert_eq!(stored[0].timestamp, chat.sessions()[0].timestamp);
        assert_eq!(view.loading_count(), 0);
        assert_eq!(view.blocks().len(), 2);
    }

    #[tokio::test]
    async fn failure_appends_notice_and_leaves_store_unchanged() {
        let mut chat = controller();
        let mut view = HtmlView::new();
        let ok = FixedRetriever::answering("primera", vec![]);
        chat.send_message("uno", &ok, &mut view).await;
        let before = chat.store().load().unwrap();

        let failing =
            FixedRetriever::failing(Error::retrieval("backend query failed", Some(500), None));
        chat.send_message("dos", &failing, &mut view).await;

        let last = chat.messages().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert!(last.is_error);
        assert_eq!(last.content, ERROR_NOTICE);
        assert_eq!(chat.messages().iter().filter(|m| m.is_error).count(), 1);
        assert_eq!(chat.store().load().unwrap(), before);
        assert_eq!(view.loading_count(), 0);
    }

    #[test]
    fn failed_first_exchange_keeps_title() {
        let mut chat = controller();
        let (pending, _) = chat.begin_send("hola").unwrap();
        let commands =
            chat.complete_send(pending, Err(Error::retrieval("unreachable", None, None)));
        assert_eq!(commands.first(), Some(&RenderCommand::RemoveLoading));
        assert_eq!(commands.last(), Some(&RenderCommand::ScrollToBottom));
        let stored = chat.store().load().unwrap();
        assert_eq!(stored[0].title, "hola");
        assert!(stored[0].last_message.is_none());
    }

    #[test]
    fn new_sessions_are_most_recent_first() {
        let mut chat = controller();
        chat.new_session();
        let first = chat.current_session_id().unwrap().to_string();
        chat.new_session();
        let second = chat.current_session_id().unwrap().to_string();
        chat.new_session();
        let third = chat.current_session_id().unwrap().to_string();
        let ids: Vec<_> = chat
            .store()
            .load()
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![third, second, first]);
    }

    #[test]
    fn new_session_commands() {
        let mut chat = controller();
        let commands = chat.new_session();
        assert_eq!(commands.len(), 2);
        assert!(matches!(
            &commands[0],
            RenderCommand::RefreshHistory { sessions, current }
                if sessions.len() == 1 && current.as_deref() == chat.current_session_id()
        ));
        assert_eq!(commands[1], RenderCommand::ShowWelcome);
    }

    #[test]
    fn agent_change_does_not_alter_existing_session() {
        let mut chat = controller();
        chat.new_session();
        chat.select_agent(AgentKey::Legal);
        assert_eq!(chat.sessions()[0].agent, AgentKey::General);
        assert_eq!(chat.store().load().unwrap()[0].agent, AgentKey::General);
        chat.new_session();
        assert_eq!(chat.sessions()[0].agent, AgentKey::Legal);
    }

    #[test]
    fn loading_label_uses_selected_agent() {
        let mut chat = controller();
        chat.select_agent(AgentKey::Hr);
        let (_, commands) = chat.begin_send("vacaciones").unwrap();
        assert!(commands.contains(&RenderCommand::ShowLoading {
            agent_name: "HR Specialist".to_string()
        }));
    }

    #[test]
    fn load_session_clears_to_welcome() {
        let mut chat = controller();
        let (pending, _) = chat.begin_send("primera").unwrap();
        chat.complete_send(pending, Ok(AskResponse::default()));
        let old = chat.current_session_id().unwrap().to_string();
        chat.new_session();

        let commands = chat.load_session(&old);
        assert_eq!(chat.current_session_id(), Some(old.as_str()));
        assert!(chat.messages().is_empty());
        assert_eq!(commands.last(), Some(&RenderCommand::ShowWelcome));

        chat.begin_send("otra pregunta").unwrap();
        assert_eq!(chat.current_session().unwrap().title, "primera");
    }

    #[test]
    fn load_session_accepts_unknown_id() {
        let mut chat = controller();
        chat.load_session("chat_0_missing");
        assert_eq!(chat.current_session_id(), Some("chat_0_missing"));
        assert!(chat.current_session().is_none());
        let (pending, _) = chat.begin_send("hola").unwrap();
        chat.complete_send(pending, Ok(AskResponse::default()));
        assert!(chat.sessions().is_empty());
    }

    #[test]
    fn resolve_session_by_id_or_position() {
        let mut chat = controller();
        chat.new_session();
        chat.new_session();
        let newest = chat.sessions()[0].id.clone();
        let oldest = chat.sessions()[1].id.clone();
        assert_eq!(chat.resolve_session("1").unwrap(), newest);
        assert_eq!(chat.resolve_session(&oldest).unwrap(), oldest);
        assert!(chat.resolve_session("3").unwrap_err().is_not_found());
        assert_eq!(chat.resolve_session("chat_x").unwrap(), "chat_x");
    }

    #[test]
    fn store_failures_do_not_stop_the_chat() {
        let mut chat = ChatController::new(ChatConfig::new(), BrokenStore);
        assert!(chat.sessions().is_empty());
        let (pending, _) = chat.begin_send("hola").unwrap();
        chat.complete_send(pending, Ok(AskResponse::default()));
        assert_eq!(chat.sessions()[0].title, "hola");
        assert_eq!(chat.messages().len(), 2);
    }

    #[test]
    fn unreadable_store_is_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apex_ai_chats.json");
        let saved = r#"[
            {"id":"chat_1_a","title":"Ley Karin","timestamp":1,"agent":"hr","lastMessage":null},
            {"id":"chat_2_b","title":"Presupuesto","timestamp":2,"agent":"finance","lastMessage":null}
        ]"#;
        std::fs::write(&path, saved).unwrap();

        let mut chat = ChatController::new(ChatConfig::new(), crate::FileChatStore::new(&path));
        assert!(chat.is_read_only());
        assert!(chat.sessions().is_empty());
        chat.new_session();
        let (pending, _) = chat.begin_send("hola").unwrap();
        chat.complete_send(pending, Ok(AskResponse::default()));

        assert_eq!(chat.sessions().len(), 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), saved);
    }

    #[test]
    fn readable_store_is_writable() {
        let chat = controller();
        assert!(!chat.is_read_only());
    }

    #[test]
    fn controllers_are_independent() {
        let mut a = ChatController::new(
            ChatConfig::new().with_default_agent(AgentKey::Technical),
            MemoryChatStore::new(),
        );
        let b = controller();
        a.new_session();
        assert_eq!(a.sessions().len(), 1);
        assert!(b.sessions().is_empty());
        assert_eq!(a.selected_agent(), AgentKey::Technical);
        assert_eq!(b.selected_agent(), AgentKey::General);
    }

    #[test]
    fn pending_query_carries_config_top_k() {
        let mut chat = ChatController::new(ChatConfig::new().with_top_k(9), MemoryChatStore::new());
        let (pending, _) = chat.begin_send("  pregunta ").unwrap();
        assert_eq!(pending.question, "pregunta");
        assert_eq!(pending.top_k, 9);
        assert_eq!(pending.agent, AgentKey::General);
    }
}
