//! Message formatting and display targets.
//!
//! [`format_content`] turns the light markup used in answers into HTML.
//! [`ChatView`] is the display target driven by the chat controller;
//! [`HtmlView`] builds the HTML fragments of the browser screen. The
//! terminal implementation lives in `chat::render`.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{Agent, ChatSession, Message, RAG_AGENT_TAG, Role, SourceRef};

/// Role label for the user's own messages.
pub const USER_LABEL: &str = "Tú";

/// Role label for answers produced by the RAG backend.
pub const RAG_LABEL: &str = "Apex AI (RAG)";

/// Role label when the message's agent is not in the catalog.
pub const FALLBACK_LABEL: &str = "Asistente";

/// CSS class marking the transient loading block.
pub const LOADING_CLASS: &str = "loading";

static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());
static ITALIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*(.*?)\*").unwrap());
static CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`(.*?)`").unwrap());

/// Converts the markup subset into HTML.
///
/// Rules run in order: newline to `<br>`, `**x**` to bold, `*x*` to italic,
/// `` `x` `` to inline code. Each rule is one global, left-to-right,
/// non-overlapping pass. Nothing is escaped.
pub fn format_content(content: &str) -> String {
    let text = content.replace('\n', "<br>");
    let text = BOLD.replace_all(&text, "<strong>$1</strong>");
    let text = ITALIC.replace_all(&text, "<em>$1</em>");
    CODE.replace_all(&text, "<code>$1</code>").into_owned()
}

/// Applies the same rules as [`format_content`] with caller-chosen markers.
///
/// Newlines are left in place.
pub fn format_content_with(
    content: &str,
    bold: (&str, &str),
    italic: (&str, &str),
    code: (&str, &str),
) -> String {
    let text = BOLD.replace_all(content, format!("{}${{1}}{}", bold.0, bold.1).as_str());
    let text = ITALIC.replace_all(&text, format!("{}${{1}}{}", italic.0, italic.1).as_str());
    CODE.replace_all(&text, format!("{}${{1}}{}", code.0, code.1).as_str())
        .into_owned()
}

/// Avatar marker for a role.
pub fn avatar(role: Role) -> &'static str {
    match role {
        Role::User => "TÚ",
        Role::Assistant => "AI",
    }
}

/// The label shown above a message.
pub fn role_label(message: &Message) -> &'static str {
    match message.role {
        Role::User => USER_LABEL,
        Role::Assistant => match message.agent.as_deref() {
            Some(RAG_AGENT_TAG) => RAG_LABEL,
            Some(key) => Agent::lookup(key)
                .map(|agent| agent.display_name)
                .unwrap_or(FALLBACK_LABEL),
            None => FALLBACK_LABEL,
        },
    }
}

/// A similarity score as a percentage with one decimal, e.g. `87.0%`.
pub fn format_score(score: f64) -> String {
    format!("{:.1}%", score * 100.0)
}

/// The chunk index of a source, `-` when the backend did not send one.
pub fn format_chunk(source: &SourceRef) -> String {
    source
        .chunk_index
        .map(|i| i.to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Renders one message as the HTML block of the chat screen.
pub fn render_message_html(message: &Message) -> String {
    let mut html = format!(
        "<div class=\"message {role}\"><div class=\"message-header\"><div class=\"message-avatar\">{avatar}</div><div class=\"message-role\">{label}</div></div><div class=\"message-content\">{content}</div>",
        role = message.role.as_str(),
        avatar = avatar(message.role),
        label = role_label(message),
        content = format_content(&message.content),
    );
    let sources = message.sources();
    if !sources.is_empty() {
        html.push_str("<div class=\"rag-sources\"><div class=\"rag-sources-title\">📚 Fuentes consultadas</div>");
        for source in sources {
            html.push_str(&format!(
                "<div class=\"source-item\"><span><strong>{}</strong></span><span>Chunk {}</span><span>Score {}</span></div>",
                source.filename.as_deref().unwrap_or(""),
                format_chunk(source),
                format_score(source.score),
            ));
        }
        html.push_str("</div>");
    }
    html.push_str("</div>");
    html
}

/// Renders the loading placeholder shown while a query is pending.
pub fn render_loading_html(agent_name: &str) -> String {
    format!(
        "<div class=\"message assistant {LOADING_CLASS}\"><div class=\"message-header\"><div class=\"message-avatar\">AI</div><div class=\"message-role\">{agent_name}</div></div><div class=\"message-content\"><div class=\"loading-indicator\"><div class=\"loading-dot\"></div><div class=\"loading-dot\"></div><div class=\"loading-dot\"></div></div></div></div>"
    )
}

/// Renders the chat-history sidebar, highlighting the current session.
pub fn render_history_html(sessions: &[ChatSession], current: Option<&str>) -> String {
    sessions
        .iter()
        .map(|session| {
            let class = if Some(session.id.as_str()) == current {
                "chat-history-item active"
            } else {
                "chat-history-item"
            };
            format!(
                "<div class=\"{class}\" data-chat-id=\"{}\"><div class=\"chat-title\">{}</div></div>",
                session.id, session.title
            )
        })
        .collect()
}

/// A display target for the chat screen.
///
/// The chat controller never touches output directly; it emits render
/// commands that are applied to a view.
pub trait ChatView {
    /// Show the empty/welcome state and clear the transcript.
    fn show_welcome(&mut self);

    /// Switch from the welcome state to the transcript.
    fn show_conversation(&mut self);

    /// Append a message block.
    fn render_message(&mut self, message: &Message);

    /// Append the loading placeholder labelled with `agent_name`.
    fn show_loading(&mut self, agent_name: &str);

    /// Remove the loading placeholder; a no-op when there is none.
    fn remove_loading(&mut self);

    /// Redraw the session list with `current` highlighted.
    fn refresh_history(&mut self, sessions: &[ChatSession], current: Option<&str>);

    /// Bring the newest message into view.
    fn scroll_to_bottom(&mut self);

    /// Print an informational message outside the transcript.
    fn print_info(&mut self, info: &str);

    /// Print an error message outside the transcript.
    fn print_error(&mut self, error: &str);
}

/// One block of the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlBlock {
    /// CSS classes of the block's root element.
    pub class: String,
    /// The rendered markup.
    pub html: String,
}

impl HtmlBlock {
    /// Returns true for the loading placeholder.
    pub fn is_loading(&self) -> bool {
        self.class.split(' ').any(|c| c == LOADING_CLASS)
    }
}

/// Builds the chat screen as HTML fragments.
#[derive(Debug, Clone)]
pub struct HtmlView {
    blocks: Vec<HtmlBlock>,
    history: String,
    welcome_visible: bool,
    scrolled: usize,
    notices: Vec<String>,
}

impl HtmlView {
    /// Creates a view showing the welcome state.
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            history: String::new(),
            welcome_visible: true,
            scrolled: 0,
            notices: Vec::new(),
        }
    }

    /// Transcript blocks in display order.
    pub fn blocks(&self) -> &[HtmlBlock] {
        &self.blocks
    }

    /// Number of loading placeholders currently shown.
    pub fn loading_count(&self) -> usize {
        self.blocks.iter().filter(|b| b.is_loading()).count()
    }

    /// Whether the welcome state is showing.
    pub fn welcome_visible(&self) -> bool {
        self.welcome_visible
    }

    /// The rendered session list.
    pub fn history_html(&self) -> &str {
        &self.history
    }

    /// How many times the view was scrolled to the newest message.
    pub fn scroll_count(&self) -> usize {
        self.scrolled
    }

    /// Informational and error notices, in order.
    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    /// The transcript as one HTML fragment.
    pub fn transcript_html(&self) -> String {
        self.blocks.iter().map(|b| b.html.as_str()).collect()
    }
}

impl Default for HtmlView {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatView for HtmlView {
    fn show_welcome(&mut self) {
        self.welcome_visible = true;
        self.blocks.clear();
    }

    fn show_conversation(&mut self) {
        self.welcome_visible = false;
    }

    fn render_message(&mut self, message: &Message) {
        self.blocks.push(HtmlBlock {
            class: format!("message {}", message.role.as_str()),
            html: render_message_html(message),
        });
    }

    fn show_loading(&mut self, agent_name: &str) {
        if self.loading_count() > 0 {
            return;
        }
        self.blocks.push(HtmlBlock {
            class: format!("message assistant {LOADING_CLASS}"),
            html: render_loading_html(agent_name),
        });
    }

    fn remove_loading(&mut self) {
        if let Some(index) = self.blocks.iter().position(|b| b.is_loading()) {
            self.blocks.remove(index);
        }
    }

    fn refresh_history(&mut self, sessions: &[ChatSession], current: Option<&str>) {
        self.history = render_history_html(sessions, current);
    }

    fn scroll_to_bottom(&mut self) {
        self.scrolled += 1;
    }

    fn print_info(&mut self, info: &str) {
        self.notices.push(info.to_string());
    }

    fn print_error(&mut self, error: &str) {
        self.notices.push(format!("Error: {error}"));
    }
}
