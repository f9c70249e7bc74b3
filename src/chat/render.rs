//! Terminal output for the chat application.
//!
//! [`TerminalView`] is the [`ChatView`] used by the REPL. Answer markup is
//! mapped to ANSI styles when color is enabled and stripped otherwise.

use std::io::{self, Stdout, Write};

use crate::render::{ChatView, avatar, format_chunk, format_content_with, format_score, role_label};
use crate::types::{AGENTS, AgentKey, ChatSession, Message, Role};
use crate::utils::time::unix_millis;

/// ANSI escape code for bold text.
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code ending bold text.
const ANSI_NORMAL: &str = "\x1b[22m";

/// ANSI escape code for italic text.
const ANSI_ITALIC: &str = "\x1b[3m";

/// ANSI escape code ending italic text.
const ANSI_NO_ITALIC: &str = "\x1b[23m";

/// ANSI escape code for dim text (used for the loading line and sources).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for inline code).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for the default foreground.
const ANSI_DEFAULT_FG: &str = "\x1b[39m";

/// ANSI escape code for green text (used for the user label).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for magenta text (used for assistant labels).
const ANSI_MAGENTA: &str = "\x1b[35m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Return to column zero and clear the line.
const ANSI_ERASE_LINE: &str = "\r\x1b[2K";

/// Writes the chat transcript to a terminal.
///
/// The history sidebar has no terminal counterpart, so `refresh_history`
/// draws nothing; `/history` prints the list on demand via
/// [`format_history`].
pub struct TerminalView<W: Write = Stdout> {
    out: W,
    use_color: bool,
    loading: bool,
}

impl TerminalView<Stdout> {
    /// Creates a view on stdout with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a view on stdout with the specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self::with_writer(io::stdout(), use_color)
    }
}

impl Default for TerminalView<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> TerminalView<W> {
    /// Creates a view on an arbitrary writer.
    pub fn with_writer(out: W, use_color: bool) -> Self {
        Self {
            out,
            use_color,
            loading: false,
        }
    }

    /// Whether the loading line is currently shown.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        let _ = self.out.write_all(text.as_bytes());
    }

    fn flush(&mut self) {
        let _ = self.out.flush();
    }

    fn style(&self, code: &'static str) -> &'static str {
        if self.use_color { code } else { "" }
    }

    fn format_body(&self, content: &str) -> String {
        if self.use_color {
            format_content_with(
                content,
                (ANSI_BOLD, ANSI_NORMAL),
                (ANSI_ITALIC, ANSI_NO_ITALIC),
                (ANSI_CYAN, ANSI_DEFAULT_FG),
            )
        } else {
            format_content_with(content, ("", ""), ("", ""), ("`", "`"))
        }
    }

    fn clear_loading(&mut self) {
        if self.loading {
            let erase = if self.use_color { ANSI_ERASE_LINE } else { "\n" };
            self.emit(erase);
            self.loading = false;
        }
    }
}

impl<W: Write> ChatView for TerminalView<W> {
    fn show_welcome(&mut self) {
        self.clear_loading();
        let text = format!(
            "\n{}Nueva conversación.{} Escribe tu consulta o /help.\n",
            self.style(ANSI_BOLD),
            self.style(ANSI_RESET)
        );
        self.emit(&text);
        self.flush();
    }

    fn show_conversation(&mut self) {}

    fn render_message(&mut self, message: &Message) {
        self.clear_loading();
        let label_color = match message.role {
            Role::User => self.style(ANSI_GREEN),
            Role::Assistant if message.is_error => self.style(ANSI_RED),
            Role::Assistant => self.style(ANSI_MAGENTA),
        };
        let mut text = format!(
            "\n{label_color}{}[{}] {}{}\n{}\n",
            self.style(ANSI_BOLD),
            avatar(message.role),
            role_label(message),
            self.style(ANSI_RESET),
            self.format_body(&message.content),
        );
        let sources = message.sources();
        if !sources.is_empty() {
            text.push_str(&format!("{}📚 Fuentes consultadas\n", self.style(ANSI_DIM)));
            for source in sources {
                text.push_str(&format!(
                    "  - {} | Chunk {} | Score {}\n",
                    source.filename.as_deref().unwrap_or(""),
                    format_chunk(source),
                    format_score(source.score),
                ));
            }
            text.push_str(self.style(ANSI_RESET));
        }
        self.emit(&text);
        self.flush();
    }

    fn show_loading(&mut self, agent_name: &str) {
        if self.loading {
            return;
        }
        let text = format!(
            "{}{agent_name} está pensando...{}",
            self.style(ANSI_DIM),
            self.style(ANSI_RESET)
        );
        self.emit(&text);
        self.loading = true;
        self.flush();
    }

    fn remove_loading(&mut self) {
        self.clear_loading();
        self.flush();
    }

    fn refresh_history(&mut self, _sessions: &[ChatSession], _current: Option<&str>) {}

    fn scroll_to_bottom(&mut self) {
        self.flush();
    }

    fn print_info(&mut self, info: &str) {
        self.clear_loading();
        self.emit(&format!("{info}\n"));
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        self.clear_loading();
        let text = format!(
            "{}Error: {error}{}\n",
            self.style(ANSI_RED),
            self.style(ANSI_RESET)
        );
        self.emit(&text);
        self.flush();
    }
}

/// Formats the session list for `/history`, one numbered line per session.
pub fn format_history(sessions: &[ChatSession], current: Option<&str>) -> String {
    if sessions.is_empty() {
        return "No saved conversations.".to_string();
    }
    sessions
        .iter()
        .enumerate()
        .map(|(i, session)| {
            let marker = if Some(session.id.as_str()) == current {
                "*"
            } else {
                " "
            };
            format!(
                "{marker} {:>2}. {} [{}] ({}, {})",
                i + 1,
                session.title,
                session.agent,
                session.id,
                unix_millis(&session.timestamp),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Formats the agent catalog for `/agents`, marking the selected agent.
pub fn format_agents(selected: AgentKey) -> String {
    AGENTS
        .iter()
        .map(|agent| {
            let marker = if agent.key == selected { "*" } else { " " };
            format!("{marker} {:<10} {}", agent.key.as_str(), agent.display_name)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
