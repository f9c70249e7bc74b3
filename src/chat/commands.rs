//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without sending questions
//! to the backend.

use crate::types::AgentKey;

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Start a new conversation.
    New,

    /// Select the agent used for the next conversation.
    Agent(AgentKey),

    /// List the agent catalog.
    ListAgents,

    /// Show the saved session list.
    History,

    /// Switch to a saved session, by id or by 1-based position in `/history`.
    Load(String),

    /// Show the current configuration.
    ShowConfig,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a valid command,
/// or `None` if it should be treated as a question.
///
/// # Examples
///
/// ```
/// # use apex_rag::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/agent hr").is_some());
/// assert!(parse_command("¿Qué es la Ley Karin?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input[1..].splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "new" | "clear" => ChatCommand::New,
        "agent" => match argument {
            Some(arg) => match arg.parse::<AgentKey>() {
                Ok(key) => ChatCommand::Agent(key),
                Err(err) => ChatCommand::Invalid(err),
            },
            None => ChatCommand::Invalid("/agent requires an agent name".to_string()),
        },
        "agents" => ChatCommand::ListAgents,
        "history" | "chats" => ChatCommand::History,
        "load" => match argument {
            Some(arg) => ChatCommand::Load(arg.to_string()),
            None => ChatCommand::Invalid("/load requires a session id or number".to_string()),
        },
        "config" => ChatCommand::ShowConfig,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /new                   Start a new conversation
  /agent <name>          Select the agent (general, hr, legal, technical, training)
  /agents                List available agents
  /history               Show saved conversations
  /load <id|number>      Switch to a saved conversation
  /config                Show current configuration
  /help                  Show this help message
  /quit                  Exit the chat"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("  /quit  "), Some(ChatCommand::Quit));
    }

    #[test]
    fn parse_new() {
        assert_eq!(parse_command("/new"), Some(ChatCommand::New));
        assert_eq!(parse_command("/NEW"), Some(ChatCommand::New));
        assert_eq!(parse_command("/clear"), Some(ChatCommand::New));
    }

    #[test]
    fn parse_agent() {
        assert_eq!(
            parse_command("/agent hr"),
            Some(ChatCommand::Agent(AgentKey::Hr))
        );
        assert_eq!(
            parse_command("/agent   Training  "),
            Some(ChatCommand::Agent(AgentKey::Training))
        );
        assert_eq!(
            parse_command("/agent"),
            Some(ChatCommand::Invalid(
                "/agent requires an agent name".to_string()
            ))
        );
        assert!(matches!(
            parse_command("/agent finance"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("Unknown agent")
        ));
    }

    #[test]
    fn parse_load() {
        assert_eq!(
            parse_command("/load chat_1_abc"),
            Some(ChatCommand::Load("chat_1_abc".to_string()))
        );
        assert_eq!(
            parse_command("/load 2"),
            Some(ChatCommand::Load("2".to_string()))
        );
        assert!(matches!(
            parse_command("/load"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("requires")
        ));
    }

    #[test]
    fn parse_listing_commands() {
        assert_eq!(parse_command("/agents"), Some(ChatCommand::ListAgents));
        assert_eq!(parse_command("/history"), Some(ChatCommand::History));
        assert_eq!(parse_command("/config"), Some(ChatCommand::ShowConfig));
        assert_eq!(parse_command("/?"), Some(ChatCommand::Help));
    }

    #[test]
    fn unknown_command() {
        assert_eq!(
            parse_command("/model gpt-4"),
            Some(ChatCommand::Invalid("Unknown command: /model".to_string()))
        );
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("Hola, ¿cómo estás?"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("  "), None);
    }

    #[test]
    fn help_text_not_empty() {
        let help = help_text();
        assert!(help.contains("/quit"));
        assert!(help.contains("/new"));
        assert!(help.contains("/agent"));
        assert!(help.contains("/load"));
    }
}
