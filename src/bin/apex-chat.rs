//! Interactive chat against the Apex AI RAG backend.
//!
//! # Usage
//!
//! ```bash
//! # Backend on localhost:8000
//! apex-chat
//!
//! # Backend next to another host, over https
//! apex-chat --host intranet.apex.cl --https
//!
//! # Work without a backend
//! apex-chat --mock --agent hr
//!
//! # Disable colors (useful for piping output)
//! apex-chat --no-color
//! ```
//!
//! # Commands
//!
//! - `/new` - Start a new conversation
//! - `/agent <name>` - Select the agent
//! - `/history` - Show saved conversations
//! - `/load <id|number>` - Switch to a saved conversation
//! - `/help` - Show available commands
//! - `/quit` - Exit the application

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use apex_rag::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatController, TerminalView, apply_all, format_agents,
    format_history, help_text, parse_command,
};
use apex_rag::{ChatView, FileChatStore, RagClient, Retriever, StubRetriever};

/// Main entry point for the apex-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("apex-chat [OPTIONS]");

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("apex_rag=warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = ChatConfig::from_args(args)?;
    let store = match &config.store_path {
        Some(path) => FileChatStore::new(path),
        None => FileChatStore::default_location()?,
    };
    let store_path = store.path().display().to_string();

    let retriever: Box<dyn Retriever> = if config.use_stub {
        tracing::warn!("using canned answers; the backend is not contacted");
        Box::new(StubRetriever::with_delay(config.stub_delay))
    } else {
        Box::new(RagClient::with_options(
            Some(config.api_base_url.clone()),
            Some(config.request_timeout),
        )?)
    };

    let mut view = TerminalView::with_color(config.use_color);
    let mut chat = ChatController::new(config, store);
    let mut rl = DefaultEditor::new()?;

    println!(
        "Apex AI (backend: {}, agent: {})",
        chat.config().api_base_url,
        chat.selected_agent().agent().display_name
    );
    if chat.is_read_only() {
        view.print_error(&format!(
            "Could not read saved chats in {}; they are left untouched and this run will not be saved",
            store_path
        ));
    }
    println!("Type /help for commands, /quit to exit\n");

    loop {
        match rl.readline("Tú: ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("¡Hasta pronto!");
                            break;
                        }
                        ChatCommand::New => {
                            let commands = chat.new_session();
                            apply_all(&commands, &mut view);
                        }
                        ChatCommand::Agent(agent) => {
                            chat.select_agent(agent);
                            view.print_info(&format!(
                                "Agent set to: {}",
                                agent.agent().display_name
                            ));
                        }
                        ChatCommand::ListAgents => {
                            view.print_info(&format_agents(chat.selected_agent()));
                        }
                        ChatCommand::History => {
                            view.print_info(&format_history(
                                chat.sessions(),
                                chat.current_session_id(),
                            ));
                        }
                        ChatCommand::Load(reference) => match chat.resolve_session(&reference) {
                            Ok(id) => {
                                let commands = chat.load_session(&id);
                                apply_all(&commands, &mut view);
                                if let Some(session) = chat.current_session() {
                                    view.print_info(&format!("Loaded: {}", session.title));
                                }
                            }
                            Err(err) => view.print_error(&err.to_string()),
                        },
                        ChatCommand::ShowConfig => {
                            print_config(chat.config(), &store_path);
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Invalid(message) => {
                            view.print_error(&message);
                        }
                    }
                    continue;
                }

                chat.send_message(line, retriever.as_ref(), &mut view).await;
            }
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\n¡Hasta pronto!");
                break;
            }
            Err(err) => {
                view.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

fn print_config(config: &ChatConfig, store_path: &str) {
    println!("    Current Configuration:");
    println!("      Backend: {}", config.api_base_url);
    println!("      Top-k: {}", config.top_k);
    println!(
        "      Timeout: {:.1}s",
        config.request_timeout.as_secs_f64()
    );
    if config.use_stub {
        println!(
            "      Answers: canned ({} ms delay)",
            config.stub_delay.as_millis()
        );
    } else {
        println!("      Answers: backend");
    }
    println!("      Default agent: {}", config.default_agent);
    println!("      Session store: {}", store_path);
    println!(
        "      Colors: {}",
        if config.use_color { "on" } else { "off" }
    );
}
