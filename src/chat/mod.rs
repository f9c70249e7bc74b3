//! Chat application module for conversations with the RAG backend.
//!
//! This module provides the session controller and a REPL-oriented
//! terminal front end built on top of the apex-rag client library. It
//! supports:
//!
//! - A session list persisted through a [`ChatStore`](crate::ChatStore)
//! - Per-agent loading labels and canned stub answers
//! - ANSI-styled answers with cited sources
//! - Slash commands for session control
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`controller`]: session state machine producing render commands
//! - [`commands`]: Slash command parsing
//! - [`render`]: terminal display target

pub mod commands;
pub mod config;
pub mod controller;
pub mod render;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, ChatConfigFile};
pub use controller::{ChatController, PendingQuery, RenderCommand, SessionState, apply_all};
pub use render::{TerminalView, format_agents, format_history};
