//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg`, an optional YAML
//! configuration file, and the resolved [`ChatConfig`] injected into the
//! chat controller.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use arrrg_derive::CommandLine;
use serde::{Deserialize, Serialize};

use crate::client::{API_URL_ENV, normalize_base_url, resolve_api_base_url};
use crate::error::{Error, Result};
use crate::retriever::DEFAULT_STUB_DELAY;
use crate::types::{AgentKey, DEFAULT_TOP_K};

/// Default per-request timeout for backend queries.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Command-line arguments for the apex-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Backend base URL.
    #[arrrg(optional, "Backend base URL (default: http://<host>:8000/api)", "URL")]
    pub api_url: Option<String>,

    /// Host the backend is co-located with.
    #[arrrg(optional, "Backend host when no URL is given (default: localhost)", "HOST")]
    pub host: Option<String>,

    /// Use https when deriving the URL from the host.
    #[arrrg(flag, "Use https when deriving the backend URL from the host")]
    pub https: bool,

    /// Number of chunks to retrieve per question.
    #[arrrg(optional, "Chunks retrieved per question (default: 5)", "N")]
    pub top_k: Option<u32>,

    /// Per-request timeout in seconds.
    #[arrrg(optional, "Backend request timeout in seconds (default: 30)", "SECONDS")]
    pub timeout: Option<u64>,

    /// Answer from canned responses instead of the backend.
    #[arrrg(flag, "Answer from canned responses instead of the backend")]
    pub mock: bool,

    /// Delay applied to canned responses.
    #[arrrg(optional, "Delay for canned responses in milliseconds (default: 1500)", "MS")]
    pub mock_delay_ms: Option<u64>,

    /// Session list file.
    #[arrrg(optional, "Session list file (default: data dir)", "PATH")]
    pub store: Option<String>,

    /// Agent selected at startup.
    #[arrrg(optional, "Agent: general, hr, legal, technical, training", "AGENT")]
    pub agent: Option<String>,

    /// YAML configuration file.
    #[arrrg(optional, "YAML configuration file", "PATH")]
    pub config: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Contents of a YAML configuration file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatConfigFile {
    /// Backend base URL.
    pub api_url: Option<String>,
    /// Backend host when no URL is given.
    pub host: Option<String>,
    /// Use https when deriving the URL from the host.
    pub https: Option<bool>,
    /// Chunks retrieved per question.
    pub top_k: Option<u32>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Answer from canned responses.
    pub mock: Option<bool>,
    /// Canned response delay in milliseconds.
    pub mock_delay_ms: Option<u64>,
    /// Session list file.
    pub store: Option<PathBuf>,
    /// Agent selected at startup.
    pub agent: Option<AgentKey>,
    /// Whether to use ANSI colors.
    pub color: Option<bool>,
}

impl ChatConfigFile {
    /// Reads a configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|err| Error::io(format!("failed to read {}", path.display()), err))?;
        Ok(serde_yaml::from_str(&content)?)
    }
}

/// Resolved configuration for a chat controller.
///
/// Built once at startup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Backend base URL, without a trailing slash.
    pub api_base_url: String,

    /// Chunks retrieved per question.
    pub top_k: u32,

    /// Per-request timeout for backend queries.
    pub request_timeout: Duration,

    /// Answer from canned responses instead of the backend.
    pub use_stub: bool,

    /// Delay applied to canned responses.
    pub stub_delay: Duration,

    /// Session list file; `None` means the default data-dir location.
    pub store_path: Option<PathBuf>,

    /// Agent selected at startup.
    pub default_agent: AgentKey,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Backend: http://localhost:8000/api
    /// - Top-k: 5
    /// - Timeout: 30 seconds
    /// - Stub: disabled, 1500 ms delay
    /// - Agent: general
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            api_base_url: resolve_api_base_url(None, false),
            top_k: DEFAULT_TOP_K,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            use_stub: false,
            stub_delay: DEFAULT_STUB_DELAY,
            store_path: None,
            default_agent: AgentKey::General,
            use_color: true,
        }
    }

    /// Sets the backend base URL.
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Sets the number of chunks retrieved per question.
    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = top_k;
        self
    }

    /// Sets the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Enables or disables canned responses.
    pub fn with_stub(mut self, enabled: bool) -> Self {
        self.use_stub = enabled;
        self
    }

    /// Sets the canned response delay.
    pub fn with_stub_delay(mut self, delay: Duration) -> Self {
        self.stub_delay = delay;
        self
    }

    /// Sets the session list file.
    pub fn with_store_path(mut self, path: Option<PathBuf>) -> Self {
        self.store_path = path;
        self
    }

    /// Sets the agent selected at startup.
    pub fn with_default_agent(mut self, agent: AgentKey) -> Self {
        self.default_agent = agent;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Resolves a configuration from command-line arguments.
    ///
    /// Precedence, highest first: command line, the `APEX_RAG_API_URL`
    /// environment variable (URL only), the YAML file named by `--config`,
    /// built-in defaults.
    pub fn from_args(args: ChatArgs) -> Result<Self> {
        let file = match &args.config {
            Some(path) => ChatConfigFile::from_file(path)?,
            None => ChatConfigFile::default(),
        };
        Self::resolve(args, file, env::var(API_URL_ENV).ok())
    }

    fn resolve(args: ChatArgs, file: ChatConfigFile, env_url: Option<String>) -> Result<Self> {
        let defaults = ChatConfig::new();

        let host = args.host.or(file.host);
        let https = args.https || file.https.unwrap_or(false);
        let api_base_url = match args.api_url.or(env_url).or(file.api_url) {
            Some(url) => url,
            None => resolve_api_base_url(host.as_deref(), https),
        };
        let api_base_url = normalize_base_url(&api_base_url)?;

        let default_agent = match args.agent {
            Some(agent) => agent
                .parse::<AgentKey>()
                .map_err(|err| Error::validation(err, Some("agent".to_string())))?,
            None => file.agent.unwrap_or(defaults.default_agent),
        };

        let top_k = args.top_k.or(file.top_k).unwrap_or(defaults.top_k);
        if top_k == 0 {
            return Err(Error::validation(
                "top_k must be at least 1",
                Some("top_k".to_string()),
            ));
        }

        let request_timeout = match args.timeout.or(file.timeout_secs) {
            Some(0) => {
                return Err(Error::validation(
                    "timeout must be at least 1 second",
                    Some("timeout".to_string()),
                ));
            }
            Some(secs) => Duration::from_secs(secs),
            None => defaults.request_timeout,
        };

        Ok(ChatConfig {
            api_base_url,
            top_k,
            request_timeout,
            use_stub: args.mock || file.mock.unwrap_or(false),
            stub_delay: args
                .mock_delay_ms
                .or(file.mock_delay_ms)
                .map(Duration::from_millis)
                .unwrap_or(defaults.stub_delay),
            store_path: args.store.map(PathBuf::from).or(file.store),
            default_agent,
            use_color: !args.no_color && file.color.unwrap_or(true),
        })
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}
