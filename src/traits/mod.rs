use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::TtsSettings;
use crate::services::tts::error::TtsError;
use crate::services::tts::health::HealthStatus;

#[async_trait]
pub trait TtsTrait: Send + Sync {
    // Sanitizes with the snapshot's filter toggles, returns the saved audio path
    async fn synthesize(&self, text: &str, settings: &TtsSettings) -> Result<PathBuf, TtsError>;
    async fn synthesize_raw(&self, text: &str, settings: &TtsSettings) -> Result<PathBuf, TtsError>;
    async fn probe(&self, settings: &TtsSettings) -> HealthStatus;
}

/// The chat framework this plugin is mounted into.
#[async_trait]
pub trait HostTrait: Send + Sync {
    fn register_command(&self, name: &str, description: &str, handler: Arc<dyn CommandTrait>);
    fn has_command(&self, name: &str) -> bool;
    async fn send(&self, session_id: &str, reply: Reply) -> anyhow::Result<()>;
}

#[async_trait]
pub trait CommandTrait: Send + Sync {
    async fn execute(&self, session: &Session, args: &str) -> Reply;
}

/// Splits a message into its leading command token and the trimmed remainder.
pub fn split_command(text: &str) -> (&str, &str) {
    let text = text.trim();
    text.split_once(char::is_whitespace)
        .map(|(name, args)| (name, args.trim()))
        .unwrap_or((text, ""))
}

/// The conversation a message arrived on, plus the message text that triggered the work.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub content: String,
}

/// What a command or the middleware hands back to the host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    pub text: Option<String>,
    pub audio: Option<PathBuf>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            audio: None,
        }
    }

    pub fn audio(path: PathBuf) -> Self {
        Self {
            text: None,
            audio: Some(path),
        }
    }
}
