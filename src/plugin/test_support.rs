use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::config::TtsSettings;
use crate::services::tts::error::TtsError;
use crate::services::tts::health::HealthStatus;
use crate::traits::{CommandTrait, HostTrait, Reply, TtsTrait};

/// Fake synthesizer that records the text it was asked to speak.
pub struct ScriptedTts {
    result: Option<PathBuf>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTts {
    pub fn ok(path: &str) -> Self {
        Self {
            result: Some(PathBuf::from(path)),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            result: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn respond(&self, text: &str, settings: &TtsSettings) -> Result<PathBuf, TtsError> {
        self.calls.lock().unwrap().push(text.to_string());
        self.result.clone().ok_or_else(|| TtsError::ServiceUnavailable {
            addr: settings.api_url.clone(),
        })
    }
}

#[async_trait]
impl TtsTrait for ScriptedTts {
    async fn synthesize(&self, text: &str, settings: &TtsSettings) -> Result<PathBuf, TtsError> {
        self.respond(text, settings)
    }

    async fn synthesize_raw(
        &self,
        text: &str,
        settings: &TtsSettings,
    ) -> Result<PathBuf, TtsError> {
        self.respond(&format!("raw:{}", text), settings)
    }

    async fn probe(&self, settings: &TtsSettings) -> HealthStatus {
        match self.result {
            Some(_) => HealthStatus::Online,
            None => HealthStatus::Unreachable {
                addr: settings.api_url.clone(),
            },
        }
    }
}

/// Fake host that keeps registrations and outgoing replies in memory.
#[derive(Default)]
pub struct RecordingHost {
    commands: Mutex<HashMap<String, Arc<dyn CommandTrait>>>,
    sent: Mutex<Vec<(String, Reply)>>,
}

impl RecordingHost {
    pub fn sent(&self) -> Vec<(String, Reply)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn command(&self, name: &str) -> Option<Arc<dyn CommandTrait>> {
        self.commands.lock().unwrap().get(name).cloned()
    }

    pub fn command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl HostTrait for RecordingHost {
    fn register_command(&self, name: &str, _description: &str, handler: Arc<dyn CommandTrait>) {
        self.commands.lock().unwrap().insert(name.to_string(), handler);
    }

    fn has_command(&self, name: &str) -> bool {
        self.commands.lock().unwrap().contains_key(name)
    }

    async fn send(&self, session_id: &str, reply: Reply) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push((session_id.to_string(), reply));
        Ok(())
    }
}
