use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{SharedTtsSettings, TtsSettings};
use crate::services::text::extractor::extract_text;
use crate::services::text::policy::SpeechPolicy;
use crate::traits::{split_command, HostTrait, Reply, Session, TtsTrait};

/// Allows a single auto-conversion at a time.
#[derive(Clone, Default)]
pub struct ProcessingGuard {
    busy: Arc<AtomicBool>,
}

/// Held while a conversion runs; releases the guard when dropped.
pub struct GuardPermit {
    busy: Arc<AtomicBool>,
}

impl ProcessingGuard {
    pub fn try_acquire(&self) -> Option<GuardPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| GuardPermit {
                busy: self.busy.clone(),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for GuardPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Reads qualifying host replies aloud after the host has produced them.
pub struct AutoConvert {
    tts: Arc<dyn TtsTrait>,
    host: Arc<dyn HostTrait>,
    settings: SharedTtsSettings,
    policy: SpeechPolicy,
    guard: ProcessingGuard,
}

impl AutoConvert {
    pub fn new(
        tts: Arc<dyn TtsTrait>,
        host: Arc<dyn HostTrait>,
        settings: SharedTtsSettings,
        policy: SpeechPolicy,
    ) -> Self {
        Self {
            tts,
            host,
            settings,
            policy,
            guard: ProcessingGuard::default(),
        }
    }

    pub fn guard(&self) -> &ProcessingGuard {
        &self.guard
    }

    /// Runs the downstream reply pipeline, then schedules speech for its result.
    /// The reply is handed back untouched.
    pub async fn around<F>(&self, session: &Session, next: F) -> Value
    where
        F: Future<Output = Value>,
    {
        let reply = next.await;
        self.schedule(session, &reply);
        reply
    }

    fn schedule(
        &self,
        session: &Session,
        reply: &Value,
    ) -> Option<tokio::task::JoinHandle<()>> {
        let settings = self.settings.snapshot();
        let text = self.speech_candidate(session, reply, &settings)?;

        let Some(permit) = self.guard.try_acquire() else {
            debug!("Auto-convert busy, skipping reply for session {}", session.id);
            return None;
        };

        let tts = self.tts.clone();
        let host = self.host.clone();
        let session_id = session.id.clone();
        let delay = Duration::from_millis(settings.auto_convert_delay_ms);

        Some(tokio::spawn(async move {
            let _permit = permit;
            tokio::time::sleep(delay).await;

            match tts.synthesize(&text, &settings).await {
                Ok(path) => {
                    info!("Auto-convert produced {} for session {}", path.display(), session_id);
                    if let Err(e) = host.send(&session_id, Reply::audio(path)).await {
                        warn!("Auto-convert delivery failed: {}", e);
                    }
                }
                Err(e) => warn!("Auto-convert synthesis failed: {}", e),
            }
        }))
    }

    fn speech_candidate(
        &self,
        session: &Session,
        reply: &Value,
        settings: &TtsSettings,
    ) -> Option<String> {
        if !settings.auto_convert || is_empty_reply(reply) {
            return None;
        }
        // replies to our own commands are not read back
        let (name, _) = split_command(&session.content);
        if self.host.has_command(name) {
            return None;
        }

        let text = extract_text(reply);
        if !self.policy.is_speech_worthy(&text) {
            debug!("Reply not speech-worthy, skipping: {:?}", text);
            return None;
        }
        Some(text)
    }
}

fn is_empty_reply(reply: &Value) -> bool {
    match reply {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
