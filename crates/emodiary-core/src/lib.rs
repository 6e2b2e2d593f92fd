//! emodiary-core: conversational-safety and emotion-inference pipeline for a
//! journaling/chat companion.
//!
//! The pipeline has five parts: a stateless injection detector, a
//! language-locked conversation orchestrator, an emotion classifier (AI
//! adapter with a deterministic heuristic fallback), a pure trend
//! aggregator, and the shared vocabulary/prompt tables. Persistence (sled)
//! and the language-model endpoint (Groq, via [`llm::ChatCompletion`]) are
//! the only collaborators; routing, auth, and audio live outside this crate.

pub mod chat;
pub mod config;
pub mod emotion;
pub mod error;
pub mod llm;
pub mod prompts;
pub mod safety;
pub mod sentiment;
pub mod store;
pub mod trends;

pub use chat::{ChatReply, ChatService, SessionEnd, SessionStart, CONTEXT_WINDOW_TURNS};
pub use config::DiaryConfig;
pub use emotion::{fallback_from_polarity, Classification, EmotionClassifier, EmotionService};
pub use error::{DiaryError, DiaryResult};
pub use llm::{ChatCompletion, ChatMessage, GroqBridge};
pub use prompts::{Language, EMOTION_VOCABULARY};
pub use safety::is_injection;
pub use store::{DiaryStore, EmotionRecord, Role, Session, SessionMode, Turn};
pub use trends::{mood_trends, EmotionCount, TrendPoint, TrendReport, TrendsService};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::error::{DiaryError, DiaryResult};
    use crate::llm::{ChatCompletion, ChatMessage};

    /// Scripted model endpoint: returns one fixed reply or always fails,
    /// counting calls and keeping the last request for inspection.
    pub struct ScriptedModel {
        reply: Option<String>,
        calls: AtomicUsize,
        last_messages: Mutex<Vec<ChatMessage>>,
    }

    impl ScriptedModel {
        pub fn replies(text: &str) -> Self {
            Self {
                reply: Some(text.to_string()),
                calls: AtomicUsize::new(0),
                last_messages: Mutex::new(Vec::new()),
            }
        }

        pub fn unavailable() -> Self {
            Self {
                reply: None,
                calls: AtomicUsize::new(0),
                last_messages: Mutex::new(Vec::new()),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn last_message_count(&self) -> usize {
            self.last_messages.lock().unwrap().len()
        }

        pub fn last_system_content(&self) -> String {
            self.last_messages
                .lock()
                .unwrap()
                .first()
                .filter(|m| m.role == "system")
                .map(|m| m.content.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl ChatCompletion for ScriptedModel {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            _max_tokens: u32,
            _temperature: f32,
        ) -> DiaryResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_messages.lock().unwrap() = messages.to_vec();
            match &self.reply {
                Some(text) => Ok(text.clone()),
                None => Err(DiaryError::UpstreamUnavailable("scripted failure".to_string())),
            }
        }
    }
}
