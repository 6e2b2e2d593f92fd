//! Emotion classifier: AI adapter with a deterministic heuristic fallback.
//!
//! Classification always computes the lexical sentiment score first, then
//! attempts the AI path. Any call failure or malformed payload discards the
//! AI result entirely and the fallback table takes over; a partially trusted
//! response is never stored. The `primary_emotion` coming back from the
//! model is treated as untrusted and repaired locally: it must be a
//! maximal-confidence key of the returned map, or `neutral` when the map is
//! empty.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tokio::task::JoinHandle;

use crate::error::{DiaryError, DiaryResult};
use crate::llm::{ChatCompletion, ChatMessage};
use crate::prompts::{is_known_emotion, EMOTION_VOCABULARY};
use crate::sentiment;
use crate::store::{DiaryStore, EmotionRecord};

/// Cost/latency cap on classifier input, in characters.
const AI_INPUT_CAP_CHARS: usize = 1500;
const AI_MAX_TOKENS: u32 = 200;
/// Low temperature for consistent structured output.
const AI_TEMPERATURE: f32 = 0.1;
/// Confidences at or below this are excluded from the emotions map.
const MIN_CONFIDENCE: f64 = 0.1;

/// Classifier output before it is attached to a source.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub sentiment_score: f64,
    pub emotions: BTreeMap<String, f64>,
    pub primary_emotion: String,
}

#[derive(Deserialize)]
struct AiEmotionPayload {
    #[serde(default)]
    emotions: BTreeMap<String, f64>,
    #[serde(default)]
    primary_emotion: Option<String>,
}

/// Classifies text into the fixed emotion vocabulary via the model endpoint,
/// with the heuristic table as the offline substitute.
pub struct EmotionClassifier {
    model: Arc<dyn ChatCompletion>,
}

impl EmotionClassifier {
    pub fn new(model: Arc<dyn ChatCompletion>) -> Self {
        Self { model }
    }

    /// Classify text. Never fails: the AI path is best-effort and the
    /// fallback is total over the polarity range.
    pub async fn classify(&self, text: &str) -> Classification {
        let sentiment_score = sentiment::polarity(text);
        match self.classify_with_ai(text).await {
            Ok((emotions, primary_emotion)) => Classification {
                sentiment_score,
                emotions,
                primary_emotion,
            },
            Err(e) => {
                tracing::warn!(
                    target: "diary::emotion",
                    error = %e,
                    "AI emotion analysis failed, using heuristic fallback"
                );
                let (emotions, primary_emotion) = fallback_from_polarity(sentiment_score);
                Classification {
                    sentiment_score,
                    emotions,
                    primary_emotion,
                }
            }
        }
    }

    async fn classify_with_ai(&self, text: &str) -> DiaryResult<(BTreeMap<String, f64>, String)> {
        let system = format!(
            "You are an emotion analysis engine. Analyze the given text and output \
             ONLY a JSON object with exactly two keys:\n\
             1. \"emotions\": an object mapping emotion names to confidence scores (0.0-1.0). \
             Use ONLY these emotions: {}. Include only emotions with confidence > 0.1.\n\
             2. \"primary_emotion\": the single most dominant emotion.\n\
             Output ONLY valid JSON, no markdown, no explanation.",
            EMOTION_VOCABULARY.join(", ")
        );
        let messages = [
            ChatMessage::system(system),
            ChatMessage::user(truncate_chars(text, AI_INPUT_CAP_CHARS)),
        ];
        let raw = self
            .model
            .complete(&messages, AI_MAX_TOKENS, AI_TEMPERATURE)
            .await?;
        parse_ai_payload(&raw)
    }
}

/// Parse and validate a structured classifier response. Unknown emotion
/// names and confidences ≤ 0.1 are dropped, confidences are clamped to 1.0,
/// and the primary emotion is repaired from the map when the claimed value
/// does not hold up.
pub fn parse_ai_payload(raw: &str) -> DiaryResult<(BTreeMap<String, f64>, String)> {
    let body = strip_code_fences(raw);
    let payload: AiEmotionPayload = serde_json::from_str(body)
        .map_err(|e| DiaryError::MalformedUpstreamResponse(format!("emotion payload: {e}")))?;

    let emotions: BTreeMap<String, f64> = payload
        .emotions
        .into_iter()
        .filter(|(name, confidence)| is_known_emotion(name) && *confidence > MIN_CONFIDENCE)
        .map(|(name, confidence)| (name, confidence.min(1.0)))
        .collect();

    let primary = repair_primary(payload.primary_emotion.as_deref(), &emotions);
    Ok((emotions, primary))
}

/// Accept the claimed primary only when it is a maximal-confidence key of
/// the validated map; otherwise recompute it, defaulting to `neutral`.
fn repair_primary(claimed: Option<&str>, emotions: &BTreeMap<String, f64>) -> String {
    let max = emotions
        .values()
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max);
    if let Some(name) = claimed {
        if is_known_emotion(name) && emotions.get(name).is_some_and(|v| *v >= max) {
            return name.to_string();
        }
    }
    emotions
        .iter()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(Ordering::Equal))
        .map(|(name, _)| name.clone())
        .unwrap_or_else(|| "neutral".to_string())
}

/// Deterministic polarity-to-emotion mapping, total over −1.0..1.0.
/// Confidence values are rounded to two decimal places.
pub fn fallback_from_polarity(polarity: f64) -> (BTreeMap<String, f64>, String) {
    let mut emotions = BTreeMap::new();
    let primary = if polarity > 0.3 {
        emotions.insert("joy".to_string(), round2(polarity));
        emotions.insert("calm".to_string(), round2(polarity * 0.5));
        "joy"
    } else if polarity < -0.3 {
        emotions.insert("sadness".to_string(), round2(polarity.abs()));
        emotions.insert("anxiety".to_string(), round2(polarity.abs() * 0.4));
        "sadness"
    } else if polarity < -0.1 {
        emotions.insert("frustration".to_string(), round2(polarity.abs()));
        "frustration"
    } else {
        emotions.insert("neutral".to_string(), 0.8);
        "neutral"
    };
    (emotions, primary.to_string())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Classification attached to persistence: analyze, look up, and list
/// emotion records.
pub struct EmotionService {
    store: Arc<DiaryStore>,
    classifier: EmotionClassifier,
}

impl EmotionService {
    pub fn new(store: Arc<DiaryStore>, model: Arc<dyn ChatCompletion>) -> Self {
        Self {
            store,
            classifier: EmotionClassifier::new(model),
        }
    }

    /// Classify `text` and atomically replace the record for
    /// `(source_type, source_id)`. Idempotent per source key.
    pub async fn analyze_and_store(
        &self,
        user_id: &str,
        source_type: &str,
        source_id: &str,
        text: &str,
    ) -> DiaryResult<EmotionRecord> {
        let classification = self.classifier.classify(text).await;
        let record = EmotionRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            source_type: source_type.to_string(),
            source_id: source_id.to_string(),
            sentiment_score: classification.sentiment_score,
            emotions: classification.emotions,
            primary_emotion: classification.primary_emotion,
            created_at: Utc::now(),
        };
        self.store.put_emotion_record(&record)?;
        Ok(record)
    }

    /// Fire-and-forget trigger for content-creating collaborators: the work
    /// runs on a detached task and never blocks or fails the caller's path.
    /// The handle is returned so tests can await completion; production
    /// callers drop it.
    pub fn spawn_analyze_and_store(
        self: &Arc<Self>,
        user_id: &str,
        source_type: &str,
        source_id: &str,
        text: &str,
    ) -> JoinHandle<()> {
        let service = Arc::clone(self);
        let user_id = user_id.to_string();
        let source_type = source_type.to_string();
        let source_id = source_id.to_string();
        let text = text.to_string();
        tokio::spawn(async move {
            if let Err(e) = service
                .analyze_and_store(&user_id, &source_type, &source_id, &text)
                .await
            {
                tracing::error!(
                    target: "diary::emotion",
                    error = %e,
                    %source_type,
                    %source_id,
                    "background emotion analysis failed"
                );
            }
        })
    }

    pub fn get_analysis_for_source(
        &self,
        source_type: &str,
        source_id: &str,
    ) -> DiaryResult<Option<EmotionRecord>> {
        self.store.get_emotion_record(source_type, source_id)
    }

    /// Recent records for a user, newest first. The default limit is 30.
    pub fn get_emotion_history(&self, user_id: &str, limit: usize) -> DiaryResult<Vec<EmotionRecord>> {
        self.store.list_emotion_records(user_id, limit)
    }
}

fn truncate_chars(text: &str, cap: usize) -> &str {
    match text.char_indices().nth(cap) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn strip_code_fences(raw: &str) -> &str {
    let s = raw.trim();
    if let Some(rest) = s.strip_prefix("```") {
        let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or(rest);
        let body = body.rsplit_once("```").map(|(b, _)| b).unwrap_or(body);
        return body.trim();
    }
    s
}
