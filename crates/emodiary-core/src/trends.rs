//! Trend aggregation over classified records, plus AI-generated insights.
//!
//! `mood_trends` is a pure transformation: no bucket-averaging, one point
//! per record. The insights path shares the model endpoint with chat and
//! classification and degrades to fixed per-language strings on empty data
//! or model failure.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;

use crate::error::DiaryResult;
use crate::llm::{ChatCompletion, ChatMessage};
use crate::prompts::{self, Language};
use crate::store::{DiaryStore, EmotionRecord};

const INSIGHTS_RECORD_LIMIT: usize = 10;
const INSIGHTS_MAX_TOKENS: u32 = 300;
const INSIGHTS_TEMPERATURE: f32 = 0.7;

/// One chart point: the record's day, sentiment score, and primary emotion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: String,
    pub score: f64,
    pub mood: String,
}

/// One slice of the emotion frequency table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmotionCount {
    pub name: String,
    pub value: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendReport {
    pub trends: Vec<TrendPoint>,
    pub emotion_distribution: Vec<EmotionCount>,
    pub entry_count: usize,
}

/// Aggregate records from the trailing `window_days` window: a chronological
/// series with one point per record, and an emotion frequency table sorted
/// descending by count (ties keep first-seen order).
pub fn mood_trends(records: &[EmotionRecord], window_days: i64) -> TrendReport {
    let cutoff = Utc::now() - Duration::days(window_days);
    let mut in_window: Vec<&EmotionRecord> =
        records.iter().filter(|r| r.created_at >= cutoff).collect();
    in_window.sort_by_key(|r| r.created_at);

    let mut trends = Vec::with_capacity(in_window.len());
    let mut counts: Vec<EmotionCount> = Vec::new();
    for record in &in_window {
        trends.push(TrendPoint {
            date: record.created_at.format("%Y-%m-%d").to_string(),
            score: record.sentiment_score,
            mood: record.primary_emotion.clone(),
        });
        for name in record.emotions.keys() {
            match counts.iter_mut().find(|c| c.name == *name) {
                Some(count) => count.value += 1,
                None => counts.push(EmotionCount { name: name.clone(), value: 1 }),
            }
        }
    }
    // Stable sort: equal counts stay in first-seen order.
    counts.sort_by(|a, b| b.value.cmp(&a.value));

    TrendReport {
        trends,
        emotion_distribution: counts,
        entry_count: in_window.len(),
    }
}

/// Trend/insight surface over the stored emotion history.
pub struct TrendsService {
    store: Arc<DiaryStore>,
    model: Arc<dyn ChatCompletion>,
}

impl TrendsService {
    pub fn new(store: Arc<DiaryStore>, model: Arc<dyn ChatCompletion>) -> Self {
        Self { store, model }
    }

    /// Mood trends for a user over the trailing `days` window.
    pub fn mood_trends(&self, user_id: &str, days: i64) -> DiaryResult<TrendReport> {
        let mut records = self.store.list_emotion_records(user_id, usize::MAX)?;
        records.reverse(); // stored newest first; aggregate chronologically
        Ok(mood_trends(&records, days))
    }

    /// Three bullet insights over the user's recent records, in the given
    /// language, plain text. Model failure yields a fixed apology string.
    pub async fn insights(&self, user_id: &str, language: Language) -> DiaryResult<String> {
        let records = self
            .store
            .list_emotion_records(user_id, INSIGHTS_RECORD_LIMIT)?;
        if records.is_empty() {
            return Ok(prompts::insights_no_data(language).to_string());
        }

        let mut lines = String::new();
        for record in &records {
            let emotions = record
                .emotions
                .keys()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            lines.push_str(&format!(
                "- {} (Mood: {}, Sentiment: {:.2}, Emotions: {})\n",
                record.created_at.format("%Y-%m-%d"),
                record.primary_emotion,
                record.sentiment_score,
                emotions,
            ));
        }

        let mut prompt = format!(
            "Analyze the following recent mood records from a user's journal.\n\
             Identify patterns, emotional triggers, and improvements or declines in their well-being.\n\n\
             Records:\n{lines}\n"
        );
        prompt.push_str(match language {
            Language::Hi => {
                "Provide 3 concise, actionable, and empathetic insights in bullet points in HINDI (Devanagari script).\n\
                 Do not use markdown formatting like bolding * or **. Just plain text bullet points.\n\
                 Focus on \"You\" perspective (use \"आप\" and respectful tone)."
            }
            Language::En => {
                "Provide 3 concise, actionable, and empathetic insights in bullet points.\n\
                 Do not use markdown formatting like bolding * or **. Just plain text bullet points.\n\
                 Focus on \"You\" perspective."
            }
        });

        let messages = [
            ChatMessage::system("You are an empathetic mental health companion analyst."),
            ChatMessage::user(prompt),
        ];
        match self
            .model
            .complete(&messages, INSIGHTS_MAX_TOKENS, INSIGHTS_TEMPERATURE)
            .await
        {
            Ok(text) => Ok(text),
            Err(e) => {
                tracing::error!(target: "diary::trends", error = %e, "insight generation failed");
                Ok(prompts::insights_apology(language).to_string())
            }
        }
    }
}
