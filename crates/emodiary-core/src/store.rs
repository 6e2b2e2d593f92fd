//! Sled-backed store: sessions, turns, and emotion records as JSON rows.
//!
//! Three keyed trees back the three logical collections. Turns are
//! append-only and keyed by `{session_id}:{seq}` with a zero-padded sequence
//! from `sled::Db::generate_id`, so a prefix scan yields them in insertion
//! order. Emotion records are keyed by `{source_type}:{source_id}`: writing
//! the same key is a single atomic replace, which keeps at most one live
//! record per source even under retries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::DiaryResult;
use crate::prompts::Language;

/// Session mode tag, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    #[default]
    Text,
    Voice,
}

impl SessionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionMode::Text => "text",
            SessionMode::Voice => "voice",
        }
    }

    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "voice" => SessionMode::Voice,
            _ => SessionMode::Text,
        }
    }
}

/// Turn author. Closed two-value set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One conversation thread. Language and mode are fixed at creation; the
/// only later mutation is appending the end timestamp and duration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub language: Language,
    pub mode: SessionMode,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_s: Option<i64>,
}

/// One message in a session. Append-only; never edited or reordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: String,
    pub session_id: String,
    pub role: Role,
    pub content: String,
    pub seq: u64,
    pub created_at: DateTime<Utc>,
}

/// One classification result for exactly one source object. A new
/// classification for the same `(source_type, source_id)` replaces the old.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionRecord {
    pub id: String,
    pub user_id: String,
    pub source_type: String,
    pub source_id: String,
    /// Continuous polarity in −1.0..1.0.
    pub sentiment_score: f64,
    /// Emotion name → confidence, names from the fixed vocabulary,
    /// confidences in (0.1, 1.0].
    pub emotions: BTreeMap<String, f64>,
    /// Always a maximal-confidence key of `emotions`, or `neutral` when the
    /// map is empty.
    pub primary_emotion: String,
    pub created_at: DateTime<Utc>,
}

/// Persistent store over three sled trees.
pub struct DiaryStore {
    db: sled::Db,
    sessions: sled::Tree,
    turns: sled::Tree,
    emotions: sled::Tree,
}

impl DiaryStore {
    /// Open or create the database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> DiaryResult<Self> {
        Self::from_db(sled::open(path)?)
    }

    /// In-memory database for tests; dropped with the value.
    pub fn open_temporary() -> DiaryResult<Self> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: sled::Db) -> DiaryResult<Self> {
        let sessions = db.open_tree("sessions")?;
        let turns = db.open_tree("turns")?;
        let emotions = db.open_tree("emotion_records")?;
        Ok(Self { db, sessions, turns, emotions })
    }

    // ── sessions ──

    pub fn create_session(
        &self,
        user_id: &str,
        language: Language,
        mode: SessionMode,
    ) -> DiaryResult<Session> {
        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            language,
            mode,
            started_at: Utc::now(),
            ended_at: None,
            duration_s: None,
        };
        self.sessions
            .insert(session.id.as_bytes(), serde_json::to_vec(&session)?)?;
        Ok(session)
    }

    pub fn get_session(&self, session_id: &str) -> DiaryResult<Option<Session>> {
        match self.sessions.get(session_id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Persist session mutations (end timestamp + duration only).
    pub fn update_session(&self, session: &Session) -> DiaryResult<()> {
        self.sessions
            .insert(session.id.as_bytes(), serde_json::to_vec(session)?)?;
        Ok(())
    }

    // ── turns ──

    /// Append a turn. The sequence comes from `Db::generate_id`, monotonic
    /// for the lifetime of the database, so keys sort in insertion order.
    pub fn append_turn(&self, session_id: &str, role: Role, content: &str) -> DiaryResult<Turn> {
        let seq = self.db.generate_id()?;
        let turn = Turn {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            role,
            content: content.to_string(),
            seq,
            created_at: Utc::now(),
        };
        let key = turn_key(session_id, seq);
        self.turns.insert(key.as_bytes(), serde_json::to_vec(&turn)?)?;
        Ok(turn)
    }

    /// All turns for a session in chronological (insertion) order.
    pub fn list_turns(&self, session_id: &str) -> DiaryResult<Vec<Turn>> {
        let prefix = format!("{session_id}:");
        let mut turns = Vec::new();
        for entry in self.turns.scan_prefix(prefix.as_bytes()) {
            let (_, bytes) = entry?;
            turns.push(serde_json::from_slice(&bytes)?);
        }
        Ok(turns)
    }

    // ── emotion records ──

    /// Atomic replace keyed by `(source_type, source_id)`: at most one live
    /// record per source.
    pub fn put_emotion_record(&self, record: &EmotionRecord) -> DiaryResult<()> {
        let key = emotion_key(&record.source_type, &record.source_id);
        self.emotions
            .insert(key.as_bytes(), serde_json::to_vec(record)?)?;
        Ok(())
    }

    pub fn get_emotion_record(
        &self,
        source_type: &str,
        source_id: &str,
    ) -> DiaryResult<Option<EmotionRecord>> {
        match self.emotions.get(emotion_key(source_type, source_id).as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Recent records for a user, newest first, up to `limit`.
    pub fn list_emotion_records(&self, user_id: &str, limit: usize) -> DiaryResult<Vec<EmotionRecord>> {
        let mut records: Vec<EmotionRecord> = Vec::new();
        for entry in self.emotions.iter() {
            let (_, bytes) = entry?;
            let record: EmotionRecord = serde_json::from_slice(&bytes)?;
            if record.user_id == user_id {
                records.push(record);
            }
        }
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }
}

fn turn_key(session_id: &str, seq: u64) -> String {
    format!("{session_id}:{seq:020}")
}

fn emotion_key(source_type: &str, source_id: &str) -> String {
    format!("{source_type}:{source_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(user: &str, source_id: &str, primary: &str) -> EmotionRecord {
        EmotionRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.to_string(),
            source_type: "journal".to_string(),
            source_id: source_id.to_string(),
            sentiment_score: 0.0,
            emotions: BTreeMap::from([(primary.to_string(), 0.8)]),
            primary_emotion: primary.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn session_roundtrip_and_end_update() {
        let store = DiaryStore::open_temporary().unwrap();
        let session = store
            .create_session("user-1", Language::Hi, SessionMode::Text)
            .unwrap();

        let mut loaded = store.get_session(&session.id).unwrap().unwrap();
        assert_eq!(loaded.user_id, "user-1");
        assert_eq!(loaded.language, Language::Hi);
        assert!(loaded.ended_at.is_none());

        loaded.ended_at = Some(Utc::now());
        loaded.duration_s = Some(42);
        store.update_session(&loaded).unwrap();
        let reloaded = store.get_session(&session.id).unwrap().unwrap();
        assert_eq!(reloaded.duration_s, Some(42));
    }

    #[test]
    fn turns_keep_insertion_order() {
        let store = DiaryStore::open_temporary().unwrap();
        let session = store
            .create_session("user-1", Language::En, SessionMode::Text)
            .unwrap();

        for i in 0..25 {
            store
                .append_turn(&session.id, Role::User, &format!("message {i}"))
                .unwrap();
        }
        let turns = store.list_turns(&session.id).unwrap();
        assert_eq!(turns.len(), 25);
        assert_eq!(turns[0].content, "message 0");
        assert_eq!(turns[24].content, "message 24");
        assert!(turns.windows(2).all(|w| w[0].seq < w[1].seq));
    }

    #[test]
    fn turns_are_scoped_per_session() {
        let store = DiaryStore::open_temporary().unwrap();
        let a = store.create_session("u", Language::En, SessionMode::Text).unwrap();
        let b = store.create_session("u", Language::En, SessionMode::Text).unwrap();
        store.append_turn(&a.id, Role::User, "for a").unwrap();
        store.append_turn(&b.id, Role::User, "for b").unwrap();

        let turns = store.list_turns(&a.id).unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, "for a");
    }

    #[test]
    fn emotion_record_replaces_per_source() {
        let store = DiaryStore::open_temporary().unwrap();
        store.put_emotion_record(&record("u", "entry-1", "joy")).unwrap();
        store.put_emotion_record(&record("u", "entry-1", "sadness")).unwrap();

        let live = store.get_emotion_record("journal", "entry-1").unwrap().unwrap();
        assert_eq!(live.primary_emotion, "sadness");
        assert_eq!(store.list_emotion_records("u", 30).unwrap().len(), 1);
    }

    #[test]
    fn history_is_per_user_newest_first_with_limit() {
        let store = DiaryStore::open_temporary().unwrap();
        for i in 0..5 {
            let mut r = record("u", &format!("entry-{i}"), "calm");
            r.created_at = Utc::now() + chrono::Duration::seconds(i);
            store.put_emotion_record(&r).unwrap();
        }
        store.put_emotion_record(&record("someone-else", "entry-x", "joy")).unwrap();

        let history = store.list_emotion_records("u", 3).unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].source_id, "entry-4");
        assert!(history.iter().all(|r| r.user_id == "u"));
    }
}
