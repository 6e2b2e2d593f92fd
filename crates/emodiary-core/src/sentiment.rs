//! Deterministic lexical polarity scorer.
//!
//! Counts matches against fixed positive/negative word lists, with a
//! single-token negation flip, and returns `(pos − neg) / (pos + neg)` in
//! −1.0..1.0 rounded to three decimals. Deterministic and monotonic with
//! perceived positivity; used for the sentiment score of every record and as
//! the input to the heuristic emotion fallback.

const POSITIVE: &[&str] = &[
    "happy", "happier", "joy", "joyful", "glad", "great", "good", "love", "loved",
    "wonderful", "excited", "exciting", "grateful", "gratitude", "calm", "peaceful",
    "hope", "hopeful", "amazing", "proud", "relieved", "relaxed", "better", "fun",
    "smile", "smiled", "laughed", "beautiful", "kind", "supported", "thankful",
    "energized", "content", "optimistic",
];

const NEGATIVE: &[&str] = &[
    "sad", "unhappy", "angry", "anger", "terrible", "awful", "bad", "hate", "hated",
    "anxious", "anxiety", "worried", "worry", "tired", "exhausted", "lonely", "alone",
    "scared", "afraid", "fear", "guilty", "guilt", "frustrated", "frustrating",
    "hurt", "cried", "cry", "crying", "stressed", "stress", "hopeless", "miserable",
    "overwhelmed", "hard", "difficult", "worse", "upset", "drained",
];

const NEGATORS: &[&str] = &[
    "not", "no", "never", "don't", "dont", "can't", "cant", "won't", "wont",
    "didn't", "didnt", "isn't", "isnt", "wasn't", "wasnt", "couldn't", "couldnt",
];

/// Polarity of the text in −1.0..1.0, rounded to 3 decimal places.
/// Texts with no lexicon hits score 0.0.
pub fn polarity(text: &str) -> f64 {
    let tokens: Vec<String> = text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    let mut pos = 0i64;
    let mut neg = 0i64;
    for (i, token) in tokens.iter().enumerate() {
        let negated = i > 0 && NEGATORS.contains(&tokens[i - 1].as_str());
        if POSITIVE.contains(&token.as_str()) {
            if negated { neg += 1 } else { pos += 1 }
        } else if NEGATIVE.contains(&token.as_str()) {
            if negated { pos += 1 } else { neg += 1 }
        }
    }

    let total = pos + neg;
    if total == 0 {
        return 0.0;
    }
    round3((pos - neg) as f64 / total as f64)
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
