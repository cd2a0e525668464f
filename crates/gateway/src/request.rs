//! Wire-request normalization.
//!
//! Clients send every field in either snake_case or camelCase. Each logical
//! field is looked up through an explicit alias table, in precedence order:
//! the first alias holding a non-null value wins. Nothing downstream sees the
//! raw JSON.

use selah_core::message::Role;
use selah_core::{BibleContext, ChatMode, DevotionalContext, QuotaContext, WitLevel};
use selah_engine::{ChatRequest, HistoryTurn};
use serde_json::{Map, Value};
use thiserror::Error;

/// `(canonical, aliases in precedence order)`.
type FieldTable = &'static [(&'static str, &'static [&'static str])];

const TOP_LEVEL: FieldTable = &[
    ("user_id", &["user_id", "userId"]),
    ("message", &["message"]),
    ("conversation_history", &["conversation_history", "conversationHistory"]),
    ("mode", &["mode"]),
    ("wit_level", &["wit_level", "witLevel"]),
    ("bible_context", &["bible_context", "bibleContext"]),
    ("devotional_context", &["devotional_context", "devotionalContext"]),
    ("quota_context", &["quota_context", "quotaContext"]),
    ("stream", &["stream"]),
    ("thread_id", &["thread_id", "threadId"]),
];

const QUOTA: FieldTable = &[
    ("is_premium", &["is_premium", "isPremium"]),
    ("is_free_tier", &["is_free_tier", "isFreeTier"]),
    ("seeds_remaining", &["seeds_remaining", "seedsRemaining"]),
    ("total_seeds", &["total_seeds", "totalSeeds"]),
    ("is_last_seed", &["is_last_seed", "isLastSeed"]),
];

const DEVOTIONAL: FieldTable = &[
    ("series_title", &["series_title", "seriesTitle"]),
    ("day_number", &["day_number", "dayNumber"]),
    ("scripture_refs", &["scripture_refs", "scriptureRefs"]),
    ("reflection_questions", &["reflection_questions", "reflectionQuestions"]),
    ("prayer_focus", &["prayer_focus", "prayerFocus"]),
];

const BIBLE: FieldTable = &[
    ("book", &["book"]),
    ("chapter", &["chapter"]),
    ("verse", &["selected_verse", "selectedVerse", "verse"]),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("Request body must be a JSON object")]
    NotAnObject,

    #[error("message is required and must be a non-empty string")]
    MissingMessage,
}

/// A JSON object read through one alias table.
struct Fields<'a> {
    object: &'a Map<String, Value>,
    table: FieldTable,
}

impl<'a> Fields<'a> {
    fn new(object: &'a Map<String, Value>, table: FieldTable) -> Self {
        Self { object, table }
    }

    fn get(&self, canonical: &str) -> Option<&'a Value> {
        let (_, aliases) = self.table.iter().find(|(name, _)| *name == canonical)?;
        aliases
            .iter()
            .filter_map(|alias| self.object.get(*alias))
            .find(|v| !v.is_null())
    }

    fn string(&self, canonical: &str) -> Option<String> {
        match self.get(canonical)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn bool(&self, canonical: &str) -> bool {
        match self.get(canonical) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    fn u32(&self, canonical: &str) -> Option<u32> {
        match self.get(canonical)? {
            Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// A list of strings; a lone string becomes a one-element list.
    fn strings(&self, canonical: &str) -> Vec<String> {
        match self.get(canonical) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
            _ => Vec::new(),
        }
    }

    fn object(&self, canonical: &str, table: FieldTable) -> Option<Fields<'a>> {
        self.get(canonical)
            .and_then(Value::as_object)
            .map(|o| Fields::new(o, table))
    }
}

/// Normalize a raw request body. History is filtered to user/assistant turns
/// with content, then cut to the last `history_limit` entries.
pub fn normalize(body: &Value, history_limit: usize) -> Result<ChatRequest, RequestError> {
    let object = body.as_object().ok_or(RequestError::NotAnObject)?;
    let top = Fields::new(object, TOP_LEVEL);

    let message = match top.get("message") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => return Err(RequestError::MissingMessage),
    };

    let mut history: Vec<HistoryTurn> = match top.get("conversation_history") {
        Some(Value::Array(entries)) => entries.iter().filter_map(history_turn).collect(),
        _ => Vec::new(),
    };
    let excess = history.len().saturating_sub(history_limit);
    history.drain(..excess);

    Ok(ChatRequest {
        user_id: top.string("user_id"),
        message,
        history,
        mode: ChatMode::resolve(top.string("mode").as_deref()),
        wit_level: WitLevel::resolve(top.string("wit_level").as_deref()),
        bible: top.object("bible_context", BIBLE).map(|b| bible(&b)),
        devotional: top
            .object("devotional_context", DEVOTIONAL)
            .map(|d| devotional(&d)),
        quota: top
            .object("quota_context", QUOTA)
            .map(|q| quota(&q))
            .unwrap_or_default(),
        stream: top.bool("stream"),
        thread_id: top.string("thread_id"),
    })
}

fn history_turn(entry: &Value) -> Option<HistoryTurn> {
    let role = Role::from_history(entry.get("role")?.as_str()?)?;
    let content = entry.get("content")?.as_str()?.trim();
    if content.is_empty() {
        return None;
    }
    Some(HistoryTurn {
        role,
        content: content.to_string(),
    })
}

fn quota(q: &Fields<'_>) -> QuotaContext {
    QuotaContext {
        is_premium: q.bool("is_premium"),
        is_free_tier: q.bool("is_free_tier"),
        seeds_remaining: q.u32("seeds_remaining"),
        total_seeds: q.u32("total_seeds"),
        is_last_seed: q.bool("is_last_seed"),
    }
}

fn devotional(d: &Fields<'_>) -> DevotionalContext {
    DevotionalContext {
        series_title: d.string("series_title"),
        day_number: d.u32("day_number"),
        scripture_refs: d.strings("scripture_refs"),
        reflection_questions: d.strings("reflection_questions"),
        prayer_focus: d.string("prayer_focus"),
    }
}

fn bible(b: &Fields<'_>) -> BibleContext {
    BibleContext {
        book: b.string("book"),
        chapter: b.u32("chapter"),
        verse: b.u32("verse"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn camel_case_body_normalizes() {
        let body = json!({
            "userId": "u1",
            "message": "  Help me pray  ",
            "witLevel": "HIGH",
            "mode": "prayer",
            "threadId": "t-9",
            "quotaContext": { "isFreeTier": true, "seedsRemaining": 2, "totalSeeds": 5 },
            "bibleContext": { "book": "John", "chapter": 3, "selectedVerse": 16 },
            "devotionalContext": { "seriesTitle": "Hope", "dayNumber": "4", "scriptureRefs": "Romans 5:5" }
        });
        let req = normalize(&body, 10).unwrap();
        assert_eq!(req.user_id.as_deref(), Some("u1"));
        assert_eq!(req.message, "Help me pray");
        assert_eq!(req.wit_level, WitLevel::High);
        assert_eq!(req.mode, ChatMode::Prayer);
        assert_eq!(req.thread_id.as_deref(), Some("t-9"));
        assert_eq!(req.quota.seeds_remaining, Some(2));
        assert!(req.quota.is_free_tier);
        assert_eq!(req.bible.unwrap().reference().as_deref(), Some("John 3:16"));
        let d = req.devotional.unwrap();
        assert_eq!(d.day_number, Some(4));
        assert_eq!(d.scripture_refs, vec!["Romans 5:5"]);
    }

    #[test]
    fn snake_case_wins_over_camel_case() {
        let body = json!({
            "message": "hi",
            "user_id": "snake",
            "userId": "camel",
            "wit_level": "low",
            "witLevel": "high",
            "quota_context": { "is_premium": false, "isPremium": true }
        });
        let req = normalize(&body, 10).unwrap();
        assert_eq!(req.user_id.as_deref(), Some("snake"));
        assert_eq!(req.wit_level, WitLevel::Low);
        assert!(!req.quota.is_premium);
    }

    #[test]
    fn null_snake_case_falls_through() {
        let body = json!({ "message": "hi", "user_id": null, "userId": "camel" });
        assert_eq!(normalize(&body, 10).unwrap().user_id.as_deref(), Some("camel"));
    }

    #[test]
    fn defaults_when_fields_absent() {
        let req = normalize(&json!({ "message": "hi" }), 10).unwrap();
        assert_eq!(req.mode, ChatMode::Auto);
        assert_eq!(req.wit_level, WitLevel::Medium);
        assert_eq!(req.quota, QuotaContext::default());
        assert!(req.user_id.is_none() && req.bible.is_none() && !req.stream);
    }

    #[test]
    fn missing_or_blank_message_is_rejected() {
        assert_eq!(
            normalize(&json!({ "message": "   " }), 10),
            Err(RequestError::MissingMessage)
        );
        assert_eq!(
            normalize(&json!({ "message": 42 }), 10),
            Err(RequestError::MissingMessage)
        );
        assert_eq!(normalize(&json!({}), 10), Err(RequestError::MissingMessage));
        assert_eq!(normalize(&json!("hi"), 10), Err(RequestError::NotAnObject));
    }

    #[test]
    fn history_is_filtered_and_truncated() {
        let mut entries: Vec<Value> = (0..12)
            .map(|i| json!({ "role": if i % 2 == 0 { "user" } else { "assistant" }, "content": format!("m{i}") }))
            .collect();
        entries.push(json!({ "role": "system", "content": "ignore me" }));
        entries.push(json!({ "role": "user", "content": "  " }));
        let body = json!({ "message": "now", "conversationHistory": entries });

        let req = normalize(&body, 10).unwrap();
        assert_eq!(req.history.len(), 10);
        assert_eq!(req.history[0].content, "m2");
        assert_eq!(req.history[9].content, "m11");
    }

    #[test]
    fn stream_flag_accepts_bool() {
        let req = normalize(&json!({ "message": "hi", "stream": true }), 10).unwrap();
        assert!(req.stream);
    }
}
