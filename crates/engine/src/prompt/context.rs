//! Renders request and user context into prompt sections.

use selah_core::{BibleContext, DevotionalContext, UserContext};
use std::fmt::Write;

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none recorded".into()
    } else {
        items.join(", ")
    }
}

pub fn user_snapshot(user: &UserContext) -> String {
    let mut out = String::from("ABOUT THIS USER:\n");
    let _ = writeln!(
        out,
        "- Preferred translation: {}",
        user.preferred_translation.to_uppercase()
    );
    let _ = writeln!(out, "- Spiritual maturity: {}", user.maturity_level);
    if let Some(season) = &user.current_season {
        let _ = writeln!(out, "- Current season: {season}");
    }
    let _ = writeln!(out, "- Recent themes: {}", list_or_none(&user.recent_themes));
    let _ = writeln!(out, "- Recent struggles: {}", list_or_none(&user.recent_struggles));
    let prayers: Vec<String> = user
        .active_prayers
        .iter()
        .map(|p| format!("{} (prayer_id: {})", p.title, p.id))
        .collect();
    let _ = writeln!(out, "- Praying for: {}", list_or_none(&prayers));
    let _ = writeln!(
        out,
        "- Verses due for review: {}",
        list_or_none(&user.verses_due_for_review)
    );
    let _ = writeln!(
        out,
        "- Open commitments: {}",
        list_or_none(&user.pending_obedience_steps)
    );
    for (question, answer) in &user.onboarding_responses {
        let _ = writeln!(out, "- Asked \"{question}\", they said: {answer}");
    }
    out.push_str("Weave this in naturally; never recite it back as a list.");
    out
}

/// `None` when the caller sent an empty devotional.
pub fn devotional_block(d: &DevotionalContext) -> Option<String> {
    let empty = d.series_title.is_none()
        && d.day_number.is_none()
        && d.scripture_refs.is_empty()
        && d.reflection_questions.is_empty()
        && d.prayer_focus.is_none();
    if empty {
        return None;
    }

    let mut out = String::from("TODAY'S DEVOTIONAL:\n");
    match (&d.series_title, d.day_number) {
        (Some(title), Some(day)) => {
            let _ = writeln!(out, "- Series: {title}, day {day}");
        }
        (Some(title), None) => {
            let _ = writeln!(out, "- Series: {title}");
        }
        (None, Some(day)) => {
            let _ = writeln!(out, "- Day {day}");
        }
        (None, None) => {}
    }
    if !d.scripture_refs.is_empty() {
        let _ = writeln!(out, "- Scripture: {}", d.scripture_refs.join("; "));
    }
    for q in &d.reflection_questions {
        let _ = writeln!(out, "- Reflection question: {q}");
    }
    if let Some(focus) = &d.prayer_focus {
        let _ = writeln!(out, "- Prayer focus: {focus}");
    }
    Some(out.trim_end().to_string())
}

pub fn reading_block(b: &BibleContext) -> Option<String> {
    b.reference().map(|reference| {
        format!(
            "CURRENTLY READING: The user has {reference} open. Connect your reply to this \
             passage when it fits their question."
        )
    })
}
