//! Static quick-reply chips per mode.

use selah_core::{ChatMode, SuggestedAction};

type Chip = (&'static str, &'static str, &'static str);

const AUTO: &[Chip] = &[
    ("Today's devotional", "Walk me through today's devotional", "sun"),
    ("Pray with me", "Can you pray with me about something?", "hands"),
    ("Journal", "I want to journal about my day", "pen"),
    ("Find a verse", "Show me a verse for what I'm facing", "book-open"),
];

const DEVOTIONAL: &[Chip] = &[
    ("Go deeper", "Help me go deeper into today's passage", "layers"),
    ("Apply it", "How can I live this out today?", "footprints"),
    ("Pray it", "Turn today's reading into a prayer", "hands"),
];

const PRAYER: &[Chip] = &[
    ("Add a request", "I'd like to add a prayer request", "plus"),
    ("Answered prayer", "I want to share an answered prayer", "check-circle"),
    ("Help me pray", "I don't know what to pray", "hands"),
];

const JOURNAL: &[Chip] = &[
    ("Save this", "Please save this as a journal entry", "bookmark"),
    ("Ask me more", "Ask me a question to go deeper", "message-circle"),
    ("Find a verse", "Is there a verse that speaks to this?", "book-open"),
];

const LECTIO: &[Chip] = &[
    ("Read again", "Read the passage with me again", "repeat"),
    ("What stood out", "A word stood out to me", "sparkles"),
    ("Rest in it", "Help me sit quietly with this passage", "feather"),
];

const EXAMEN: &[Chip] = &[
    ("Start the examen", "Walk me through tonight's examen", "moon"),
    ("A good moment", "Something today felt like a gift", "gift"),
    ("A hard moment", "Part of today was hard", "cloud"),
];

const MEMORY: &[Chip] = &[
    ("Review verses", "Let's review my memory verses", "brain"),
    ("New verse", "Help me start memorizing a new verse", "plus"),
    ("Quiz me", "Quiz me on a verse", "help-circle"),
];

const CONFESSION: &[Chip] = &[
    ("Something to confess", "There's something I need to bring to God", "heart"),
    ("Forgiveness", "Remind me what scripture says about forgiveness", "book-open"),
    ("Make it right", "Help me take a step to make things right", "footprints"),
];

const GRATITUDE: &[Chip] = &[
    ("Three things", "Help me name three things I'm grateful for", "list"),
    ("Thank God", "Help me write a prayer of thanks", "hands"),
    ("Small gifts", "Help me notice small gifts from today", "sparkles"),
];

const CELEBRATION: &[Chip] = &[
    ("Share a win", "I have good news to share", "party-popper"),
    ("Answered prayer", "A prayer of mine was answered!", "check-circle"),
    ("Look back", "Show me how far I've come", "trending-up"),
];

/// Chips for `mode`. Every mode has between three and four.
pub fn suggested_actions(mode: ChatMode) -> Vec<SuggestedAction> {
    let chips = match mode {
        ChatMode::Auto => AUTO,
        ChatMode::Devotional => DEVOTIONAL,
        ChatMode::Prayer => PRAYER,
        ChatMode::Journal => JOURNAL,
        ChatMode::Lectio => LECTIO,
        ChatMode::Examen => EXAMEN,
        ChatMode::Memory => MEMORY,
        ChatMode::Confession => CONFESSION,
        ChatMode::Gratitude => GRATITUDE,
        ChatMode::Celebration => CELEBRATION,
    };
    chips
        .iter()
        .map(|(label, prompt, icon)| SuggestedAction {
            label: (*label).into(),
            prompt: (*prompt).into(),
            icon: (*icon).into(),
        })
        .collect()
}

/// Chips for a raw mode string; unknown modes get the `auto` set.
pub fn suggested_actions_for(raw: &str) -> Vec<SuggestedAction> {
    suggested_actions(ChatMode::resolve(Some(raw)))
}
