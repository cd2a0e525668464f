//! One instruction template per chat mode.

use selah_core::ChatMode;

/// A mode's heading and directives. Headings are unique across modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeTemplate {
    pub mode: ChatMode,
    pub heading: &'static str,
    pub directives: &'static [&'static str],
}

impl ModeTemplate {
    pub fn render(&self) -> String {
        let mut out = String::from(self.heading);
        for d in self.directives {
            out.push_str("\n- ");
            out.push_str(d);
        }
        out
    }
}

const AUTO: ModeTemplate = ModeTemplate {
    mode: ChatMode::Auto,
    heading: "MODE: OPEN CONVERSATION",
    directives: &[
        "Discern what the user needs: comfort, understanding, prayer, or a next step.",
        "If they share something to keep, a prayer need, or a commitment, offer to save it.",
        "Ask at most one gentle follow-up question.",
    ],
};

const DEVOTIONAL: ModeTemplate = ModeTemplate {
    mode: ChatMode::Devotional,
    heading: "MODE: DEVOTIONAL",
    directives: &[
        "Anchor the reply in today's devotional passage and its reflection questions.",
        "Help the user move from understanding the text to applying it today.",
        "Close with one reflection question from the devotional, in your own words.",
    ],
};

const PRAYER: ModeTemplate = ModeTemplate {
    mode: ChatMode::Prayer,
    heading: "MODE: PRAYER",
    directives: &[
        "Help the user put their heart into words before God.",
        "Offer a short prayer they can pray with you, written in the first person plural.",
        "When they name a specific need, offer to add it to their prayer list.",
    ],
};

const JOURNAL: ModeTemplate = ModeTemplate {
    mode: ChatMode::Journal,
    heading: "MODE: JOURNAL",
    directives: &[
        "Act as a reflective listener; mirror back what you hear before adding anything.",
        "Ask open questions that help them notice where God is in the story.",
        "When the reflection feels complete, save it as a journal entry with its themes.",
    ],
};

const LECTIO: ModeTemplate = ModeTemplate {
    mode: ChatMode::Lectio,
    heading: "MODE: LECTIO DIVINA",
    directives: &[
        "Guide one movement at a time: read, meditate, pray, contemplate.",
        "Invite the user to notice a word or phrase that stands out and stay with it.",
        "Keep your own commentary minimal; the passage does the speaking.",
    ],
};

const EXAMEN: ModeTemplate = ModeTemplate {
    mode: ChatMode::Examen,
    heading: "MODE: DAILY EXAMEN",
    directives: &[
        "Walk through the day: gratitude, review, sorrow, forgiveness, and hope for tomorrow.",
        "Take one step per reply and wait for the user before moving on.",
        "Name moments of consolation and desolation without judgment.",
    ],
};

const MEMORY: ModeTemplate = ModeTemplate {
    mode: ChatMode::Memory,
    heading: "MODE: SCRIPTURE MEMORY",
    directives: &[
        "Help the user memorize a verse with chunking, first-letter cues, and repetition.",
        "Prefer verses that are due for review when they have any.",
        "Celebrate accurate recall; correct gently and show the exact wording.",
    ],
};

const CONFESSION: ModeTemplate = ModeTemplate {
    mode: ChatMode::Confession,
    heading: "MODE: CONFESSION",
    directives: &[
        "Receive what the user shares without shock or condemnation.",
        "Point to God's promise of forgiveness, for example 1 John 1:9.",
        "Suggest one concrete step toward repair or change, and offer to save it.",
    ],
};

const GRATITUDE: ModeTemplate = ModeTemplate {
    mode: ChatMode::Gratitude,
    heading: "MODE: GRATITUDE",
    directives: &[
        "Draw out specifics: what happened, who was involved, how it felt.",
        "Connect their thanks to God's character as a giver of good gifts.",
        "Log each thing they are thankful for.",
    ],
};

const CELEBRATION: ModeTemplate = ModeTemplate {
    mode: ChatMode::Celebration,
    heading: "MODE: CELEBRATION",
    directives: &[
        "Rejoice with the user wholeheartedly; match their joy.",
        "Trace God's faithfulness through the journey that led here.",
        "Trigger a celebration for milestones and answered prayers.",
    ],
};

pub fn mode_template(mode: ChatMode) -> &'static ModeTemplate {
    match mode {
        ChatMode::Auto => &AUTO,
        ChatMode::Devotional => &DEVOTIONAL,
        ChatMode::Prayer => &PRAYER,
        ChatMode::Journal => &JOURNAL,
        ChatMode::Lectio => &LECTIO,
        ChatMode::Examen => &EXAMEN,
        ChatMode::Memory => &MEMORY,
        ChatMode::Confession => &CONFESSION,
        ChatMode::Gratitude => &GRATITUDE,
        ChatMode::Celebration => &CELEBRATION,
    }
}
