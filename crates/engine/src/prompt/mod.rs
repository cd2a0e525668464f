//! System-instruction composition.
//!
//! [`compose`] is pure: it turns a [`PromptInputs`] into a [`PromptPlan`],
//! an ordered list of sections plus the selected mode and tier. Rendering to
//! text is a separate step so the plan can be inspected in tests.

mod base;
mod context;
mod modes;

pub use modes::{ModeTemplate, mode_template};

use selah_core::{
    BibleContext, ChatMode, DevotionalContext, QuotaContext, QuotaTier, UserContext, WitLevel,
};

/// Everything the composer reads. Borrowed for the duration of one request.
#[derive(Debug, Clone, Copy)]
pub struct PromptInputs<'a> {
    pub mode: ChatMode,
    pub wit_level: WitLevel,
    pub quota: &'a QuotaContext,
    pub devotional: Option<&'a DevotionalContext>,
    pub bible: Option<&'a BibleContext>,
    pub user: &'a UserContext,
    /// Rendered citation lines, or the no-verses sentinel.
    pub scripture: &'a str,
    /// Whether persistence tools can run for this request.
    pub signed_in: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Persona,
    Tone,
    Formatting,
    UserSnapshot,
    Devotional,
    Reading,
    Scripture,
    ToolDirectives,
    Guardrails,
    Mode,
    Tier,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    pub body: String,
}

/// Response-depth instruction chosen from the quota tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierBlock {
    /// Premium: four-part deep-dive structure.
    DeepDive,
    /// Last free seed: closing framing plus the deep-dive structure.
    ClosingSession,
    /// Few seeds left: answer comprehensively.
    Comprehensive,
    None,
}

impl TierBlock {
    pub fn for_quota(quota: &QuotaContext) -> Self {
        match quota.tier() {
            QuotaTier::Premium => Self::DeepDive,
            QuotaTier::LastSeed => Self::ClosingSession,
            QuotaTier::LowRemaining => Self::Comprehensive,
            QuotaTier::None => Self::None,
        }
    }

    fn text(&self) -> Option<String> {
        match self {
            Self::DeepDive => Some(base::DEEP_DIVE.to_string()),
            Self::ClosingSession => Some(format!("{}\n\n{}", base::CLOSING_FRAME, base::DEEP_DIVE)),
            Self::Comprehensive => Some(base::COMPREHENSIVE.to_string()),
            Self::None => None,
        }
    }
}

/// The composed instruction, before rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPlan {
    pub mode: ChatMode,
    pub tier: TierBlock,
    pub sections: Vec<Section>,
}

impl PromptPlan {
    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    pub fn render(&self) -> String {
        self.sections
            .iter()
            .map(|s| s.body.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Build the plan. Section order: persona, tone, formatting, user snapshot,
/// devotional, current reading, scripture, tool directives, guardrails, mode,
/// tier. Devotional, reading, and tier sections are omitted when empty.
pub fn compose(inputs: &PromptInputs<'_>) -> PromptPlan {
    let tier = TierBlock::for_quota(inputs.quota);
    let mut sections = Vec::with_capacity(11);
    let mut push = |kind, body: String| sections.push(Section { kind, body });

    push(SectionKind::Persona, base::PERSONA.to_string());
    push(SectionKind::Tone, base::tone(inputs.wit_level).to_string());
    push(SectionKind::Formatting, base::FORMATTING.to_string());
    push(SectionKind::UserSnapshot, context::user_snapshot(inputs.user));
    if let Some(block) = inputs.devotional.and_then(context::devotional_block) {
        push(SectionKind::Devotional, block);
    }
    if let Some(block) = inputs.bible.and_then(context::reading_block) {
        push(SectionKind::Reading, block);
    }
    push(
        SectionKind::Scripture,
        format!("{}\n{}", base::SCRIPTURE_HEADING, inputs.scripture),
    );
    push(SectionKind::ToolDirectives, base::tool_directives(inputs.signed_in));
    push(SectionKind::Guardrails, base::GUARDRAILS.to_string());
    push(SectionKind::Mode, mode_template(inputs.mode).render());
    if let Some(text) = tier.text() {
        push(SectionKind::Tier, text);
    }

    PromptPlan {
        mode: inputs.mode,
        tier,
        sections,
    }
}
