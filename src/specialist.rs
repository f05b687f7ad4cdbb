use serde::{Deserialize, Serialize};
use std::fmt;

use crate::fallback;

/// Identifies which single-purpose prompt is issuing a model call.
///
/// The tag travels with every completion request so the degraded path can
/// pick canned guidance without looking at prompt wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Specialist {
    // Deal coach panel
    StageStrategist,
    ObjectionAnticipator,
    PricingStrategist,
    RelationshipAdvisor,
    CoachSynthesizer,
    // Objection handler
    RebuttalWriter,
    CustomerSimulator,
    RebuttalPolisher,
    // Win-loss explainer
    WinExplainer,
    LossExplainer,
    ExplanationValidator,
    ExplanationEditor,
    // Persona builder
    ProfileAnalyzer,
    PersonaGenerator,
    CommunicationAdvisor,
}

impl Specialist {
    pub const COACH_PANEL: [Specialist; 4] = [
        Specialist::StageStrategist,
        Specialist::ObjectionAnticipator,
        Specialist::PricingStrategist,
        Specialist::RelationshipAdvisor,
    ];

    /// Section label used when this specialist's output is handed to a synthesizer.
    pub fn label(&self) -> &'static str {
        match self {
            Specialist::StageStrategist => "Stage Strategy",
            Specialist::ObjectionAnticipator => "Objection Handling",
            Specialist::PricingStrategist => "Pricing Strategy",
            Specialist::RelationshipAdvisor => "Contact Approach",
            Specialist::CoachSynthesizer => "Coaching Plan",
            Specialist::RebuttalWriter => "Rebuttal",
            Specialist::CustomerSimulator => "Customer Reaction",
            Specialist::RebuttalPolisher => "Final Rebuttal",
            Specialist::WinExplainer => "Win Explanation",
            Specialist::LossExplainer => "Loss Explanation",
            Specialist::ExplanationValidator => "Validation",
            Specialist::ExplanationEditor => "Final Explanation",
            Specialist::ProfileAnalyzer => "Profile Analysis",
            Specialist::PersonaGenerator => "Persona",
            Specialist::CommunicationAdvisor => "Communication Advice",
        }
    }

    /// Hard word ceiling appended to the system instruction, if any.
    pub fn word_limit(&self) -> Option<u32> {
        match self {
            Specialist::RebuttalWriter
            | Specialist::CustomerSimulator
            | Specialist::RebuttalPolisher => Some(50),
            _ => None,
        }
    }

    /// Canned text substituted when the model call fails.
    pub fn fallback_text(&self, user_payload: &str) -> String {
        match self {
            Specialist::StageStrategist => fallback::stage_strategy(user_payload).to_string(),
            Specialist::ObjectionAnticipator => fallback::OBJECTION_HANDLING.to_string(),
            Specialist::PricingStrategist => fallback::PRICING_STRATEGY.to_string(),
            Specialist::RelationshipAdvisor => fallback::CONTACT_APPROACH.to_string(),
            Specialist::CoachSynthesizer => fallback::COACHING_PLAN.to_string(),
            _ => fallback::GENERIC_ERROR.to_string(),
        }
    }
}

impl fmt::Display for Specialist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
