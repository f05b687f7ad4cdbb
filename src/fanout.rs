use futures_util::future::join_all;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::llm::Completer;
use crate::progress::{AgentProgress, ProgressSink};
use crate::specialist::Specialist;

/// A specialist paired with the system instruction it runs under.
#[derive(Debug, Clone, Copy)]
pub struct Brief<'a> {
    pub specialist: Specialist,
    pub system: &'a str,
}

impl<'a> Brief<'a> {
    pub fn new(specialist: Specialist, system: &'a str) -> Self {
        Brief { specialist, system }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisResult {
    pub per_specialist: BTreeMap<Specialist, String>,
    pub combined: String,
}

/// Runs a panel of specialists concurrently on one payload, waits for all of
/// them, then hands their labeled outputs to a synthesizer.
pub struct FanOut {
    completer: Completer,
    progress: ProgressSink,
}

impl FanOut {
    pub fn new(completer: Completer) -> Self {
        FanOut {
            completer,
            progress: ProgressSink::none(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    /// A specialist listed more than once runs once, at its first position.
    pub async fn run(&self, panel: &[Brief<'_>], payload: &str, synthesizer: Brief<'_>) -> SynthesisResult {
        let mut seen = BTreeSet::new();
        let panel: Vec<&Brief<'_>> = panel
            .iter()
            .filter(|brief| seen.insert(brief.specialist))
            .collect();
        self.progress.send(AgentProgress::SpecialistsStarted(panel.len()));

        let calls = panel.iter().map(|brief| async move {
            let text = self
                .completer
                .complete(brief.specialist, brief.system, payload)
                .await;
            self.progress.send(AgentProgress::SpecialistCompleted(brief.specialist));
            (brief.specialist, text)
        });
        // Completion never fails, so the barrier always yields one output per specialist.
        let outputs: Vec<(Specialist, String)> = join_all(calls).await;

        log::info!("[FanOut] All {} specialists responded, synthesizing", outputs.len());
        self.progress.send(AgentProgress::Synthesizing);

        let synthesis_input = labeled_sections(&outputs);
        let combined = self
            .completer
            .complete(synthesizer.specialist, synthesizer.system, &synthesis_input)
            .await;

        SynthesisResult {
            per_specialist: outputs.into_iter().collect(),
            combined,
        }
    }
}

pub fn labeled_sections(outputs: &[(Specialist, String)]) -> String {
    outputs
        .iter()
        .map(|(specialist, text)| format!("{}: {}", specialist.label(), text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback;
    use crate::testing::ScriptedModel;
    use anyhow::anyhow;
    use std::sync::Arc;

    const PANEL: [Brief<'static>; 4] = [
        Brief { specialist: Specialist::StageStrategist, system: "stage" },
        Brief { specialist: Specialist::ObjectionAnticipator, system: "objections" },
        Brief { specialist: Specialist::PricingStrategist, system: "pricing" },
        Brief { specialist: Specialist::RelationshipAdvisor, system: "contacts" },
    ];

    fn synthesizer() -> Brief<'static> {
        Brief::new(Specialist::CoachSynthesizer, "synthesize")
    }

    #[tokio::test]
    async fn synthesis_sees_exactly_one_section_per_specialist() {
        let model = Arc::new(ScriptedModel::new(|request| Ok(format!("advice from {}", request.system))));
        let fan_out = FanOut::new(Completer::new(model.clone(), "gpt-4o", 0.7));

        let result = fan_out.run(&PANEL, "Deal Information: {}", synthesizer()).await;

        assert_eq!(result.per_specialist.len(), 4);
        assert_eq!(result.combined, "advice from synthesize");

        let synthesis = model.requests_matching("synthesize");
        assert_eq!(synthesis.len(), 1);
        let sections: Vec<&str> = synthesis[0].user.split("\n\n").collect();
        assert_eq!(
            sections,
            vec![
                "Stage Strategy: advice from stage",
                "Objection Handling: advice from objections",
                "Pricing Strategy: advice from pricing",
                "Contact Approach: advice from contacts",
            ]
        );
        // Synthesis is the last call issued.
        assert_eq!(model.requests().last().map(|r| r.system.as_str()), Some("synthesize"));
    }

    #[tokio::test]
    async fn repeated_specialist_runs_once() {
        let model = Arc::new(ScriptedModel::new(|request| Ok(format!("advice from {}", request.system))));
        let fan_out = FanOut::new(Completer::new(model.clone(), "gpt-4o", 0.7));
        let panel = [PANEL[0], PANEL[2], Brief::new(Specialist::StageStrategist, "stage again")];

        let result = fan_out.run(&panel, "payload", synthesizer()).await;

        assert_eq!(result.per_specialist.len(), 2);
        assert_eq!(result.per_specialist[&Specialist::StageStrategist], "advice from stage");
        let synthesis = model.requests_matching("synthesize");
        assert_eq!(
            synthesis[0].user,
            "Stage Strategy: advice from stage\n\nPricing Strategy: advice from pricing"
        );
        assert!(model.requests_matching("stage again").is_empty());
    }

    #[tokio::test]
    async fn failing_specialist_degrades_to_fallback() {
        let model = Arc::new(ScriptedModel::new(|request| {
            if request.system == "pricing" {
                Err(anyhow!("rate limited"))
            } else {
                Ok("fine".to_string())
            }
        }));
        let fan_out = FanOut::new(Completer::new(model.clone(), "gpt-4o", 0.7));

        let result = fan_out.run(&PANEL, "payload", synthesizer()).await;

        assert_eq!(result.per_specialist.len(), 4);
        assert_eq!(
            result.per_specialist[&Specialist::PricingStrategist],
            fallback::PRICING_STRATEGY
        );
        assert_eq!(result.per_specialist[&Specialist::StageStrategist], "fine");
        assert_eq!(result.combined, "fine");
        assert_eq!(model.requests().len(), 5);
    }

    #[tokio::test]
    async fn progress_reports_each_specialist_before_synthesis() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let model = Arc::new(ScriptedModel::new(|_| Ok("ok".to_string())));
        FanOut::new(Completer::new(model, "gpt-4o", 0.7))
            .with_progress(ProgressSink::new(tx))
            .run(&PANEL, "payload", synthesizer())
            .await;

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events.first(), Some(&AgentProgress::SpecialistsStarted(4)));
        assert_eq!(events.last(), Some(&AgentProgress::Synthesizing));
        assert_eq!(events.len(), 6);
    }
}
