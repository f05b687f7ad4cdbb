use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use super::SalesAssistant;
use crate::context::{compact, DealContext};
use crate::entities::{DealStage, Outcome};
use crate::llm::Completer;
use crate::progress::AgentProgress;
use crate::refine::{RefineAgents, RefineLoop};
use crate::specialist::Specialist;
use crate::structured::{parse_structured, Verdict};

const WIN_EXPLAINER: &str = "You are a Win Analysis Expert. Your job is to explain why deals were won by identifying key success factors.

YOUR TASK:
1. Analyze the deal context and identify 3-5 key factors that contributed to winning
2. Consider sales approach, value proposition alignment, relationship factors, and competitive advantages
3. Provide specific, actionable insights that can be replicated in future deals
4. If receiving feedback, improve your explanation accordingly

IMPORTANT: Limit your response to 150 words or less.";

const LOSS_EXPLAINER: &str = "You are a Loss Analysis Expert. Your job is to explain why deals were lost by identifying key failure points.

YOUR TASK:
1. Analyze the deal context and identify 3-5 key factors that contributed to losing
2. Consider gaps in sales approach, misalignment with customer needs, competitive disadvantages, and process issues
3. Provide specific, actionable insights that can prevent similar losses in future deals
4. If receiving feedback, improve your explanation accordingly

IMPORTANT: Limit your response to 150 words or less.";

const EXPLANATION_VALIDATOR: &str = "You are a Deal Analysis Validator. Your job is to evaluate explanations of why deals were won or lost.

YOUR TASK:
1. Determine if the explanation is valid based on the deal context
2. Evaluate if the explanation provides specific, actionable insights
3. Check if the explanation identifies concrete factors rather than generic statements
4. Return a structured evaluation with:
   - is_valid: boolean (true/false)
   - rationale: brief explanation (max 50 words)

IMPORTANT: Return ONLY a valid JSON object with these two fields. DO NOT use markdown formatting, code blocks, or backticks. Return raw JSON only.";

const EXPLANATION_EDITOR: &str = "You are an Explanation Editor for deal reviews. Your task is to polish the best win or loss explanation produced so far.

YOUR TASK:
1. Keep every factor the explanation identifies and its supporting evidence
2. Improve clarity and make each factor read as an actionable lesson
3. Do not invent new factors or facts that are not in the explanation

IMPORTANT: Keep the explanation to 150 words or less.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplanationResult {
    pub deal_id: String,
    pub outcome: Outcome,
    pub explanation: String,
    pub raw_explanation: String,
    pub is_valid: bool,
    pub attempts: usize,
    pub feedback: Option<String>,
}

struct ExplainerAgents<'a> {
    completer: &'a Completer,
    context: &'a DealContext,
    outcome: Outcome,
    similar_deals: usize,
}

impl ExplainerAgents<'_> {
    fn explainer(&self) -> (Specialist, &'static str, &'static str) {
        match self.outcome {
            Outcome::Won => (Specialist::WinExplainer, WIN_EXPLAINER, "win"),
            _ => (Specialist::LossExplainer, LOSS_EXPLAINER, "loss"),
        }
    }

    fn outcome_label(&self) -> &'static str {
        match self.outcome {
            Outcome::Won => "Won",
            _ => "Lost",
        }
    }
}

#[async_trait]
impl<'a> RefineAgents for ExplainerAgents<'a> {
    async fn generate(&self, attempt: usize, max_attempts: usize, feedback: Option<&str>) -> String {
        let (specialist, system, kind) = self.explainer();
        let deal_context = compact(&self.context.explainer_context(self.similar_deals));
        let user = match feedback {
            Some(feedback) => format!(
                "Iteration: {}/{}\nDeal Context: {}\nPrevious feedback: {}\nGenerate improved {} explanation.",
                attempt, max_attempts, deal_context, feedback, kind
            ),
            None => format!(
                "Iteration: {}/{}\nDeal Context: {}\nGenerate initial {} explanation.",
                attempt, max_attempts, deal_context, kind
            ),
        };
        self.completer.complete(specialist, system, &user).await
    }

    async fn evaluate(&self, candidate: &str, _attempt: usize, _max_attempts: usize) -> Verdict {
        let user = format!(
            "Deal Context: {}\nDeal Outcome: {}\nExplanation: \"{}\"\n\nEvaluate if this explanation is valid, specific, and actionable. Return JSON only without any markdown formatting or code blocks.",
            compact(&self.context.validator_context()),
            self.outcome_label(),
            candidate
        );
        let output = self
            .completer
            .complete(Specialist::ExplanationValidator, EXPLANATION_VALIDATOR, &user)
            .await;
        parse_structured(&output)
    }

    async fn finalize(&self, best: &str) -> String {
        let user = format!(
            "Deal Outcome: {}\nExplanation: \"{}\"\nDeal Context: {}\nPolish this explanation.",
            self.outcome_label(),
            best,
            compact(&self.context.polish_context())
        );
        self.completer
            .complete(Specialist::ExplanationEditor, EXPLANATION_EDITOR, &user)
            .await
    }
}

impl SalesAssistant {
    /// Explain why a deal was won or lost. Anything not closed-won is
    /// explained as a loss.
    pub async fn explain_outcome(&self, deal_id: &str) -> Result<ExplanationResult> {
        self.progress.send(AgentProgress::Started("Win-Loss Explainer"));
        let context = self.deal_context(deal_id).await?;

        let outcome = if context.current_deal.deal.stage == DealStage::ClosedWon {
            Outcome::Won
        } else {
            Outcome::Lost
        };
        log::info!("Deal {} outcome: {}", deal_id, outcome.as_str());

        let agents = ExplainerAgents {
            completer: &self.completer,
            context: &context,
            outcome,
            similar_deals: self.settings.explainer_similar_deals,
        };
        let result = RefineLoop::new(self.settings.max_attempts)
            .with_progress(self.progress.clone())
            .run(&agents)
            .await;

        self.progress.send(AgentProgress::Completed);
        Ok(ExplanationResult {
            deal_id: deal_id.to_string(),
            outcome,
            explanation: result.final_output,
            raw_explanation: result.best_raw_output,
            is_valid: result.was_accepted,
            attempts: result.attempts_used,
            feedback: result.last_rationale,
        })
    }
}
