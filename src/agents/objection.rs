use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use super::SalesAssistant;
use crate::context::{compact, DealContext};
use crate::llm::Completer;
use crate::progress::AgentProgress;
use crate::refine::{RefineAgents, RefineLoop};
use crate::specialist::Specialist;
use crate::structured::{parse_structured, Verdict};

const REBUTTAL_WRITER: &str = "You are a Response Generator for sales objections. Generate convincing responses to overcome customer objections using deal context provided.

YOUR TASK:
1. Create a persuasive response addressing the specific objection
2. Focus on value proposition and benefits
3. Use relevant context from the deal information
4. If receiving feedback, improve your response accordingly

IMPORTANT: Limit your response to exactly 50 words or less.";

const CUSTOMER_SIMULATOR: &str = "You are a Customer Simulator evaluating sales responses to objections. Analyze responses as if you were the actual customer.

YOUR TASK:
1. Determine if the response would convince the customer
2. Return a structured evaluation with:
   - is_convinced: boolean (true/false)
   - rationale: brief explanation (max 50 words)

Be realistic and critical. Consider if the response addresses core concerns, provides value, and feels authentic.

IMPORTANT: Return ONLY a valid JSON object with these two fields. DO NOT use markdown formatting, code blocks, or backticks. Return raw JSON only.";

const REBUTTAL_POLISHER: &str = "You are a Final Response Refiner for sales objections. Your task is to polish the best response generated through the iteration process.

YOUR TASK:
1. Review the final response from the Response Generator
2. Make minor improvements to tone, clarity, and persuasiveness
3. Ensure the response directly addresses the original objection
4. Maintain the core message and selling points

IMPORTANT: Keep the final response to exactly 50 words or less. Focus on refinement, not complete rewriting.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectionResult {
    pub deal_id: String,
    pub objection: String,
    pub attempts: usize,
    pub final_response: String,
    pub was_convinced: bool,
    pub raw_response: String,
    pub rationale: Option<String>,
}

struct ObjectionAgents<'a> {
    completer: &'a Completer,
    context: &'a DealContext,
    objection: &'a str,
}

#[async_trait]
impl<'a> RefineAgents for ObjectionAgents<'a> {
    async fn generate(&self, attempt: usize, max_attempts: usize, feedback: Option<&str>) -> String {
        let deal_context = compact(&self.context.rebuttal_context());
        let user = match feedback {
            Some(feedback) => format!(
                "Iteration: {}/{}\nCustomer Objection: \"{}\"\nDeal Context: {}\nPrevious feedback: {}\nGenerate improved response.",
                attempt, max_attempts, self.objection, deal_context, feedback
            ),
            None => format!(
                "Iteration: {}/{}\nCustomer Objection: \"{}\"\nDeal Context: {}\nGenerate initial response.",
                attempt, max_attempts, self.objection, deal_context
            ),
        };
        self.completer
            .complete(Specialist::RebuttalWriter, REBUTTAL_WRITER, &user)
            .await
    }

    async fn evaluate(&self, candidate: &str, attempt: usize, max_attempts: usize) -> Verdict {
        let user = format!(
            "Iteration: {}/{}\nObjection: \"{}\"\nResponse: \"{}\"\nCustomer Context: {}\nEvaluate if this response would convince the customer. Return JSON only without any markdown formatting or code blocks.",
            attempt,
            max_attempts,
            self.objection,
            candidate,
            compact(&self.context.customer_context())
        );
        let output = self
            .completer
            .complete(Specialist::CustomerSimulator, CUSTOMER_SIMULATOR, &user)
            .await;
        parse_structured(&output)
    }

    async fn finalize(&self, best: &str) -> String {
        let user = format!(
            "Objection: \"{}\"\nBest Response: \"{}\"\nDeal Context: {}\nRefine tone and phrasing.",
            self.objection,
            best,
            compact(&self.context.polish_context())
        );
        self.completer
            .complete(Specialist::RebuttalPolisher, REBUTTAL_POLISHER, &user)
            .await
    }
}

impl SalesAssistant {
    /// Draft a rebuttal, test it on a simulated customer, refine until
    /// convinced or out of attempts, then polish.
    pub async fn handle_objection(&self, deal_id: &str, objection: &str) -> Result<ObjectionResult> {
        self.progress.send(AgentProgress::Started("Objection Handler"));
        let context = self.deal_context(deal_id).await?;

        let agents = ObjectionAgents {
            completer: &self.completer,
            context: &context,
            objection,
        };
        let outcome = RefineLoop::new(self.settings.max_attempts)
            .with_progress(self.progress.clone())
            .run(&agents)
            .await;

        self.progress.send(AgentProgress::Completed);
        Ok(ObjectionResult {
            deal_id: deal_id.to_string(),
            objection: objection.to_string(),
            attempts: outcome.attempts_used,
            final_response: outcome.final_output,
            was_convinced: outcome.was_accepted,
            raw_response: outcome.best_raw_output,
            rationale: outcome.last_rationale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::indexed_assistant;
    use crate::testing::ScriptedModel;
    use std::sync::Arc;

    #[tokio::test]
    async fn convinced_customer_stops_after_one_attempt() {
        let model = Arc::new(ScriptedModel::new(|request| {
            Ok(if request.system.contains("Customer Simulator") {
                "```json\n{\"is_convinced\": true, \"rationale\": \"Clear ROI\"}\n```".to_string()
            } else if request.system.contains("Final Response Refiner") {
                "Polished rebuttal".to_string()
            } else {
                "Draft rebuttal".to_string()
            })
        }));
        let (assistant, _dir) = indexed_assistant(model.clone()).await;

        let result = assistant
            .handle_objection("d-1", "Your price is too high")
            .await
            .unwrap();

        assert_eq!(result.attempts, 1);
        assert!(result.was_convinced);
        assert_eq!(result.final_response, "Polished rebuttal");
        assert_eq!(result.raw_response, "Draft rebuttal");
        assert_eq!(result.rationale.as_deref(), Some("Clear ROI"));

        let drafts = model.requests_matching("You are a Response Generator");
        assert_eq!(drafts.len(), 1);
        assert!(drafts[0].user.starts_with("Iteration: 1/3\nCustomer Objection: \"Your price is too high\""));
        assert!(!drafts[0].user.contains("Previous feedback"));
        assert!(model
            .requests()
            .iter()
            .all(|r| r.system.ends_with("\nRespond in ≤50 words.")));
    }

    #[tokio::test]
    async fn unconvinced_customer_exhausts_attempts_with_feedback() {
        let model = Arc::new(ScriptedModel::new(|request| {
            Ok(if request.system.contains("Customer Simulator") {
                "{\"is_convinced\": false, \"rationale\": \"Still too expensive\"}".to_string()
            } else {
                "Some rebuttal".to_string()
            })
        }));
        let (assistant, _dir) = indexed_assistant(model.clone()).await;

        let result = assistant.handle_objection("d-1", "Too expensive").await.unwrap();

        assert_eq!(result.attempts, 3);
        assert!(!result.was_convinced);
        assert_eq!(result.rationale.as_deref(), Some("Still too expensive"));
        assert!(!result.final_response.is_empty());

        let drafts = model.requests_matching("You are a Response Generator");
        assert_eq!(drafts.len(), 3);
        assert!(drafts[2].user.starts_with("Iteration: 3/3"));
        assert!(drafts[2].user.contains("Previous feedback: Still too expensive"));
        assert_eq!(model.requests_matching("Final Response Refiner").len(), 1);
    }

    #[tokio::test]
    async fn garbled_judge_counts_as_not_convinced() {
        let model = Arc::new(ScriptedModel::new(|request| {
            Ok(if request.system.contains("Customer Simulator") {
                "I think they'd probably agree!".to_string()
            } else {
                "Rebuttal".to_string()
            })
        }));
        let (assistant, _dir) = indexed_assistant(model).await;

        let result = assistant.handle_objection("d-1", "Not now").await.unwrap();
        assert_eq!(result.attempts, 3);
        assert!(!result.was_convinced);
        assert_eq!(
            result.rationale.as_deref(),
            Some("Invalid format from judge, treated as not acceptable.")
        );
    }
}
