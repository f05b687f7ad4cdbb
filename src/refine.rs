use async_trait::async_trait;
use serde::Serialize;

use crate::progress::{AgentProgress, ProgressSink};
use crate::structured::Verdict;

/// The three roles of a critique-refine loop.
#[async_trait]
pub trait RefineAgents: Send + Sync {
    /// Draft a candidate. `feedback` is the previous judge's rationale and is
    /// `None` on the first attempt.
    async fn generate(&self, attempt: usize, max_attempts: usize, feedback: Option<&str>) -> String;

    async fn evaluate(&self, candidate: &str, attempt: usize, max_attempts: usize) -> Verdict;

    async fn finalize(&self, best: &str) -> String;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoopResult {
    pub attempts_used: usize,
    pub final_output: String,
    pub was_accepted: bool,
    pub best_raw_output: String,
    pub last_rationale: Option<String>,
}

/// Generate, evaluate, retry with feedback until accepted or out of
/// attempts, then polish the last candidate once.
#[derive(Debug, Clone)]
pub struct RefineLoop {
    max_attempts: usize,
    progress: ProgressSink,
}

impl RefineLoop {
    pub fn new(max_attempts: usize) -> Self {
        RefineLoop {
            max_attempts: max_attempts.max(1),
            progress: ProgressSink::none(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub async fn run<A: RefineAgents + ?Sized>(&self, agents: &A) -> LoopResult {
        let max = self.max_attempts;
        let mut attempts_used = 0;
        let mut candidate = String::new();
        let mut feedback: Option<String> = None;
        let mut was_accepted = false;

        while attempts_used < max {
            attempts_used += 1;

            self.progress.send(AgentProgress::Generating(attempts_used, max));
            candidate = agents.generate(attempts_used, max, feedback.as_deref()).await;

            self.progress.send(AgentProgress::Evaluating(attempts_used, max));
            let verdict = agents.evaluate(&candidate, attempts_used, max).await;
            feedback = Some(verdict.rationale);

            if verdict.is_acceptable {
                log::info!("[RefineLoop] Accepted on attempt {}/{}", attempts_used, max);
                was_accepted = true;
                break;
            }
            log::info!("[RefineLoop] Attempt {}/{} rejected", attempts_used, max);
        }

        if !was_accepted {
            log::info!("[RefineLoop] Max attempts reached. Using last candidate.");
        }

        self.progress.send(AgentProgress::Finalizing);
        let final_output = agents.finalize(&candidate).await;

        LoopResult {
            attempts_used,
            final_output,
            was_accepted,
            best_raw_output: candidate,
            last_rationale: feedback,
        }
    }
}
