use std::fmt;
use tokio::sync::mpsc;

use crate::specialist::Specialist;

#[derive(Debug, Clone, PartialEq)]
pub enum AgentProgress {
    Started(&'static str), // agent name
    AssemblingContext,
    Generating(usize, usize), // current attempt, max attempts
    Evaluating(usize, usize),
    Finalizing,
    SpecialistsStarted(usize), // number of specialists
    SpecialistCompleted(Specialist),
    Synthesizing,
    Completed,
}

impl fmt::Display for AgentProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentProgress::Started(agent) => write!(f, "{} started", agent),
            AgentProgress::AssemblingContext => f.write_str("Assembling context"),
            AgentProgress::Generating(n, max) => write!(f, "Generating attempt {}/{}", n, max),
            AgentProgress::Evaluating(n, max) => write!(f, "Evaluating attempt {}/{}", n, max),
            AgentProgress::Finalizing => f.write_str("Finalizing"),
            AgentProgress::SpecialistsStarted(n) => write!(f, "Running {} specialists", n),
            AgentProgress::SpecialistCompleted(specialist) => write!(f, "{} ready", specialist),
            AgentProgress::Synthesizing => f.write_str("Synthesizing"),
            AgentProgress::Completed => f.write_str("Completed"),
        }
    }
}

/// Optional progress channel. Sends are fire-and-forget; a dropped receiver
/// is not an error.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    tx: Option<mpsc::UnboundedSender<AgentProgress>>,
}

impl ProgressSink {
    pub fn new(tx: mpsc::UnboundedSender<AgentProgress>) -> Self {
        ProgressSink { tx: Some(tx) }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn send(&self, progress: AgentProgress) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(progress);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_forwards_and_tolerates_closed_receiver() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = ProgressSink::new(tx);
        sink.send(AgentProgress::Generating(1, 3));
        assert_eq!(rx.try_recv().unwrap(), AgentProgress::Generating(1, 3));

        drop(rx);
        sink.send(AgentProgress::Completed);
        ProgressSink::none().send(AgentProgress::Finalizing);
    }

    #[test]
    fn progress_displays_counters() {
        assert_eq!(AgentProgress::Evaluating(2, 3).to_string(), "Evaluating attempt 2/3");
        assert_eq!(
            AgentProgress::SpecialistCompleted(Specialist::PricingStrategist).to_string(),
            "Pricing Strategy ready"
        );
    }
}
