pub mod agents;
pub mod config;
pub mod context;
pub mod documents;
pub mod embeddings;
pub mod entities;
pub mod fallback;
pub mod fanout;
pub mod llm;
pub mod progress;
pub mod refine;
pub mod specialist;
pub mod store;
pub mod structured;
pub mod vector;

#[cfg(test)]
mod testing;

pub use agents::SalesAssistant;
pub use config::Config;
