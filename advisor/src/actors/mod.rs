//! Actor implementations for the advisor service.

pub mod knowledge;

pub use knowledge::{KnowledgeActor, KnowledgeArguments, KnowledgeMsg};
