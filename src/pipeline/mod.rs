pub mod metadata;
pub mod orchestrator;

pub use metadata::MetadataExtractor;
pub use orchestrator::{CategoryRun, PipelineOrchestrator, RunSummary, Stage};
