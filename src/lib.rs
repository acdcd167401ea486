pub mod arxiv;
pub mod config;
pub mod digest;
pub mod error;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod storage;
pub mod taxonomy;

pub use arxiv::{ArxivClient, ListingParser, SourceClient};
pub use config::{Config, EngineConfig, PipelineConfig, SourceConfig, StoragePaths};
pub use error::{Error, Result};
pub use llm::{AnalysisEngine, JudgeEngine, OpenAiProvider};
pub use pipeline::{CategoryRun, MetadataExtractor, PipelineOrchestrator, RunSummary};
pub use storage::{ResultStore, RunLedger, RunRecord, RunStatus};
