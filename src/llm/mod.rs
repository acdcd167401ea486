pub mod provider;
pub mod openai;
pub mod prompts;
pub mod parser;

pub use provider::{AnalysisEngine, JudgeEngine};
pub use openai::OpenAiProvider;
