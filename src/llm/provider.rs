use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Article, ExtractedContent, Verdict};

/// Decides whether an article is worth reading and translates its summary.
#[async_trait]
pub trait JudgeEngine: Send + Sync {
    async fn judge(&self, article: &Article) -> Result<Verdict>;
    fn name(&self) -> &str;
}

/// Produces a free-text report from a paper's extracted sources.
#[async_trait]
pub trait AnalysisEngine: Send + Sync {
    async fn analyze(&self, content: &ExtractedContent) -> Result<String>;
    fn name(&self) -> &str;
}
