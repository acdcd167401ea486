use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};

use crate::arxiv::{listing_url, source_archive_url, ListingParser, SourceClient};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::llm::{AnalysisEngine, JudgeEngine};
use crate::models::{Article, ExtractedContent, PageResult};
use crate::pipeline::metadata::MetadataExtractor;
use crate::storage::ResultStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Crawl,
    Judge,
    Extract,
    Analyze,
    Persist,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Crawl => write!(f, "crawl"),
            Stage::Judge => write!(f, "judge"),
            Stage::Extract => write!(f, "extract"),
            Stage::Analyze => write!(f, "analyze"),
            Stage::Persist => write!(f, "persist"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub category: String,
    pub total: usize,
    pub judged: usize,
    pub relevant: usize,
    pub extracted: usize,
    pub analyzed: usize,
    pub persisted: bool,
    pub record_path: Option<PathBuf>,
    pub timings: Vec<(Stage, Duration)>,
}

#[derive(Debug, Clone)]
pub struct CategoryRun {
    pub page: PageResult,
    pub summary: RunSummary,
}

/// Drives one category through crawl, judge, extract, analyze and persist.
///
/// Only the crawl can fail the run. Every per-article call in the fan-out
/// stages is awaited to completion and its error logged, so a flaky engine
/// costs the affected articles their results and nothing else.
pub struct PipelineOrchestrator {
    source: Arc<dyn SourceClient>,
    parser: ListingParser,
    judge: Arc<dyn JudgeEngine>,
    analyzer: Arc<dyn AnalysisEngine>,
    extractor: MetadataExtractor,
    store: ResultStore,
    config: PipelineConfig,
}

impl PipelineOrchestrator {
    pub fn new(
        source: impl SourceClient + 'static,
        judge: Arc<dyn JudgeEngine>,
        analyzer: Arc<dyn AnalysisEngine>,
        store: ResultStore,
        config: PipelineConfig,
    ) -> Result<Self> {
        Ok(Self {
            source: Arc::new(source),
            parser: ListingParser::new(&config.arxiv_base_url)?,
            judge,
            analyzer,
            extractor: MetadataExtractor::new(config.max_figures, config.pdf_pages, config.pdf_dpi),
            store,
            config,
        })
    }

    pub async fn run(&self, category: &str, run_date: NaiveDate) -> Result<CategoryRun> {
        let mut summary = RunSummary {
            category: category.to_string(),
            ..Default::default()
        };

        // Stage 1: crawl
        let started = Instant::now();
        let mut page = match self.crawl(category).await {
            Ok(page) => page,
            Err(e) => {
                tracing::error!("[{}] Crawl failed after {:.1?}: {}", category, started.elapsed(), e);
                return Err(Error::Crawl {
                    category: category.to_string(),
                    source: Box::new(e),
                });
            }
        };
        summary.total = page.articles.len();
        summary.timings.push((Stage::Crawl, started.elapsed()));
        tracing::info!(
            "[{}] Crawled {} articles in {:.1?}",
            category,
            summary.total,
            started.elapsed()
        );

        // Stage 2: judge
        let started = Instant::now();
        summary.judged = self.judge_all(&mut page).await;
        summary.timings.push((Stage::Judge, started.elapsed()));
        tracing::info!(
            "[{}] Judged {}/{} articles in {:.1?}",
            category,
            summary.judged,
            summary.total,
            started.elapsed()
        );

        let selected = page.relevant_indices();
        summary.relevant = selected.len();
        tracing::info!("[{}] {} articles marked relevant", category, summary.relevant);

        if self.config.skip_analysis {
            tracing::info!("[{}] Deep analysis disabled, skipping extraction", category);
        } else {
            // Stage 3: metadata extraction
            let started = Instant::now();
            summary.extracted = self.extract_all(&mut page, &selected).await;
            summary.timings.push((Stage::Extract, started.elapsed()));
            tracing::info!(
                "[{}] Extracted content for {}/{} articles in {:.1?}",
                category,
                summary.extracted,
                selected.len(),
                started.elapsed()
            );

            // Stage 4: deep analysis
            let with_content: Vec<usize> = selected
                .iter()
                .copied()
                .filter(|&i| page.articles[i].has_content())
                .collect();
            let started = Instant::now();
            summary.analyzed = self.analyze_all(&mut page, &with_content, run_date).await;
            summary.timings.push((Stage::Analyze, started.elapsed()));
            tracing::info!(
                "[{}] Analyzed {}/{} articles in {:.1?}",
                category,
                summary.analyzed,
                with_content.len(),
                started.elapsed()
            );
        }

        // Stage 5: persist
        let started = Instant::now();
        tracing::info!(
            "[{}] Persisting {} articles for {}",
            category,
            page.articles.len(),
            run_date
        );
        match self.store.save_page(run_date, &page) {
            Ok(path) => {
                tracing::info!("[{}] Saved record to {}", category, path.display());
                summary.persisted = true;
                summary.record_path = Some(path);
            }
            Err(e) => {
                tracing::error!("[{}] Failed to persist record: {}", category, e);
            }
        }
        summary.timings.push((Stage::Persist, started.elapsed()));

        Ok(CategoryRun { page, summary })
    }

    async fn crawl(&self, category: &str) -> Result<PageResult> {
        let url = listing_url(&self.config.arxiv_base_url, category);
        tracing::info!("[{}] Fetching listing {}", category, url);
        let html = self.source.fetch_text(&url).await?;
        self.parser.parse(&html, &url, category)
    }

    async fn judge_all(&self, page: &mut PageResult) -> usize {
        tracing::info!(
            "[{}] Judging {} articles with {}",
            page.category,
            page.articles.len(),
            self.judge.name()
        );
        let pb = self.progress_bar(page.articles.len(), "judged");
        let judge = self.judge.as_ref();

        let results = join_all(page.articles.iter().map(|article| {
            let pb = pb.clone();
            async move {
                let result = judge.judge(article).await;
                pb.inc(1);
                result
            }
        }))
        .await;
        pb.finish_and_clear();

        let mut succeeded = 0;
        for (article, result) in page.articles.iter_mut().zip(results) {
            match result {
                Ok(verdict) => {
                    article.verdict = Some(verdict);
                    succeeded += 1;
                }
                Err(e) => tracing::warn!(
                    "[{}] Judge failed for {}: {}",
                    article.category,
                    article.arxiv_id,
                    e
                ),
            }
        }
        succeeded
    }

    async fn extract_all(&self, page: &mut PageResult, selected: &[usize]) -> usize {
        tracing::info!(
            "[{}] Fetching sources for {} relevant articles",
            page.category,
            selected.len()
        );
        let pb = self.progress_bar(selected.len(), "extracted");

        let results = join_all(selected.iter().map(|&i| {
            let article = &page.articles[i];
            let pb = pb.clone();
            async move {
                let result = self.extract_one(article).await;
                pb.inc(1);
                result
            }
        }))
        .await;
        pb.finish_and_clear();

        let mut succeeded = 0;
        for (&i, result) in selected.iter().zip(results) {
            let article = &mut page.articles[i];
            match result {
                Ok(content) if !content.is_empty() => {
                    tracing::debug!(
                        "[{}] {}: {} texts, {} figures",
                        article.category,
                        article.arxiv_id,
                        content.texts.len(),
                        content.figures.len()
                    );
                    article.content = Some(content);
                    succeeded += 1;
                }
                Ok(_) => tracing::warn!(
                    "[{}] No usable source content for {}",
                    article.category,
                    article.arxiv_id
                ),
                Err(e) => tracing::warn!(
                    "[{}] Extraction failed for {}: {}",
                    article.category,
                    article.arxiv_id,
                    e
                ),
            }
        }
        succeeded
    }

    async fn extract_one(&self, article: &Article) -> Result<ExtractedContent> {
        let url = source_archive_url(article, &self.config.arxiv_base_url)
            .ok_or_else(|| Error::MissingLink(article.arxiv_id.clone()))?;

        let archive = self.source.download(&url).await?;
        let mut files = self.source.extract(&archive).await?;
        if files.is_empty() {
            // No source bundle: arXiv hands back the PDF itself.
            files.push(archive);
        }

        Ok(self.extractor.extract(&files).await)
    }

    async fn analyze_all(&self, page: &mut PageResult, indices: &[usize], run_date: NaiveDate) -> usize {
        tracing::info!(
            "[{}] Analyzing {} articles with {}",
            page.category,
            indices.len(),
            self.analyzer.name()
        );
        let pb = self.progress_bar(indices.len(), "analyzed");
        let analyzer = self.analyzer.as_ref();

        let inputs: Vec<(usize, &ExtractedContent)> = indices
            .iter()
            .filter_map(|&i| page.articles[i].content.as_ref().map(|c| (i, c)))
            .collect();
        let positions: Vec<usize> = inputs.iter().map(|(i, _)| *i).collect();

        let results = join_all(inputs.into_iter().map(|(_, content)| {
            let pb = pb.clone();
            async move {
                let result = analyzer.analyze(content).await;
                pb.inc(1);
                result
            }
        }))
        .await;
        pb.finish_and_clear();

        let mut succeeded = 0;
        for (i, result) in positions.into_iter().zip(results) {
            let article = &mut page.articles[i];
            match result {
                Ok(report) => {
                    if let Err(e) =
                        self.store
                            .write_report(run_date, &article.category, &article.arxiv_id, &report)
                    {
                        tracing::warn!(
                            "[{}] Could not write report for {}: {}",
                            article.category,
                            article.arxiv_id,
                            e
                        );
                    }
                    article.analysis = Some(report);
                    succeeded += 1;
                }
                Err(e) => tracing::warn!(
                    "[{}] Analysis failed for {}: {}",
                    article.category,
                    article.arxiv_id,
                    e
                ),
            }
        }
        succeeded
    }

    fn progress_bar(&self, len: usize, unit: &str) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        let template = format!(
            "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {}",
            unit
        );
        if let Ok(style) = ProgressStyle::default_bar().template(&template) {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}
