use std::path::PathBuf;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use futures::future::join_all;
use tracing_subscriber::EnvFilter;

use arxivdaily::digest::{self, DigestStyle};
use arxivdaily::{
    taxonomy, AnalysisEngine, ArxivClient, CategoryRun, Config, EngineConfig, JudgeEngine,
    OpenAiProvider, PipelineConfig, PipelineOrchestrator, ResultStore, RunLedger, RunRecord,
    RunStatus, SourceConfig, StoragePaths,
};

#[derive(Parser, Debug)]
#[command(name = "arxivdaily")]
#[command(version = "0.1.0")]
#[command(about = "Crawl new arXiv listings, triage them with an LLM and analyze the relevant papers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the pipeline for one or more categories
    Run {
        /// Categories to process, comma separated (defaults to PREFER_CATEGORY)
        #[arg(short, long, value_delimiter = ',')]
        categories: Vec<String>,

        /// Stop after judging; no downloads, no deep analysis
        #[arg(long)]
        skip_analysis: bool,

        /// Run date used for output paths (defaults to today, UTC)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Write the combined digest after all categories finish
        #[arg(long)]
        publish: bool,

        /// Digest style used with --publish (table, detail)
        #[arg(long, default_value = "table")]
        style: DigestStyle,

        /// Hide progress bars
        #[arg(long)]
        no_progress: bool,
    },

    /// Combine a day's category records into one Markdown digest
    Combine {
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Digest style (table, detail)
        #[arg(long, default_value = "table")]
        style: DigestStyle,

        /// Output file (defaults to {report dir}/{date}/{date}-Arxiv.md)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the recorded outcome of each category run for a day
    Status {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("arxivdaily=info".parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let today = Utc::now().date_naive();

    match cli.command {
        Command::Run {
            categories,
            skip_analysis,
            date,
            publish,
            style,
            no_progress,
        } => {
            let config = Config::from_env()?;
            let categories = if categories.is_empty() {
                config.categories.clone()
            } else {
                categories
            };
            let mut pipeline_config = PipelineConfig::from(&config);
            pipeline_config.skip_analysis = skip_analysis;
            pipeline_config.show_progress = !no_progress;

            let run_date = date.unwrap_or(today);
            let outcome = run_categories(&config, &categories, pipeline_config, run_date).await;

            let store = ResultStore::new(&config.report_dir);
            finish_run(outcome, publish.then_some((&store, run_date, style)))?;
        }
        Command::Combine { date, style, output } => {
            let paths = StoragePaths::from_env();
            let store = ResultStore::new(&paths.report_dir);
            combine(&store, date.unwrap_or(today), style, output)?;
        }
        Command::Status { date } => {
            let paths = StoragePaths::from_env();
            let ledger = RunLedger::new(&paths.database_path)?;
            print_status(&ledger, date.unwrap_or(today))?;
        }
    }

    Ok(())
}

async fn run_categories(
    config: &Config,
    categories: &[String],
    pipeline_config: PipelineConfig,
    run_date: NaiveDate,
) -> anyhow::Result<()> {
    for category in categories {
        if !taxonomy::is_known_category(category) {
            tracing::warn!("{} is not a known arXiv CS category", category);
        }
    }

    let engine_config = EngineConfig::from(config);
    let judge: Arc<dyn JudgeEngine> =
        Arc::new(OpenAiProvider::new(&engine_config, config.judge_model.clone())?);
    let analyzer: Arc<dyn AnalysisEngine> =
        Arc::new(OpenAiProvider::new(&engine_config, config.analyzer_model.clone())?);
    let store = ResultStore::new(&config.report_dir);
    let source_config = SourceConfig::from(config);
    let ledger = RunLedger::new(&config.database_path)?;

    tracing::info!(
        "Starting run for {} on {} ({} categories)",
        categories.join(", "),
        run_date,
        categories.len()
    );

    let results = join_all(categories.iter().map(|category| {
        let judge = judge.clone();
        let analyzer = analyzer.clone();
        let store = store.clone();
        let source_config = source_config.for_category(category);
        let pipeline_config = pipeline_config.clone();
        async move {
            run_category(
                category,
                run_date,
                source_config,
                judge,
                analyzer,
                store,
                pipeline_config,
            )
            .await
        }
    }))
    .await;

    let mut failed = Vec::new();
    for (category, result) in categories.iter().zip(results) {
        let record = match result {
            Ok(run) => {
                let summary = &run.summary;
                println!(
                    "{}: {} articles, {} judged, {} relevant, {} extracted, {} analyzed{}",
                    category,
                    summary.total,
                    summary.judged,
                    summary.relevant,
                    summary.extracted,
                    summary.analyzed,
                    if summary.persisted { "" } else { " (record NOT saved)" }
                );
                RunRecord::from_summary(run_date, summary)
            }
            Err(e) => {
                tracing::error!("[{}] Run failed: {}", category, e);
                failed.push(category.as_str());
                RunRecord::failed(run_date, category, e.to_string())
            }
        };
        if record.status == RunStatus::Incomplete {
            failed.push(category.as_str());
        }
        if let Err(e) = ledger.record(&record) {
            tracing::error!("[{}] Could not record run in ledger: {}", category, e);
        }
    }

    if !failed.is_empty() {
        anyhow::bail!(
            "{} of {} categories did not complete: {}",
            failed.len(),
            categories.len(),
            failed.join(", ")
        );
    }

    Ok(())
}

async fn run_category(
    category: &str,
    run_date: NaiveDate,
    source_config: SourceConfig,
    judge: Arc<dyn JudgeEngine>,
    analyzer: Arc<dyn AnalysisEngine>,
    store: ResultStore,
    pipeline_config: PipelineConfig,
) -> arxivdaily::Result<CategoryRun> {
    // One HTTP pool per category, released when the client drops.
    let source = ArxivClient::new(source_config)?;
    let orchestrator = PipelineOrchestrator::new(source, judge, analyzer, store, pipeline_config)?;
    orchestrator.run(category, run_date).await
}

/// Publishes before surfacing a failed run, so categories that finished
/// still make it into the digest.
fn finish_run(
    outcome: anyhow::Result<()>,
    publish: Option<(&ResultStore, NaiveDate, DigestStyle)>,
) -> anyhow::Result<()> {
    if let Some((store, date, style)) = publish {
        combine(store, date, style, None)?;
    }
    outcome
}

fn combine(
    store: &ResultStore,
    date: NaiveDate,
    style: DigestStyle,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let pages = store.load_all(date)?;
    if pages.is_empty() {
        tracing::warn!("No category records found under {}", store.date_dir(date).display());
    }

    let markdown = digest::render(&pages, style);
    let path = match output {
        Some(path) => {
            std::fs::write(&path, &markdown)?;
            path
        }
        None => store.write_digest(date, &markdown)?,
    };

    tracing::info!("Digest for {} categories written to: {}", pages.len(), path.display());
    Ok(())
}

fn print_status(ledger: &RunLedger, date: NaiveDate) -> anyhow::Result<()> {
    let runs = ledger.list(date)?;
    if runs.is_empty() {
        println!("No runs recorded for {}", date);
        return Ok(());
    }

    println!("| Category | Status | Articles | Judged | Relevant | Extracted | Analyzed | Finished | Error |");
    println!("|----------|--------|----------|--------|----------|-----------|----------|----------|-------|");
    for run in runs {
        println!(
            "| {} | {} | {} | {} | {} | {} | {} | {} | {} |",
            run.category,
            run.status,
            run.total,
            run.judged,
            run.relevant,
            run.extracted,
            run.analyzed,
            run.finished_at.format("%H:%M:%S UTC"),
            run.error.as_deref().unwrap_or("")
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arxivdaily::models::PageResult;

    #[test]
    fn test_failed_run_still_publishes() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::new(dir.path());
        let date = NaiveDate::from_ymd_opt(2025, 11, 25).unwrap();
        let page = PageResult {
            category: "cs.AI".to_string(),
            url: "https://arxiv.org/list/cs.AI/new".to_string(),
            scraped_at: Utc::now(),
            articles: vec![],
        };
        store.save_page(date, &page).unwrap();

        let err = finish_run(
            Err(anyhow::anyhow!("1 of 2 categories did not complete: cs.LG")),
            Some((&store, date, DigestStyle::Table)),
        )
        .unwrap_err();

        assert!(err.to_string().contains("cs.LG"));
        let digest = std::fs::read_to_string(store.digest_path(date)).unwrap();
        assert!(digest.contains("# cs.AI"));
    }

    #[test]
    fn test_no_publish_leaves_no_digest() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::new(dir.path());
        let date = NaiveDate::from_ymd_opt(2025, 11, 25).unwrap();

        finish_run(Ok(()), None).unwrap();
        assert!(!store.digest_path(date).exists());
    }
}
