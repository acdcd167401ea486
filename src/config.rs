use crate::error::{Error, Result};
use reqwest::Url;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub judge_model: String,
    pub analyzer_model: String,
    pub max_figures: usize,
    pub research_prefer: String,
    pub research_not_prefer: String,
    pub translation_language: String,
    pub categories: Vec<String>,
    pub arxiv_base_url: String,
    pub report_dir: PathBuf,
    pub download_dir: PathBuf,
    pub database_path: String,
    pub connect_timeout_secs: u64,
    pub listing_timeout_secs: u64,
    pub download_timeout_secs: u64,
    pub llm_timeout_secs: u64,
    pub pdf_dpi: u32,
    pub pdf_pages: PageRange,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY")
            .map_err(|_| Error::Config("OPENAI_API_KEY environment variable not set".to_string()))?;

        let base_url = env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());

        let judge_model = env::var("JUDGE_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let analyzer_model = env::var("ANALYZER_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());

        let categories = parse_categories(
            &env::var("PREFER_CATEGORY").unwrap_or_else(|_| "cs.AI".to_string()),
        );
        if categories.is_empty() {
            return Err(Error::Config("PREFER_CATEGORY lists no categories".to_string()));
        }

        let pdf_pages = PageRange {
            first: env_parse("PDF_FIRST_PAGE"),
            last: env_parse("PDF_LAST_PAGE"),
        };
        if let (Some(first), Some(last)) = (pdf_pages.first, pdf_pages.last) {
            if first > last {
                return Err(Error::Config(format!(
                    "PDF_FIRST_PAGE ({}) is after PDF_LAST_PAGE ({})",
                    first, last
                )));
            }
        }

        let arxiv_base_url =
            env::var("ARXIV_BASE_URL").unwrap_or_else(|_| "https://arxiv.org".to_string());
        Url::parse(&arxiv_base_url).map_err(|e| {
            Error::Config(format!("ARXIV_BASE_URL {:?} is not a URL: {}", arxiv_base_url, e))
        })?;

        let paths = StoragePaths::from_env();

        Ok(Self {
            api_key,
            base_url,
            judge_model,
            analyzer_model,
            max_figures: env_parse("MAX_FIGURE_NUM").unwrap_or(40),
            research_prefer: env::var("RESEARCH_PREFER").unwrap_or_default(),
            research_not_prefer: env::var("RESEARCH_NOT_PREFER").unwrap_or_default(),
            translation_language: env::var("TRANSLATION_LANGUAGE")
                .unwrap_or_else(|_| "Chinese".to_string()),
            categories,
            arxiv_base_url,
            report_dir: paths.report_dir,
            download_dir: env::var("DOWNLOAD_PATH")
                .unwrap_or_else(|_| "downloads".to_string())
                .into(),
            database_path: paths.database_path,
            connect_timeout_secs: env_parse("CONNECT_TIMEOUT_SECS").unwrap_or(40),
            listing_timeout_secs: env_parse("LISTING_TIMEOUT_SECS").unwrap_or(20),
            download_timeout_secs: env_parse("DOWNLOAD_TIMEOUT_SECS").unwrap_or(300),
            llm_timeout_secs: env_parse("LLM_TIMEOUT_SECS").unwrap_or(300),
            pdf_dpi: env_parse("PDF_RENDER_DPI").unwrap_or(100),
            pdf_pages,
        })
    }
}

/// Where results and the run ledger live. Commands that only read past
/// runs need nothing else, so this loads without an API key.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    pub report_dir: PathBuf,
    pub database_path: String,
}

impl StoragePaths {
    pub fn from_env() -> Self {
        Self {
            report_dir: env::var("ANALYZE_REPORT_PATH")
                .unwrap_or_else(|_| "reports".to_string())
                .into(),
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "arxivdaily.db".to_string()),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Splits a comma or whitespace separated category list, dropping blanks
/// and repeats while keeping the first-seen order.
pub fn parse_categories(raw: &str) -> Vec<String> {
    let mut categories: Vec<String> = Vec::new();
    for part in raw.split(|c: char| c == ',' || c.is_whitespace()) {
        let part = part.trim();
        if !part.is_empty() && !categories.iter().any(|c| c == part) {
            categories.push(part.to_string());
        }
    }
    categories
}

/// Inclusive, 1-based page selection for PDF rendering. Unset bounds mean
/// "from the first page" / "through the last page".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRange {
    pub first: Option<u32>,
    pub last: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub arxiv_base_url: String,
    pub max_figures: usize,
    pub skip_analysis: bool,
    pub show_progress: bool,
    pub pdf_dpi: u32,
    pub pdf_pages: PageRange,
}

impl From<&Config> for PipelineConfig {
    fn from(config: &Config) -> Self {
        Self {
            arxiv_base_url: config.arxiv_base_url.clone(),
            max_figures: config.max_figures,
            skip_analysis: false,
            show_progress: true,
            pdf_dpi: config.pdf_dpi,
            pdf_pages: config.pdf_pages,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub download_dir: PathBuf,
    pub connect_timeout: Duration,
    pub listing_timeout: Duration,
    pub download_timeout: Duration,
    pub max_idle_per_host: usize,
}

impl SourceConfig {
    /// Categories run concurrently and share cross-listed papers, so each
    /// gets its own download and extraction tree.
    pub fn for_category(&self, category: &str) -> Self {
        Self {
            download_dir: self.download_dir.join(category.replace(['/', '\\'], "_")),
            ..self.clone()
        }
    }
}

impl From<&Config> for SourceConfig {
    fn from(config: &Config) -> Self {
        Self {
            download_dir: config.download_dir.clone(),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            listing_timeout: Duration::from_secs(config.listing_timeout_secs),
            download_timeout: Duration::from_secs(config.download_timeout_secs),
            max_idle_per_host: 200,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub research_prefer: String,
    pub research_not_prefer: String,
    pub translation_language: String,
}

impl From<&Config> for EngineConfig {
    fn from(config: &Config) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            timeout: Duration::from_secs(config.llm_timeout_secs),
            research_prefer: config.research_prefer.clone(),
            research_not_prefer: config.research_not_prefer.clone(),
            translation_language: config.translation_language.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_categories() {
        assert_eq!(
            parse_categories("cs.AI, cs.CL cs.AI,,cs.OS"),
            vec!["cs.AI", "cs.CL", "cs.OS"]
        );
        assert!(parse_categories(" , ").is_empty());
    }

    #[test]
    fn test_source_config_per_category() {
        let shared = SourceConfig {
            download_dir: PathBuf::from("downloads"),
            connect_timeout: Duration::from_secs(40),
            listing_timeout: Duration::from_secs(20),
            download_timeout: Duration::from_secs(300),
            max_idle_per_host: 200,
        };

        let ai = shared.for_category("cs.AI");
        let lg = shared.for_category("cs.LG");
        assert_eq!(ai.download_dir, PathBuf::from("downloads/cs.AI"));
        assert_ne!(ai.download_dir, lg.download_dir);
        assert_eq!(ai.download_timeout, shared.download_timeout);
        assert_eq!(shared.for_category("../x").download_dir, PathBuf::from("downloads/.._x"));
    }
}
