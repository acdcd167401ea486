use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },

    #[error("Failed to crawl {category}: {source}")]
    Crawl {
        category: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Listing page error: {0}")]
    Listing(String),

    #[error("LLM API error: {0}")]
    LLMApi(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("PDF render error: {0}")]
    Render(String),

    #[error("Article {0} has no PDF link")]
    MissingLink(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Only crawl failures abort a category run; everything else is
    /// absorbed at the article boundary or reported as an incomplete run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Crawl { .. })
    }
}
