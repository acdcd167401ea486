use serde::{Deserialize, Serialize};

/// The judge's decision for one article.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Verdict {
    #[serde(alias = "chinese_name")]
    pub translated_title: String,
    #[serde(alias = "chinese_abstract")]
    pub translated_abstract: String,
    #[serde(alias = "worth_read")]
    pub relevant: bool,
    #[serde(alias = "comment")]
    pub rationale: String,
}
