use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::content::ExtractedContent;
use super::verdict::Verdict;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Article {
    pub index: u32,
    pub arxiv_id: String,
    pub category: String,

    pub abs_url: String,
    #[serde(default)]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub other_url: Option<String>,

    pub title: String,
    pub authors: Vec<String>,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub subjects_primary: Option<String>,
    #[serde(default)]
    pub subjects_other: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,

    pub scraped_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
    /// Never persisted: figures are base64 page renders and would dwarf the record.
    #[serde(skip)]
    pub content: Option<ExtractedContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
}

impl Article {
    pub fn is_relevant(&self) -> bool {
        self.verdict.as_ref().map(|v| v.relevant).unwrap_or(false)
    }

    pub fn has_content(&self) -> bool {
        self.content.as_ref().map(|c| !c.is_empty()).unwrap_or(false)
    }

    pub fn download_url(&self) -> &str {
        self.pdf_url.as_deref().unwrap_or(&self.abs_url)
    }

    /// The fields handed to the judge: everything scraped from the listing,
    /// nothing produced by later stages.
    pub fn metadata(&self) -> ArticleMetadata<'_> {
        ArticleMetadata {
            arxiv_id: &self.arxiv_id,
            category: &self.category,
            title: &self.title,
            authors: &self.authors,
            comments: self.comments.as_deref(),
            subjects_primary: self.subjects_primary.as_deref(),
            subjects_other: &self.subjects_other,
            abstract_text: &self.abstract_text,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ArticleMetadata<'a> {
    pub arxiv_id: &'a str,
    pub category: &'a str,
    pub title: &'a str,
    pub authors: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subjects_primary: Option<&'a str>,
    pub subjects_other: &'a [String],
    #[serde(rename = "abstract")]
    pub abstract_text: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageResult {
    pub category: String,
    pub url: String,
    pub scraped_at: DateTime<Utc>,
    #[serde(default)]
    pub articles: Vec<Article>,
}

impl PageResult {
    pub fn judged(&self) -> impl Iterator<Item = &Article> {
        self.articles.iter().filter(|a| a.verdict.is_some())
    }

    pub fn relevant_indices(&self) -> Vec<usize> {
        self.articles
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_relevant())
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::content::{ImageSegment, TextSegment};

    fn article() -> Article {
        Article {
            index: 1,
            arxiv_id: "2511.17673".to_string(),
            category: "cs.AI".to_string(),
            abs_url: "https://arxiv.org/abs/2511.17673".to_string(),
            pdf_url: Some("https://arxiv.org/pdf/2511.17673".to_string()),
            html_url: None,
            other_url: Some("https://arxiv.org/format/2511.17673".to_string()),
            title: "Structured Cognitive Loop".to_string(),
            authors: vec!["Myung Ho Kim".to_string()],
            comments: Some("27 pages".to_string()),
            subjects_primary: Some("Artificial Intelligence (cs.AI)".to_string()),
            subjects_other: vec!["Computation and Language (cs.CL)".to_string()],
            abstract_text: "Large language model agents ...".to_string(),
            scraped_at: Utc::now(),
            verdict: None,
            content: None,
            analysis: None,
        }
    }

    #[test]
    fn test_content_is_not_serialized() {
        let mut a = article();
        a.verdict = Some(Verdict {
            translated_title: "结构化认知循环".to_string(),
            translated_abstract: "摘要".to_string(),
            relevant: true,
            rationale: "agents".to_string(),
        });
        a.content = Some(ExtractedContent {
            texts: vec![TextSegment { name: "main".into(), text: "\\section{Intro}".into() }],
            figures: vec![ImageSegment { name: "fig".into(), b64: "AAAA".into(), mime: "image/png".into() }],
        });

        let json = serde_json::to_string(&a).unwrap();
        assert!(!json.contains("content"));
        assert!(!json.contains("AAAA"));
        assert!(json.contains("\"abstract\""));

        let back: Article = serde_json::from_str(&json).unwrap();
        assert!(back.content.is_none());
        a.content = None;
        assert_eq!(back, a);
    }

    #[test]
    fn test_relevance_and_download_url() {
        let mut a = article();
        assert!(!a.is_relevant());
        assert_eq!(a.download_url(), "https://arxiv.org/pdf/2511.17673");

        a.pdf_url = None;
        assert_eq!(a.download_url(), "https://arxiv.org/abs/2511.17673");

        a.verdict = Some(Verdict {
            translated_title: String::new(),
            translated_abstract: String::new(),
            relevant: false,
            rationale: String::new(),
        });
        assert!(!a.is_relevant());
    }

    #[test]
    fn test_metadata_omits_stage_output() {
        let mut a = article();
        a.analysis = Some("report".to_string());
        let json = serde_json::to_value(a.metadata()).unwrap();
        assert_eq!(json["arxiv_id"], "2511.17673");
        assert!(json.get("analysis").is_none());
        assert!(json.get("verdict").is_none());
    }
}
