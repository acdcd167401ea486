pub mod archive;
pub mod client;
pub mod listing;

pub use client::{ArxivClient, SourceClient};
pub use listing::ListingParser;

use reqwest::Url;

use crate::models::Article;

pub fn listing_url(base_url: &str, category: &str) -> String {
    format!("{}/list/{}/new", base_url.trim_end_matches('/'), category)
}

/// Source-archive URL for an article: the `/pdf/` path segment of its PDF
/// link swapped for `/src/`. PDF links of any other shape fall back to
/// `{base}/src/{arxiv_id}`. `None` when the article has no PDF link.
pub fn source_archive_url(article: &Article, base_url: &str) -> Option<String> {
    let pdf_url = article.pdf_url.as_deref()?;

    if let Ok(mut url) = Url::parse(pdf_url) {
        let segments: Vec<String> = url
            .path_segments()
            .map(|s| s.map(str::to_string).collect())
            .unwrap_or_default();
        if let Some((first, rest)) = segments.split_first() {
            let rest: Vec<&String> = rest.iter().filter(|s| !s.is_empty()).collect();
            if first == "pdf" && !rest.is_empty() {
                if let Ok(mut path) = url.path_segments_mut() {
                    path.clear().push("src").extend(rest);
                }
                return Some(url.into());
            }
        }
    }

    let base = Url::parse(&format!("{}/", base_url.trim_end_matches('/'))).ok()?;
    base.join(&format!("src/{}", article.arxiv_id))
        .ok()
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn article(pdf_url: Option<&str>) -> Article {
        Article {
            index: 1,
            arxiv_id: "2511.16837".to_string(),
            category: "cs.AI".to_string(),
            abs_url: "https://arxiv.org/abs/2511.16837".to_string(),
            pdf_url: pdf_url.map(str::to_string),
            html_url: None,
            other_url: None,
            title: "t".to_string(),
            authors: vec![],
            comments: None,
            subjects_primary: None,
            subjects_other: vec![],
            abstract_text: "a".to_string(),
            scraped_at: Utc::now(),
            verdict: None,
            content: None,
            analysis: None,
        }
    }

    #[test]
    fn test_listing_url() {
        assert_eq!(listing_url("https://arxiv.org/", "cs.OS"), "https://arxiv.org/list/cs.OS/new");
    }

    #[test]
    fn test_source_url_from_pdf_segment() {
        let a = article(Some("https://arxiv.org/pdf/2511.16837v2"));
        assert_eq!(
            source_archive_url(&a, "https://arxiv.org").as_deref(),
            Some("https://arxiv.org/src/2511.16837v2")
        );
    }

    #[test]
    fn test_source_url_only_rewrites_path_segment() {
        // A naive replace of "pdf" would mangle the host.
        let a = article(Some("https://pdf.mirror.org/pdf/2511.16837"));
        assert_eq!(
            source_archive_url(&a, "https://arxiv.org").as_deref(),
            Some("https://pdf.mirror.org/src/2511.16837")
        );
    }

    #[test]
    fn test_source_url_fallback_and_missing() {
        let a = article(Some("https://example.org/files/2511.16837.pdf"));
        assert_eq!(
            source_archive_url(&a, "https://arxiv.org/").as_deref(),
            Some("https://arxiv.org/src/2511.16837")
        );
        assert_eq!(source_archive_url(&article(None), "https://arxiv.org"), None);
    }

    #[test]
    fn test_source_url_keeps_old_style_ids() {
        let mut a = article(Some("https://arxiv.org/pdf/cs/0112017v1"));
        a.arxiv_id = "cs/0112017".to_string();
        assert_eq!(
            source_archive_url(&a, "https://arxiv.org").as_deref(),
            Some("https://arxiv.org/src/cs/0112017v1")
        );

        a.pdf_url = Some("https://arxiv.org/pdf/".to_string());
        assert_eq!(
            source_archive_url(&a, "https://mirror.example/arxiv").as_deref(),
            Some("https://mirror.example/arxiv/src/cs/0112017")
        );
    }
}
