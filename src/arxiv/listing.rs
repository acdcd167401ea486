use chrono::{DateTime, Utc};
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use crate::error::{Error, Result};
use crate::models::{Article, PageResult};

/// Turns an arXiv `/list/<category>/new` page into a [`PageResult`].
pub struct ListingParser {
    base: Url,
}

struct Selectors {
    container: Selector,
    anchor: Selector,
    meta: Selector,
    title: Selector,
    authors: Selector,
    comments: Selector,
    subjects: Selector,
    primary_subject: Selector,
    abstract_text: Selector,
}

impl Selectors {
    fn new() -> Result<Self> {
        Ok(Self {
            container: selector("dl#articles")?,
            anchor: selector("a")?,
            meta: selector("div.meta")?,
            title: selector("div.list-title")?,
            authors: selector("div.list-authors a")?,
            comments: selector("div.list-comments")?,
            subjects: selector("div.list-subjects")?,
            primary_subject: selector("span.primary-subject")?,
            abstract_text: selector("p.mathjax")?,
        })
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Listing(format!("bad selector {}: {}", css, e)))
}

#[derive(Default)]
struct Links {
    index: Option<u32>,
    arxiv_id: Option<String>,
    abs_url: Option<String>,
    pdf_url: Option<String>,
    html_url: Option<String>,
    other_url: Option<String>,
}

impl ListingParser {
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid arXiv base URL {}: {}", base_url, e)))?;
        Ok(Self { base })
    }

    pub fn parse(&self, markup: &str, source_url: &str, category: &str) -> Result<PageResult> {
        let selectors = Selectors::new()?;
        let document = Html::parse_document(markup);

        let container = document.select(&selectors.container).next().ok_or_else(|| {
            Error::Listing(format!("no <dl id=\"articles\"> in {}", source_url))
        })?;

        let mut dts = Vec::new();
        let mut dds = Vec::new();
        for child in container.children().filter_map(ElementRef::wrap) {
            match child.value().name() {
                "dt" => dts.push(child),
                "dd" => dds.push(child),
                _ => {}
            }
        }
        if dts.len() != dds.len() {
            tracing::warn!(
                "Listing {} has {} <dt> but {} <dd>, pairing the first {}",
                source_url,
                dts.len(),
                dds.len(),
                dts.len().min(dds.len())
            );
        }

        let scraped_at = Utc::now();
        let mut articles = Vec::new();
        for (position, (dt, dd)) in dts.into_iter().zip(dds).enumerate() {
            match self.parse_entry(&selectors, dt, dd, category, scraped_at) {
                Ok(article) => articles.push(article),
                Err(e) => tracing::warn!("Skipping listing entry {}: {}", position + 1, e),
            }
        }

        Ok(PageResult {
            category: category.to_string(),
            url: source_url.to_string(),
            scraped_at,
            articles,
        })
    }

    fn parse_entry(
        &self,
        selectors: &Selectors,
        dt: ElementRef<'_>,
        dd: ElementRef<'_>,
        category: &str,
        scraped_at: DateTime<Utc>,
    ) -> Result<Article> {
        let links = self.parse_links(selectors, dt);
        let (Some(index), Some(arxiv_id), Some(abs_url)) = (links.index, links.arxiv_id, links.abs_url)
        else {
            return Err(Error::Listing("missing index, arxiv id or abstract link".to_string()));
        };

        let meta = dd
            .select(&selectors.meta)
            .next()
            .ok_or_else(|| Error::Listing(format!("{}: no .meta block", arxiv_id)))?;

        let title = meta
            .select(&selectors.title)
            .next()
            .map(|el| strip_label(&collapse_text(el), "Title:"))
            .ok_or_else(|| Error::Listing(format!("{}: no title", arxiv_id)))?;

        let authors = meta
            .select(&selectors.authors)
            .map(collapse_text)
            .filter(|name| !name.is_empty())
            .collect();

        let comments = meta
            .select(&selectors.comments)
            .next()
            .map(|el| strip_label(&collapse_text(el), "Comments:"))
            .filter(|c| !c.is_empty());

        let mut subjects_primary = None;
        let mut subjects_other = Vec::new();
        if let Some(subjects) = meta.select(&selectors.subjects).next() {
            subjects_primary = subjects
                .select(&selectors.primary_subject)
                .next()
                .map(collapse_text)
                .filter(|s| !s.is_empty());

            let mut rest = strip_label(&collapse_text(subjects), "Subjects:");
            if let Some(primary) = &subjects_primary {
                rest = rest.replacen(primary.as_str(), "", 1);
            }
            subjects_other = rest
                .split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }

        let abstract_text = meta
            .select(&selectors.abstract_text)
            .next()
            .map(collapse_text)
            .ok_or_else(|| Error::Listing(format!("{}: no abstract", arxiv_id)))?;

        Ok(Article {
            index,
            arxiv_id,
            category: category.to_string(),
            abs_url,
            pdf_url: links.pdf_url,
            html_url: links.html_url,
            other_url: links.other_url,
            title,
            authors,
            comments,
            subjects_primary,
            subjects_other,
            abstract_text,
            scraped_at,
            verdict: None,
            content: None,
            analysis: None,
        })
    }

    fn parse_links(&self, selectors: &Selectors, dt: ElementRef<'_>) -> Links {
        let mut links = Links::default();
        let anchors: Vec<_> = dt.select(&selectors.anchor).collect();

        // First anchor reads "[12]".
        links.index = anchors
            .first()
            .and_then(|a| collapse_text(*a).trim_matches(|c| c == '[' || c == ']').parse().ok());

        for a in anchors {
            let href = a.value().attr("href").unwrap_or("");
            let title = a.value().attr("title").unwrap_or("").to_lowercase();
            let id = a.value().attr("id").unwrap_or("");

            let Some(url) = self.join(href) else {
                tracing::debug!("Ignoring unresolvable link {:?}", href);
                continue;
            };

            if title.contains("abstract") || url.path().starts_with("/abs/") {
                links.arxiv_id = if id.is_empty() {
                    last_segment(&url)
                } else {
                    Some(id.to_string())
                };
                links.abs_url = Some(url.into());
            } else if id.starts_with("pdf-") || title.contains("pdf") {
                links.pdf_url = Some(url.into());
            } else if id.starts_with("html-") || title.contains("html") {
                links.html_url = Some(url.into());
            } else if id.starts_with("oth-") || title.contains("other formats") {
                links.other_url = Some(url.into());
            }
        }

        links
    }

    /// Resolves `href` against the listing host: absolute, root-relative
    /// and protocol-relative links alike.
    fn join(&self, href: &str) -> Option<Url> {
        if href.is_empty() {
            return None;
        }
        self.base.join(href).ok()
    }
}

fn last_segment(url: &Url) -> Option<String> {
    url.path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(str::to_string)
}

fn collapse_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_label(text: &str, label: &str) -> String {
    text.trim()
        .strip_prefix(label)
        .unwrap_or(text)
        .trim()
        .to_string()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn entry(index: u32, id: &str, title: &str) -> String {
        format!(
            r#"<dt>
  <a name="item{index}">[{index}]</a>
  <a href="/abs/{id}" title="Abstract" id="{id}">arXiv:{id}</a>
  [<a href="/pdf/{id}" title="Download PDF" id="pdf-{id}" aria-labelledby="pdf-{id}">pdf</a>,
   <a href="https://arxiv.org/html/{id}v1" title="View HTML" id="html-{id}">html</a>,
   <a href="/format/{id}" title="Other formats" id="oth-{id}">other</a>]
</dt>
<dd>
  <div class='meta'>
    <div class='list-title mathjax'><span class='descriptor'>Title:</span>
      {title}
    </div>
    <div class='list-authors'><a href="/a/kim_m_1">Myung Ho Kim</a>, <a href="/a/lee_j_1">Jae Lee</a></div>
    <div class='list-comments mathjax'><span class='descriptor'>Comments:</span> 27 pages</div>
    <div class='list-subjects'><span class='descriptor'>Subjects:</span>
      <span class="primary-subject">Artificial Intelligence (cs.AI)</span>; Computation and Language (cs.CL); Computational Engineering, Finance, and Science (cs.CE)
    </div>
    <p class='mathjax'>
      Abstract for {title}.
      Second line.
    </p>
  </div>
</dd>"#
        )
    }

    pub(crate) fn listing(entries: &[String]) -> String {
        format!(
            "<html><body><div id='dlpage'><dl id='articles'>{}</dl></div></body></html>",
            entries.concat()
        )
    }

    #[test]
    fn test_parse_listing() {
        let html = listing(&[
            entry(1, "2511.17673", "Bridging Symbolic Control"),
            entry(2, "2511.16837", "Another Paper"),
        ]);
        let page = ListingParser::new("https://arxiv.org/")
            .unwrap()
            .parse(&html, "https://arxiv.org/list/cs.AI/new", "cs.AI")
            .unwrap();

        assert_eq!(page.category, "cs.AI");
        assert_eq!(page.articles.len(), 2);

        let a = &page.articles[0];
        assert_eq!(a.index, 1);
        assert_eq!(a.arxiv_id, "2511.17673");
        assert_eq!(a.abs_url, "https://arxiv.org/abs/2511.17673");
        assert_eq!(a.pdf_url.as_deref(), Some("https://arxiv.org/pdf/2511.17673"));
        assert_eq!(a.html_url.as_deref(), Some("https://arxiv.org/html/2511.17673v1"));
        assert_eq!(a.other_url.as_deref(), Some("https://arxiv.org/format/2511.17673"));
        assert_eq!(a.title, "Bridging Symbolic Control");
        assert_eq!(a.authors, vec!["Myung Ho Kim", "Jae Lee"]);
        assert_eq!(a.comments.as_deref(), Some("27 pages"));
        assert_eq!(a.subjects_primary.as_deref(), Some("Artificial Intelligence (cs.AI)"));
        assert_eq!(
            a.subjects_other,
            vec![
                "Computation and Language (cs.CL)",
                "Computational Engineering, Finance, and Science (cs.CE)"
            ]
        );
        assert_eq!(a.abstract_text, "Abstract for Bridging Symbolic Control. Second line.");
        assert_eq!(page.articles[1].index, 2);
        assert_eq!(a.scraped_at, page.scraped_at);
    }

    #[test]
    fn test_malformed_entry_is_skipped() {
        let broken = r#"<dt><a name="item2">[2]</a></dt><dd><div class='meta'></div></dd>"#.to_string();
        let html = listing(&[
            entry(1, "2511.00001", "First"),
            broken,
            entry(3, "2511.00003", "Third"),
        ]);
        let page = ListingParser::new("https://arxiv.org")
            .unwrap()
            .parse(&html, "https://arxiv.org/list/cs.AI/new", "cs.AI")
            .unwrap();

        let ids: Vec<_> = page.articles.iter().map(|a| a.arxiv_id.as_str()).collect();
        assert_eq!(ids, vec!["2511.00001", "2511.00003"]);
    }

    #[test]
    fn test_missing_container_is_an_error() {
        let err = ListingParser::new("https://arxiv.org")
            .unwrap()
            .parse("<html><body>maintenance</body></html>", "https://arxiv.org/list/cs.AI/new", "cs.AI")
            .unwrap_err();
        assert!(matches!(err, Error::Listing(_)));
    }

    #[test]
    fn test_links_resolve_against_base() {
        let parser = ListingParser::new("https://arxiv.org").unwrap();
        assert_eq!(
            parser.join("//arxiv.org/abs/2511.00001").map(String::from).as_deref(),
            Some("https://arxiv.org/abs/2511.00001")
        );
        assert_eq!(
            parser.join("/pdf/2511.00001").map(String::from).as_deref(),
            Some("https://arxiv.org/pdf/2511.00001")
        );
        assert_eq!(
            parser.join("https://export.arxiv.org/format/2511.00001").map(String::from).as_deref(),
            Some("https://export.arxiv.org/format/2511.00001")
        );
        assert_eq!(parser.join(""), None);
    }

    #[test]
    fn test_protocol_relative_entry_links() {
        let html = listing(&[entry(1, "2511.00001", "First")
            .replace("href=\"/abs/", "href=\"//arxiv.org/abs/")
            .replace("href=\"/pdf/", "href=\"//arxiv.org/pdf/")]);
        let page = ListingParser::new("https://arxiv.org")
            .unwrap()
            .parse(&html, "https://arxiv.org/list/cs.AI/new", "cs.AI")
            .unwrap();

        let a = &page.articles[0];
        assert_eq!(a.arxiv_id, "2511.00001");
        assert_eq!(a.abs_url, "https://arxiv.org/abs/2511.00001");
        assert_eq!(a.pdf_url.as_deref(), Some("https://arxiv.org/pdf/2511.00001"));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(ListingParser::new("not a url"), Err(Error::Config(_))));
    }
}
