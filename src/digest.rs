//! Markdown rendering of a day's category records into one digest.

use crate::models::{Article, PageResult};
use crate::taxonomy::category_heading;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigestStyle {
    #[default]
    Table,
    Detail,
}

impl std::str::FromStr for DigestStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(DigestStyle::Table),
            "detail" => Ok(DigestStyle::Detail),
            other => Err(format!("unknown digest style '{}' (expected table or detail)", other)),
        }
    }
}

pub fn render(pages: &[PageResult], style: DigestStyle) -> String {
    match style {
        DigestStyle::Table => render_table(pages),
        DigestStyle::Detail => render_detail(pages),
    }
}

/// One table per category. Articles the judge never answered for are left out.
pub fn render_table(pages: &[PageResult]) -> String {
    let mut output = String::new();

    for page in pages {
        output.push_str(&format!("# {}\n\n", category_heading(&page.category)));
        output.push_str(
            "| arXiv ID | Title | Translated Title | Translated Abstract | Relevant | Rationale | Download |\n",
        );
        output.push_str("|---|---|---|---|---|---|---|\n");

        for article in page.judged() {
            let Some(verdict) = article.verdict.as_ref() else {
                continue;
            };
            output.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | [link]({}) |\n",
                cell(&article.arxiv_id),
                cell(&article.title),
                cell(&verdict.translated_title),
                cell(&verdict.translated_abstract),
                yes_no(verdict.relevant),
                cell(&verdict.rationale),
                article.download_url()
            ));
        }

        output.push_str("\n---\n\n");
    }

    output
}

pub fn render_detail(pages: &[PageResult]) -> String {
    let mut output = String::new();

    for page in pages {
        output.push_str(&format!("# {}\n\n", category_heading(&page.category)));
        for article in page.judged() {
            push_article(&mut output, article);
        }
        output.push_str("---\n\n");
    }

    output
}

fn push_article(output: &mut String, article: &Article) {
    let Some(verdict) = article.verdict.as_ref() else {
        return;
    };

    output.push_str(&format!("## {}\n\n", single_line(&article.title)));
    output.push_str(&format!("- **arXiv ID**: {}\n", article.arxiv_id));
    output.push_str(&format!(
        "- **Translated Title**: {}\n",
        single_line(&verdict.translated_title)
    ));
    output.push_str(&format!(
        "- **Translated Abstract**: {}\n",
        single_line(&verdict.translated_abstract)
    ));
    output.push_str(&format!("- **Relevant**: {}\n", yes_no(verdict.relevant)));
    output.push_str(&format!("- **Rationale**: {}\n", single_line(&verdict.rationale)));
    output.push_str(&format!("- **Download**: {}\n\n", article.download_url()));
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn cell(text: &str) -> String {
    single_line(&text.replace('|', "\\|"))
}

fn single_line(text: &str) -> String {
    text.trim().replace("\r\n", "\n").replace('\n', "<br/>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Verdict;
    use chrono::Utc;

    fn article(index: u32, id: &str, verdict: Option<bool>) -> Article {
        Article {
            index,
            arxiv_id: id.to_string(),
            category: "cs.AI".to_string(),
            abs_url: format!("https://arxiv.org/abs/{}", id),
            pdf_url: Some(format!("https://arxiv.org/pdf/{}", id)),
            html_url: None,
            other_url: None,
            title: format!("Paper {}", id),
            authors: vec![],
            comments: None,
            subjects_primary: None,
            subjects_other: vec![],
            abstract_text: "abstract".to_string(),
            scraped_at: Utc::now(),
            verdict: verdict.map(|relevant| Verdict {
                translated_title: "标题".to_string(),
                translated_abstract: "第一行\n第二行".to_string(),
                relevant,
                rationale: "uses a | pipe".to_string(),
            }),
            content: None,
            analysis: None,
        }
    }

    fn pages() -> Vec<PageResult> {
        let mut unlinked = article(3, "2511.00003", Some(false));
        unlinked.pdf_url = None;
        vec![
            PageResult {
                category: "cs.AI".to_string(),
                url: "https://arxiv.org/list/cs.AI/new".to_string(),
                scraped_at: Utc::now(),
                articles: vec![
                    article(1, "2511.00001", Some(true)),
                    article(2, "2511.00002", None),
                    unlinked,
                ],
            },
            PageResult {
                category: "cs.XX".to_string(),
                url: "https://arxiv.org/list/cs.XX/new".to_string(),
                scraped_at: Utc::now(),
                articles: vec![],
            },
        ]
    }

    #[test]
    fn test_table_includes_only_judged_articles() {
        let md = render_table(&pages());

        assert!(md.starts_with("# cs.AI (Artificial Intelligence)\n"));
        assert!(md.contains("# cs.XX\n"));
        assert!(md.contains(
            "| 2511.00001 | Paper 2511.00001 | 标题 | 第一行<br/>第二行 | yes | uses a \\| pipe | [link](https://arxiv.org/pdf/2511.00001) |"
        ));
        assert!(!md.contains("2511.00002"));
        assert!(md.contains("[link](https://arxiv.org/abs/2511.00003)"));
        assert_eq!(md.matches("---\n\n").count(), 2);
    }

    #[test]
    fn test_detail_sections() {
        let md = render_detail(&pages());

        assert!(md.contains("## Paper 2511.00001\n\n- **arXiv ID**: 2511.00001\n"));
        assert!(md.contains("- **Translated Abstract**: 第一行<br/>第二行\n"));
        assert!(md.contains("- **Relevant**: no\n"));
        assert!(!md.contains("Paper 2511.00002"));
    }

    #[test]
    fn test_style_parsing() {
        assert_eq!("Table".parse::<DigestStyle>().unwrap(), DigestStyle::Table);
        assert_eq!("detail".parse::<DigestStyle>().unwrap(), DigestStyle::Detail);
        assert!("html".parse::<DigestStyle>().is_err());
        assert_eq!(render(&[], DigestStyle::Detail), "");
    }
}
