use crate::error::Result;
use crate::models::{Article, TextSegment};

pub const ANALYZER_SYSTEM_PROMPT: &str = r#"You are a senior researcher reading a newly published paper.
You are given the paper's LaTeX sources (each section prefixed by its file name) and its figures.

Write a structured report in Markdown with these sections:
1. Problem: what question the paper addresses and why it matters.
2. Method: the core idea, architecture or algorithm, with enough detail to reimplement the key step.
3. Experiments: datasets, baselines, headline numbers, and what the figures show.
4. Limitations: weaknesses, missing ablations, threats to validity.
5. Takeaways: what a practitioner in the field should remember.

Base every claim on the provided material. Say so when something cannot be determined."#;

pub fn judge_system_prompt(prefer: &str, not_prefer: &str, language: &str) -> String {
    format!(
        r#"You are an expert paper reviewer. Using my research interests and a paper's metadata, decide whether the paper is worth my time to read in full.

You must respond with valid JSON matching this exact schema:
{{
    "translated_title": "the paper title translated into {language}",
    "translated_abstract": "the abstract translated into {language}",
    "relevant": true or false,
    "rationale": "why it is or is not worth reading and how it relates to my interests, plain text without markdown"
}}

My research interests: {prefer}
Topics I am not interested in: {not_prefer}

Judge strictly. Partial overlap in wording is not enough to mark a paper relevant."#,
        language = language,
        prefer = if prefer.trim().is_empty() { "(not specified)" } else { prefer },
        not_prefer = if not_prefer.trim().is_empty() { "(not specified)" } else { not_prefer },
    )
}

pub fn judge_user_prompt(article: &Article) -> Result<String> {
    let metadata = serde_json::to_string_pretty(&article.metadata())?;
    Ok(format!("Paper metadata:\n{}", metadata))
}

pub fn text_block(segment: &TextSegment) -> String {
    format!("------- TITLE: {} --------\n{}\n", segment.name, segment.text)
}
