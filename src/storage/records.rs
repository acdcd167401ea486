use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::Result;
use crate::models::PageResult;

/// File-backed store for per-category run records:
///
/// ```text
/// {root}/{date}/{category}.json
/// {root}/{date}/{category}/{arxiv_id}.md
/// {root}/{date}/{date}-Arxiv.md
/// ```
#[derive(Debug, Clone)]
pub struct ResultStore {
    root: PathBuf,
}

impl ResultStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn date_dir(&self, date: NaiveDate) -> PathBuf {
        self.root.join(date.format("%Y-%m-%d").to_string())
    }

    pub fn record_path(&self, date: NaiveDate, category: &str) -> PathBuf {
        self.date_dir(date).join(format!("{}.json", category))
    }

    pub fn report_path(&self, date: NaiveDate, category: &str, arxiv_id: &str) -> PathBuf {
        self.date_dir(date)
            .join(category)
            .join(format!("{}.md", arxiv_id.replace('/', "_")))
    }

    pub fn digest_path(&self, date: NaiveDate) -> PathBuf {
        let day = date.format("%Y-%m-%d");
        self.date_dir(date).join(format!("{}-Arxiv.md", day))
    }

    /// Writes the record for `(date, page.category)`, replacing any previous one.
    pub fn save_page(&self, date: NaiveDate, page: &PageResult) -> Result<PathBuf> {
        let path = self.record_path(date, &page.category);
        let json = serde_json::to_string_pretty(page)?;
        write_atomic(&path, json.as_bytes())?;
        Ok(path)
    }

    pub fn load_page(&self, date: NaiveDate, category: &str) -> Result<Option<PageResult>> {
        let path = self.record_path(date, category);
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Every category record for `date`, ordered by file name.
    pub fn load_all(&self, date: NaiveDate) -> Result<Vec<PageResult>> {
        let dir = self.date_dir(date);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().map(|e| e == "json").unwrap_or(false) {
                files.push(path);
            }
        }
        files.sort();

        let mut pages = Vec::with_capacity(files.len());
        for file in files {
            let text = std::fs::read_to_string(&file)?;
            pages.push(serde_json::from_str(&text)?);
        }
        Ok(pages)
    }

    pub fn write_report(
        &self,
        date: NaiveDate,
        category: &str,
        arxiv_id: &str,
        report: &str,
    ) -> Result<PathBuf> {
        let path = self.report_path(date, category, arxiv_id);
        write_atomic(&path, report.as_bytes())?;
        Ok(path)
    }

    pub fn write_digest(&self, date: NaiveDate, markdown: &str) -> Result<PathBuf> {
        let path = self.digest_path(date);
        write_atomic(&path, markdown.as_bytes())?;
        Ok(path)
    }
}

/// Write to a sibling temp file and rename, so readers never see half a record.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
