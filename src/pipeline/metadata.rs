use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use tokio::process::Command;

use crate::config::PageRange;
use crate::error::{Error, Result};
use crate::models::{ExtractedContent, ImageSegment, TextSegment};

const TEXT_EXTENSIONS: &[&str] = &["tex", "txt", "md"];

/// Turns the files of an extracted source archive into text and figure
/// segments for the analysis engine.
pub struct MetadataExtractor {
    max_figures: usize,
    pages: PageRange,
    dpi: u32,
}

enum FileKind {
    Pdf,
    Text,
    Other,
}

fn classify(path: &Path) -> FileKind {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if ext == "pdf" {
        FileKind::Pdf
    } else if TEXT_EXTENSIONS.contains(&ext.as_str()) {
        FileKind::Text
    } else {
        FileKind::Other
    }
}

/// `main.tex` -> `main`, but `2511.00001` stays whole: arXiv ids look like
/// an extension to `Path::file_stem`.
fn segment_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.starts_with(|c: char| c.is_ascii_alphabetic()) => {
            stem.to_string()
        }
        _ => name,
    }
}

impl MetadataExtractor {
    pub fn new(max_figures: usize, pages: PageRange, dpi: u32) -> Self {
        Self {
            max_figures,
            pages,
            dpi,
        }
    }

    pub async fn extract(&self, paths: &[PathBuf]) -> ExtractedContent {
        let mut content = ExtractedContent::default();

        for path in paths {
            match classify(path) {
                FileKind::Pdf => match self.render_pdf(path).await {
                    Ok(pages) => content.figures.extend(pages),
                    Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
                },
                FileKind::Text => match read_text(path).await {
                    Ok(text) => content.texts.push(text),
                    Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
                },
                FileKind::Other => match sniff(path).await {
                    Ok(Sniffed::Pdf) => match self.render_pdf(path).await {
                        Ok(pages) => content.figures.extend(pages),
                        Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
                    },
                    Ok(Sniffed::Image(image)) => content.figures.push(image),
                    Ok(Sniffed::Other) => tracing::trace!("Ignoring {}", path.display()),
                    Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
                },
            }
        }

        let dropped = content.cap_figures(self.max_figures);
        if dropped > 0 {
            tracing::debug!("Dropped {} figures over the cap of {}", dropped, self.max_figures);
        }
        content
    }

    /// First and last page to render. Pages past the figure cap would be
    /// dropped anyway.
    fn page_window(&self) -> (u32, u32) {
        let first = self.pages.first.unwrap_or(1).max(1);
        let cap = u32::try_from(self.max_figures).unwrap_or(u32::MAX);
        let cap_last = first.saturating_add(cap.saturating_sub(1));
        let last = self.pages.last.map(|l| l.min(cap_last)).unwrap_or(cap_last);
        (first, last)
    }

    /// Rasterizes the selected pages to PNG with poppler's `pdftoppm`.
    async fn render_pdf(&self, path: &Path) -> Result<Vec<ImageSegment>> {
        if self.max_figures == 0 {
            return Ok(Vec::new());
        }

        let stem = segment_name(path);
        let out_dir = path.with_file_name(format!("{}-pages", stem));
        fresh_dir(&out_dir).await?;

        let (first, last) = self.page_window();

        let output = Command::new("pdftoppm")
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-f")
            .arg(first.to_string())
            .arg("-l")
            .arg(last.to_string())
            .arg(path)
            .arg(out_dir.join("page"))
            .output()
            .await
            .map_err(|e| Error::Render(format!("failed to run pdftoppm: {}", e)))?;

        if !output.status.success() {
            return Err(Error::Render(format!(
                "pdftoppm exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let mut rendered = Vec::new();
        let mut entries = tokio::fs::read_dir(&out_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let page = name
                .strip_prefix("page-")
                .and_then(|n| n.strip_suffix(".png"))
                .and_then(|n| n.parse::<u32>().ok());
            if let Some(page) = page {
                rendered.push((page, entry.path()));
            }
        }
        rendered.sort_by_key(|(page, _)| *page);

        let mut images = Vec::with_capacity(rendered.len());
        for (page, png) in rendered {
            let bytes = tokio::fs::read(&png).await?;
            images.push(ImageSegment {
                name: format!("{}-p{}", stem, page),
                b64: B64.encode(&bytes),
                mime: "image/png".to_string(),
            });
        }
        Ok(images)
    }
}

async fn read_text(path: &Path) -> Result<TextSegment> {
    let bytes = tokio::fs::read(path).await?;
    Ok(TextSegment {
        name: segment_name(path),
        text: String::from_utf8_lossy(&bytes).into_owned(),
    })
}

enum Sniffed {
    Pdf,
    Image(ImageSegment),
    Other,
}

/// Classifies a file by its content. Downloads named after the URL tail
/// carry no extension, so a PDF served in place of a source bundle only
/// shows up here.
async fn sniff(path: &Path) -> Result<Sniffed> {
    let bytes = tokio::fs::read(path).await?;
    let Some(kind) = infer::get(&bytes) else {
        return Ok(Sniffed::Other);
    };
    let mime = kind.mime_type();
    if mime == "application/pdf" {
        return Ok(Sniffed::Pdf);
    }
    if !mime.starts_with("image/") {
        return Ok(Sniffed::Other);
    }
    Ok(Sniffed::Image(ImageSegment {
        name: segment_name(path),
        b64: B64.encode(&bytes),
        mime: mime.to_string(),
    }))
}

/// Empties `dir` so pages from an earlier render never mix with this one.
async fn fresh_dir(dir: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    tokio::fs::create_dir_all(dir).await?;
    Ok(())
}
