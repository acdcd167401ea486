use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;

use crate::error::{Error, Result};

enum ArchiveKind {
    TarGz,
    Tar,
    /// A gzip stream that does not wrap a tar: arXiv serves single-file
    /// TeX submissions this way.
    GzFile,
    Unknown,
}

fn sniff(path: &Path) -> Result<ArchiveKind> {
    let mut head = [0u8; 512];
    let mut file = File::open(path)?;
    let read = read_up_to(&mut file, &mut head)?;
    let head = &head[..read];

    if infer::archive::is_gz(head) {
        let mut inner = [0u8; 512];
        let mut decoder = GzDecoder::new(File::open(path)?);
        let inner_read = read_up_to(&mut decoder, &mut inner).unwrap_or(0);
        if infer::archive::is_tar(&inner[..inner_read]) {
            return Ok(ArchiveKind::TarGz);
        }
        return Ok(ArchiveKind::GzFile);
    }
    if infer::archive::is_tar(head) {
        return Ok(ArchiveKind::Tar);
    }
    Ok(ArchiveKind::Unknown)
}

fn read_up_to(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

/// `downloads/arXiv-2511.16837v1.tar.gz` -> `arXiv-2511.16837v1`
fn archive_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string());
    for suffix in [".tar.gz", ".tgz", ".tar", ".gz"] {
        if let Some(stem) = name.strip_suffix(suffix) {
            if !stem.is_empty() {
                return stem.to_string();
            }
        }
    }
    name
}

fn is_safe_entry(path: &Path) -> bool {
    path.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Unpacks `archive` under `dest_root/<stem>/` and returns the regular files
/// written, in archive order. Returns an empty list for anything that is not
/// a tar, a gzipped tar, or a gzipped single file.
pub fn extract_archive(archive: &Path, dest_root: &Path) -> Result<Vec<PathBuf>> {
    let kind = sniff(archive)?;
    let stem = archive_stem(archive);
    let dest = dest_root.join(&stem);

    match kind {
        ArchiveKind::Unknown => {
            tracing::debug!("{} is not an archive", archive.display());
            Ok(Vec::new())
        }
        ArchiveKind::GzFile => {
            fs::create_dir_all(&dest)?;
            let target = dest.join(format!("{}.tex", stem));
            let mut decoder = GzDecoder::new(File::open(archive)?);
            let mut out = File::create(&target)?;
            io::copy(&mut decoder, &mut out)
                .map_err(|e| Error::Archive(format!("{}: {}", archive.display(), e)))?;
            Ok(vec![target])
        }
        ArchiveKind::TarGz => {
            let decoder = GzDecoder::new(File::open(archive)?);
            unpack_tar(tar::Archive::new(decoder), archive, &dest)
        }
        ArchiveKind::Tar => unpack_tar(tar::Archive::new(File::open(archive)?), archive, &dest),
    }
}

fn unpack_tar<R: Read>(mut tar: tar::Archive<R>, archive: &Path, dest: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dest)?;
    let mut files = Vec::new();

    let entries = tar
        .entries()
        .map_err(|e| Error::Archive(format!("{}: {}", archive.display(), e)))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| Error::Archive(format!("{}: {}", archive.display(), e)))?;
        let entry_path = match entry.path() {
            Ok(p) => p.into_owned(),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry in {}: {}", archive.display(), e);
                continue;
            }
        };

        if !is_safe_entry(&entry_path) {
            tracing::warn!(
                "Skipping unsafe entry {} in {}",
                entry_path.display(),
                archive.display()
            );
            continue;
        }

        let is_file = entry.header().entry_type().is_file();
        match entry.unpack_in(dest) {
            Ok(true) if is_file => files.push(dest.join(&entry_path)),
            Ok(_) => {}
            Err(e) => tracing::warn!(
                "Failed to unpack {} from {}: {}",
                entry_path.display(),
                archive.display(),
                e
            ),
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn append(builder: &mut tar::Builder<impl Write>, name: &str, data: &[u8]) {
        let mut header = tar::Header::new_gnu();
        header.set_path(name).unwrap();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append(&header, data).unwrap();
    }

    /// `set_path` refuses `..`, so the name is written into the raw header.
    fn append_raw_name(builder: &mut tar::Builder<impl Write>, name: &str, data: &[u8]) {
        let mut header = tar::Header::new_old();
        let bytes = name.as_bytes();
        header.as_old_mut().name[..bytes.len()].copy_from_slice(bytes);
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_cksum();
        builder.append(&header, data).unwrap();
    }

    #[test]
    fn test_extract_tar_gz_skips_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("arXiv-2511.16837v1.tar.gz");

        let encoder = GzEncoder::new(File::create(&archive).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        append(&mut builder, "main.tex", b"\\documentclass{article}");
        append_raw_name(&mut builder, "../escape.tex", b"nope");
        append(&mut builder, "figures/plot.png", b"\x89PNG\r\n\x1a\n0000");
        builder.into_inner().unwrap().finish().unwrap();

        let out = dir.path().join("out");
        let files = extract_archive(&archive, &out).unwrap();

        let dest = out.join("arXiv-2511.16837v1");
        assert_eq!(files, vec![dest.join("main.tex"), dest.join("figures/plot.png")]);
        assert!(!out.join("escape.tex").exists());
        assert!(!dir.path().join("escape.tex").exists());
    }

    #[test]
    fn test_gzipped_single_file_becomes_tex() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("2511.00001");
        let mut encoder = GzEncoder::new(File::create(&archive).unwrap(), Compression::default());
        encoder.write_all(b"\\section{Only file}").unwrap();
        encoder.finish().unwrap();

        let files = extract_archive(&archive, &dir.path().join("out")).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("2511.00001/2511.00001.tex"));
        assert_eq!(fs::read_to_string(&files[0]).unwrap(), "\\section{Only file}");
    }

    #[test]
    fn test_non_archive_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("paper.pdf");
        fs::write(&pdf, b"%PDF-1.5\n%fake").unwrap();

        assert!(extract_archive(&pdf, dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_archive_stem() {
        assert_eq!(archive_stem(Path::new("d/arXiv-1.tar.gz")), "arXiv-1");
        assert_eq!(archive_stem(Path::new("d/x.tgz")), "x");
        assert_eq!(archive_stem(Path::new("d/2511.00001")), "2511.00001");
    }
}
