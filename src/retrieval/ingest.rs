//! Builds the document index from a directory of text files.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::splitter::TextSplitter;
use super::store::ChunkStore;
use crate::providers::Embedder;

/// File extensions picked up by an index build.
#[cfg(not(feature = "rag-pdf"))]
const INGEST_EXTENSIONS: &[&str] = &["txt", "md"];
#[cfg(feature = "rag-pdf")]
const INGEST_EXTENSIONS: &[&str] = &["txt", "md", "pdf"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub files: usize,
    pub chunks: usize,
    pub skipped: Vec<PathBuf>,
}

/// Indexable files under `dir`, sorted for reproducible builds.
pub fn discover_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("Corpus directory not found: {}", dir.display());
    }
    let pattern = format!("{}/**/*", glob::Pattern::escape(&dir.to_string_lossy()));
    let mut files: Vec<PathBuf> = glob::glob(&pattern)
        .context("Invalid corpus path")?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| INGEST_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        })
        .collect();
    files.sort();
    Ok(files)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Plain text of a document. Invalid UTF-8 is replaced rather than rejected.
fn read_document(path: &Path) -> Result<String> {
    if is_pdf(path) {
        return read_pdf(path);
    }
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(feature = "rag-pdf")]
fn read_pdf(path: &Path) -> Result<String> {
    pdf_extract::extract_text(path)
        .with_context(|| format!("Failed to extract text from {}", path.display()))
}

#[cfg(not(feature = "rag-pdf"))]
fn read_pdf(path: &Path) -> Result<String> {
    anyhow::bail!(
        "PDF support not compiled in (rebuild with --features rag-pdf): {}",
        path.display()
    )
}

/// Split, embed and store every document under `dir`.
///
/// Re-ingesting a file replaces its previous chunks. Unreadable files are
/// skipped and reported; embedding failures abort the build.
pub async fn build_index(
    dir: &Path,
    splitter: &TextSplitter,
    embedder: &dyn Embedder,
    store: &ChunkStore,
) -> Result<IngestReport> {
    let mut report = IngestReport::default();

    for path in discover_documents(dir)? {
        let text = match read_document(&path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(path = %path.display(), "Skipping unreadable document: {e:#}");
                report.skipped.push(path);
                continue;
            }
        };
        let source = path
            .strip_prefix(dir)
            .unwrap_or(&path)
            .to_string_lossy()
            .into_owned();

        store.remove_source(&source)?;
        let chunks = splitter.split(&text);
        for (position, chunk) in chunks.iter().enumerate() {
            let embedding = embedder
                .embed(chunk)
                .await
                .with_context(|| format!("Failed to embed chunk {position} of {source}"))?;
            store.insert(&source, position, chunk, &embedding)?;
        }

        tracing::info!(source = %source, chunks = chunks.len(), "Indexed document");
        report.files += 1;
        report.chunks += chunks.len();
    }

    store.record_build(embedder.model_name())?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::index::testing::KeywordEmbedder;

    #[cfg(not(feature = "rag-pdf"))]
    #[test]
    fn discover_filters_by_extension() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("acts")).unwrap();
        std::fs::write(tmp.path().join("acts").join("ipc.TXT"), "Section 499").unwrap();
        std::fs::write(tmp.path().join("notes.md"), "# Notes").unwrap();
        std::fs::write(tmp.path().join("scan.pdf"), "%PDF").unwrap();

        let files = discover_documents(tmp.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|p| p.extension().unwrap() != "pdf"));
    }

    #[cfg(not(feature = "rag-pdf"))]
    #[test]
    fn pdf_without_feature_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let pdf = tmp.path().join("act.PDF");
        std::fs::write(&pdf, "%PDF-1.4").unwrap();
        let err = read_document(&pdf).unwrap_err();
        assert!(err.to_string().contains("rag-pdf"));
    }

    #[test]
    fn discover_requires_directory() {
        let err = discover_documents(Path::new("/definitely/not/here")).unwrap_err();
        assert!(err.to_string().contains("Corpus directory not found"));
    }

    #[tokio::test]
    async fn build_indexes_and_reingests_without_duplicates() {
        let tmp = tempfile::tempdir().unwrap();
        let corpus = tmp.path().join("corpus");
        std::fs::create_dir_all(&corpus).unwrap();
        std::fs::write(
            corpus.join("president.txt"),
            "The President is the head of state.\n\nThe President is elected indirectly.",
        )
        .unwrap();

        let store = ChunkStore::create(&tmp.path().join("index.db")).unwrap();
        let splitter = TextSplitter::new(40, 0);
        let embedder = KeywordEmbedder {
            keywords: vec!["president", "elected"],
        };

        let report = build_index(&corpus, &splitter, &embedder, &store).await.unwrap();
        assert_eq!(report.files, 1);
        assert_eq!(report.chunks, 2);

        build_index(&corpus, &splitter, &embedder, &store).await.unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.chunks, 2);
        assert_eq!(stats.embedding_model.as_deref(), Some("keyword-test"));
    }
}
