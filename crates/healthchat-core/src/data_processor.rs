//! Corpus loading: walks a directory and turns supported files into `Document`s.
//!
//! `.txt` files become one document each; `.pdf` files become one document per
//! page with extractable text. Anything else is skipped.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use pdf_oxide::converters::ConversionOptions;
use tracing::{debug, info, warn};

use crate::chunker::{self, ChunkingConfig};
use crate::error::{Error, Result};
use crate::types::{Document, DocumentChunk, SourceMeta};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Text,
    Pdf,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" => Some(Self::Text),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct DataProcessor {
    chunking_config: ChunkingConfig,
}

impl DataProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunking(chunking_config: ChunkingConfig) -> Self {
        Self { chunking_config }
    }

    pub fn chunking_config(&self) -> &ChunkingConfig {
        &self.chunking_config
    }

    /// Load and chunk every supported file under `data_dir`.
    pub fn process_directory(&self, data_dir: &Path) -> Result<(Vec<Document>, Vec<DocumentChunk>)> {
        let documents = self.load_documents(data_dir)?;
        let chunks = chunker::split(&documents, &self.chunking_config)?;
        info!(documents = documents.len(), chunks = chunks.len(), "chunked corpus");
        Ok((documents, chunks))
    }

    /// Fails with `EmptyCorpus` when the directory is missing or yields no documents.
    pub fn load_documents(&self, data_dir: &Path) -> Result<Vec<Document>> {
        if !data_dir.is_dir() {
            return Err(Error::EmptyCorpus(format!(
                "corpus directory {} does not exist",
                data_dir.display()
            )));
        }
        let files = self.list_corpus_files(data_dir);
        let mut documents = Vec::new();
        for (file_index, (file_path, kind)) in files.iter().enumerate() {
            debug!("Loading file {}/{}: {}", file_index + 1, files.len(), file_path.display());
            let meta = SourceMeta::new(file_path.to_string_lossy(), self.extract_doc_id(file_path, data_dir));
            match kind {
                DocumentKind::Text => {
                    let content = self.read_file_content(file_path)?;
                    documents.push(Document::new(content, meta));
                }
                DocumentKind::Pdf => match read_pdf_pages(file_path) {
                    Ok(pages) => {
                        for (page, text) in pages {
                            documents.push(Document::new(text, meta.clone().with_page(page)));
                        }
                    }
                    Err(e) => warn!("Skipping unreadable PDF {}: {:#}", file_path.display(), e),
                },
            }
        }
        documents.retain(|d| !d.text.is_empty());
        if documents.is_empty() {
            return Err(Error::EmptyCorpus(format!(
                "no .txt or .pdf documents found under {}",
                data_dir.display()
            )));
        }
        info!("Loaded {} documents from {} files", documents.len(), files.len());
        Ok(documents)
    }

    fn read_file_content(&self, file_path: &Path) -> Result<String> {
        match fs::read_to_string(file_path) {
            Ok(content) => Ok(content),
            Err(_) => {
                let bytes = fs::read(file_path).map_err(|e| Error::io(file_path, e))?;
                Ok(String::from_utf8_lossy(&bytes).to_string())
            }
        }
    }

    fn extract_doc_id(&self, file_path: &Path, data_dir: &Path) -> String {
        let relative = file_path.strip_prefix(data_dir).unwrap_or(file_path).with_extension("");
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn list_corpus_files(&self, root: &Path) -> Vec<(PathBuf, DocumentKind)> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
            let path = entry.path();
            match DocumentKind::from_path(path) {
                Some(kind) => files.push((path.to_path_buf(), kind)),
                None => debug!("Skipping unsupported file {}", path.display()),
            }
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));
        files
    }
}

/// Text of every non-empty page, keyed by 1-based page number.
fn read_pdf_pages(path: &Path) -> anyhow::Result<Vec<(usize, String)>> {
    let path_str = path.to_string_lossy();
    let mut doc = pdf_oxide::PdfDocument::open(&*path_str).map_err(|e| anyhow!("{}", e))?;
    let page_count = doc.page_count().map_err(|e| anyhow!("{}", e))?;
    let options = ConversionOptions { include_images: false, ..ConversionOptions::default() };
    let mut pages = Vec::new();
    for page_index in 0..page_count {
        let text = doc.to_markdown(page_index, &options).map_err(|e| anyhow!("page {}: {}", page_index + 1, e))?;
        if !text.trim().is_empty() {
            pages.push((page_index + 1, text));
        }
    }
    if pages.is_empty() {
        return Err(anyhow!("no extractable text"));
    }
    Ok(pages)
}
