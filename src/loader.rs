//! PDF directory loading.
//!
//! `pdf-extract` returns a whole document as one string with pages separated by form feeds.
//! The loader splits on those, numbers pages from 1, and tags each page with the file name.
//! Files that fail to read or parse are skipped and reported instead of aborting the batch.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::processing::types::Page;

const PAGE_BREAK: char = '\x0C';

/// Errors raised while loading documents.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Filesystem access failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Text extraction failed for a PDF.
    #[error("Failed to extract text from {path}: {message}")]
    Pdf {
        /// File that could not be parsed.
        path: PathBuf,
        /// Extractor error message.
        message: String,
    },
}

/// File that was skipped during a load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    /// File name of the skipped document.
    pub file: String,
    /// Reason the file was skipped.
    pub reason: String,
}

/// Pages gathered from a directory plus the files that could not be read.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Number of PDF files found, including failed ones.
    pub files_found: usize,
    /// Extracted pages, in file-name order then page order.
    pub pages: Vec<Page>,
    /// Files skipped because extraction failed.
    pub failures: Vec<LoadFailure>,
}

/// Source of raw pages for the ingest pipeline.
pub trait DocumentLoader: Send + Sync {
    /// Load every document the loader knows about.
    fn load(&self) -> Result<LoadReport, LoaderError>;

    /// Human-readable location of the documents, used in logs and error messages.
    fn describe(&self) -> String;
}

/// Loads every `*.pdf` file directly inside a directory.
#[derive(Debug, Clone)]
pub struct PdfDirectoryLoader {
    dir: PathBuf,
}

impl PdfDirectoryLoader {
    /// Create a loader for `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory scanned by this loader.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// PDF files in the directory, sorted by name. Creates the directory when missing.
    pub fn pdf_files(&self) -> Result<Vec<PathBuf>, LoaderError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| LoaderError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::warn!(error = %err, "Skipping unreadable directory entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| is_pdf(path))
            .collect();
        files.sort();
        Ok(files)
    }
}

impl DocumentLoader for PdfDirectoryLoader {
    fn describe(&self) -> String {
        self.dir.display().to_string()
    }

    fn load(&self) -> Result<LoadReport, LoaderError> {
        let files = self.pdf_files()?;
        let mut report = LoadReport {
            files_found: files.len(),
            ..LoadReport::default()
        };

        for path in files {
            let file = file_name(&path);
            match extract_pages(&path) {
                Ok(pages) => {
                    tracing::debug!(file = %file, pages = pages.len(), "Loaded PDF");
                    report.pages.extend(pages);
                }
                Err(err) => {
                    tracing::warn!(file = %file, error = %err, "Skipping unreadable PDF");
                    report.failures.push(LoadFailure {
                        file,
                        reason: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            dir = %self.dir.display(),
            files = report.files_found,
            pages = report.pages.len(),
            failed = report.failures.len(),
            "Loaded PDF directory"
        );
        Ok(report)
    }
}

/// Read one PDF and split its text into pages.
pub fn extract_pages(path: &Path) -> Result<Vec<Page>, LoaderError> {
    let bytes = std::fs::read(path).map_err(|source| LoaderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    // The extractor panics on some malformed documents.
    let extracted = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(&bytes));
    let text = match extracted {
        Ok(Ok(text)) => text,
        Ok(Err(err)) => {
            return Err(LoaderError::Pdf {
                path: path.to_path_buf(),
                message: err.to_string(),
            });
        }
        Err(_) => {
            return Err(LoaderError::Pdf {
                path: path.to_path_buf(),
                message: "extractor panicked".to_string(),
            });
        }
    };
    Ok(pages_from_text(&file_name(path), &text))
}

/// Split extracted text on form feeds into 1-based pages, dropping blank ones.
pub fn pages_from_text(source: &str, text: &str) -> Vec<Page> {
    text.split(PAGE_BREAK)
        .enumerate()
        .filter(|(_, page)| !page.trim().is_empty())
        .map(|(index, page)| Page::new(source, page, u32::try_from(index + 1).ok()))
        .collect()
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
