//! Fixed-width character fragmenting of repository files.

use crate::types::{FileFilter, Fragment};
use explain_core::{AppError, AppResult};
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// Fragments produced from one working copy plus read statistics.
#[derive(Debug, Clone, Default)]
pub struct FragmentBatch {
    pub fragments: Vec<Fragment>,
    pub files_indexed: usize,
    pub files_skipped: usize,
    pub bytes_read: u64,
}

/// Splits files into fragments of at most `chunk_size` characters.
#[derive(Debug, Clone, Copy)]
pub struct Fragmenter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Fragmenter {
    /// Overlap must be smaller than the width.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> AppResult<Self> {
        if chunk_size == 0 {
            return Err(AppError::Config(
                "Fragment width must be at least 1 character".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(AppError::Config(format!(
                "Fragment overlap ({}) must be smaller than fragment width ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// Split one file's text. Counts Unicode scalar values, never bytes.
    pub fn split_text(&self, source_path: &Path, text: &str) -> Vec<Fragment> {
        let chars: Vec<char> = text.chars().collect();
        let step = self.chunk_size - self.chunk_overlap;

        let mut fragments = Vec::new();
        let mut start = 0;
        let mut position = 0u32;

        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            fragments.push(Fragment {
                source_path: source_path.to_path_buf(),
                position,
                text: chars[start..end].iter().collect(),
                char_start: start,
                char_end: end,
            });

            if end == chars.len() {
                break;
            }
            position += 1;
            start += step;
        }

        fragments
    }

    /// Walk `root` in file-name order and fragment every file the filter accepts.
    ///
    /// Unreadable and non-UTF-8 files are skipped and counted.
    pub fn fragment_tree(&self, root: &Path, filter: &FileFilter) -> AppResult<FragmentBatch> {
        if !root.is_dir() {
            return Err(AppError::Ingestion(format!(
                "Working copy is not a directory: {}",
                root.display()
            )));
        }

        let mut batch = FragmentBatch::default();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_git_dir(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!("Skipping unreadable directory entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            if !filter.matches(relative) {
                continue;
            }

            let bytes = match std::fs::read(entry.path()) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::debug!("Skipping {:?}: {}", relative, e);
                    batch.files_skipped += 1;
                    continue;
                }
            };
            let size = bytes.len() as u64;
            let text = match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    tracing::debug!("Skipping {:?}: not valid UTF-8", relative);
                    batch.files_skipped += 1;
                    continue;
                }
            };

            let fragments = self.split_text(relative, &text);
            tracing::debug!("Fragmented {:?}: {} fragments", relative, fragments.len());

            batch.files_indexed += 1;
            batch.bytes_read += size;
            batch.fragments.extend(fragments);
        }

        tracing::debug!(
            "Fragmented {} files into {} fragments (width: {}, overlap: {})",
            batch.files_indexed,
            batch.fragments.len(),
            self.chunk_size,
            self.chunk_overlap
        );

        Ok(batch)
    }
}

fn is_git_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() && entry.file_name() == ".git"
}
