//! Merging of short pages into larger logical units per source document.
//!
//! Table-of-contents fragments and half-filled pages carry too little signal to be useful
//! retrieval units on their own. The coalescer buffers consecutive pages below
//! `min_characters` and flushes them as one unit when a full page arrives or the source runs
//! out, tracking the page range each unit spans.

use std::collections::HashMap;

use super::normalize::{HeaderStripper, normalize_text};
use super::types::{CleanedUnit, Page};

/// Normalizes, strips, and coalesces pages into [`CleanedUnit`]s.
#[derive(Debug, Clone)]
pub struct PageCoalescer {
    min_characters: usize,
    stripper: HeaderStripper,
}

impl PageCoalescer {
    /// Build a coalescer with the given short-page threshold and header stripper.
    pub fn new(min_characters: usize, stripper: HeaderStripper) -> Self {
        Self {
            min_characters,
            stripper,
        }
    }

    /// Normalize a page and remove its header lines.
    pub fn clean_page(&self, raw: &str) -> String {
        let normalized = normalize_text(raw);
        self.stripper.strip(&normalized).trim().to_string()
    }

    /// Clean and coalesce a batch of pages, processing each source independently.
    ///
    /// Sources appear in the output in the order they first appear in the input.
    pub fn coalesce(&self, pages: Vec<Page>) -> Vec<CleanedUnit> {
        let mut units = Vec::new();

        for (source, mut pages) in group_by_source(pages) {
            pages.sort_by_key(|page| page.page_number.unwrap_or(0));
            let mut buffer = PageBuffer::default();
            let before = units.len();

            for page in pages {
                let text = self.clean_page(&page.content);
                if text.is_empty() {
                    tracing::trace!(source = %source, page = ?page.page_number, "Skipping empty page");
                    continue;
                }

                if text.chars().count() < self.min_characters {
                    buffer.push(text, page.page_number);
                    continue;
                }

                if let Some(unit) = buffer.flush(&source) {
                    units.push(unit);
                }
                units.push(CleanedUnit::from_pages(
                    text,
                    source.as_str(),
                    page.page_number,
                ));
            }

            if let Some(unit) = buffer.flush(&source) {
                units.push(unit);
            }

            tracing::debug!(
                source = %source,
                units = units.len() - before,
                "Coalesced source pages"
            );
        }

        units
    }
}

/// Running buffer of below-threshold pages for one source.
#[derive(Default)]
struct PageBuffer {
    text: String,
    pages: Vec<u32>,
}

impl PageBuffer {
    fn push(&mut self, text: String, page_number: Option<u32>) {
        if self.text.is_empty() {
            self.text = text;
        } else {
            self.text.push_str("\n\n");
            self.text.push_str(&text);
        }
        if let Some(page) = page_number {
            self.pages.push(page);
        }
    }

    fn flush(&mut self, source: &str) -> Option<CleanedUnit> {
        if self.text.is_empty() {
            return None;
        }
        let text = std::mem::take(&mut self.text);
        let pages = std::mem::take(&mut self.pages);
        Some(CleanedUnit::from_pages(text, source, pages))
    }
}

fn group_by_source(pages: Vec<Page>) -> Vec<(String, Vec<Page>)> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<Page>)> = Vec::new();

    for page in pages {
        match positions.get(&page.source) {
            Some(&index) => groups[index].1.push(page),
            None => {
                positions.insert(page.source.clone(), groups.len());
                groups.push((page.source.clone(), vec![page]));
            }
        }
    }

    groups
}
