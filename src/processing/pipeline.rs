//! Composition of normalization, header stripping, coalescing, and chunk splitting.

use super::chunking::ChunkSplitter;
use super::coalesce::PageCoalescer;
use super::normalize::HeaderStripper;
use super::types::{Chunk, CleanedUnit, Page, PipelineError};

/// Header patterns recognised in the bundled medical guides.
pub const DEFAULT_HEADER_PATTERNS: [&str; 3] =
    ["^GUÍA.*", "^Manual.*Cruz Roja.*", "^Referencia Rápida.*"];

/// Tunables for [`PreprocessPipeline`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Pages with fewer cleaned characters are merged with their neighbours.
    pub min_page_characters: usize,
    /// Whole-line header patterns, matched case-insensitively.
    pub header_patterns: Vec<String>,
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Maximum characters shared by consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_page_characters: 400,
            header_patterns: DEFAULT_HEADER_PATTERNS
                .iter()
                .map(|pattern| pattern.to_string())
                .collect(),
            chunk_size: 900,
            chunk_overlap: 150,
        }
    }
}

/// Result of running the full pipeline over a batch of pages.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Number of pages fed into the pipeline.
    pub page_count: usize,
    /// Units produced by the coalescer.
    pub units: Vec<CleanedUnit>,
    /// Chunks produced from those units.
    pub chunks: Vec<Chunk>,
}

/// Turns loader pages into chunks. Built once; validation happens at construction.
#[derive(Debug, Clone)]
pub struct PreprocessPipeline {
    coalescer: PageCoalescer,
    splitter: ChunkSplitter,
}

impl PreprocessPipeline {
    /// Validate the configuration and compile header patterns.
    pub fn new(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let stripper = HeaderStripper::new(&config.header_patterns)?;
        let splitter = ChunkSplitter::new(config.chunk_size, config.chunk_overlap)?;
        Ok(Self {
            coalescer: PageCoalescer::new(config.min_page_characters, stripper),
            splitter,
        })
    }

    /// Normalize, strip, and coalesce pages.
    pub fn clean(&self, pages: Vec<Page>) -> Vec<CleanedUnit> {
        self.coalescer.coalesce(pages)
    }

    /// Split cleaned units into chunks.
    pub fn split(&self, units: &[CleanedUnit]) -> Vec<Chunk> {
        self.splitter.split_units(units)
    }

    /// Run the pipeline end to end, returning only the chunks.
    pub fn run(&self, pages: Vec<Page>) -> Vec<Chunk> {
        self.process(pages).chunks
    }

    /// Run the pipeline end to end, keeping intermediate units for reporting.
    pub fn process(&self, pages: Vec<Page>) -> PipelineOutput {
        let page_count = pages.len();
        let units = self.clean(pages);
        let chunks = self.split(&units);
        tracing::info!(
            pages = page_count,
            units = units.len(),
            chunks = chunks.len(),
            "Preprocessed pages"
        );
        PipelineOutput {
            page_count,
            units,
            chunks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PipelineConfig {
        PipelineConfig {
            min_page_characters: 80,
            chunk_size: 120,
            chunk_overlap: 20,
            ..PipelineConfig::default()
        }
    }

    fn body(paragraphs: usize, tag: &str) -> String {
        (0..paragraphs)
            .map(|i| format!("Paragraph {i} of {tag} explains a first aid step in detail."))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    #[test]
    fn pages_flow_through_to_chunks_with_provenance() {
        let pages = vec![
            Page::new("guia.pdf", "GUÍA DE PRIMEROS AUXILIOS\nÍndice", Some(1)),
            Page::new("guia.pdf", "Referencia Rápida 2021\r\nContenido", Some(2)),
            Page::new(
                "guia.pdf",
                format!("Manual de la Cruz Roja\n{}", body(6, "burns")),
                Some(3),
            ),
        ];

        let pipeline = PreprocessPipeline::new(&config()).expect("pipeline");
        let output = pipeline.process(pages);

        assert_eq!(output.page_count, 3);
        assert_eq!(output.units.len(), 2);
        assert_eq!(output.units[0].content, "Índice\n\nContenido");
        assert_eq!(
            (output.units[0].page_start, output.units[0].page_end),
            (Some(1), Some(2))
        );

        assert!(output.chunks.len() > 2);
        assert_eq!(output.chunks[0].content, "Índice\n\nContenido");
        for chunk in &output.chunks[1..] {
            assert_eq!(chunk.source, "guia.pdf");
            assert_eq!((chunk.page_start, chunk.page_end), (Some(3), Some(3)));
            assert!(chunk.content.chars().count() <= 120);
            assert!(!chunk.content.contains("Cruz Roja"));
        }
    }

    #[test]
    fn run_returns_the_same_chunks_as_process() {
        let pages = vec![Page::new("a.pdf", body(4, "cpr"), Some(1))];
        let pipeline = PreprocessPipeline::new(&config()).expect("pipeline");
        assert_eq!(pipeline.run(pages.clone()), pipeline.process(pages).chunks);
    }

    #[test]
    fn empty_input_produces_nothing() {
        let pipeline = PreprocessPipeline::new(&PipelineConfig::default()).expect("pipeline");
        let output = pipeline.process(Vec::new());
        assert_eq!(output.page_count, 0);
        assert!(output.units.is_empty());
        assert!(output.chunks.is_empty());
    }

    #[test]
    fn invalid_configuration_is_rejected_at_construction() {
        let overlap = PipelineConfig {
            chunk_size: 100,
            chunk_overlap: 200,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            PreprocessPipeline::new(&overlap),
            Err(PipelineError::OverlapTooLarge { .. })
        ));

        let pattern = PipelineConfig {
            header_patterns: vec!["[".into()],
            ..PipelineConfig::default()
        };
        assert!(matches!(
            PreprocessPipeline::new(&pattern),
            Err(PipelineError::InvalidHeaderPattern { .. })
        ));
    }
}
