//! PDF documents, extracted page by page.

use super::FormatProvider;
use crate::error::ProcessingError;
use crate::models::{Chunk, ChunkOptions, SourceFile};
use crate::services::splitter::TextSplitter;

pub struct PdfProvider {
    default_chunk_size: usize,
    default_chunk_overlap: usize,
}

impl PdfProvider {
    pub fn new() -> Self {
        Self {
            default_chunk_size: 1000,
            default_chunk_overlap: 200,
        }
    }
}

impl Default for PdfProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatProvider for PdfProvider {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn file_name_extensions(&self) -> &[&'static str] {
        &[".pdf"]
    }

    fn process_file(
        &self,
        file: &SourceFile,
        opts: &ChunkOptions,
    ) -> Result<Vec<Chunk>, ProcessingError> {
        let buffer = file.buffer()?;
        let pages = pdf_extract::extract_text_from_mem_by_pages(&buffer)
            .map_err(|e| ProcessingError::invalid(format!("failed to parse PDF: {e}")))?;

        // pages are numbered from 1, following document convention
        let documents: Vec<Chunk> = pages
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                Chunk::new(text)
                    .meta("page", (i + 1) as i64)
                    .meta("pdf_parser", "pdf-extract")
            })
            .collect();

        let (chunk_size, chunk_overlap) =
            opts.resolve(self.default_chunk_size, self.default_chunk_overlap)?;
        let splitter = TextSplitter::new(chunk_size, chunk_overlap);
        let mut chunks = splitter.split_chunks(&documents);

        // NUL bytes cannot be stored by pgvector
        for chunk in &mut chunks {
            if chunk.content.contains('\0') {
                chunk.content = chunk.content.replace('\0', "\u{fffd}");
            }
        }

        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::test_support::named_file;

    #[test]
    fn test_pdf_provider_supports_only_pdf() {
        let provider = PdfProvider::new();
        assert!(provider.supports(&named_file("report.pdf")));
        assert!(provider.supports(&named_file("REPORT.PDF")));
        assert!(!provider.supports(&named_file("report.docx")));
    }
}
