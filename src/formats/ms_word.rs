//! Word documents (.docx), paragraph text extraction.

use docx_rs::{DocumentChild, ParagraphChild, RunChild};

use super::FormatProvider;
use crate::error::ProcessingError;
use crate::models::{Chunk, ChunkOptions, SourceFile};
use crate::services::splitter::TextSplitter;

pub struct MsWordProvider {
    default_chunk_size: usize,
    default_chunk_overlap: usize,
}

impl MsWordProvider {
    pub fn new() -> Self {
        Self {
            default_chunk_size: 1000,
            default_chunk_overlap: 200,
        }
    }
}

impl Default for MsWordProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatProvider for MsWordProvider {
    fn name(&self) -> &'static str {
        "ms_word"
    }

    fn file_name_extensions(&self) -> &[&'static str] {
        &[".docx"]
    }

    fn process_file(
        &self,
        file: &SourceFile,
        opts: &ChunkOptions,
    ) -> Result<Vec<Chunk>, ProcessingError> {
        let buffer = file.buffer()?;
        let doc = docx_rs::read_docx(&buffer)
            .map_err(|e| ProcessingError::invalid(format!("failed to parse docx: {e}")))?;

        let mut content = String::new();
        for child in doc.document.children {
            if let DocumentChild::Paragraph(paragraph) = child {
                for child in paragraph.children {
                    if let ParagraphChild::Run(run) = child {
                        for child in run.children {
                            if let RunChild::Text(text) = child {
                                content.push_str(&text.text);
                            }
                        }
                    }
                }
                content.push('\n');
            }
        }

        let (chunk_size, chunk_overlap) =
            opts.resolve(self.default_chunk_size, self.default_chunk_overlap)?;
        let splitter = TextSplitter::new(chunk_size, chunk_overlap);
        Ok(splitter.create_chunks(&[&content]))
    }
}
