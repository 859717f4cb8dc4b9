//! Plain text.

use super::FormatProvider;
use crate::error::ProcessingError;
use crate::models::{Chunk, ChunkOptions, SourceFile};
use crate::services::splitter::TextSplitter;

pub struct PlainProvider {
    default_chunk_size: usize,
    default_chunk_overlap: usize,
}

impl PlainProvider {
    pub fn new() -> Self {
        Self {
            default_chunk_size: 1000,
            default_chunk_overlap: 200,
        }
    }
}

impl Default for PlainProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatProvider for PlainProvider {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn file_name_extensions(&self) -> &[&'static str] {
        &[".txt", ".text"]
    }

    fn process_file(
        &self,
        file: &SourceFile,
        opts: &ChunkOptions,
    ) -> Result<Vec<Chunk>, ProcessingError> {
        let text = decode_utf8(&file.buffer()?)?;
        let (chunk_size, chunk_overlap) =
            opts.resolve(self.default_chunk_size, self.default_chunk_overlap)?;
        let splitter = TextSplitter::new(chunk_size, chunk_overlap);
        Ok(splitter.create_chunks(&[&text]))
    }
}

/// Decode a text buffer, rejecting non-UTF-8 input.
pub(crate) fn decode_utf8(buffer: &[u8]) -> Result<String, ProcessingError> {
    String::from_utf8(buffer.to_vec())
        .map_err(|_| ProcessingError::invalid("file content is not valid UTF-8"))
}
