//! YAML, split along document and structure boundaries.

use super::FormatProvider;
use super::plain::decode_utf8;
use crate::error::ProcessingError;
use crate::models::{Chunk, ChunkOptions, SourceFile};
use crate::services::splitter::TextSplitter;

const SEPARATORS: [&str; 9] = [
    "\n---\n", // separates multi-document YAML
    "\n\n",    // empty lines
    "\n- ",    // list items
    "\n  ",    // indented lines (2 spaces)
    "\n    ",  // further indented lines (4 spaces)
    "\n",      // single line breaks
    ": ",      // key-value pairs
    ", ",      // comma-separated values
    " ",       // single spaces
];

pub struct YamlProvider {
    default_chunk_size: usize,
    default_chunk_overlap: usize,
}

impl YamlProvider {
    pub fn new() -> Self {
        Self {
            default_chunk_size: 1000,
            default_chunk_overlap: 200,
        }
    }
}

impl Default for YamlProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatProvider for YamlProvider {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn file_name_extensions(&self) -> &[&'static str] {
        &[".yml", ".yaml"]
    }

    fn process_file(
        &self,
        file: &SourceFile,
        opts: &ChunkOptions,
    ) -> Result<Vec<Chunk>, ProcessingError> {
        let text = decode_utf8(&file.buffer()?)?;
        let (chunk_size, chunk_overlap) =
            opts.resolve(self.default_chunk_size, self.default_chunk_overlap)?;
        let splitter = TextSplitter::with_separators(chunk_size, chunk_overlap, &SEPARATORS);
        Ok(splitter.create_chunks(&[&text]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::test_support::temp_file;

    #[test]
    fn test_yaml_multi_document_split() {
        let doc = "key: value\nlist:\n- one\n- two\n";
        let text = format!("{doc}\n---\n{doc}");
        let (_dir, file) = temp_file(text.as_bytes(), "conf.yaml");

        let provider = YamlProvider::new();
        assert!(provider.supports(&file));

        let opts = ChunkOptions {
            chunk_size: Some(40),
            chunk_overlap: Some(0),
        };
        let chunks = provider.process_file(&file, &opts).unwrap();
        assert!(chunks.len() >= 2);
    }
}
