//! Generic XML, split along element boundaries.

use super::FormatProvider;
use super::plain::decode_utf8;
use crate::error::ProcessingError;
use crate::models::{Chunk, ChunkOptions, SourceFile};
use crate::services::splitter::TextSplitter;

const SEPARATORS: [&str; 4] = ["\n<", "\n\n", "\n", " "];

pub struct XmlProvider {
    default_chunk_size: usize,
    default_chunk_overlap: usize,
}

impl XmlProvider {
    pub fn new() -> Self {
        Self {
            default_chunk_size: 1000,
            default_chunk_overlap: 200,
        }
    }
}

impl Default for XmlProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatProvider for XmlProvider {
    fn name(&self) -> &'static str {
        "xml"
    }

    fn file_name_extensions(&self) -> &[&'static str] {
        &[".xml"]
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
    fn test_xml_roundtrip() {
        let (_dir, file) = temp_file(b"<root>\n<item>a</item>\n</root>", "data.xml");
        let provider = XmlProvider::new();
        assert!(provider.supports(&file));

        let chunks = provider.process_file(&file, &ChunkOptions::default()).unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].content.contains("<item>a</item>"));
    }
}
