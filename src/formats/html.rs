//! HTML markup, split along block-level tags. Content is preserved verbatim.

use super::FormatProvider;
use super::plain::decode_utf8;
use crate::error::ProcessingError;
use crate::models::{Chunk, ChunkOptions, SourceFile};
use crate::services::splitter::TextSplitter;

const SEPARATORS: [&str; 14] = [
    "<body", "<div", "<section", "<article", "<p", "<br", "<li", "<h1", "<h2", "<h3", "<table",
    "\n\n", "\n", " ",
];

pub struct HtmlProvider {
    default_chunk_size: usize,
    default_chunk_overlap: usize,
}

impl HtmlProvider {
    pub fn new() -> Self {
        Self {
            default_chunk_size: 1000,
            default_chunk_overlap: 200,
        }
    }
}

impl Default for HtmlProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatProvider for HtmlProvider {
    fn name(&self) -> &'static str {
        "html"
    }

    fn file_name_extensions(&self) -> &[&'static str] {
        &[".html", ".htm", ".xhtml"]
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
    fn test_html_content_preserved() {
        let (_dir, file) = temp_file(b"<h1>Hello World!</h1>", "text.html");
        let provider = HtmlProvider::new();
        assert!(provider.supports(&file));

        let chunks = provider.process_file(&file, &ChunkOptions::default()).unwrap();
        assert!(!chunks.is_empty());
        assert_eq!(chunks[0].content, "<h1>Hello World!</h1>");
    }
}
