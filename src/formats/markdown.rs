//! Markdown, split along heading and paragraph structure.

use super::FormatProvider;
use super::plain::decode_utf8;
use crate::error::ProcessingError;
use crate::models::{Chunk, ChunkOptions, SourceFile};
use crate::services::splitter::TextSplitter;

const SEPARATORS: [&str; 9] = [
    "\n# ", "\n## ", "\n### ", "\n#### ", "\n```", "\n---\n", "\n\n", "\n", " ",
];

pub struct MarkdownProvider {
    default_chunk_size: usize,
    default_chunk_overlap: usize,
}

impl MarkdownProvider {
    pub fn new() -> Self {
        Self {
            default_chunk_size: 1000,
            default_chunk_overlap: 200,
        }
    }
}

impl Default for MarkdownProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatProvider for MarkdownProvider {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn file_name_extensions(&self) -> &[&'static str] {
        &[".md", ".markdown"]
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
    fn test_markdown_content_preserved() {
        let (_dir, file) = temp_file(b"# Hello World!", "text.md");
        let provider = MarkdownProvider::new();
        assert!(provider.supports(&file));

        let chunks = provider.process_file(&file, &ChunkOptions::default()).unwrap();
        assert!(!chunks.is_empty());
        assert_eq!(chunks[0].content, "# Hello World!");
    }

    #[test]
    fn test_markdown_splits_at_headings() {
        let section = "words ".repeat(40);
        let text = format!("# One\n{section}\n## Two\n{section}");
        let (_dir, file) = temp_file(text.as_bytes(), "doc.md");

        let provider = MarkdownProvider::new();
        let opts = ChunkOptions {
            chunk_size: Some(300),
            chunk_overlap: Some(0),
        };
        let chunks = provider.process_file(&file, &opts).unwrap();
        assert!(chunks.len() >= 2);
        assert!(chunks.iter().any(|c| c.content.starts_with("## Two")));
    }
}
