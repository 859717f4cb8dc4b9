//! Source code, split along language-specific declaration boundaries.

use super::FormatProvider;
use super::plain::decode_utf8;
use crate::error::ProcessingError;
use crate::models::{Chunk, ChunkOptions, SourceFile};
use crate::services::splitter::TextSplitter;

/// Separator ladders per language, from coarse declarations down to lines.
fn language_separators(extension: &str) -> Option<&'static [&'static str]> {
    Some(match extension {
        ".cpp" => &[
            "\nclass ", "\nvoid ", "\nint ", "\nnamespace ", "\nif ", "\nfor ", "\nwhile ",
            "\n\n", "\n", " ",
        ],
        ".go" => &[
            "\nfunc ", "\ntype ", "\nvar ", "\nconst ", "\nif ", "\nfor ", "\n\n", "\n", " ",
        ],
        ".java" => &[
            "\nclass ", "\npublic ", "\nprotected ", "\nprivate ", "\nstatic ", "\nif ", "\nfor ",
            "\n\n", "\n", " ",
        ],
        ".js" => &[
            "\nfunction ", "\nconst ", "\nlet ", "\nvar ", "\nclass ", "\nif ", "\nfor ",
            "\n\n", "\n", " ",
        ],
        ".php" => &[
            "\nfunction ", "\nclass ", "\nif ", "\nforeach ", "\nwhile ", "\n\n", "\n", " ",
        ],
        ".proto" => &[
            "\nmessage ", "\nservice ", "\nenum ", "\noption ", "\nimport ", "\n\n", "\n", " ",
        ],
        ".py" => &["\nclass ", "\ndef ", "\n\tdef ", "\n\n", "\n", " "],
        ".rb" => &[
            "\ndef ", "\nclass ", "\nmodule ", "\nif ", "\nunless ", "\nwhile ", "\n\n", "\n", " ",
        ],
        ".rs" => &[
            "\nfn ", "\nconst ", "\nlet ", "\nif ", "\nwhile ", "\nfor ", "\nloop ", "\nmatch ",
            "\n\n", "\n", " ",
        ],
        ".rst" => &["\n=+\n", "\n-+\n", "\n\n", "\n", " "],
        ".scala" => &[
            "\nclass ", "\nobject ", "\ndef ", "\nval ", "\nvar ", "\nif ", "\nfor ", "\n\n",
            "\n", " ",
        ],
        ".swift" => &[
            "\nfunc ", "\nclass ", "\nstruct ", "\nenum ", "\nif ", "\nfor ", "\nwhile ", "\n\n",
            "\n", " ",
        ],
        _ => return None,
    })
}

pub struct CodeProvider {
    default_chunk_size: usize,
    default_chunk_overlap: usize,
}

impl CodeProvider {
    pub fn new() -> Self {
        Self {
            default_chunk_size: 4000,
            default_chunk_overlap: 200,
        }
    }
}

impl Default for CodeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatProvider for CodeProvider {
    fn name(&self) -> &'static str {
        "code"
    }

    fn file_name_extensions(&self) -> &[&'static str] {
        &[
            ".cpp", ".go", ".java", ".js", ".php", ".proto", ".py", ".rb", ".rs", ".rst",
            ".scala", ".swift",
        ]
    }

    fn process_file(
        &self,
        file: &SourceFile,
        opts: &ChunkOptions,
    ) -> Result<Vec<Chunk>, ProcessingError> {
        let text = decode_utf8(&file.buffer()?)?;

        let name = file.file_name.to_lowercase();
        let separators = self
            .file_name_extensions()
            .iter()
            .find(|ext| name.ends_with(*ext))
            .and_then(|ext| language_separators(ext))
            .ok_or_else(|| ProcessingError::invalid("invalid language found"))?;

        let (chunk_size, chunk_overlap) =
            opts.resolve(self.default_chunk_size, self.default_chunk_overlap)?;
        let splitter = TextSplitter::with_separators(chunk_size, chunk_overlap, separators);
        Ok(splitter.create_chunks(&[&text]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::test_support::temp_file;

    #[test]
    fn test_code_content_preserved() {
        let (_dir, file) = temp_file(b"print(\"Hello World!\")", "script.py");
        let provider = CodeProvider::new();
        assert!(provider.supports(&file));

        let chunks = provider.process_file(&file, &ChunkOptions::default()).unwrap();
        assert!(!chunks.is_empty());
        assert_eq!(chunks[0].content, "print(\"Hello World!\")");
    }

    #[test]
    fn test_code_splits_at_function_boundaries() {
        let body = "    x = 1\n".repeat(10);
        let text = format!("def first():\n{body}\ndef second():\n{body}");
        let (_dir, file) = temp_file(text.as_bytes(), "mod.py");

        let provider = CodeProvider::new();
        let opts = ChunkOptions {
            chunk_size: Some(120),
            chunk_overlap: Some(0),
        };
        let chunks = provider.process_file(&file, &opts).unwrap();
        assert!(chunks.len() >= 2);
        assert!(chunks.iter().any(|c| c.content.starts_with("def second()")));
    }

    #[test]
    fn test_every_claimed_extension_has_separators() {
        let provider = CodeProvider::new();
        for ext in provider.file_name_extensions() {
            assert!(language_separators(ext).is_some(), "missing separators for {ext}");
        }
    }
}
