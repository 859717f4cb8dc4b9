//! PowerPoint presentations (.pptx), one document per slide.

use std::io::Read;

use quick_xml::Reader;
use quick_xml::events::Event;

use super::FormatProvider;
use crate::error::ProcessingError;
use crate::models::{Chunk, ChunkOptions, SourceFile};
use crate::services::splitter::TextSplitter;

pub struct MsPptProvider {
    default_chunk_size: usize,
    default_chunk_overlap: usize,
}

impl MsPptProvider {
    pub fn new() -> Self {
        Self {
            default_chunk_size: 1000,
            default_chunk_overlap: 200,
        }
    }
}

impl Default for MsPptProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatProvider for MsPptProvider {
    fn name(&self) -> &'static str {
        "ms_ppt"
    }

    fn file_name_extensions(&self) -> &[&'static str] {
        &[".pptx"]
    }

    fn process_file(
        &self,
        file: &SourceFile,
        opts: &ChunkOptions,
    ) -> Result<Vec<Chunk>, ProcessingError> {
        let buffer = file.buffer()?;
        let cursor = std::io::Cursor::new(buffer);
        let mut archive = zip::ZipArchive::new(cursor)
            .map_err(|e| ProcessingError::invalid(format!("failed to open pptx archive: {e}")))?;

        // slides live at ppt/slides/slideN.xml; sort by N
        let mut slide_names: Vec<String> = archive
            .file_names()
            .filter(|name| name.starts_with("ppt/slides/slide") && name.ends_with(".xml"))
            .map(|s| s.to_string())
            .collect();
        slide_names.sort_by_key(|name| {
            name.trim_start_matches("ppt/slides/slide")
                .trim_end_matches(".xml")
                .parse::<u32>()
                .unwrap_or(0)
        });

        let mut documents = Vec::new();
        for (slide_index, slide_name) in slide_names.iter().enumerate() {
            let mut xml_content = String::new();
            if let Ok(mut entry) = archive.by_name(slide_name) {
                if entry.read_to_string(&mut xml_content).is_err() {
                    continue;
                }
            }

            let text = slide_text(&xml_content);
            if text.is_empty() {
                continue;
            }

            documents.push(
                Chunk::new(text)
                    .meta("page_name", format!("Slide {}", slide_index + 1))
                    .meta("page_number", (slide_index + 1) as i64),
            );
        }

        let (chunk_size, chunk_overlap) =
            opts.resolve(self.default_chunk_size, self.default_chunk_overlap)?;
        let splitter = TextSplitter::new(chunk_size, chunk_overlap);
        Ok(splitter.split_chunks(&documents))
    }
}

/// Collect the text runs (`<a:t>` elements) of one slide, one line per
/// paragraph.
fn slide_text(xml: &str) -> String {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut lines: Vec<String> = Vec::new();
    let mut current_line = String::new();
    let mut in_text_element = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text_element = true;
                }
            }
            Ok(Event::Text(e)) => {
                if in_text_element
                    && let Ok(text) = e.unescape()
                {
                    if !current_line.is_empty() {
                        current_line.push(' ');
                    }
                    current_line.push_str(text.trim());
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text_element = false,
                b"p" => {
                    if !current_line.trim().is_empty() {
                        lines.push(std::mem::take(&mut current_line));
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
    }

    if !current_line.trim().is_empty() {
        lines.push(current_line);
    }
    lines.join("\n")
}
