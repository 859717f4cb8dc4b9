//! Excel workbooks (.xlsx), one document per sheet.

use calamine::Reader;

use super::FormatProvider;
use crate::error::ProcessingError;
use crate::models::{Chunk, ChunkOptions, SourceFile};
use crate::services::splitter::TextSplitter;

pub struct MsExcelProvider {
    default_chunk_size: usize,
    default_chunk_overlap: usize,
}

impl MsExcelProvider {
    pub fn new() -> Self {
        Self {
            default_chunk_size: 1000,
            default_chunk_overlap: 200,
        }
    }
}

impl Default for MsExcelProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatProvider for MsExcelProvider {
    fn name(&self) -> &'static str {
        "ms_excel"
    }

    fn file_name_extensions(&self) -> &[&'static str] {
        &[".xlsx"]
    }

    fn process_file(
        &self,
        file: &SourceFile,
        opts: &ChunkOptions,
    ) -> Result<Vec<Chunk>, ProcessingError> {
        let buffer = file.buffer()?;
        let cursor = std::io::Cursor::new(buffer);
        let mut workbook = calamine::open_workbook_auto_from_rs(cursor)
            .map_err(|e| ProcessingError::invalid(format!("failed to parse xlsx: {e}")))?;

        let mut documents = Vec::new();
        for (sheet_index, sheet_name) in workbook.sheet_names().to_vec().into_iter().enumerate() {
            let Ok(range) = workbook.worksheet_range(&sheet_name) else {
                continue;
            };

            let mut lines = Vec::new();
            for row in range.rows() {
                let cells: Vec<String> = row
                    .iter()
                    .map(|cell| match cell {
                        calamine::Data::Empty => String::new(),
                        calamine::Data::String(s) => s.clone(),
                        calamine::Data::Float(f) => f.to_string(),
                        calamine::Data::Int(i) => i.to_string(),
                        calamine::Data::Bool(b) => b.to_string(),
                        calamine::Data::DateTime(dt) => dt.to_string(),
                        _ => String::new(),
                    })
                    .collect();
                if cells.iter().any(|c| !c.is_empty()) {
                    lines.push(cells.join(" ").trim().to_string());
                }
            }

            if lines.is_empty() {
                continue;
            }

            documents.push(
                Chunk::new(lines.join("\n"))
                    .meta("page_name", sheet_name)
                    .meta("page_number", (sheet_index + 1) as i64),
            );
        }

        let (chunk_size, chunk_overlap) =
            opts.resolve(self.default_chunk_size, self.default_chunk_overlap)?;
        let splitter = TextSplitter::new(chunk_size, chunk_overlap);
        Ok(splitter.split_chunks(&documents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::test_support::named_file;

    #[test]
    fn test_ms_excel_provider_claims_xlsx() {
        let provider = MsExcelProvider::new();
        assert!(provider.supports(&named_file("birthdays.xlsx")));
        assert!(!provider.supports(&named_file("birthdays.xls")));
    }
}
