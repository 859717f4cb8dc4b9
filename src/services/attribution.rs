//! Source attribution for retrieved chunks.
//!
//! Converts a ranked result list into a human-readable grouped summary and a
//! structured source list. The rank score is purely positional.

use std::collections::{BTreeSet, HashMap};

use serde_json::Value;

use crate::models::{Chunk, RetrievedSource, SourceChunk, SourceDocument};

fn page_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Grouped, human-readable summary of the result's sources.
///
/// Chunks are grouped by their `source` metadata in first-occurrence order;
/// page numbers are deduplicated and string-sorted. Zero results produce an
/// empty string, not a header with no body.
pub fn sources_markdown(results: &[Chunk]) -> String {
    if results.is_empty() {
        return String::new();
    }

    let header = "## Sources\n\n";

    // a file may appear several times at different locations
    let mut order: Vec<String> = Vec::new();
    let mut pages: HashMap<String, BTreeSet<String>> = HashMap::new();
    for chunk in results {
        let source = chunk.meta_str("source").unwrap_or("Unknown").to_string();
        if !pages.contains_key(&source) {
            order.push(source.clone());
            pages.insert(source.clone(), BTreeSet::new());
        }
        for key in ["page", "page_number"] {
            if let Some(value) = chunk.metadata.get(key)
                && !value.is_null()
                && let Some(seen) = pages.get_mut(&source)
            {
                seen.insert(page_string(value));
            }
        }
    }

    let bullets: Vec<String> = order
        .iter()
        .map(|source| {
            let seen = &pages[source];
            if seen.is_empty() {
                source.clone()
            } else {
                let listed: Vec<String> = seen.iter().cloned().collect();
                format!("{}, p. {}", source, listed.join(", "))
            }
        })
        .collect();

    format!("{header}* {}", bullets.join("\n* "))
}

fn parse_int_array(value: Option<&Value>) -> Option<Vec<i64>> {
    match value? {
        Value::Number(n) => n.as_i64().map(|n| vec![n]),
        Value::String(s) => s.parse::<i64>().ok().map(|n| vec![n]),
        _ => None,
    }
}

/// Structured source list for the result, one entry per chunk.
///
/// Rank score is `results.len() - position`: strictly descending by result
/// order, no other scoring function.
pub fn file_sources(results: &[Chunk]) -> Vec<RetrievedSource> {
    let length = results.len() as i64;

    results
        .iter()
        .enumerate()
        .map(|(i, doc)| RetrievedSource {
            title: doc.meta_str("source").unwrap_or("Unknown").to_string(),
            chunk: SourceChunk {
                uri: doc.meta_str("id").unwrap_or_default().to_string(),
                content: doc.content.clone(),
                pages: parse_int_array(doc.metadata.get("page")),
                score: length - i as i64,
            },
            document: SourceDocument {
                uri: doc.meta_str("doc_id").unwrap_or_default().to_string(),
                name: doc
                    .meta_str("source")
                    .unwrap_or("Unknown Filename")
                    .to_string(),
                mime_type: doc.meta_str("mime_type").unwrap_or_default().to_string(),
                link: doc.meta_str("link").map(str::to_string),
            },
            metadata: doc
                .metadata
                .iter()
                .filter(|(key, _)| !matches!(key.as_str(), "page" | "id" | "doc_id"))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(source: &str, page: Option<i64>) -> Chunk {
        let mut chunk = Chunk::new("content").meta("source", source);
        if let Some(page) = page {
            chunk = chunk.meta("page", page);
        }
        chunk
    }

    #[test]
    fn test_empty_results_give_empty_summary() {
        assert_eq!(sources_markdown(&[]), "");
    }

    #[test]
    fn test_grouping_preserves_first_occurrence_order() {
        let results = vec![
            chunk("b.pdf", Some(1)),
            chunk("a.pdf", None),
            chunk("b.pdf", Some(3)),
        ];
        let summary = sources_markdown(&results);
        assert_eq!(summary, "## Sources\n\n* b.pdf, p. 1, 3\n* a.pdf");
    }

    #[test]
    fn test_pages_deduplicated_and_string_sorted() {
        // string comparison sorts "10" before "2"
        let results = vec![
            chunk("doc.pdf", Some(2)),
            chunk("doc.pdf", Some(10)),
            chunk("doc.pdf", Some(2)),
        ];
        let summary = sources_markdown(&results);
        assert_eq!(summary, "## Sources\n\n* doc.pdf, p. 10, 2");
    }

    #[test]
    fn test_page_number_metadata_counts_too() {
        let results = vec![Chunk::new("x")
            .meta("source", "sheet.xlsx")
            .meta("page_number", 1)];
        let summary = sources_markdown(&results);
        assert_eq!(summary, "## Sources\n\n* sheet.xlsx, p. 1");
    }

    #[test]
    fn test_rank_score_is_strictly_descending() {
        let results = vec![
            chunk("a.pdf", Some(1)),
            chunk("b.pdf", None),
            chunk("c.pdf", None),
        ];
        let sources = file_sources(&results);
        let scores: Vec<i64> = sources.iter().map(|s| s.chunk.score).collect();
        assert_eq!(scores, [3, 2, 1]);
    }

    #[test]
    fn test_file_sources_fields_and_metadata_filtering() {
        let chunk = Chunk::new("body")
            .meta("source", "report.pdf")
            .meta("id", "chunk-1")
            .meta("doc_id", "doc-1")
            .meta("mime_type", "application/pdf")
            .meta("page", 4)
            .meta("segment_begin_seconds", 0);
        let sources = file_sources(&[chunk]);

        assert_eq!(sources.len(), 1);
        let source = &sources[0];
        assert_eq!(source.title, "report.pdf");
        assert_eq!(source.chunk.uri, "chunk-1");
        assert_eq!(source.chunk.pages, Some(vec![4]));
        assert_eq!(source.document.uri, "doc-1");
        assert_eq!(source.document.mime_type, "application/pdf");
        assert!(source.document.link.is_none());

        // page, id and doc_id are dropped from the residual metadata
        assert!(!source.metadata.contains_key("page"));
        assert!(!source.metadata.contains_key("id"));
        assert!(!source.metadata.contains_key("doc_id"));
        assert!(source.metadata.contains_key("segment_begin_seconds"));
    }

    #[test]
    fn test_file_sources_empty() {
        assert!(file_sources(&[]).is_empty());
    }
}
