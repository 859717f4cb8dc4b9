//! JSON documents, split into size-bounded sub-objects.
//!
//! Objects are walked depth-first and leaf entries are packed into chunks
//! whose serialized size stays at or below the chunk size, each chunk
//! reproducing the nesting path of its entries. Arrays and scalars are
//! treated as leaves.

use serde_json::{Map, Value};

use super::FormatProvider;
use super::plain::decode_utf8;
use crate::error::ProcessingError;
use crate::models::{Chunk, ChunkOptions, SourceFile};

pub struct JsonProvider {
    default_chunk_size: usize,
}

impl JsonProvider {
    pub fn new() -> Self {
        Self {
            default_chunk_size: 1000,
        }
    }
}

impl Default for JsonProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatProvider for JsonProvider {
    fn name(&self) -> &'static str {
        "json"
    }

    fn file_name_extensions(&self) -> &[&'static str] {
        &[".json"]
    }

    fn process_file(
        &self,
        file: &SourceFile,
        opts: &ChunkOptions,
    ) -> Result<Vec<Chunk>, ProcessingError> {
        let text = decode_utf8(&file.buffer()?)?;
        let value: Value = serde_json::from_str(&text)
            .map_err(|e| ProcessingError::invalid(format!("invalid JSON: {e}")))?;

        let (chunk_size, _) = opts.resolve(self.default_chunk_size, 0)?;

        let chunks = split_json(&value, chunk_size)
            .into_iter()
            .map(|part| Chunk::new(compact(&part)))
            .collect();
        Ok(chunks)
    }
}

fn compact(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// Split a JSON value into sub-objects whose serialized size is bounded by
/// `max_size` where possible. A single oversized leaf still produces one
/// chunk of its own.
pub(crate) fn split_json(value: &Value, max_size: usize) -> Vec<Value> {
    let Value::Object(root) = value else {
        return vec![value.clone()];
    };
    if root.is_empty() {
        return Vec::new();
    }

    let mut done: Vec<Map<String, Value>> = Vec::new();
    let mut current: Map<String, Value> = Map::new();
    collect(root, &mut Vec::new(), &mut current, &mut done, max_size);
    if !current.is_empty() {
        done.push(current);
    }

    done.into_iter().map(Value::Object).collect()
}

fn collect(
    obj: &Map<String, Value>,
    path: &mut Vec<String>,
    current: &mut Map<String, Value>,
    done: &mut Vec<Map<String, Value>>,
    max_size: usize,
) {
    for (key, value) in obj {
        match value {
            Value::Object(nested) if !nested.is_empty() => {
                path.push(key.clone());
                collect(nested, path, current, done, max_size);
                path.pop();
            }
            leaf => {
                let mut candidate = current.clone();
                set_nested(&mut candidate, path, key, leaf.clone());

                if !current.is_empty() && compact(&Value::Object(candidate.clone())).len() > max_size
                {
                    done.push(std::mem::take(current));
                    set_nested(current, path, key, leaf.clone());
                } else {
                    *current = candidate;
                }
            }
        }
    }
}

/// Insert `value` under `path` + `key`, creating intermediate objects.
fn set_nested(map: &mut Map<String, Value>, path: &[String], key: &str, value: Value) {
    let mut cursor = map;
    for segment in path {
        let entry = cursor
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(next) = entry else {
            return;
        };
        cursor = next;
    }
    cursor.insert(key.to_string(), value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::test_support::temp_file;
    use serde_json::json;

    #[test]
    fn test_small_object_single_chunk() {
        let value = json!({"a": 1, "b": "two"});
        let parts = split_json(&value, 1000);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0], value);
    }

    #[test]
    fn test_split_respects_size_bound() {
        let value = json!({
            "ducks": [
                {"name": "Dagobert Duck", "birthdate": "1867-03-19"},
                {"name": "Donald Duck", "birthdate": "1934-06-09"}
            ],
            "additional_info": {"creator": "Walt Disney"}
        });
        let parts = split_json(&value, 100);
        assert_eq!(parts.len(), 2);
        assert!(parts[0].get("ducks").is_some());
        assert_eq!(
            parts[1],
            json!({"additional_info": {"creator": "Walt Disney"}})
        );
    }

    #[test]
    fn test_nested_paths_preserved() {
        let value = json!({"a": {"b": {"c": 1, "d": 2}}});
        let parts = split_json(&value, 1000);
        assert_eq!(parts, vec![value]);
    }

    #[test]
    fn test_empty_object_yields_nothing() {
        assert!(split_json(&json!({}), 100).is_empty());
    }

    #[test]
    fn test_json_provider_parses_and_chunks() {
        let (_dir, file) = temp_file(br#"{"name": "Donald Duck"}"#, "birthdays.json");
        let provider = JsonProvider::new();
        assert!(provider.supports(&file));

        let chunks = provider.process_file(&file, &ChunkOptions::default()).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, r#"{"name":"Donald Duck"}"#);
    }

    #[test]
    fn test_json_provider_rejects_invalid_json() {
        let (_dir, file) = temp_file(b"{not json", "bad.json");
        let provider = JsonProvider::new();
        assert!(provider.process_file(&file, &ChunkOptions::default()).is_err());
    }
}
