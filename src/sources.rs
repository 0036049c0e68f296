// 📥 Source Loader - Multi-AI dish lists
// Reads the per-source ranked lists and flattens them into DishEntry records

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

// ============================================================================
// CORE TYPES
// ============================================================================

/// One dish as listed by one source.
/// Immutable once read; `name` may be rewritten only by the alias table
/// before grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DishEntry {
    pub source_id: String,
    pub rank: u32,
    pub name: String,
    pub description: String,
    pub category: String,
    #[serde(rename = "type")]
    pub dish_type: String,
}

impl DishEntry {
    pub fn new(source_id: &str, rank: u32, name: &str) -> Self {
        DishEntry {
            source_id: source_id.to_string(),
            rank,
            name: name.to_string(),
            description: String::new(),
            category: String::new(),
            dish_type: String::new(),
        }
    }

    /// Builder pattern: add description
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Builder pattern: add category
    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    /// Builder pattern: add type
    pub fn with_type(mut self, dish_type: &str) -> Self {
        self.dish_type = dish_type.to_string();
        self
    }
}

/// Raw dish object as it appears in the input document
#[derive(Debug, Clone, Deserialize)]
struct RawDish {
    rank: u32,
    name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    description: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    category: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_empty")]
    dish_type: String,
}

/// Per-source wrapper; sources that never finished have no `dishes` array
#[derive(Debug, Clone, Default, Deserialize)]
struct RawSource {
    #[serde(default)]
    dishes: Option<Vec<RawDish>>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawDocument {
    #[serde(default)]
    metadata: Option<serde_json::Value>,

    #[serde(rename = "aiResults", alias = "sources")]
    ai_results: serde_json::Map<String, serde_json::Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// One source's ordered list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceList {
    pub id: String,
    pub dishes: Vec<DishEntry>,
}

/// The loaded input document, sources kept in document order
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub sources: Vec<SourceList>,
    pub metadata: Option<serde_json::Value>,

    /// Hex SHA-256 of the raw input bytes
    pub digest: String,
}

// ============================================================================
// SELECTION
// ============================================================================

/// Which parts of the document a run looks at
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceSelection {
    /// Restrict to these source ids, in this order (None = all, document order)
    #[serde(default)]
    pub sources: Option<Vec<String>>,

    /// Keep only the first N listed entries of each source
    #[serde(default)]
    pub depth: Option<usize>,

    /// Raw names dropped before normalization
    #[serde(default)]
    pub excluded_names: Vec<String>,
}

/// Result of applying a selection: flattened entries plus what was dropped
#[derive(Debug, Clone, Default)]
pub struct SelectedEntries {
    pub source_ids: Vec<String>,
    pub entries: Vec<DishEntry>,
    pub excluded: Vec<DishEntry>,
}

// ============================================================================
// LOADING
// ============================================================================

impl SourceDocument {
    /// Load and parse a document from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read input document: {:?}", path))?;

        Self::from_slice(&bytes)
            .with_context(|| format!("Failed to parse input document: {:?}", path))
    }

    /// Parse a document from raw JSON bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let raw: RawDocument = serde_json::from_slice(bytes).context("Malformed input JSON")?;

        let mut sources = Vec::with_capacity(raw.ai_results.len());
        for (id, value) in raw.ai_results {
            let raw_source: RawSource = serde_json::from_value(value)
                .with_context(|| format!("Malformed dish list for source '{}'", id))?;

            let dishes: Vec<DishEntry> = raw_source
                .dishes
                .unwrap_or_default()
                .into_iter()
                .map(|d| DishEntry {
                    source_id: id.clone(),
                    rank: d.rank,
                    name: d.name,
                    description: d.description,
                    category: d.category,
                    dish_type: d.dish_type,
                })
                .collect();

            if dishes.is_empty() {
                warn!(source = %id, "source contributes no dishes");
            }
            debug!(source = %id, count = dishes.len(), "loaded source");

            sources.push(SourceList { id, dishes });
        }

        Ok(SourceDocument {
            sources,
            metadata: raw.metadata,
            digest: hex_digest(bytes),
        })
    }

    /// Build a document directly from lists (tests, programmatic callers)
    pub fn from_sources(sources: Vec<SourceList>) -> Self {
        // strings and integers only, serialization cannot fail
        let digest = hex_digest(&serde_json::to_vec(&sources).unwrap_or_default());
        SourceDocument {
            sources,
            metadata: None,
            digest,
        }
    }

    pub fn source_ids(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.id.clone()).collect()
    }

    /// Total number of listed entries across all sources
    pub fn entry_count(&self) -> usize {
        self.sources.iter().map(|s| s.dishes.len()).sum()
    }

    /// Apply a selection and flatten to entries in (source, list) order
    pub fn select(&self, selection: &SourceSelection) -> SelectedEntries {
        let chosen: Vec<&SourceList> = match &selection.sources {
            Some(ids) => ids
                .iter()
                .enumerate()
                .filter_map(|(i, id)| {
                    if ids[..i].contains(id) {
                        warn!(source = %id, "source selected twice, keeping the first");
                        return None;
                    }
                    let found = self.sources.iter().find(|s| &s.id == id);
                    if found.is_none() {
                        warn!(source = %id, "selected source not present in document");
                    }
                    found
                })
                .collect(),
            None => self.sources.iter().collect(),
        };

        let mut result = SelectedEntries {
            source_ids: chosen.iter().map(|s| s.id.clone()).collect(),
            ..Default::default()
        };

        for source in chosen {
            let limit = selection.depth.unwrap_or(source.dishes.len());
            for dish in source.dishes.iter().take(limit) {
                if selection.excluded_names.iter().any(|n| n == &dish.name) {
                    debug!(source = %dish.source_id, name = %dish.name, "excluded ambiguous name");
                    result.excluded.push(dish.clone());
                } else {
                    result.entries.push(dish.clone());
                }
            }
        }

        result
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "metadata": { "title": "test" },
        "aiResults": {
            "gemini": { "dishes": [
                { "rank": 1, "name": "カレーライス", "description": "定番", "category": "主食", "type": "洋食" },
                { "rank": 2, "name": "サラダ" },
                { "rank": 3, "name": "親子丼", "description": null }
            ]},
            "chatgpt": { "dishes": [
                { "rank": 1, "name": "親子丼" }
            ]},
            "qwen3": { "status": "pending" }
        }
    }"#;

    #[test]
    fn test_load_keeps_document_order() {
        let doc = SourceDocument::from_slice(DOC.as_bytes()).unwrap();

        assert_eq!(doc.source_ids(), vec!["gemini", "chatgpt", "qwen3"]);
        assert_eq!(doc.entry_count(), 4);
        assert_eq!(doc.digest.len(), 64);
        assert!(doc.metadata.is_some());
    }

    #[test]
    fn test_missing_optional_fields_become_empty() {
        let doc = SourceDocument::from_slice(DOC.as_bytes()).unwrap();
        let gemini = &doc.sources[0];

        assert_eq!(gemini.dishes[0].category, "主食");
        assert_eq!(gemini.dishes[0].dish_type, "洋食");
        assert_eq!(gemini.dishes[1].description, "");
        assert_eq!(gemini.dishes[2].description, "");
        assert_eq!(gemini.dishes[2].source_id, "gemini");
    }

    #[test]
    fn test_source_without_dishes_contributes_nothing() {
        let doc = SourceDocument::from_slice(DOC.as_bytes()).unwrap();
        assert!(doc.sources[2].dishes.is_empty());
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(SourceDocument::from_slice(b"{ not json").is_err());
        assert!(SourceDocument::from_slice(b"{\"metadata\": {}}").is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        let result = SourceDocument::from_file("/nonexistent/dishes-data.json");
        assert!(result.is_err());
    }

    #[test]
    fn test_select_subset_depth_and_exclusions() {
        let doc = SourceDocument::from_slice(DOC.as_bytes()).unwrap();
        let selection = SourceSelection {
            sources: Some(vec!["chatgpt".to_string(), "gemini".to_string()]),
            depth: Some(2),
            excluded_names: vec!["サラダ".to_string()],
        };

        let selected = doc.select(&selection);

        assert_eq!(selected.source_ids, vec!["chatgpt", "gemini"]);
        let names: Vec<&str> = selected.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["親子丼", "カレーライス"]);
        assert_eq!(selected.excluded.len(), 1);
        assert_eq!(selected.excluded[0].name, "サラダ");
    }

    #[test]
    fn test_from_sources_digest_tracks_content() {
        let list = |name: &str| {
            vec![SourceList {
                id: "a".to_string(),
                dishes: vec![DishEntry::new("a", 1, name)],
            }]
        };

        let first = SourceDocument::from_sources(list("そば"));
        let again = SourceDocument::from_sources(list("そば"));
        let other = SourceDocument::from_sources(list("うどん"));

        assert_eq!(first.digest.len(), 64);
        assert_eq!(first.digest, again.digest);
        assert_ne!(first.digest, other.digest);
    }

    #[test]
    fn test_select_repeated_source_once() {
        let doc = SourceDocument::from_slice(DOC.as_bytes()).unwrap();
        let selection = SourceSelection {
            sources: Some(vec!["chatgpt".to_string(), "chatgpt".to_string()]),
            ..Default::default()
        };

        let selected = doc.select(&selection);

        assert_eq!(selected.source_ids, vec!["chatgpt"]);
        assert_eq!(selected.entries.len(), 1);
    }

    #[test]
    fn test_same_bytes_same_digest() {
        let a = SourceDocument::from_slice(DOC.as_bytes()).unwrap();
        let b = SourceDocument::from_slice(DOC.as_bytes()).unwrap();
        assert_eq!(a.digest, b.digest);
    }
}
