// 🔍 Aggregation Engine - Group dish entries into canonical dishes
// One appearance per source; intra-source duplicates keep the best rank

use crate::normalizer::normalize_key;
use crate::sources::DishEntry;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

// ============================================================================
// APPEARANCE
// ============================================================================

/// One source's contribution to a canonical dish
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appearance {
    pub source_id: String,
    pub rank: u32,
    pub name: String,
    pub description: String,
    pub category: String,
    #[serde(rename = "type")]
    pub dish_type: String,
}

impl From<&DishEntry> for Appearance {
    fn from(entry: &DishEntry) -> Self {
        Appearance {
            source_id: entry.source_id.clone(),
            rank: entry.rank,
            name: entry.name.clone(),
            description: entry.description.clone(),
            category: entry.category.clone(),
            dish_type: entry.dish_type.clone(),
        }
    }
}

/// What happened when an entry was offered to a dish
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// First appearance from this source
    Added,

    /// Better rank from a source already present; the old rank was dropped
    Replaced { dropped: Appearance },

    /// Worse or equal rank from a source already present; the entry was dropped
    Ignored { dropped: Appearance },
}

// ============================================================================
// CANONICAL DISH
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalDish {
    /// Normalization key used for grouping
    pub key: String,

    /// First-seen (alias-resolved) raw name
    pub display_name: String,

    appearances: Vec<Appearance>,
    average_rank: f64,
}

impl CanonicalDish {
    pub fn new(key: &str, display_name: &str) -> Self {
        CanonicalDish {
            key: key.to_string(),
            display_name: display_name.to_string(),
            appearances: Vec::new(),
            average_rank: 0.0,
        }
    }

    /// Offer an entry. At most one appearance per source is kept, the
    /// numerically lowest rank wins.
    pub fn add_appearance(&mut self, entry: &DishEntry) -> MergeOutcome {
        let incoming = Appearance::from(entry);

        let outcome = match self
            .appearances
            .iter()
            .position(|a| a.source_id == incoming.source_id)
        {
            None => {
                self.appearances.push(incoming);
                MergeOutcome::Added
            }
            Some(i) if incoming.rank < self.appearances[i].rank => {
                let dropped = std::mem::replace(&mut self.appearances[i], incoming);
                MergeOutcome::Replaced { dropped }
            }
            Some(_) => MergeOutcome::Ignored { dropped: incoming },
        };

        self.recompute();
        outcome
    }

    fn recompute(&mut self) {
        let total: u64 = self.appearances.iter().map(|a| a.rank as u64).sum();
        self.average_rank = if self.appearances.is_empty() {
            0.0
        } else {
            total as f64 / self.appearances.len() as f64
        };
    }

    pub fn appearances(&self) -> &[Appearance] {
        &self.appearances
    }

    pub fn appearance_for(&self, source_id: &str) -> Option<&Appearance> {
        self.appearances.iter().find(|a| a.source_id == source_id)
    }

    /// Number of distinct sources that picked this dish
    pub fn source_count(&self) -> usize {
        self.appearances.len()
    }

    /// Mean of the kept per-source ranks
    pub fn average_rank(&self) -> f64 {
        self.average_rank
    }

    /// Distinct non-empty descriptions in appearance order
    pub fn descriptions(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for a in &self.appearances {
            if !a.description.is_empty() && !seen.contains(&a.description.as_str()) {
                seen.push(a.description.as_str());
            }
        }
        seen
    }

    /// Category/type of the first appearance that has one
    pub fn category(&self) -> &str {
        self.appearances
            .iter()
            .map(|a| a.category.as_str())
            .find(|c| !c.is_empty())
            .unwrap_or("")
    }

    pub fn dish_type(&self) -> &str {
        self.appearances
            .iter()
            .map(|a| a.dish_type.as_str())
            .find(|t| !t.is_empty())
            .unwrap_or("")
    }
}

// ============================================================================
// AGGREGATION RESULT
// ============================================================================

/// A source listing the same canonical dish more than once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateResolution {
    pub dish: String,
    pub source: String,
    pub kept_rank: u32,
    pub dropped_rank: u32,
    pub dropped_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    /// Canonical dishes in first-creation order
    pub dishes: Vec<CanonicalDish>,
    pub resolutions: Vec<DuplicateResolution>,

    /// Entries offered to the aggregator
    pub entry_count: usize,

    /// Distinct raw names before normalization and aliasing
    pub distinct_raw_names: usize,
}

impl Aggregation {
    /// Entries that survived intra-source deduplication
    pub fn kept_entry_count(&self) -> usize {
        self.dishes.iter().map(|d| d.source_count()).sum()
    }
}

// ============================================================================
// AGGREGATOR
// ============================================================================

#[derive(Debug, Default)]
pub struct Aggregator {
    dishes: Vec<CanonicalDish>,
    index: HashMap<String, usize>,
    resolutions: Vec<DuplicateResolution>,
    raw_names: HashSet<String>,
    entry_count: usize,
}

impl Aggregator {
    pub fn new() -> Self {
        Aggregator::default()
    }

    /// Track a raw name seen before aliasing
    pub fn note_raw_name(&mut self, name: &str) {
        self.raw_names.insert(name.to_string());
    }

    /// Add one (already alias-resolved) entry
    pub fn add(&mut self, entry: &DishEntry) {
        self.entry_count += 1;

        let key = normalize_key(&entry.name);
        let idx = match self.index.get(&key) {
            Some(&idx) => idx,
            None => {
                self.dishes.push(CanonicalDish::new(&key, &entry.name));
                self.index.insert(key, self.dishes.len() - 1);
                self.dishes.len() - 1
            }
        };

        let dish = &mut self.dishes[idx];
        let outcome = dish.add_appearance(entry);

        let (kept_rank, dropped) = match outcome {
            MergeOutcome::Added => return,
            MergeOutcome::Replaced { dropped } => (entry.rank, dropped),
            MergeOutcome::Ignored { dropped } => {
                let kept = dish
                    .appearance_for(&entry.source_id)
                    .map(|a| a.rank)
                    .unwrap_or(entry.rank);
                (kept, dropped)
            }
        };

        debug!(
            dish = %dish.display_name,
            source = %entry.source_id,
            kept_rank,
            dropped_rank = dropped.rank,
            "dropped intra-source duplicate"
        );
        self.resolutions.push(DuplicateResolution {
            dish: dish.display_name.clone(),
            source: entry.source_id.clone(),
            kept_rank,
            dropped_rank: dropped.rank,
            dropped_name: dropped.name,
        });
    }

    pub fn finish(self) -> Aggregation {
        Aggregation {
            dishes: self.dishes,
            resolutions: self.resolutions,
            entry_count: self.entry_count,
            distinct_raw_names: self.raw_names.len(),
        }
    }
}

/// Group entries (already alias-resolved) into canonical dishes
pub fn aggregate(entries: &[DishEntry]) -> Aggregation {
    let mut aggregator = Aggregator::new();
    for entry in entries {
        aggregator.note_raw_name(&entry.name);
        aggregator.add(entry);
    }
    aggregator.finish()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_and_space_variants_merge() {
        let entries = vec![
            DishEntry::new("a", 1, "Sushi"),
            DishEntry::new("b", 2, "sushi"),
            DishEntry::new("c", 5, " SU SHI"),
        ];

        let agg = aggregate(&entries);

        assert_eq!(agg.dishes.len(), 1);
        let dish = &agg.dishes[0];
        assert_eq!(dish.display_name, "Sushi");
        assert_eq!(dish.source_count(), 3);
        assert!((dish.average_rank() - 8.0 / 3.0).abs() < 1e-9);
        assert_eq!(agg.distinct_raw_names, 3);
    }

    #[test]
    fn test_intra_source_duplicate_keeps_best_rank() {
        let entries = vec![
            DishEntry::new("a", 7, "カレー ライス"),
            DishEntry::new("a", 3, "カレーライス"),
            DishEntry::new("b", 4, "カレーライス"),
        ];

        let agg = aggregate(&entries);
        let dish = &agg.dishes[0];

        assert_eq!(dish.source_count(), 2);
        assert_eq!(dish.appearance_for("a").unwrap().rank, 3);
        assert_eq!(dish.average_rank(), 3.5);
        assert_eq!(agg.resolutions.len(), 1);
        assert_eq!(agg.resolutions[0].kept_rank, 3);
        assert_eq!(agg.resolutions[0].dropped_rank, 7);
        assert_eq!(agg.resolutions[0].dropped_name, "カレー ライス");
        assert_eq!(agg.entry_count, 3);
        assert_eq!(agg.kept_entry_count(), 2);
    }

    #[test]
    fn test_worse_duplicate_is_ignored() {
        let mut dish = CanonicalDish::new("k", "K");
        assert_eq!(dish.add_appearance(&DishEntry::new("a", 3, "K")), MergeOutcome::Added);

        let outcome = dish.add_appearance(&DishEntry::new("a", 7, "K"));

        assert!(matches!(outcome, MergeOutcome::Ignored { ref dropped } if dropped.rank == 7));
        assert_eq!(dish.average_rank(), 3.0);
    }

    #[test]
    fn test_source_count_bounded_by_sources() {
        let entries = vec![
            DishEntry::new("a", 1, "x"),
            DishEntry::new("a", 2, "X"),
            DishEntry::new("b", 1, "y"),
            DishEntry::new("b", 2, "x"),
        ];

        let agg = aggregate(&entries);

        for dish in &agg.dishes {
            assert!(dish.source_count() >= 1);
            assert!(dish.source_count() <= 2);
        }
    }

    #[test]
    fn test_dishes_keep_creation_order() {
        let entries = vec![
            DishEntry::new("a", 1, "b-dish"),
            DishEntry::new("a", 2, "a-dish"),
            DishEntry::new("b", 1, "a-dish"),
        ];

        let agg = aggregate(&entries);
        let names: Vec<&str> = agg.dishes.iter().map(|d| d.display_name.as_str()).collect();

        assert_eq!(names, vec!["b-dish", "a-dish"]);
    }

    #[test]
    fn test_descriptions_deduplicated() {
        let entries = vec![
            DishEntry::new("a", 1, "親子丼").with_description("鶏と卵").with_category("丼"),
            DishEntry::new("b", 2, "親子丼").with_description("鶏と卵"),
            DishEntry::new("c", 3, "親子丼"),
        ];

        let agg = aggregate(&entries);
        let dish = &agg.dishes[0];

        assert_eq!(dish.descriptions(), vec!["鶏と卵"]);
        assert_eq!(dish.category(), "丼");
        assert_eq!(dish.dish_type(), "");
    }

    #[test]
    fn test_empty_input() {
        let agg = aggregate(&[]);
        assert!(agg.dishes.is_empty());
        assert_eq!(agg.kept_entry_count(), 0);
    }
}
