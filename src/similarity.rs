// 🔎 Similar-name survey
// Advisory report of names that are probably the same dish; never feeds the ranking.
// Candidates found here are what the alias table gets extended with.

use crate::sources::{DishEntry, SourceDocument};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const TOP_FREQUENCIES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityKind {
    /// One name contains the other ("うどん" / "焼きうどん")
    Containment,

    /// Equal once hiragana is folded to katakana ("きんぴら" / "キンピラ")
    KanaVariant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarPair {
    pub first: String,
    pub second: String,
    pub kind: SimilarityKind,
    pub first_count: usize,
    pub second_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameFrequency {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyReport {
    pub sources: Vec<String>,
    pub total_entries: usize,
    pub unique_names: usize,
    pub similar_pairs: Vec<SimilarPair>,
    pub top_frequencies: Vec<NameFrequency>,
}

/// Hiragana → katakana, everything else untouched
pub fn fold_kana(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'ぁ'..='ゖ' => char::from_u32(c as u32 + 0x60).unwrap_or(c),
            _ => c,
        })
        .collect()
}

pub fn classify(a: &str, b: &str) -> Option<SimilarityKind> {
    if a == b {
        return None;
    }
    if a.contains(b) || b.contains(a) {
        return Some(SimilarityKind::Containment);
    }
    if fold_kana(a) == fold_kana(b) {
        return Some(SimilarityKind::KanaVariant);
    }
    None
}

/// Occurrence count per raw name, in first-seen order
fn count_names(entries: &[&DishEntry]) -> Vec<NameFrequency> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<NameFrequency> = Vec::new();

    for entry in entries {
        match index.get(entry.name.as_str()) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(entry.name.as_str(), counts.len());
                counts.push(NameFrequency {
                    name: entry.name.clone(),
                    count: 1,
                });
            }
        }
    }

    counts
}

pub fn survey(document: &SourceDocument) -> SurveyReport {
    let entries: Vec<&DishEntry> = document.sources.iter().flat_map(|s| s.dishes.iter()).collect();
    let names = count_names(&entries);

    let mut similar_pairs = Vec::new();
    for (i, a) in names.iter().enumerate() {
        for b in &names[i + 1..] {
            if let Some(kind) = classify(&a.name, &b.name) {
                similar_pairs.push(SimilarPair {
                    first: a.name.clone(),
                    second: b.name.clone(),
                    kind,
                    first_count: a.count,
                    second_count: b.count,
                });
            }
        }
    }

    let mut top_frequencies = names.clone();
    // stable: equal counts stay in first-seen order
    top_frequencies.sort_by(|a, b| b.count.cmp(&a.count));
    top_frequencies.truncate(TOP_FREQUENCIES);

    SurveyReport {
        sources: document.source_ids(),
        total_entries: entries.len(),
        unique_names: names.len(),
        similar_pairs,
        top_frequencies,
    }
}
