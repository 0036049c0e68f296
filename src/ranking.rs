// 🏆 Ranker - stable sort by composite score

use crate::aggregation::CanonicalDish;
use crate::scoring::{ScoreBreakdown, ScoringWeights};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct RankedDish {
    /// 1-based position in the sorted list
    pub rank: usize,
    pub dish: CanonicalDish,
    pub score: ScoreBreakdown,
}

/// All canonical dishes, best first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ranking {
    entries: Vec<RankedDish>,
}

impl Ranking {
    /// Score every dish and sort by score descending. Ties keep the order the
    /// dishes were created in during aggregation.
    pub fn build(dishes: Vec<CanonicalDish>, weights: &ScoringWeights) -> Self {
        let mut scored: Vec<(CanonicalDish, ScoreBreakdown)> = dishes
            .into_iter()
            .map(|dish| {
                let score = weights.score(&dish);
                (dish, score)
            })
            .collect();

        // sort_by is stable
        scored.sort_by(|a, b| b.1.total.total_cmp(&a.1.total));

        let entries = scored
            .into_iter()
            .enumerate()
            .map(|(i, (dish, score))| RankedDish {
                rank: i + 1,
                dish,
                score,
            })
            .collect();

        Ranking { entries }
    }

    pub fn all(&self) -> &[RankedDish] {
        &self.entries
    }

    /// First `n` entries; all of them when fewer exist
    pub fn top(&self, n: usize) -> &[RankedDish] {
        &self.entries[..n.min(self.entries.len())]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&RankedDish> {
        self.entries.iter().find(|e| e.dish.display_name == name)
    }
}

/// Number of dishes picked by exactly k sources, for each k present
pub fn selection_histogram(entries: &[RankedDish]) -> BTreeMap<usize, usize> {
    let mut histogram = BTreeMap::new();
    for entry in entries {
        *histogram.entry(entry.dish.source_count()).or_insert(0) += 1;
    }
    histogram
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::aggregate;
    use crate::sources::DishEntry;

    fn sample() -> Vec<CanonicalDish> {
        aggregate(&[
            DishEntry::new("a", 1, "alpha"),
            DishEntry::new("a", 2, "beta"),
            DishEntry::new("a", 3, "gamma"),
            DishEntry::new("b", 1, "gamma"),
            DishEntry::new("b", 2, "delta"),
            DishEntry::new("c", 2, "beta-twin"),
        ])
        .dishes
    }

    #[test]
    fn test_sorted_by_score_with_dense_positions() {
        let ranking = Ranking::build(sample(), &ScoringWeights::TOP10);
        let names: Vec<&str> = ranking.all().iter().map(|e| e.dish.display_name.as_str()).collect();

        // gamma: 2 sources avg 2 -> 380; alpha 300; beta/delta/beta-twin 280
        assert_eq!(names, vec!["gamma", "alpha", "beta", "delta", "beta-twin"]);
        let ranks: Vec<usize> = ranking.all().iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_ties_keep_creation_order() {
        let ranking = Ranking::build(sample(), &ScoringWeights::TOP10);
        let tied: Vec<&str> = ranking
            .all()
            .iter()
            .filter(|e| e.score.total == 280.0)
            .map(|e| e.dish.display_name.as_str())
            .collect();

        assert_eq!(tied, vec!["beta", "delta", "beta-twin"]);
    }

    #[test]
    fn test_top_n_larger_than_list() {
        let ranking = Ranking::build(sample(), &ScoringWeights::TOP10);

        assert_eq!(ranking.top(100).len(), 5);
        assert_eq!(ranking.top(2).len(), 2);
        assert!(Ranking::build(vec![], &ScoringWeights::TOP10).top(10).is_empty());
    }

    #[test]
    fn test_histogram() {
        let ranking = Ranking::build(sample(), &ScoringWeights::TOP10);
        let histogram = selection_histogram(ranking.all());

        assert_eq!(histogram.get(&2), Some(&1));
        assert_eq!(histogram.get(&1), Some(&4));
        assert_eq!(histogram.get(&3), None);
    }

    #[test]
    fn test_build_is_deterministic() {
        let first = Ranking::build(sample(), &ScoringWeights::DEEP);
        let second = Ranking::build(sample(), &ScoringWeights::DEEP);
        assert_eq!(first, second);
    }
}
