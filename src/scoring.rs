// 🧮 Composite Score
// score = sourceCount × W_common + (R_max + 1 − averageRank) × W_rank

use crate::aggregation::CanonicalDish;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Bonus per distinct source (W_common)
    pub common_weight: f64,

    /// Multiplier on the rank bonus (W_rank)
    pub rank_weight: f64,

    /// Deepest rank considered (R_max)
    pub max_rank: u32,
}

impl ScoringWeights {
    /// Top-10 per source
    pub const TOP10: ScoringWeights = ScoringWeights {
        common_weight: 100.0,
        rank_weight: 20.0,
        max_rank: 10,
    };

    /// Full lists, rank bonus halved
    pub const DEEP: ScoringWeights = ScoringWeights {
        common_weight: 100.0,
        rank_weight: 10.0,
        max_rank: 20,
    };

    pub fn new(common_weight: f64, rank_weight: f64, max_rank: u32) -> Self {
        ScoringWeights {
            common_weight,
            rank_weight,
            max_rank,
        }
    }

    /// Human-readable formula for the report metadata
    pub fn describe(&self) -> String {
        format!(
            "共通度ボーナス(AI数×{}) + 順位ボーナス(({}-平均順位)×{})",
            self.common_weight,
            self.max_rank + 1,
            self.rank_weight
        )
    }

    pub fn score(&self, dish: &CanonicalDish) -> ScoreBreakdown {
        self.score_parts(dish.source_count(), dish.average_rank())
    }

    pub fn score_parts(&self, source_count: usize, average_rank: f64) -> ScoreBreakdown {
        let commonality_bonus = source_count as f64 * self.common_weight;
        let rank_bonus = (self.max_rank as f64 + 1.0 - average_rank) * self.rank_weight;

        ScoreBreakdown {
            commonality_bonus,
            rank_bonus,
            total: commonality_bonus + rank_bonus,
        }
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        ScoringWeights::TOP10
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub commonality_bonus: f64,
    pub rank_bonus: f64,
    pub total: f64,
}

/// Round to one decimal the way the published reports do
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
