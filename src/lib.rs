// Dish Ranking - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod sources;
pub mod normalizer;
pub mod aggregation;
pub mod scoring;
pub mod ranking;
pub mod config;
pub mod pipeline;
pub mod report;
pub mod similarity;
pub mod alternatives;

// Re-export commonly used types
pub use sources::{DishEntry, SourceDocument, SourceList, SourceSelection};
pub use normalizer::{
    normalize_key, AliasConflict, AliasPrecedence, AliasRule, AliasTable, IntegrationLogEntry,
};
pub use aggregation::{aggregate, Aggregation, Aggregator, Appearance, CanonicalDish, DuplicateResolution};
pub use scoring::{ScoreBreakdown, ScoringWeights};
pub use ranking::{selection_histogram, RankedDish, Ranking};
pub use config::{PipelineConfig, Preset};
pub use pipeline::{run, PipelineRun};
pub use report::{
    classify_dish, save_csv, write_csv, write_json, CategoryStats, DetailedDish,
    FullRankingReport, RankingReport,
};
pub use similarity::{survey, SimilarPair, SimilarityKind, SurveyReport};
pub use alternatives::{
    build_view, AlternativeFilters, AlternativesDataset, AlternativesView, Cuisine, Difficulty,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
