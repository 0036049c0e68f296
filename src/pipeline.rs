// 🔗 Ranking Pipeline
// select → alias → aggregate → score → rank, one linear pass

use crate::aggregation::{Aggregator, DuplicateResolution};
use crate::config::PipelineConfig;
use crate::normalizer::{AliasConflict, IntegrationLogEntry};
use crate::ranking::Ranking;
use crate::sources::{DishEntry, SourceDocument};
use anyhow::Result;
use tracing::info;

/// Everything a run produced, ready for the reporter
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub config: PipelineConfig,
    pub source_ids: Vec<String>,
    pub input_digest: String,

    /// Entries listed by the selected sources, exclusions included
    pub original_entries: usize,
    pub excluded: Vec<DishEntry>,

    pub integration_log: Vec<IntegrationLogEntry>,
    pub alias_conflicts: Vec<AliasConflict>,

    /// Distinct raw names before normalization and aliasing
    pub dishes_before_normalization: usize,

    /// Entries left after intra-source deduplication
    pub cleaned_entries: usize,
    pub duplicate_resolutions: Vec<DuplicateResolution>,

    pub ranking: Ranking,
}

impl PipelineRun {
    /// Canonical dishes after normalization
    pub fn dish_count(&self) -> usize {
        self.ranking.len()
    }
}

pub fn run(document: &SourceDocument, config: &PipelineConfig) -> Result<PipelineRun> {
    config.validate()?;

    let selected = document.select(&config.selection);
    let original_entries = selected.entries.len() + selected.excluded.len();
    info!(
        sources = selected.source_ids.len(),
        entries = original_entries,
        excluded = selected.excluded.len(),
        "selected entries"
    );

    let mut aggregator = Aggregator::new();
    for entry in &selected.entries {
        aggregator.note_raw_name(&entry.name);
    }

    let aliases = config.alias_table();
    let alias_conflicts = aliases.conflicts();
    let mut entries = selected.entries;
    let integration_log = aliases.apply(&mut entries);
    info!(rules = aliases.rules().len(), rewrites = integration_log.len(), "applied alias table");

    for entry in &entries {
        aggregator.add(entry);
    }
    let aggregation = aggregator.finish();
    let cleaned_entries = aggregation.kept_entry_count();
    info!(
        before = aggregation.distinct_raw_names,
        after = aggregation.dishes.len(),
        dropped_duplicates = aggregation.resolutions.len(),
        "aggregated canonical dishes"
    );

    let ranking = Ranking::build(aggregation.dishes, &config.weights);
    if let Some(best) = ranking.all().first() {
        info!(dish = %best.dish.display_name, score = best.score.total, "ranked dishes");
    }

    Ok(PipelineRun {
        config: config.clone(),
        source_ids: selected.source_ids,
        input_digest: document.digest.clone(),
        original_entries,
        excluded: selected.excluded,
        integration_log,
        alias_conflicts,
        dishes_before_normalization: aggregation.distinct_raw_names,
        cleaned_entries,
        duplicate_resolutions: aggregation.resolutions,
        ranking,
    })
}
