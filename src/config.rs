// ⚙️ Pipeline Configuration
// Every tunable of a ranking run, with named presets for the published variants

use crate::normalizer::{AliasPrecedence, AliasRule, AliasTable};
use crate::scoring::ScoringWeights;
use crate::sources::SourceSelection;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Names too generic to rank as a single dish
pub const AMBIGUOUS_DISHES: &[&str] = &[
    "サラダ", "パスタ", "スパゲッティ", "煮物", "酢の物", "鍋料理", "コーヒー", "刺身", "寿司",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Top-10 of every source, no aliasing
    Consensus,

    /// Full lists with the built-in alias table
    Integrated,

    /// Three sources, ambiguous names removed, deep weights
    Clean,
}

impl Preset {
    pub fn name(&self) -> &str {
        match self {
            Preset::Consensus => "consensus",
            Preset::Integrated => "integrated",
            Preset::Clean => "clean",
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "consensus" => Ok(Preset::Consensus),
            "integrated" => Ok(Preset::Integrated),
            "clean" => Ok(Preset::Clean),
            other => bail!("Unknown preset '{}' (expected consensus, integrated or clean)", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Project title written into the report
    #[serde(default = "default_project")]
    pub project: String,

    #[serde(default)]
    pub selection: SourceSelection,

    /// Alias rules; empty disables aliasing
    #[serde(default)]
    pub alias_rules: Vec<AliasRule>,

    #[serde(default)]
    pub alias_precedence: AliasPrecedence,

    #[serde(default)]
    pub weights: ScoringWeights,

    /// Length of the primary ranking
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Entries given the detailed per-source breakdown
    #[serde(default = "default_summary_size")]
    pub summary_size: usize,
}

fn default_project() -> String {
    "日本料理AI比較システム".to_string()
}

fn default_top_n() -> usize {
    100
}

fn default_summary_size() -> usize {
    10
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig::preset(Preset::Integrated)
    }
}

impl PipelineConfig {
    pub fn preset(preset: Preset) -> Self {
        match preset {
            Preset::Consensus => PipelineConfig {
                project: default_project(),
                selection: SourceSelection {
                    depth: Some(10),
                    ..Default::default()
                },
                alias_rules: Vec::new(),
                alias_precedence: AliasPrecedence::default(),
                weights: ScoringWeights::TOP10,
                top_n: 10,
                summary_size: 10,
            },
            Preset::Integrated => PipelineConfig {
                project: format!("{} - 統合版", default_project()),
                selection: SourceSelection::default(),
                alias_rules: AliasTable::builtin().rules().to_vec(),
                alias_precedence: AliasPrecedence::default(),
                weights: ScoringWeights::TOP10,
                top_n: 100,
                summary_size: 10,
            },
            Preset::Clean => PipelineConfig {
                project: format!("{} - 改良3AI版", default_project()),
                selection: SourceSelection {
                    sources: Some(vec![
                        "gemini".to_string(),
                        "chatgpt".to_string(),
                        "claude".to_string(),
                    ]),
                    depth: None,
                    excluded_names: AMBIGUOUS_DISHES.iter().map(|s| s.to_string()).collect(),
                },
                alias_rules: Vec::new(),
                alias_precedence: AliasPrecedence::default(),
                weights: ScoringWeights::DEEP,
                top_n: 100,
                summary_size: 10,
            },
        }
    }

    /// Load a config from JSON; missing fields take their serde defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: PipelineConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_n == 0 {
            bail!("top_n must be at least 1");
        }
        if self.weights.max_rank == 0 {
            bail!("weights.max_rank must be at least 1");
        }
        if self.selection.depth == Some(0) {
            bail!("selection.depth must be at least 1 when set");
        }
        if let Some(ids) = &self.selection.sources {
            for (i, id) in ids.iter().enumerate() {
                if ids[..i].contains(id) {
                    bail!("selection.sources lists '{}' more than once", id);
                }
            }
        }
        Ok(())
    }

    pub fn alias_table(&self) -> AliasTable {
        AliasTable::from_rules(self.alias_rules.clone(), self.alias_precedence)
    }
}
