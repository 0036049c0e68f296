// 🍚 Rice Alternatives - filter + view model
// Pure transform: (dataset, filters) → view model. Rendering lives elsewhere.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Carbohydrate grams per 100 g of cooked white rice
pub const WHITE_RICE_CARBS: f64 = 36.8;
pub const DEFAULT_CARB_LIMIT: f64 = 25.0;
const COMPARISON_ALTERNATIVES: usize = 3;

// ============================================================================
// DATASET
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn label(&self) -> &str {
        match self {
            Difficulty::Easy => "簡単",
            Difficulty::Medium => "普通",
            Difficulty::Hard => "難しい",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub name: String,
    pub carbs_per_100g: f64,
    #[serde(default)]
    pub protein_per_100g: f64,
    #[serde(default)]
    pub calories_per_100g: f64,
    #[serde(default)]
    pub fiber_per_100g: Option<f64>,
    #[serde(default)]
    pub carb_reduction_vs_white_rice: f64,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub texture: String,
    #[serde(default)]
    pub tips: Option<String>,
    #[serde(default)]
    pub preparation: String,
    #[serde(default)]
    pub best_for: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlternativeTiers {
    #[serde(default)]
    pub ultra_low_carb: Vec<Alternative>,
    #[serde(default)]
    pub low_carb: Vec<Alternative>,
    #[serde(default)]
    pub moderate_carb: Vec<Alternative>,
    #[serde(default)]
    pub specialty_blends: Vec<Alternative>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseDish {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub alternatives: AlternativeTiers,
}

/// Reference staple for the comparison table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Staple {
    pub name: String,
    pub carbs_per_100g: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonStandards {
    #[serde(default)]
    pub rice_types: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub bread_types: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub noodle_types: serde_json::Map<String, serde_json::Value>,
}

impl ComparisonStandards {
    /// Staples in document order; entries without name/carbs are skipped
    pub fn staples(&self) -> Vec<Staple> {
        [&self.rice_types, &self.bread_types, &self.noodle_types]
            .into_iter()
            .flat_map(|group| group.values())
            .filter_map(|v| serde_json::from_value::<Staple>(v.clone()).ok())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativesDataset {
    pub dishes: Vec<BaseDish>,
    #[serde(default)]
    pub comparison_standards: ComparisonStandards,
}

impl AlternativesDataset {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read alternatives dataset: {:?}", path.as_ref()))?;
        serde_json::from_str(&content).context("Failed to parse alternatives JSON")
    }

    /// Every alternative of the first base dish, tagged with its tier
    pub fn all(&self) -> Vec<(Tier, &Alternative)> {
        let Some(dish) = self.dishes.first() else {
            return Vec::new();
        };
        let tiers = &dish.alternatives;

        [
            (Tier::UltraLowCarb, &tiers.ultra_low_carb),
            (Tier::LowCarb, &tiers.low_carb),
            (Tier::ModerateCarb, &tiers.moderate_carb),
            (Tier::Specialty, &tiers.specialty_blends),
        ]
        .into_iter()
        .flat_map(|(tier, list)| list.iter().map(move |alt| (tier, alt)))
        .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    UltraLowCarb,
    LowCarb,
    ModerateCarb,
    Specialty,
}

// ============================================================================
// FILTERS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cuisine {
    All,
    Curry,
    Sushi,
    FriedRice,
    RiceBowl,
    Furikake,
}

impl Cuisine {
    /// `best_for` labels that count as this cuisine
    pub fn labels(&self) -> &'static [&'static str] {
        match self {
            Cuisine::All => &[],
            Cuisine::Curry => &["カレー"],
            Cuisine::Sushi => &["寿司"],
            Cuisine::FriedRice => &["チャーハン"],
            Cuisine::RiceBowl => &["丼ぶり", "丼物", "汁だく丼"],
            Cuisine::Furikake => &["ふりかけご飯"],
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        Ok(match value {
            "all" => Cuisine::All,
            "curry" => Cuisine::Curry,
            "sushi" => Cuisine::Sushi,
            "fried_rice" => Cuisine::FriedRice,
            "rice_bowl" => Cuisine::RiceBowl,
            "furikake" => Cuisine::Furikake,
            other => bail!("Unknown cuisine '{}'", other),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeFilters {
    pub carb_limit: f64,

    /// None = any difficulty
    pub difficulty: Option<Difficulty>,
    pub cuisine: Cuisine,

    /// Overrides `cuisine` unless `All`
    pub active_tab: Cuisine,
}

impl Default for AlternativeFilters {
    fn default() -> Self {
        AlternativeFilters {
            carb_limit: DEFAULT_CARB_LIMIT,
            difficulty: None,
            cuisine: Cuisine::All,
            active_tab: Cuisine::All,
        }
    }
}

impl AlternativeFilters {
    fn target_cuisine(&self) -> Cuisine {
        if self.active_tab != Cuisine::All {
            self.active_tab
        } else {
            self.cuisine
        }
    }

    pub fn accepts(&self, alt: &Alternative) -> bool {
        if alt.carbs_per_100g > self.carb_limit {
            return false;
        }
        if let Some(difficulty) = self.difficulty {
            if alt.difficulty != difficulty {
                return false;
            }
        }
        match self.target_cuisine() {
            Cuisine::All => true,
            cuisine => alt
                .best_for
                .iter()
                .any(|label| cuisine.labels().contains(&label.as_str())),
        }
    }
}

// ============================================================================
// VIEW MODEL
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeCard {
    pub name: String,
    pub tier: Tier,
    pub carbs_per_100g: f64,
    pub protein_per_100g: f64,
    pub calories_per_100g: f64,
    pub fiber_per_100g: Option<f64>,
    pub carb_reduction_vs_white_rice: f64,
    pub difficulty: Difficulty,
    pub difficulty_label: String,
    pub texture: String,
    pub tips: Option<String>,
    pub preparation: String,
    pub best_for: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonKind {
    Baseline,
    Alternative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub name: String,
    pub carbs_per_100g: f64,
    pub kind: ComparisonKind,

    /// Bar length relative to the highest row, 0–100
    pub bar_percent: f64,

    /// Reduction vs white rice, alternatives only
    pub reduction_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativesView {
    pub carb_limit_label: String,
    pub cards: Vec<AlternativeCard>,
    pub comparison: Vec<ComparisonRow>,
}

impl AlternativesView {
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

fn card(tier: Tier, alt: &Alternative) -> AlternativeCard {
    AlternativeCard {
        name: alt.name.clone(),
        tier,
        carbs_per_100g: alt.carbs_per_100g,
        protein_per_100g: alt.protein_per_100g,
        calories_per_100g: alt.calories_per_100g,
        fiber_per_100g: alt.fiber_per_100g,
        carb_reduction_vs_white_rice: alt.carb_reduction_vs_white_rice,
        difficulty: alt.difficulty,
        difficulty_label: alt.difficulty.label().to_string(),
        texture: alt.texture.clone(),
        tips: alt.tips.clone(),
        preparation: alt.preparation.clone(),
        best_for: alt.best_for.clone(),
    }
}

/// Staples plus the lowest-carb alternatives, highest carbs first.
/// Independent of the active filters.
pub fn comparison_table(dataset: &AlternativesDataset) -> Vec<ComparisonRow> {
    let mut rows: Vec<(String, f64, ComparisonKind)> = dataset
        .comparison_standards
        .staples()
        .into_iter()
        .map(|s| (s.name, s.carbs_per_100g, ComparisonKind::Baseline))
        .collect();

    let mut alternatives: Vec<&Alternative> = dataset.all().into_iter().map(|(_, a)| a).collect();
    alternatives.sort_by(|a, b| a.carbs_per_100g.total_cmp(&b.carbs_per_100g));
    rows.extend(
        alternatives
            .into_iter()
            .take(COMPARISON_ALTERNATIVES)
            .map(|a| (a.name.clone(), a.carbs_per_100g, ComparisonKind::Alternative)),
    );

    rows.sort_by(|a, b| b.1.total_cmp(&a.1));
    let max_carbs = rows.iter().map(|r| r.1).fold(0.0_f64, f64::max);

    rows.into_iter()
        .map(|(name, carbs, kind)| {
            let reduction_percent = match kind {
                ComparisonKind::Alternative => {
                    Some(((WHITE_RICE_CARBS - carbs) / WHITE_RICE_CARBS * 1000.0).round() / 10.0)
                }
                ComparisonKind::Baseline => None,
            };
            ComparisonRow {
                name,
                carbs_per_100g: carbs,
                bar_percent: if max_carbs > 0.0 { carbs / max_carbs * 100.0 } else { 0.0 },
                kind,
                reduction_percent,
            }
        })
        .collect()
}

pub fn build_view(dataset: &AlternativesDataset, filters: &AlternativeFilters) -> AlternativesView {
    let cards = dataset
        .all()
        .into_iter()
        .filter(|(_, alt)| filters.accepts(alt))
        .map(|(tier, alt)| card(tier, alt))
        .collect();

    AlternativesView {
        carb_limit_label: format!("{}g以下", filters.carb_limit),
        cards,
        comparison: comparison_table(dataset),
    }
}

// ============================================================================
// TESTS
// ============================================================================
