// 📊 Report Builder - JSON artifacts + CSV export
// Field names are read directly by the ranking pages; keep them stable.

use crate::aggregation::DuplicateResolution;
use crate::normalizer::{AliasConflict, AliasPrecedence, AliasRule, IntegrationLogEntry};
use crate::pipeline::PipelineRun;
use crate::ranking::{selection_histogram, RankedDish};
use crate::scoring::{round1, ScoringWeights};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

const COMMONALITY_EXAMPLES: usize = 5;
const FALLBACK_DESCRIPTION: &str = "人気の日本料理";

// ============================================================================
// REPORT TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub project: String,
    pub analysis_date: String,
    pub ai_sources: Vec<String>,
    pub input_digest: String,

    /// Canonical dishes after normalization
    pub total_dishes_analyzed: usize,
    pub total_dishes_before_normalization: usize,
    pub original_entries: usize,
    pub cleaned_entries: usize,
    pub top_n: usize,
    pub scoring_method: String,
    pub weights: ScoringWeights,
}

/// Per-source detail inside `ai_rankings`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRanking {
    pub rank: u32,
    pub description: String,
    pub category: String,
    #[serde(rename = "type")]
    pub dish_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedDish {
    pub integrated_rank: usize,
    pub dish_name: String,
    pub total_score: f64,
    pub ai_count: usize,
    pub average_rank: f64,
    pub commonality_bonus: f64,
    pub rank_bonus: f64,
    pub description: String,
    pub category: String,
    #[serde(rename = "type")]
    pub dish_type: String,

    /// Every source id; `null` when the source did not pick the dish
    pub ai_rankings: BTreeMap<String, Option<SourceRanking>>,
    pub analysis_reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonalityExample {
    pub name: String,
    pub average_rank: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonalityGroup {
    /// Number of sources
    pub count: usize,

    /// Dishes picked by exactly `count` sources
    pub dishes: usize,
    pub examples: Vec<CommonalityExample>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullAnalysis {
    pub top100_ranking: Vec<DetailedDish>,

    /// `aiK_dishes` → dishes in the top list picked by exactly K sources
    pub scoring_distribution: BTreeMap<String, usize>,

    /// Keyword category → score totals over the top list
    #[serde(default)]
    pub category_analysis: BTreeMap<String, CategoryStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    pub count: usize,
    pub total_score: f64,
    pub avg_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedEntry {
    pub name: String,
    pub source: String,
    pub rank: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationSummary {
    pub alias_precedence: AliasPrecedence,
    pub rules: Vec<AliasRule>,
    pub log: Vec<IntegrationLogEntry>,
    pub conflicts: Vec<AliasConflict>,
    pub excluded: Vec<ExcludedEntry>,
    pub duplicate_resolutions: Vec<DuplicateResolution>,
}

/// Primary artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingReport {
    pub metadata: ReportMetadata,
    pub commonality_analysis: BTreeMap<String, CommonalityGroup>,
    pub integrated_top10: Vec<DetailedDish>,
    pub full_analysis: FullAnalysis,
    pub integration: IntegrationSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingRow {
    pub overall_rank: usize,
    pub dish_name: String,
    pub total_score: f64,
    pub ai_count: usize,
    pub average_rank: f64,
}

/// Secondary artifact: every canonical dish, sorted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullRankingReport {
    pub metadata: ReportMetadata,
    pub ranking: Vec<RankingRow>,
}

// ============================================================================
// BUILDING
// ============================================================================

fn metadata(run: &PipelineRun, generated: NaiveDate) -> ReportMetadata {
    ReportMetadata {
        project: run.config.project.clone(),
        analysis_date: generated.format("%Y-%m-%d").to_string(),
        ai_sources: run.source_ids.clone(),
        input_digest: run.input_digest.clone(),
        total_dishes_analyzed: run.dish_count(),
        total_dishes_before_normalization: run.dishes_before_normalization,
        original_entries: run.original_entries,
        cleaned_entries: run.cleaned_entries,
        top_n: run.config.top_n,
        scoring_method: run.config.weights.describe(),
        weights: run.config.weights,
    }
}

fn detailed(entry: &RankedDish, source_ids: &[String]) -> DetailedDish {
    let dish = &entry.dish;

    let ai_rankings = source_ids
        .iter()
        .map(|id| {
            let detail = dish.appearance_for(id).map(|a| SourceRanking {
                rank: a.rank,
                description: a.description.clone(),
                category: a.category.clone(),
                dish_type: a.dish_type.clone(),
            });
            (id.clone(), detail)
        })
        .collect();

    DetailedDish {
        integrated_rank: entry.rank,
        dish_name: dish.display_name.clone(),
        total_score: round1(entry.score.total),
        ai_count: dish.source_count(),
        average_rank: round1(dish.average_rank()),
        commonality_bonus: round1(entry.score.commonality_bonus),
        rank_bonus: round1(entry.score.rank_bonus),
        description: dish
            .descriptions()
            .first()
            .copied()
            .unwrap_or(FALLBACK_DESCRIPTION)
            .to_string(),
        category: dish.category().to_string(),
        dish_type: dish.dish_type().to_string(),
        ai_rankings,
        analysis_reason: format!(
            "{}つのAIで選出され、平均順位{:.1}位の高評価を獲得",
            dish.source_count(),
            dish.average_rank()
        ),
    }
}

fn commonality_analysis(all: &[RankedDish]) -> BTreeMap<String, CommonalityGroup> {
    let mut groups: BTreeMap<String, CommonalityGroup> = BTreeMap::new();

    for (count, dishes) in selection_histogram(all) {
        let examples = all
            .iter()
            .filter(|e| e.dish.source_count() == count)
            .take(COMMONALITY_EXAMPLES)
            .map(|e| CommonalityExample {
                name: e.dish.display_name.clone(),
                average_rank: round1(e.dish.average_rank()),
            })
            .collect();

        groups.insert(
            format!("{}_ai_selection", count),
            CommonalityGroup {
                count,
                dishes,
                examples,
            },
        );
    }

    groups
}

fn scoring_distribution(top: &[RankedDish], source_total: usize) -> BTreeMap<String, usize> {
    let histogram = selection_histogram(top);
    (1..=source_total.max(1))
        .map(|k| (format!("ai{}_dishes", k), histogram.get(&k).copied().unwrap_or(0)))
        .collect()
}

/// Coarse course type guessed from the dish name
pub fn classify_dish(name: &str) -> &'static str {
    fn has(name: &str, words: &[&str]) -> bool {
        words.iter().any(|w| name.contains(w))
    }

    if has(name, &["ご飯", "丼", "ライス"]) {
        "主食"
    } else if has(name, &["汁", "スープ"]) {
        "汁物"
    } else if has(name, &["サラダ"]) {
        "サラダ"
    } else if has(name, &["デザート", "アイス"]) {
        "デザート"
    } else {
        "主菜・副菜"
    }
}

fn category_analysis(top: &[DetailedDish]) -> BTreeMap<String, CategoryStats> {
    let mut categories: BTreeMap<String, CategoryStats> = BTreeMap::new();
    for dish in top {
        let stats = categories
            .entry(classify_dish(&dish.dish_name).to_string())
            .or_insert(CategoryStats {
                count: 0,
                total_score: 0.0,
                avg_score: 0.0,
            });
        stats.count += 1;
        stats.total_score += dish.total_score;
    }

    for stats in categories.values_mut() {
        stats.total_score = round1(stats.total_score);
        stats.avg_score = round1(stats.total_score / stats.count as f64);
    }
    categories
}

impl RankingReport {
    pub fn build(run: &PipelineRun, generated: NaiveDate) -> Self {
        let top = run.ranking.top(run.config.top_n);
        let top_detailed: Vec<DetailedDish> =
            top.iter().map(|e| detailed(e, &run.source_ids)).collect();
        let summary: Vec<DetailedDish> = top_detailed
            .iter()
            .take(run.config.summary_size)
            .cloned()
            .collect();

        RankingReport {
            metadata: metadata(run, generated),
            commonality_analysis: commonality_analysis(run.ranking.all()),
            integrated_top10: summary,
            full_analysis: FullAnalysis {
                scoring_distribution: scoring_distribution(top, run.source_ids.len()),
                category_analysis: category_analysis(&top_detailed),
                top100_ranking: top_detailed,
            },
            integration: IntegrationSummary {
                alias_precedence: run.config.alias_precedence,
                rules: run.config.alias_rules.clone(),
                log: run.integration_log.clone(),
                conflicts: run.alias_conflicts.clone(),
                excluded: run
                    .excluded
                    .iter()
                    .map(|e| ExcludedEntry {
                        name: e.name.clone(),
                        source: e.source_id.clone(),
                        rank: e.rank,
                    })
                    .collect(),
                duplicate_resolutions: run.duplicate_resolutions.clone(),
            },
        }
    }

    /// Load a previously written report
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read report: {:?}", path.as_ref()))?;
        serde_json::from_str(&content).context("Failed to parse report JSON")
    }
}

impl FullRankingReport {
    pub fn build(run: &PipelineRun, generated: NaiveDate) -> Self {
        FullRankingReport {
            metadata: metadata(run, generated),
            ranking: run
                .ranking
                .all()
                .iter()
                .map(|e| RankingRow {
                    overall_rank: e.rank,
                    dish_name: e.dish.display_name.clone(),
                    total_score: round1(e.score.total),
                    ai_count: e.dish.source_count(),
                    average_rank: round1(e.dish.average_rank()),
                })
                .collect(),
        }
    }
}

// ============================================================================
// WRITING
// ============================================================================

/// Serialize fully in memory, then write; a failed run leaves no partial file
pub fn write_json<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(value).context("Failed to serialize report")?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
    }
    fs::write(path, json).with_context(|| format!("Failed to write report: {:?}", path))
}

/// CSV of the ranked list: 順位, 料理名, スコア, AI選択数, 平均順位
pub fn write_csv<W: Write>(writer: W, dishes: &[DetailedDish]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(writer);

    wtr.write_record(["順位", "料理名", "スコア", "AI選択数", "平均順位"])?;
    for dish in dishes {
        wtr.write_record([
            dish.integrated_rank.to_string(),
            dish.dish_name.clone(),
            format!("{:.0}", dish.total_score),
            dish.ai_count.to_string(),
            format!("{:.1}", dish.average_rank),
        ])?;
    }
    wtr.flush().context("Failed to flush CSV")?;
    Ok(())
}

pub fn save_csv<P: AsRef<Path>>(path: P, dishes: &[DetailedDish]) -> Result<()> {
    let mut buffer = Vec::new();
    write_csv(&mut buffer, dishes)?;
    fs::write(path.as_ref(), buffer)
        .with_context(|| format!("Failed to write CSV: {:?}", path.as_ref()))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PipelineConfig, Preset};
    use crate::pipeline;
    use crate::sources::{DishEntry, SourceDocument, SourceList};

    fn run() -> PipelineRun {
        let doc = SourceDocument::from_sources(vec![
            SourceList {
                id: "gemini".to_string(),
                dishes: vec![
                    DishEntry::new("gemini", 1, "カレーライス").with_description("国民食"),
                    DishEntry::new("gemini", 2, "親子丼"),
                    DishEntry::new("gemini", 3, "餃子"),
                ],
            },
            SourceList {
                id: "chatgpt".to_string(),
                dishes: vec![
                    DishEntry::new("chatgpt", 1, "親子丼"),
                    DishEntry::new("chatgpt", 2, "カレー ライス"),
                ],
            },
        ]);
        let mut config = PipelineConfig::preset(Preset::Consensus);
        config.top_n = 2;
        config.summary_size = 1;
        pipeline::run(&doc, &config).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 25).unwrap()
    }

    #[test]
    fn test_report_shape() {
        let report = RankingReport::build(&run(), date());

        assert_eq!(report.metadata.analysis_date, "2025-07-25");
        assert_eq!(report.metadata.ai_sources, vec!["gemini", "chatgpt"]);
        assert_eq!(report.metadata.total_dishes_analyzed, 3);
        assert_eq!(report.metadata.total_dishes_before_normalization, 4);
        assert_eq!(report.integrated_top10.len(), 1);
        assert_eq!(report.full_analysis.top100_ranking.len(), 2);

        let first = &report.full_analysis.top100_ranking[0];
        assert_eq!(first.dish_name, "カレーライス");
        assert_eq!(first.total_score, 390.0);
        assert_eq!(first.average_rank, 1.5);
        assert_eq!(first.description, "国民食");
        assert_eq!(first.ai_rankings["chatgpt"].as_ref().map(|r| r.rank), Some(2));
        assert_eq!(
            first.analysis_reason,
            "2つのAIで選出され、平均順位1.5位の高評価を獲得"
        );
    }

    #[test]
    fn test_absent_source_is_null() {
        let run = run();
        let gyoza = detailed(&run.ranking.all()[2], &run.source_ids);
        let json = serde_json::to_value(&gyoza).unwrap();

        assert_eq!(gyoza.dish_name, "餃子");
        assert_eq!(gyoza.description, FALLBACK_DESCRIPTION);
        assert!(gyoza.ai_rankings["chatgpt"].is_none());
        assert!(json["ai_rankings"]["chatgpt"].is_null());
        assert!(json["ai_rankings"]["gemini"].is_object());
    }

    #[test]
    fn test_stable_field_names() {
        let report = RankingReport::build(&run(), date());
        let json = serde_json::to_value(&report).unwrap();

        assert!(json["full_analysis"]["top100_ranking"].is_array());
        assert!(json["metadata"]["ai_sources"].is_array());
        assert!(json["integrated_top10"][0]["integrated_rank"].is_u64());
        assert_eq!(report.commonality_analysis["1_ai_selection"].examples[0].name, "餃子");
    }

    #[test]
    fn test_distribution_counts_every_k() {
        let report = RankingReport::build(&run(), date());
        let dist = &report.full_analysis.scoring_distribution;

        assert_eq!(dist["ai2_dishes"], 2);
        assert_eq!(dist["ai1_dishes"], 0);
        assert_eq!(report.commonality_analysis["2_ai_selection"].dishes, 2);
    }

    #[test]
    fn test_classify_dish() {
        assert_eq!(classify_dish("カレーライス"), "主食");
        assert_eq!(classify_dish("親子丼"), "主食");
        assert_eq!(classify_dish("豚汁"), "汁物");
        assert_eq!(classify_dish("ポテトサラダ"), "サラダ");
        assert_eq!(classify_dish("抹茶アイス"), "デザート");
        assert_eq!(classify_dish("餃子"), "主菜・副菜");
    }

    #[test]
    fn test_category_analysis_over_top_list() {
        let report = RankingReport::build(&run(), date());
        let categories = &report.full_analysis.category_analysis;

        assert_eq!(categories.len(), 1);
        let staple = &categories["主食"];
        assert_eq!(staple.count, 2);
        assert_eq!(staple.total_score, 780.0);
        assert_eq!(staple.avg_score, 390.0);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["full_analysis"]["category_analysis"]["主食"]["avgScore"], 390.0);
        assert_eq!(json["full_analysis"]["category_analysis"]["主食"]["totalScore"], 780.0);
    }

    #[test]
    fn test_full_ranking_keeps_everything() {
        let full = FullRankingReport::build(&run(), date());
        assert_eq!(full.ranking.len(), 3);
        assert_eq!(full.ranking[2].dish_name, "餃子");
        assert_eq!(full.ranking[2].overall_rank, 3);
    }

    #[test]
    fn test_write_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("ranking.json");
        let report = RankingReport::build(&run(), date());

        write_json(&path, &report).unwrap();
        let loaded = RankingReport::from_file(&path).unwrap();

        assert_eq!(loaded, report);
    }

    #[test]
    fn test_csv_export() {
        let report = RankingReport::build(&run(), date());
        let mut buffer = Vec::new();

        write_csv(&mut buffer, &report.full_analysis.top100_ranking).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "\"順位\",\"料理名\",\"スコア\",\"AI選択数\",\"平均順位\"");
        assert_eq!(lines[1], "\"1\",\"カレーライス\",\"390\",\"2\",\"1.5\"");
        assert_eq!(lines.len(), 3);
    }
}
