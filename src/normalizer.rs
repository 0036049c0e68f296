// 🏷️ Name Normalizer - Rules as Data
// Normalization key + alias table that folds spelling variants into one dish

use crate::sources::DishEntry;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

// ============================================================================
// NORMALIZATION KEY
// ============================================================================

/// Grouping key: every whitespace character removed (U+3000 included),
/// remainder lower-cased. Idempotent.
pub fn normalize_key(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

// ============================================================================
// ALIAS RULE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasRule {
    /// Name every duplicate is rewritten to
    pub canonical: String,

    /// Raw names that mean the same dish (exact match)
    #[serde(default)]
    pub duplicates: Vec<String>,

    /// Why these are merged
    #[serde(default)]
    pub reason: String,
}

impl AliasRule {
    pub fn new(canonical: &str, duplicates: &[&str], reason: &str) -> Self {
        AliasRule {
            canonical: canonical.to_string(),
            duplicates: duplicates.iter().map(|d| d.to_string()).collect(),
            reason: reason.to_string(),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.duplicates.iter().any(|d| d == name)
    }
}

/// How rules are applied when a name is covered by more than one rule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasPrecedence {
    /// Rules run once each, in list order, against the current name. A name
    /// listed by two rules takes the earlier canonical; a canonical listed as
    /// a later rule's duplicate moves on to that rule's canonical.
    #[default]
    Sequential,

    /// Earliest rule listing the raw name wins, no chaining
    FirstMatch,

    /// Latest rule listing the raw name wins, no chaining
    LastMatch,
}

/// One rewrite performed while applying the table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationLogEntry {
    pub from: String,
    pub to: String,
    pub reason: String,
    pub source: String,
    pub rank: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AliasConflict {
    /// Same raw name listed under several canonicals
    Ambiguous { name: String, canonicals: Vec<String> },

    /// A canonical is itself listed as someone else's duplicate
    Chained { name: String, rewritten_to: String },
}

// ============================================================================
// ALIAS TABLE
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    rules: Vec<AliasRule>,
    precedence: AliasPrecedence,
}

impl AliasTable {
    pub fn new() -> Self {
        AliasTable::default()
    }

    pub fn from_rules(rules: Vec<AliasRule>, precedence: AliasPrecedence) -> Self {
        AliasTable { rules, precedence }
    }

    /// Load rules from a JSON array of `{canonical, duplicates, reason}`
    pub fn from_file<P: AsRef<Path>>(path: P, precedence: AliasPrecedence) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read alias file: {:?}", path.as_ref()))?;

        let rules: Vec<AliasRule> =
            serde_json::from_str(&content).context("Failed to parse alias rules JSON")?;

        Ok(AliasTable::from_rules(rules, precedence))
    }

    /// The integration rules used for the published ranking
    pub fn builtin() -> Self {
        AliasTable::from_rules(builtin_rules(), AliasPrecedence::default())
    }

    pub fn rules(&self) -> &[AliasRule] {
        &self.rules
    }

    pub fn precedence(&self) -> AliasPrecedence {
        self.precedence
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules that rewrite a raw name, in the order they fire. Every rule is
    /// looked at once at most, so cyclic tables still terminate.
    pub fn rewrites(&self, name: &str) -> Vec<&AliasRule> {
        let changes = |rule: &&AliasRule| rule.matches(name) && rule.canonical != name;

        match self.precedence {
            AliasPrecedence::FirstMatch => self.rules.iter().find(changes).into_iter().collect(),
            AliasPrecedence::LastMatch => self.rules.iter().rev().find(changes).into_iter().collect(),
            AliasPrecedence::Sequential => {
                let mut current = name;
                let mut fired = Vec::new();
                for rule in &self.rules {
                    if rule.matches(current) && rule.canonical != current {
                        fired.push(rule);
                        current = rule.canonical.as_str();
                    }
                }
                fired
            }
        }
    }

    /// Rule that produces the final name, if any
    pub fn resolve(&self, name: &str) -> Option<&AliasRule> {
        self.rewrites(name).pop()
    }

    /// Canonical display name for a raw name (the raw name itself when no rule applies)
    pub fn canonical_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.resolve(name).map(|r| r.canonical.as_str()).unwrap_or(name)
    }

    /// Rewrite entry names in place, one log entry per rule that fired
    pub fn apply(&self, entries: &mut [DishEntry]) -> Vec<IntegrationLogEntry> {
        let mut log = Vec::new();

        for entry in entries.iter_mut() {
            for rule in self.rewrites(&entry.name) {
                debug!(from = %entry.name, to = %rule.canonical, source = %entry.source_id, "alias rewrite");
                log.push(IntegrationLogEntry {
                    from: entry.name.clone(),
                    to: rule.canonical.clone(),
                    reason: rule.reason.clone(),
                    source: entry.source_id.clone(),
                    rank: entry.rank,
                });
                entry.name = rule.canonical.clone();
            }
        }

        log
    }

    /// Names listed under more than one canonical, and canonicals that
    /// another rule would rewrite
    pub fn conflicts(&self) -> Vec<AliasConflict> {
        let mut conflicts = Vec::new();

        let mut owners: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();
        for rule in &self.rules {
            for dup in &rule.duplicates {
                let list = owners.entry(dup.as_str()).or_insert_with(|| {
                    order.push(dup.as_str());
                    Vec::new()
                });
                if !list.contains(&rule.canonical.as_str()) {
                    list.push(rule.canonical.as_str());
                }
            }
        }

        for name in order {
            let canonicals = &owners[name];
            if canonicals.len() > 1 {
                conflicts.push(AliasConflict::Ambiguous {
                    name: name.to_string(),
                    canonicals: canonicals.iter().map(|c| c.to_string()).collect(),
                });
            }
        }

        for rule in &self.rules {
            if let Some(other) = self.resolve(&rule.canonical) {
                if other.canonical != rule.canonical {
                    conflicts.push(AliasConflict::Chained {
                        name: rule.canonical.clone(),
                        rewritten_to: other.canonical.clone(),
                    });
                }
            }
        }

        for conflict in &conflicts {
            warn!(?conflict, "alias table conflict");
        }

        conflicts
    }
}

fn builtin_rules() -> Vec<AliasRule> {
    vec![
        AliasRule::new("とんかつ", &["豚カツ"], "同一料理の表記揺れ（カタカナ/漢字）"),
        AliasRule::new("焼き魚", &["焼き鮭"], "一般名と具体名の統合（焼き魚に統合）"),
        AliasRule::new("生姜焼き", &["豚の生姜焼き"], "略称と正式名の統合（略称に統合）"),
        AliasRule::new("チャーハン", &["チャーハン（焼き飯）"], "同一料理の表記揺れ（カッコ付き説明を削除）"),
        AliasRule::new(
            "味噌汁",
            &["豆腐とわかめの味噌汁", "小松菜と豆腐の味噌汁", "豆腐と卵の味噌汁", "白菜としめじの味噌汁"],
            "基本料理と具体的バリエーションの統合",
        ),
        AliasRule::new("だし巻き卵", &["卵焼き・だし巻き卵", "卵焼き"], "類似料理の統合（より具体的な名称に統合）"),
        AliasRule::new("いなり寿司", &[], "寿司の具体的な種類として独立維持"),
        AliasRule::new("ちらし寿司", &[], "寿司の具体的な種類として独立維持"),
        AliasRule::new("手巻き寿司", &[], "寿司の具体的な種類として独立維持"),
        AliasRule::new("ハンバーグ", &["豆腐ハンバーグ"], "基本料理とバリエーションの統合"),
        AliasRule::new("うどん", &["味噌煮込みうどん", "焼きうどん", "肉うどん"], "基本料理と調理法バリエーションの統合"),
        AliasRule::new("ラーメン", &["味噌ラーメン（袋麺）"], "基本料理と具体的バリエーションの統合"),
        AliasRule::new("おにぎり", &["焼きおにぎり"], "基本料理と調理法バリエーションの統合"),
        AliasRule::new("コロッケ", &["カニクリームコロッケ"], "基本料理と具体的バリエーションの統合"),
        AliasRule::new("そば", &["ざるそば"], "基本料理と調理法バリエーションの統合"),
        AliasRule::new("焼きそば", &["あんかけ焼きそば"], "基本料理と調理法バリエーションの統合"),
        AliasRule::new("シチュー", &["クリームシチュー"], "基本料理と具体的バリエーションの統合"),
        AliasRule::new("きんぴらごぼう", &["キンピラごぼう"], "同一料理の表記揺れ（ひらがな/カタカナ）"),
        AliasRule::new("ホイコーロー", &["回鍋肉（ホイコーロー）", "回鍋肉"], "同一料理の表記揺れ（カタカナ/漢字）"),
        AliasRule::new("鶏の照り焼き", &["鶏の照り焼き丼"], "基本料理と丼バリエーションの統合"),
        AliasRule::new("青椒肉絲", &["青椒肉絲（チンジャオロース）"], "同一料理の表記揺れ（読み仮名削除）"),
        AliasRule::new("春巻き", &["生春巻き"], "基本料理と調理法バリエーションの統合"),
        AliasRule::new("炊き込みご飯", &["きのこ炊き込みご飯"], "基本料理と具体的バリエーションの統合"),
        AliasRule::new("切り干し大根", &["切り干し大根の煮物"], "基本食材と調理法バリエーションの統合"),
        AliasRule::new("棒棒鶏", &["棒棒鶏（バンバンジー）"], "同一料理の表記揺れ（読み仮名削除）"),
        AliasRule::new("納豆ご飯", &["納豆"], "より具体的な食べ方に統合"),
        AliasRule::new("豚キムチ", &["豚キムチ炒め"], "略称と正式名の統合"),
        AliasRule::new("コーヒー", &["アイスコーヒー"], "基本飲料と温度バリエーションの統合"),
        AliasRule::new("もやし炒め", &["明太もやし炒め"], "基本料理と具体的バリエーションの統合"),
    ]
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_whitespace_and_case() {
        assert_eq!(normalize_key("  Sushi "), "sushi");
        assert_eq!(normalize_key("カレー　ライス"), "カレーライス");
        assert_eq!(normalize_key("Miso\tSoup\n"), "misosoup");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for name in ["Sushi", "カレー　ライス", " Tonkatsu Curry ", "豚カツ", ""] {
            let once = normalize_key(name);
            assert_eq!(normalize_key(&once), once);
        }
    }

    #[test]
    fn test_alias_rewrites_duplicate() {
        let table = AliasTable::builtin();
        let mut entries = vec![
            DishEntry::new("claude", 4, "豚カツ"),
            DishEntry::new("gemini", 2, "とんかつ"),
        ];

        let log = table.apply(&mut entries);

        assert_eq!(entries[0].name, "とんかつ");
        assert_eq!(entries[1].name, "とんかつ");
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].from, "豚カツ");
        assert_eq!(log[0].source, "claude");
        assert_eq!(log[0].rank, 4);
    }

    #[test]
    fn test_builtin_table_has_no_conflicts() {
        let table = AliasTable::builtin();
        assert_eq!(table.rules().len(), 29);
        assert!(table.conflicts().is_empty());
    }

    #[test]
    fn test_precedence_first_vs_last() {
        let rules = vec![
            AliasRule::new("焼き魚", &["焼き鮭"], "general"),
            AliasRule::new("鮭の塩焼き", &["焼き鮭"], "specific"),
        ];

        let last = AliasTable::from_rules(rules.clone(), AliasPrecedence::LastMatch);
        assert_eq!(last.canonical_name("焼き鮭"), "鮭の塩焼き");

        let first = AliasTable::from_rules(rules, AliasPrecedence::FirstMatch);
        assert_eq!(first.canonical_name("焼き鮭"), "焼き魚");

        assert_eq!(
            first.conflicts(),
            vec![AliasConflict::Ambiguous {
                name: "焼き鮭".to_string(),
                canonicals: vec!["焼き魚".to_string(), "鮭の塩焼き".to_string()],
            }]
        );
    }

    #[test]
    fn test_cycle_does_not_chain() {
        let table = AliasTable::from_rules(
            vec![
                AliasRule::new("A", &["B"], ""),
                AliasRule::new("B", &["A"], ""),
            ],
            AliasPrecedence::LastMatch,
        );
        let mut entries = vec![DishEntry::new("s", 1, "A"), DishEntry::new("s", 2, "B")];

        table.apply(&mut entries);

        assert_eq!(entries[0].name, "B");
        assert_eq!(entries[1].name, "A");
        assert_eq!(table.conflicts().len(), 2);
    }

    #[test]
    fn test_sequential_takes_earlier_rule_for_shared_name() {
        let table = AliasTable::from_rules(
            vec![AliasRule::new("A", &["X"], "first"), AliasRule::new("B", &["X"], "second")],
            AliasPrecedence::default(),
        );

        assert_eq!(table.precedence(), AliasPrecedence::Sequential);
        assert_eq!(table.canonical_name("X"), "A");
    }

    #[test]
    fn test_sequential_chains_forward() {
        let table = AliasTable::from_rules(
            vec![AliasRule::new("A", &["X"], "spelling"), AliasRule::new("B", &["A"], "variant")],
            AliasPrecedence::Sequential,
        );
        let mut entries = vec![DishEntry::new("s", 1, "X"), DishEntry::new("s", 2, "A")];

        let log = table.apply(&mut entries);

        assert_eq!(entries[0].name, "B");
        assert_eq!(entries[1].name, "B");
        assert_eq!(log.len(), 3);
        assert_eq!((log[0].from.as_str(), log[0].to.as_str()), ("X", "A"));
        assert_eq!((log[1].from.as_str(), log[1].to.as_str()), ("A", "B"));
        assert_eq!(log[1].reason, "variant");

        // earlier rules never see a later rule's output
        let reversed = AliasTable::from_rules(
            vec![AliasRule::new("B", &["A"], ""), AliasRule::new("A", &["X"], "")],
            AliasPrecedence::Sequential,
        );
        assert_eq!(reversed.canonical_name("X"), "A");
    }

    #[test]
    fn test_sequential_cycle_terminates() {
        let table = AliasTable::from_rules(
            vec![AliasRule::new("A", &["B"], ""), AliasRule::new("B", &["A"], "")],
            AliasPrecedence::Sequential,
        );
        let mut entries = vec![DishEntry::new("s", 1, "A"), DishEntry::new("s", 2, "B")];

        let log = table.apply(&mut entries);

        assert_eq!(entries[0].name, "B");
        assert_eq!(entries[1].name, "B");
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_alias_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aliases.json");
        fs::write(
            &path,
            r#"[{ "canonical": "そば", "duplicates": ["ざるそば", "かけそば"] }]"#,
        )
        .unwrap();

        let table = AliasTable::from_file(&path, AliasPrecedence::FirstMatch).unwrap();

        assert_eq!(table.canonical_name("かけそば"), "そば");
        assert_eq!(table.canonical_name("うどん"), "うどん");
        assert_eq!(table.rules()[0].reason, "");
    }
}
