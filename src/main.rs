use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use dish_ranking::{
    build_view, pipeline, save_csv, survey, write_json, AliasTable, FullRankingReport, PipelineConfig,
    Preset, RankingReport, SourceDocument,
};
use dish_ranking::{AlternativeFilters, AlternativesDataset, Cuisine, Difficulty};

/// Multi-source dish ranking: normalize, merge, score and rank
#[derive(Parser, Debug)]
#[command(name = "dish-ranking")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// `rank` flags, accepted without the subcommand name
    #[command(flatten)]
    rank: RankArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the integrated ranking (default)
    Rank(RankArgs),

    /// Report names that are probably the same dish
    Survey {
        #[arg(long, default_value = "data/dishes-data.json", env = "DISH_RANKING_INPUT")]
        input: PathBuf,

        /// Write the survey as JSON instead of printing a summary
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Filter rice alternatives and print the view model as JSON
    Alternatives {
        #[arg(long, default_value = "data/vegan-alternatives.json")]
        input: PathBuf,

        #[arg(long, default_value_t = 25.0)]
        carb_limit: f64,

        /// all, easy, medium or hard
        #[arg(long, default_value = "all")]
        difficulty: String,

        /// all, curry, sushi, fried_rice, rice_bowl or furikake
        #[arg(long, default_value = "all")]
        cuisine: String,

        /// Same values as --cuisine; wins unless "all"
        #[arg(long, default_value = "all")]
        tab: String,
    },
}

#[derive(Args, Debug)]
struct RankArgs {
    /// Multi-source input document
    #[arg(long, default_value = "data/dishes-data.json", env = "DISH_RANKING_INPUT")]
    input: PathBuf,

    /// Primary ranking artifact
    #[arg(long, default_value = "data/integrated-dishes-ranking.json", env = "DISH_RANKING_OUTPUT")]
    output: PathBuf,

    /// consensus, integrated or clean
    #[arg(long, default_value = "integrated")]
    preset: String,

    /// JSON config replacing the preset
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// JSON array of alias rules replacing the configured ones
    #[arg(long, value_name = "FILE")]
    aliases: Option<PathBuf>,

    /// Override the ranking length
    #[arg(long)]
    top: Option<usize>,

    /// Also write every canonical dish, sorted
    #[arg(long, value_name = "FILE")]
    full_output: Option<PathBuf>,

    /// Also export the ranking as CSV
    #[arg(long, value_name = "FILE")]
    csv: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("dish_ranking=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Command::Rank(args)) => run_rank(args),
        None => run_rank(cli.rank),
        Some(Command::Survey { input, output }) => run_survey(input, output),
        Some(Command::Alternatives {
            input,
            carb_limit,
            difficulty,
            cuisine,
            tab,
        }) => run_alternatives(input, carb_limit, &difficulty, &cuisine, &tab),
    }
}

fn run_rank(args: RankArgs) -> Result<()> {
    println!("🍱 Dish Ranking - multi-source integration");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::preset(Preset::parse(&args.preset)?),
    };
    if let Some(path) = &args.aliases {
        let table = AliasTable::from_file(path, config.alias_precedence)?;
        config.alias_rules = table.rules().to_vec();
    }
    if let Some(top) = args.top {
        config.top_n = top;
    }
    config.validate()?;
    match &args.config {
        Some(path) => println!("⚙️  Config: {:?}", path),
        None => println!("⚙️  Preset: {}", args.preset),
    }
    println!("   {}", config.weights.describe());

    // 1. Load
    println!("\n📂 Loading {:?}...", args.input);
    let document = SourceDocument::from_file(&args.input)?;
    for source in &document.sources {
        println!("  - {}: {} dishes", source.id, source.dishes.len());
    }

    // 2. Normalize, aggregate, score, rank
    let run = pipeline::run(&document, &config)?;
    println!("\n🔍 Normalization");
    println!("✓ Entries: {} → {} after cleaning", run.original_entries, run.cleaned_entries);
    println!(
        "✓ Dishes: {} → {} after normalization",
        run.dishes_before_normalization,
        run.dish_count()
    );
    println!("✓ Alias rewrites: {}", run.integration_log.len());
    println!("✓ Excluded entries: {}", run.excluded.len());

    // 3. Report
    let today = Local::now().date_naive();
    let report = RankingReport::build(&run, today);

    println!("\n🏆 TOP {}", report.integrated_top10.len());
    for dish in &report.integrated_top10 {
        println!(
            "{:>3}. {} (score {:.1}, {} AI, avg {:.1})",
            dish.integrated_rank, dish.dish_name, dish.total_score, dish.ai_count, dish.average_rank
        );
    }

    write_json(&args.output, &report)?;
    println!("\n💾 Saved {:?}", args.output);

    if let Some(path) = &args.full_output {
        write_json(path, &FullRankingReport::build(&run, today))?;
        println!("💾 Saved {:?}", path);
    }
    if let Some(path) = &args.csv {
        save_csv(path, &report.full_analysis.top100_ranking)?;
        println!("💾 Saved {:?}", path);
    }

    info!(output = ?args.output, dishes = run.dish_count(), "ranking complete");
    Ok(())
}

fn run_survey(input: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let document = SourceDocument::from_file(&input)?;
    let report = survey(&document);

    if let Some(path) = output {
        write_json(&path, &report)?;
        println!("💾 Saved {:?}", path);
        return Ok(());
    }

    println!("🔎 Similar dish names");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Entries: {}, unique names: {}", report.total_entries, report.unique_names);
    for (i, pair) in report.similar_pairs.iter().enumerate() {
        println!(
            "{}. \"{}\" ({}) ⇔ \"{}\" ({}) [{:?}]",
            i + 1,
            pair.first,
            pair.first_count,
            pair.second,
            pair.second_count,
            pair.kind
        );
    }

    println!("\n📈 Most listed");
    for (i, freq) in report.top_frequencies.iter().enumerate() {
        println!("{}. {}: {}", i + 1, freq.name, freq.count);
    }
    Ok(())
}

fn run_alternatives(
    input: PathBuf,
    carb_limit: f64,
    difficulty: &str,
    cuisine: &str,
    tab: &str,
) -> Result<()> {
    let dataset = AlternativesDataset::from_file(&input)?;
    let filters = AlternativeFilters {
        carb_limit,
        difficulty: match difficulty {
            "all" => None,
            other => Some(
                Difficulty::parse(other)
                    .with_context(|| format!("Unknown difficulty '{}'", other))?,
            ),
        },
        cuisine: Cuisine::parse(cuisine)?,
        active_tab: Cuisine::parse(tab)?,
    };

    let view = build_view(&dataset, &filters);
    if view.is_empty() {
        info!("no alternatives match the filters");
    }
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_bare_invocation_ranks_with_defaults() {
        let cli = Cli::try_parse_from(["dish-ranking"]).unwrap();

        assert!(cli.command.is_none());
        assert_eq!(cli.rank.preset, "integrated");
        assert!(cli.rank.top.is_none());
    }

    #[test]
    fn test_rank_flags_without_subcommand() {
        let cli = Cli::try_parse_from(["dish-ranking", "--preset", "clean", "--top", "5"]).unwrap();

        assert!(cli.command.is_none());
        assert_eq!(cli.rank.preset, "clean");
        assert_eq!(cli.rank.top, Some(5));
    }

    #[test]
    fn test_subcommands_parse() {
        let cli = Cli::try_parse_from(["dish-ranking", "rank", "--csv", "out.csv"]).unwrap();
        match cli.command {
            Some(Command::Rank(args)) => assert_eq!(args.csv, Some(PathBuf::from("out.csv"))),
            other => panic!("expected rank, got {:?}", other),
        }

        let cli = Cli::try_parse_from(["dish-ranking", "alternatives", "--cuisine", "curry"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Alternatives { .. })));
    }
}
