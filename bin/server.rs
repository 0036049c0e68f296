// Dish Ranking - Web Server
// Read-only REST API over the generated ranking artifacts

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{info, warn};

use dish_ranking::{
    build_view, normalize_key, AlternativeFilters, AlternativesDataset, Cuisine, DetailedDish,
    Difficulty, RankingReport,
};

#[derive(Parser, Debug)]
#[command(name = "dish-server")]
#[command(version)]
struct ServerArgs {
    /// Ranking artifact written by `dish-ranking rank`
    #[arg(long, default_value = "data/integrated-dishes-ranking.json", env = "DISH_RANKING_OUTPUT")]
    ranking: PathBuf,

    /// Rice alternatives dataset; the endpoint answers 404 without it
    #[arg(long, default_value = "data/vegan-alternatives.json")]
    alternatives: PathBuf,

    #[arg(long, default_value = "docs")]
    static_dir: PathBuf,

    #[arg(long, default_value = "0.0.0.0:3000", env = "DISH_SERVER_ADDR")]
    addr: String,
}

/// Shared application state, loaded once at startup
#[derive(Clone)]
struct AppState {
    ranking: Arc<RankingReport>,
    alternatives: Option<Arc<AlternativesDataset>>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body: ApiResponse<()> = ApiResponse {
        success: false,
        data: None,
        error: Some(message.into()),
    };
    (status, Json(body)).into_response()
}

#[derive(Deserialize)]
struct TopQuery {
    n: Option<usize>,
}

#[derive(Deserialize)]
struct AlternativesQuery {
    carb_limit: Option<f64>,
    difficulty: Option<String>,
    cuisine: Option<String>,
    tab: Option<String>,
}

impl AlternativesQuery {
    fn filters(&self) -> Result<AlternativeFilters> {
        let mut filters = AlternativeFilters::default();
        if let Some(limit) = self.carb_limit {
            filters.carb_limit = limit;
        }
        filters.difficulty = match self.difficulty.as_deref() {
            None | Some("all") => None,
            Some(other) => Some(
                Difficulty::parse(other).with_context(|| format!("Unknown difficulty '{}'", other))?,
            ),
        };
        if let Some(cuisine) = &self.cuisine {
            filters.cuisine = Cuisine::parse(cuisine)?;
        }
        if let Some(tab) = &self.tab {
            filters.active_tab = Cuisine::parse(tab)?;
        }
        Ok(filters)
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/ranking - Full ranking artifact
async fn get_ranking(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::ok(state.ranking.as_ref().clone()))
}

/// GET /api/ranking/top?n= - Leading dishes, summary size by default
async fn get_top(State(state): State<AppState>, Query(query): Query<TopQuery>) -> impl IntoResponse {
    let dishes = &state.ranking.full_analysis.top100_ranking;
    let n = query
        .n
        .unwrap_or(state.ranking.integrated_top10.len())
        .min(dishes.len());
    Json(ApiResponse::ok(dishes[..n].to_vec()))
}

/// GET /api/dishes/:name - One dish, matched by normalized name
async fn get_dish(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let key = normalize_key(&name);
    let found: Option<&DetailedDish> = state
        .ranking
        .full_analysis
        .top100_ranking
        .iter()
        .find(|dish| normalize_key(&dish.dish_name) == key);

    match found {
        Some(dish) => (StatusCode::OK, Json(ApiResponse::ok(dish.clone()))).into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("Dish '{}' is not ranked", name)),
    }
}

/// GET /api/alternatives - Filtered rice alternatives view
async fn get_alternatives(
    State(state): State<AppState>,
    Query(query): Query<AlternativesQuery>,
) -> Response {
    let Some(dataset) = &state.alternatives else {
        return error_response(StatusCode::NOT_FOUND, "Alternatives dataset not loaded");
    };

    match query.filters() {
        Ok(filters) => {
            let view = build_view(dataset, &filters);
            (StatusCode::OK, Json(ApiResponse::ok(view))).into_response()
        }
        Err(e) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

fn router(state: AppState, static_dir: PathBuf) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/ranking", get(get_ranking))
        .route("/ranking/top", get(get_top))
        .route("/dishes/:name", get(get_dish))
        .route("/alternatives", get(get_alternatives))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .fallback_service(ServeDir::new(static_dir))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("dish_server=info,dish_ranking=info")),
        )
        .init();

    let args = ServerArgs::parse();

    println!("🌐 Dish Ranking - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let ranking = RankingReport::from_file(&args.ranking)
        .context("Run `dish-ranking rank` to generate the ranking first")?;
    println!(
        "✓ Ranking loaded: {:?} ({} dishes)",
        args.ranking,
        ranking.full_analysis.top100_ranking.len()
    );

    let alternatives = match AlternativesDataset::from_file(&args.alternatives) {
        Ok(dataset) => {
            println!("✓ Alternatives loaded: {:?}", args.alternatives);
            Some(Arc::new(dataset))
        }
        Err(e) => {
            warn!(error = %e, "alternatives endpoint disabled");
            None
        }
    };

    let state = AppState {
        ranking: Arc::new(ranking),
        alternatives,
    };
    let app = router(state, args.static_dir);

    let listener = tokio::net::TcpListener::bind(&args.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", args.addr))?;

    println!("\n🚀 Server running on http://{}", args.addr);
    println!("   API: http://{}/api/ranking", args.addr);
    println!("\n   Press Ctrl+C to stop\n");
    info!(addr = %args.addr, "listening");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
