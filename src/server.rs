// 🌐 Read-only HTTP API over a loaded ledger
//
// The ledger is loaded once at startup and shared behind an Arc.
// Every request runs its own synchronous analysis for the requested window.

use crate::config::LedgerArgs;
use crate::loader::parse_date;
use crate::matcher::{DonationMatch, MatchingEngine};
use crate::report::MatchReport;
use crate::transaction::Transaction;
use crate::window::AnalysisWindow;
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
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "donation-server", version, about = "Serve donation matches over HTTP")]
pub struct ServerArgs {
    #[command(flatten)]
    pub ledger: LedgerArgs,

    #[arg(long, env = "DONATION_SERVER_ADDR", default_value = "0.0.0.0:3000")]
    pub addr: String,

    #[arg(long, env = "DONATION_TRACE_LOG", default_value = "info")]
    pub log_level: String,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    transactions: Arc<Vec<Transaction>>,
    default_window: AnalysisWindow,
    engine: MatchingEngine,
}

impl AppState {
    pub fn new(
        transactions: Vec<Transaction>,
        default_window: AnalysisWindow,
        engine: MatchingEngine,
    ) -> Self {
        Self {
            transactions: Arc::new(transactions),
            default_window,
            engine,
        }
    }

    fn report(&self, window: &AnalysisWindow) -> MatchReport {
        MatchReport::build(&self.transactions, window, &self.engine)
    }
}

// ============================================================================
// Responses
// ============================================================================

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(status = %self.status, "{}", self.message);
        let body = ApiResponse {
            success: false,
            data: (),
            error: Some(self.message),
        };
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

/// Match with its presenter-facing fields
#[derive(Serialize)]
struct MatchResponse {
    fingerprint: String,
    summary: String,
    #[serde(flatten)]
    detail: DonationMatch,
}

impl From<&DonationMatch> for MatchResponse {
    fn from(m: &DonationMatch) -> Self {
        Self {
            fingerprint: m.fingerprint(),
            summary: m.summary(),
            detail: m.clone(),
        }
    }
}

#[derive(Serialize)]
struct MatchesResponse {
    window: AnalysisWindow,
    headline: String,
    deposit_count: usize,
    withdrawal_count: usize,
    total_flagged: f64,
    matches: Vec<MatchResponse>,
}

impl MatchesResponse {
    fn from_report<'a>(report: &'a MatchReport, matches: impl Iterator<Item = &'a DonationMatch>) -> Self {
        Self {
            window: report.window,
            headline: report.headline(),
            deposit_count: report.deposit_count,
            withdrawal_count: report.withdrawal_count,
            total_flagged: report.total_flagged,
            matches: matches.map(MatchResponse::from).collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct WindowQuery {
    start: Option<String>,
    end: Option<String>,
}

impl WindowQuery {
    fn resolve(&self, state: &AppState) -> std::result::Result<AnalysisWindow, ApiError> {
        let date = |value: &Option<String>, fallback, name: &str| match value {
            Some(raw) => parse_date(raw)
                .ok_or_else(|| ApiError::bad_request(format!("invalid {} date: {:?}", name, raw))),
            None => Ok(fallback),
        };

        let start = date(&self.start, state.default_window.start_date, "start")?;
        let end = date(&self.end, state.default_window.end_date, "end")?;

        let window = AnalysisWindow::with_extension(start, end, state.default_window.extension_days)
            .map_err(|e| ApiError::bad_request(e.to_string()))?;
        if window.is_inverted() {
            warn!(start = %start, end = %end, "start date is after end date");
        }
        Ok(window)
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/transactions - The loaded ledger
async fn get_transactions(State(state): State<AppState>) -> Json<ApiResponse<Vec<Transaction>>> {
    Json(ApiResponse::ok(state.transactions.to_vec()))
}

/// GET /api/matches?start=&end= - Consolidated matches for a window
async fn get_matches(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<MatchesResponse> {
    let window = query.resolve(&state)?;
    let report = state.report(&window);

    Ok(Json(ApiResponse::ok(MatchesResponse::from_report(
        &report,
        report.matches.iter(),
    ))))
}

/// GET /api/matches/:fingerprint - One match by fingerprint
async fn get_match(
    State(state): State<AppState>,
    Path(fingerprint): Path<String>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<MatchResponse> {
    let window = query.resolve(&state)?;
    let report = state.report(&window);

    report
        .find(&fingerprint)
        .map(|m| Json(ApiResponse::ok(MatchResponse::from(m))))
        .ok_or_else(|| ApiError::not_found(format!("no match with fingerprint {}", fingerprint)))
}

/// GET /api/parties/:party/matches - Matches where a party deposited or withdrew
async fn get_party_matches(
    State(state): State<AppState>,
    Path(party): Path<String>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<MatchesResponse> {
    // Path has already percent-decoded the name
    let window = query.resolve(&state)?;
    let report = state.report(&window);

    Ok(Json(ApiResponse::ok(MatchesResponse::from_report(
        &report,
        report.involving(&party),
    ))))
}

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/transactions", get(get_transactions))
        .route("/matches", get(get_matches))
        .route("/matches/:fingerprint", get(get_match))
        .route("/parties/:party/matches", get(get_party_matches))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

pub async fn serve(args: ServerArgs) -> Result<()> {
    let window = args.ledger.window()?;
    let transactions = args.ledger.load_transactions()?;
    info!(count = transactions.len(), "ledger loaded");

    let state = AppState::new(transactions, window, args.ledger.engine()?);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&args.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", args.addr))?;

    info!(addr = %args.addr, "server running, try /api/matches");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
