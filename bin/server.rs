// EcoSpend - Web Server
// JSON API over per-session expense ledgers

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use clap::Parser;
use ecospend::{
    logging, CategoryShare, DailyTotal, EmissionFactorTable, Entry, SessionError, SessionStore, Submission,
};
use serde::Serialize;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

/// Upper bound on how often idle sessions are swept
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Parser)]
#[command(name = "ecospend-server", version)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "ECOSPEND_ADDR", default_value = "127.0.0.1:3000")]
    addr: String,

    /// Log filter directives (e.g. "debug")
    #[arg(long, env = "ECOSPEND_LOG")]
    log_level: Option<String>,

    /// Seconds a session may sit idle before its ledger is discarded
    #[arg(long, env = "ECOSPEND_IDLE_TIMEOUT", default_value_t = 1800)]
    idle_timeout_secs: u64,
}

/// Shared application state
#[derive(Clone, Default)]
struct AppState {
    sessions: SessionStore,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Serialize)]
struct SessionResponse {
    session_id: Uuid,
}

#[derive(Serialize)]
struct SummaryResponse {
    is_empty: bool,
    entry_count: usize,
    grand_total: f64,
}

fn session_error(err: SessionError) -> Response {
    let status = match err {
        SessionError::NotFound(_) => StatusCode::NOT_FOUND,
    };
    (status, Json(ApiResponse::<()>::err(err.to_string()))).into_response()
}

fn respond<T: Serialize>(result: Result<T, SessionError>) -> Response {
    match result {
        Ok(data) => (StatusCode::OK, Json(ApiResponse::ok(data))).into_response(),
        Err(err) => session_error(err),
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/categories - Fixed emission factor table
async fn get_categories() -> impl IntoResponse {
    Json(ApiResponse::ok(EmissionFactorTable::standard().factors()))
}

/// POST /api/sessions - Start a session with an empty ledger
async fn create_session(State(state): State<AppState>) -> impl IntoResponse {
    let session_id = state.sessions.create();
    (StatusCode::CREATED, Json(ApiResponse::ok(SessionResponse { session_id })))
}

/// DELETE /api/sessions/:id - End a session and discard its ledger
async fn end_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    respond(state.sessions.end(id).map(|()| "ended"))
}

/// POST /api/sessions/:id/expenses - Validate and append one expense
async fn add_expense(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<Submission>, JsonRejection>,
) -> Response {
    // An unknown session is reported before anything about the body
    if let Err(err) = state.sessions.with_ledger(id, |_| ()) {
        return session_error(err);
    }

    let submission = match payload {
        Ok(Json(submission)) => submission,
        Err(rejection) => {
            tracing::warn!(session = %id, error = %rejection.body_text(), "expense rejected");
            return (rejection.status(), Json(ApiResponse::<()>::err(rejection.body_text()))).into_response();
        }
    };

    match state
        .sessions
        .with_ledger_mut(id, |ledger| submission.apply(ledger).clone())
    {
        Ok(entry) => (StatusCode::CREATED, Json(ApiResponse::ok(entry))).into_response(),
        Err(err) => session_error(err),
    }
}

/// GET /api/sessions/:id/expenses - Entries in submission order
async fn get_expenses(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    respond::<Vec<Entry>>(state.sessions.with_ledger(id, |ledger| ledger.entries().to_vec()))
}

/// GET /api/sessions/:id/daily - Daily totals, ascending by date
async fn get_daily(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    respond::<Vec<DailyTotal>>(state.sessions.with_ledger(id, |ledger| ledger.daily_totals()))
}

/// GET /api/sessions/:id/categories - Category totals with shares
async fn get_category_totals(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    respond::<Vec<CategoryShare>>(state.sessions.with_ledger(id, |ledger| ledger.category_shares()))
}

/// GET /api/sessions/:id/summary - Emptiness, count and grand total
async fn get_summary(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    respond(state.sessions.with_ledger(id, |ledger| SummaryResponse {
        is_empty: ledger.is_empty(),
        entry_count: ledger.len(),
        grand_total: ledger.grand_total(),
    }))
}

fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/categories", get(get_categories))
        .route("/sessions", post(create_session))
        .route("/sessions/:id", delete(end_session))
        .route("/sessions/:id/expenses", post(add_expense).get(get_expenses))
        .route("/sessions/:id/daily", get(get_daily))
        .route("/sessions/:id/categories", get(get_category_totals))
        .route("/sessions/:id/summary", get(get_summary))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

/// Periodically discard sessions abandoned by their clients
async fn sweep_idle_sessions(sessions: SessionStore) {
    let period = sessions.idle_timeout().clamp(Duration::from_secs(1), MAX_SWEEP_INTERVAL);
    let mut ticker = tokio::time::interval(period);

    loop {
        ticker.tick().await;
        let evicted = sessions.evict_idle();
        if evicted > 0 {
            tracing::info!(evicted, live = sessions.len(), "idle sessions swept");
        }
    }
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.log_level.as_deref(), logging::DEFAULT_FILTER, None)?;

    let state = AppState {
        sessions: SessionStore::with_idle_timeout(Duration::from_secs(args.idle_timeout_secs)),
    };
    tokio::spawn(sweep_idle_sessions(state.sessions.clone()));

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&args.addr)
        .await
        .with_context(|| format!("failed to bind {}", args.addr))?;

    tracing::info!(addr = %args.addr, "🌱 EcoSpend server listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
