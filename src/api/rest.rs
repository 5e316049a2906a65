// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`. Symbols contain `/` and spaces, so
// they travel as a `?symbol=` query parameter rather than a path segment.
//
// CORS is configured permissively for development; tighten `allowed_origins`
// in production.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::app_state::AppState;
use crate::display::format_price;
use crate::indicators::{calculate_indicators, Indicators, MIN_HISTORY};
use crate::market_data::{is_known_market, MarketQuote};
use crate::runtime_config::ConfigUpdate;
use crate::signal_desk::pace_analysis;
use crate::signals::{tally_votes, VoteTally};

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/state", get(full_state))
        .route("/api/v1/markets", get(markets))
        .route("/api/v1/markets/refresh", post(refresh_markets))
        .route("/api/v1/markets/trend", get(market_trend))
        .route("/api/v1/indicators", get(indicators))
        .route("/api/v1/signals", get(signals).delete(clear_signals))
        .route("/api/v1/signals/generate", post(generate_signal))
        .route("/api/v1/config", get(config).post(update_config))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Errors
// =============================================================================

/// JSON error body `{ "error": ... }` with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        warn!(error = %err, "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
    }
}

// =============================================================================
// Health & state
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        server_time: state.now().timestamp_millis(),
    };
    Json(resp)
}

async fn full_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.build_snapshot())
}

// =============================================================================
// Markets
// =============================================================================

#[derive(Serialize)]
struct MarketSummary {
    symbol: String,
    price: f64,
    change: f64,
    percent_change: f64,
    volume: u64,
    timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
struct MarketsResponse {
    last_refresh: Option<DateTime<Utc>>,
    count: usize,
    markets: Vec<MarketSummary>,
}

async fn markets(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let markets: Vec<MarketSummary> = state
        .quotes
        .read()
        .iter()
        .map(|q| MarketSummary {
            symbol: q.symbol.clone(),
            price: q.price,
            change: q.change,
            percent_change: q.percent_change,
            volume: q.volume,
            timestamp: q.timestamp,
        })
        .collect();

    Json(MarketsResponse {
        last_refresh: *state.last_refresh.read(),
        count: markets.len(),
        markets,
    })
}

/// Points of history served for the price chart.
const TREND_CHART_POINTS: usize = 20;

/// Latest quote for a catalog symbol the desk is tracking.
fn tracked_quote(state: &AppState, symbol: &str) -> Result<MarketQuote, ApiError> {
    if !is_known_market(symbol) {
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            format!("unknown symbol '{symbol}'"),
        ));
    }
    state.quote(symbol).ok_or_else(|| {
        ApiError::new(
            StatusCode::NOT_FOUND,
            format!("no quote for '{symbol}' yet"),
        )
    })
}

#[derive(Deserialize)]
struct SymbolQuery {
    symbol: String,
}

#[derive(Serialize)]
struct TrendResponse {
    symbol: String,
    price: f64,
    /// Oldest first.
    points: Vec<f64>,
}

async fn market_trend(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SymbolQuery>,
) -> Result<Json<TrendResponse>, ApiError> {
    let quote = tracked_quote(&state, &query.symbol)?;
    let start = quote.trend.len().saturating_sub(TREND_CHART_POINTS);
    Ok(Json(TrendResponse {
        points: quote.trend[start..].to_vec(),
        price: quote.price,
        symbol: query.symbol,
    }))
}

async fn refresh_markets(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let refreshed = state.refresh_quotes();
    info!(refreshed, "Manual market refresh");
    Json(serde_json::json!({
        "refreshed": refreshed,
        "last_refresh": *state.last_refresh.read(),
        "state_version": state.current_state_version(),
    }))
}

// =============================================================================
// Indicators
// =============================================================================

#[derive(Serialize)]
struct IndicatorsResponse {
    symbol: String,
    price: f64,
    indicators: Indicators,
    votes: VoteTally,
}

async fn indicators(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SymbolQuery>,
) -> Result<Json<IndicatorsResponse>, ApiError> {
    let symbol = query.symbol;
    let quote = tracked_quote(&state, &symbol)?;

    let indicators = calculate_indicators(&quote.trend).ok_or_else(|| {
        ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!(
                "'{symbol}' has {} points of history, {MIN_HISTORY} required",
                quote.trend.len()
            ),
        )
    })?;

    let votes = tally_votes(&indicators, quote.price);
    Ok(Json(IndicatorsResponse {
        symbol,
        price: quote.price,
        indicators,
        votes,
    }))
}

// =============================================================================
// Signals
// =============================================================================

async fn signals(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let views = state.signal_views()?;
    Ok(Json(views))
}

async fn clear_signals(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cleared = state.clear_signals();
    Json(serde_json::json!({
        "cleared": cleared,
        "state_version": state.current_state_version(),
    }))
}

async fn generate_signal(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let Some(_slot) = state.try_begin_generation() else {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            "signal generation already in progress",
        ));
    };

    let pacing = state.runtime_config.read().analysis_pacing();
    pace_analysis(pacing).await;

    match state.generate_signal() {
        Some(trade) => {
            info!(
                symbol = %trade.symbol,
                direction = %trade.signal.direction,
                price = %format_price(&trade.symbol, trade.signal.current_price),
                "High-confidence signal served"
            );
            let view = state.signal_view(&trade)?;
            Ok(Json(serde_json::json!({ "signal": view })).into_response())
        }
        None => Ok(Json(serde_json::json!({
            "signal": null,
            "message": "No high-confidence signals found at this time. Market conditions not optimal.",
        }))
        .into_response()),
    }
}

// =============================================================================
// Config
// =============================================================================

async fn config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let config = state.runtime_config.read().clone();
    Json(config)
}

async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(update): Json<ConfigUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let changes = state
        .update_config(&update)
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, format!("{e:#}")))?;

    let config = state.runtime_config.read().clone();
    Ok(Json(serde_json::json!({
        "config": config,
        "changes": changes,
        "state_version": state.current_state_version(),
    })))
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime_config::RuntimeConfig;
    use crate::scheduler::FixedClock;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::TimeZone;
    use tower::ServiceExt;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn test_state() -> Arc<AppState> {
        let config = RuntimeConfig {
            symbols: vec!["EUR/USD".into(), "BTC/USD OTC".into()],
            timezone: "UTC+03:00".into(),
            ..RuntimeConfig::default()
        };
        Arc::new(AppState::seeded(config, Arc::new(FixedClock::new(t0())), 99))
    }

    fn flat_quote(symbol: &str, points: usize) -> MarketQuote {
        MarketQuote {
            symbol: symbol.to_string(),
            price: 1.0,
            change: 0.0,
            percent_change: 0.0,
            timestamp: t0(),
            trend: vec![1.0; points],
            volume: 750_000,
        }
    }

    async fn call(state: Arc<AppState>, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
        send(state, Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()).await
    }

    async fn post_json(
        state: Arc<AppState>,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(state, request).await
    }

    /// Body is `Null` when the response is not JSON.
    async fn send(state: Arc<AppState>, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, body) = call(test_state(), "GET", "/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["server_time"], t0().timestamp_millis());
    }

    #[tokio::test]
    async fn refresh_then_list_markets() {
        let state = test_state();
        let (status, body) = call(state.clone(), "GET", "/api/v1/markets").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);
        assert!(body["last_refresh"].is_null());

        let (status, body) = call(state.clone(), "POST", "/api/v1/markets/refresh").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["refreshed"], 2);

        let (_, body) = call(state, "GET", "/api/v1/markets").await;
        assert_eq!(body["count"], 2);
        assert_eq!(body["markets"][0]["symbol"], "EUR/USD");
        assert_eq!(body["markets"][1]["symbol"], "BTC/USD OTC");
        assert!(body["markets"][0].get("trend").is_none());
    }

    #[tokio::test]
    async fn indicators_for_a_tracked_symbol() {
        let state = test_state();
        state.refresh_quotes();
        let (status, body) = call(state, "GET", "/api/v1/indicators?symbol=BTC%2FUSD%20OTC").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbol"], "BTC/USD OTC");
        let rsi = body["indicators"]["rsi"].as_f64().unwrap();
        assert!((0.0..=100.0).contains(&rsi));
        assert!(body["votes"]["bullish"].is_u64());
    }

    #[tokio::test]
    async fn indicators_unknown_symbol_is_404() {
        let (status, body) = call(test_state(), "GET", "/api/v1/indicators?symbol=FOO%2FBAR").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("unknown symbol"));
    }

    #[tokio::test]
    async fn indicators_untracked_symbol_is_404() {
        let state = test_state();
        state.refresh_quotes();
        let (status, _) = call(state, "GET", "/api/v1/indicators?symbol=ETH%2FUSD").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn indicators_short_history_is_422() {
        let state = test_state();
        *state.quotes.write() = vec![flat_quote("EUR/USD", 10)];
        let (status, body) = call(state, "GET", "/api/v1/indicators?symbol=EUR%2FUSD").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("20 required"));
    }

    #[tokio::test]
    async fn generate_returns_and_records_best_signal() {
        let state = test_state();
        *state.quotes.write() = vec![flat_quote("EUR/USD", 50)];

        let (status, body) = call(state.clone(), "POST", "/api/v1/signals/generate").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["signal"]["symbol"], "EUR/USD");
        assert_eq!(body["signal"]["direction"], "up");
        assert_eq!(body["signal"]["confidence"], 70.0);

        let (status, body) = call(state, "GET", "/api/v1/signals").await;
        assert_eq!(status, StatusCode::OK);
        let list = body.as_array().unwrap();
        assert_eq!(list.len(), 1);
        // 12:00 UTC plus one to three minutes, shown at UTC+03:00.
        let entry = list[0]["entry_time"].as_str().unwrap();
        assert!(["15:01:00", "15:02:00", "15:03:00"].contains(&entry));
    }

    #[tokio::test]
    async fn generate_with_nothing_qualifying() {
        let state = test_state();
        *state.quotes.write() = vec![flat_quote("EUR/USD", 10)];
        let (status, body) = call(state.clone(), "POST", "/api/v1/signals/generate").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["signal"].is_null());
        assert!(body["message"].as_str().unwrap().contains("No high-confidence"));
        assert!(state.signal_history.read().is_empty());
    }

    #[tokio::test]
    async fn generate_is_rejected_while_running() {
        let state = test_state();
        let _slot = state.try_begin_generation().unwrap();
        let (status, _) = call(state.clone(), "POST", "/api/v1/signals/generate").await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn config_is_served() {
        let (status, body) = call(test_state(), "GET", "/api/v1/config").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["timezone"], "UTC+03:00");
        assert_eq!(body["tie_policy"], "Bearish");
        assert_eq!(body["max_history"], 10);
    }

    #[tokio::test]
    async fn trend_serves_the_last_twenty_points() {
        let state = test_state();
        let mut quote = flat_quote("EUR/USD", 50);
        quote.trend = (0..50).map(|i| i as f64).collect();
        *state.quotes.write() = vec![quote];

        let (status, body) = call(state.clone(), "GET", "/api/v1/markets/trend?symbol=EUR%2FUSD").await;
        assert_eq!(status, StatusCode::OK);
        let points: Vec<f64> = serde_json::from_value(body["points"].clone()).unwrap();
        assert_eq!(points, (30..50).map(|i| i as f64).collect::<Vec<_>>());

        *state.quotes.write() = vec![flat_quote("EUR/USD", 5)];
        let (_, body) = call(state.clone(), "GET", "/api/v1/markets/trend?symbol=EUR%2FUSD").await;
        assert_eq!(body["points"].as_array().unwrap().len(), 5);

        let (status, _) = call(state, "GET", "/api/v1/markets/trend?symbol=FOO%2FBAR").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn config_update_is_applied_and_served() {
        let state = test_state();
        let (status, body) = post_json(
            state.clone(),
            "/api/v1/config",
            serde_json::json!({ "timezone": "UTC-05:00", "tie_policy": "Abstain" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["config"]["timezone"], "UTC-05:00");
        assert_eq!(body["changes"].as_array().unwrap().len(), 2);

        let (_, body) = call(state.clone(), "GET", "/api/v1/config").await;
        assert_eq!(body["timezone"], "UTC-05:00");
        assert_eq!(body["tie_policy"], "Abstain");

        // Entry times now render in the new offset.
        *state.quotes.write() = vec![flat_quote("EUR/USD", 50)];
        let (_, body) = call(state, "POST", "/api/v1/signals/generate").await;
        let entry = body["signal"]["entry_time"].as_str().unwrap();
        assert!(["07:01:00", "07:02:00", "07:03:00"].contains(&entry));
    }

    #[tokio::test]
    async fn invalid_config_update_is_400() {
        let state = test_state();
        let (status, body) = post_json(
            state.clone(),
            "/api/v1/config",
            serde_json::json!({ "timezone": "Mars/Olympus" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("timezone"));
        assert_eq!(state.runtime_config.read().timezone, "UTC+03:00");

        let (status, _) = post_json(
            state,
            "/api/v1/config",
            serde_json::json!({ "refresh_interval_secs": 1 }),
        )
        .await;
        assert!(status.is_client_error());
    }

    #[tokio::test]
    async fn history_can_be_cleared() {
        let state = test_state();
        *state.quotes.write() = vec![flat_quote("EUR/USD", 50)];
        call(state.clone(), "POST", "/api/v1/signals/generate").await;
        call(state.clone(), "POST", "/api/v1/signals/generate").await;

        let (status, body) = call(state.clone(), "DELETE", "/api/v1/signals").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cleared"], 2);

        let (_, body) = call(state, "GET", "/api/v1/signals").await;
        assert!(body.as_array().unwrap().is_empty());
    }
}
