use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use log::info;
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use token_radar_core::{to_display_all, BondedQuery, RequestGate, Settings, TokenPipeline};

use crate::error::ApiError;
use crate::monitor::BondingMonitor;

#[derive(Clone)]
pub struct ApiState {
    pub settings: Arc<Settings>,
    pub pipeline: Arc<TokenPipeline>,
    pub monitor: Arc<BondingMonitor>,
    /// Reported by `/health`
    pub gates: Vec<Arc<RequestGate>>,
}

/// Query strings are taken as raw strings so a malformed number produces
/// our own 400 envelope instead of axum's plain-text rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BondedParams {
    search: Option<String>,
    limit: Option<String>,
    minutes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MonitorParams {
    action: Option<String>,
}

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/tokens", get(recent_tokens_handler))
        .route("/api/tokens/bonded", get(bonded_tokens_handler))
        .route("/api/tokens/trending", get(trending_tokens_handler))
        .route("/api/tokens/:id", get(token_detail_handler))
        .route(
            "/api/monitor/bonding",
            get(monitor_handler).post(monitor_handler),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
}

fn parse_param<T: FromStr>(name: &str, raw: Option<&str>) -> Result<Option<T>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("Invalid {}: {}", name, value))),
    }
}

fn token_list_response<T: serde::Serialize>(tokens: Vec<T>) -> Result<impl IntoResponse, ApiError> {
    if tokens.is_empty() {
        return Err(ApiError::NotFound("No tokens found".to_string()));
    }
    Ok(Json(json!({
        "success": true,
        "count": tokens.len(),
        "data": tokens,
        "timestamp": Utc::now().to_rfc3339()
    })))
}

async fn health_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let upstreams: Vec<_> = state.gates.iter().map(|g| g.status()).collect();
    Json(json!({
        "success": true,
        "status": "ok",
        "monitor": state.monitor.status().await.state,
        "upstreams": upstreams,
        "timestamp": Utc::now().to_rfc3339()
    }))
}

async fn recent_tokens_handler(
    State(state): State<ApiState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = state
        .settings
        .page_limit(parse_param("limit", params.limit.as_deref())?);
    let tokens = state.pipeline.recent_tokens(limit).await?;
    token_list_response(to_display_all(&tokens))
}

async fn bonded_tokens_handler(
    State(state): State<ApiState>,
    Query(params): Query<BondedParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = BondedQuery {
        search: params.search.filter(|s| !s.trim().is_empty()),
        limit: state
            .settings
            .page_limit(parse_param("limit", params.limit.as_deref())?),
        minutes: parse_param("minutes", params.minutes.as_deref())?,
    };
    let tokens = state.pipeline.bonded_tokens(&query).await?;
    token_list_response(to_display_all(&tokens))
}

async fn trending_tokens_handler(
    State(state): State<ApiState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = state
        .settings
        .page_limit(parse_param("limit", params.limit.as_deref())?);
    let tokens = state.pipeline.trending_tokens(limit).await?;
    token_list_response(to_display_all(&tokens))
}

async fn token_detail_handler(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state.pipeline.token_detail(&id).await?;
    Ok(Json(json!({
        "success": true,
        "data": detail,
        "timestamp": Utc::now().to_rfc3339()
    })))
}

async fn monitor_handler(
    State(state): State<ApiState>,
    Query(params): Query<MonitorParams>,
) -> Result<impl IntoResponse, ApiError> {
    let action = params
        .action
        .as_deref()
        .map(|a| a.trim().to_ascii_lowercase())
        .unwrap_or_else(|| "status".to_string());

    let message = match action.as_str() {
        "start" => {
            state.monitor.start().await?;
            info!("Bonding monitor started via API");
            "Bonding monitor started"
        }
        "stop" => {
            state.monitor.stop().await?;
            info!("Bonding monitor stopped via API");
            "Bonding monitor stopped"
        }
        "status" => "Bonding monitor status",
        other => {
            return Err(ApiError::BadRequest(format!(
                "Unknown action '{}', expected start, stop or status",
                other
            )))
        }
    };

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": message,
            "data": state.monitor.status().await
        })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{record, test_pipeline, FakeSource, MINT};
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use serde_json::Value;
    use std::time::Duration;
    use tempfile::TempDir;
    use token_radar_core::native::FileStorage;
    use tower::ServiceExt;

    async fn app(dir: &TempDir) -> (Arc<FakeSource>, Router) {
        let settings = Settings {
            data_dir: dir.path().to_string_lossy().into_owned(),
            monitor_interval_secs: 3600,
            ..Settings::default()
        };
        let (source, pipeline) = test_pipeline(&settings);
        let storage = Arc::new(FileStorage::new(dir.path().to_path_buf()));
        let monitor = BondingMonitor::new(pipeline.clone(), storage, &settings)
            .await
            .unwrap();
        let gate = Arc::new(RequestGate::new("pump.fun", 10, 3, Duration::from_secs(30)));
        let state = ApiState {
            settings: Arc::new(settings),
            pipeline,
            monitor,
            gates: vec![gate],
        };
        (source, create_router(state))
    }

    async fn call(router: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
        let response = router
            .clone()
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let dir = TempDir::new().unwrap();
        let (_, router) = app(&dir).await;
        let (status, body) = call(&router, Method::GET, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["monitor"], "stopped");
        assert_eq!(body["upstreams"][0]["circuit"], "closed");
    }

    #[tokio::test]
    async fn recent_tokens_envelope() {
        let dir = TempDir::new().unwrap();
        let (source, router) = app(&dir).await;
        source.set_recent(vec![
            record("older", 34_500.0, 1_716_240_000, false),
            record("newer", 1_500_000.0, 1_716_240_600, true),
        ]);

        let (status, body) = call(&router, Method::GET, "/api/tokens?limit=5").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["count"], 2);
        assert_eq!(body["data"][0]["mint"], "newer");
        assert_eq!(body["data"][0]["marketCap"], "$1.50M");
        assert_eq!(body["data"][0]["status"], "BONDED");
        assert_eq!(body["data"][1]["bondingPercentage"], 50);
        assert_eq!(body["data"][1]["createdAt"], "05/20/2024");
    }

    #[tokio::test]
    async fn empty_list_is_not_found() {
        let dir = TempDir::new().unwrap();
        let (_, router) = app(&dir).await;
        let (status, body) = call(&router, Method::GET, "/api/tokens/trending").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn bad_query_values_are_rejected() {
        let dir = TempDir::new().unwrap();
        let (_, router) = app(&dir).await;
        let (status, body) = call(&router, Method::GET, "/api/tokens?limit=lots").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, _) = call(&router, Method::GET, "/api/tokens/bonded?minutes=-5").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn bonded_search_filters() {
        let dir = TempDir::new().unwrap();
        let (source, router) = app(&dir).await;
        source.set_bonded(vec![
            record("alpha", 80_000.0, 1_716_240_000, true),
            record("beta", 90_000.0, 1_716_240_100, true),
        ]);

        let (status, body) = call(&router, Method::GET, "/api/tokens/bonded?search=ALP").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"][0]["mint"], "alpha");
    }

    #[tokio::test]
    async fn trending_ranks_by_bonding_progress() {
        let dir = TempDir::new().unwrap();
        let (source, router) = app(&dir).await;
        source.set_by_cap(vec![
            record("low", 6_900.0, 1, false),
            record("high", 65_000.0, 2, false),
        ]);

        let (status, body) = call(&router, Method::GET, "/api/tokens/trending?limit=1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"][0]["mint"], "high");
        assert_eq!(body["data"][0]["status"], "NEAR_BONDED");
    }

    #[tokio::test]
    async fn token_detail_with_quote() {
        let dir = TempDir::new().unwrap();
        let (source, router) = app(&dir).await;
        source.set_recent(vec![record(MINT, 12_000.0, 1_716_240_000, false)]);

        let (status, body) = call(&router, Method::GET, &format!("/api/tokens/{}", MINT)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["token"]["mint"], MINT);
        assert_eq!(body["data"]["token"]["marketCap"], "$12.00K");
        assert_eq!(body["data"]["quote"]["pairAddress"], format!("pair-{}", MINT));

        let (status, _) = call(&router, Method::GET, "/api/tokens/not-a-mint").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn upstream_failure_is_service_unavailable() {
        let dir = TempDir::new().unwrap();
        let (source, router) = app(&dir).await;
        source.set_failing(true);
        let (status, body) = call(&router, Method::GET, "/api/tokens").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn monitor_actions() {
        let dir = TempDir::new().unwrap();
        let (_, router) = app(&dir).await;

        let (status, body) = call(&router, Method::GET, "/api/monitor/bonding").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["state"], "stopped");
        assert_eq!(body["data"]["failureRatePercent"], 0.0);
        assert_eq!(body["data"]["storedBonded"], 0);

        let (status, body) = call(&router, Method::POST, "/api/monitor/bonding?action=stop").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, body) = call(&router, Method::POST, "/api/monitor/bonding?action=start").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["state"], "running");

        let (status, _) = call(&router, Method::POST, "/api/monitor/bonding?action=start").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(&router, Method::GET, "/api/monitor/bonding?action=stop").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["state"], "stopped");

        let (status, _) = call(&router, Method::GET, "/api/monitor/bonding?action=reboot").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
