/// file: src/api.rs
/// description: HTTP router, search request handler, and health endpoint.
/// HTTP API.
///
/// Route map:
///   POST  /api/search
///   GET   /health
use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    response::{IntoResponse, Json},
    routing::{get, post},
};
use chrono::{SecondsFormat, Utc};
use std::sync::Arc;
use tracing::info;

use crate::models::*;
use crate::scraper::Scraper;

pub const DEFAULT_MAX_RESULTS: usize = 6;
pub const MIN_RESULTS: usize = 3;
pub const MAX_RESULTS: usize = 10;

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub scraper: Arc<Scraper>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/search", post(search_handler))
        .with_state(state)
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

// ---------------------------------------------------------------------------
// POST /api/search
// ---------------------------------------------------------------------------

/// Clamps the requested count into `[MIN_RESULTS, MAX_RESULTS]`; fractional
/// requests round up.
pub fn clamp_max(requested: Option<f64>) -> usize {
    match requested {
        Some(n) if n.is_finite() => n.clamp(MIN_RESULTS as f64, MAX_RESULTS as f64).ceil() as usize,
        _ => DEFAULT_MAX_RESULTS,
    }
}

/// Validates the request and runs one search. Shared by the HTTP handler and
/// the `search` subcommand.
pub async fn run_search(scraper: &Scraper, req: SearchRequest) -> Result<SearchResponse, AppError> {
    let query = req
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::BadRequest(EMPTY_QUERY_MESSAGE.to_string()))?;
    let max = clamp_max(req.max);

    let items = scraper.search(query, max).await?;
    info!(query, max, returned = items.len(), "Search completed");

    Ok(SearchResponse {
        query: query.to_string(),
        items,
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

pub async fn search_handler(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, AppError> {
    let Json(req) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let response = run_search(&state.scraper, req).await?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use axum::response::Response;
    use mockito::Matcher;
    use tower::ServiceExt;

    const FIXTURE: &str = include_str!("../tests/fixtures/search_results.html");

    fn state_for(base_url: impl Into<String>) -> AppState {
        let scraper = Scraper::new(&SearchConfig::with_base_url(base_url)).unwrap();
        AppState {
            scraper: Arc::new(scraper),
        }
    }

    async fn call(state: AppState, req: SearchRequest) -> (StatusCode, serde_json::Value) {
        let resp: Response = search_handler(State(state), Ok(Json(req)))
            .await
            .into_response();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn send(state: AppState, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = router(state).oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_search(content_type: Option<&str>, body: &'static str) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri("/api/search");
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(state_for("http://127.0.0.1:1"), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn malformed_body_is_a_bad_request() {
        let state = state_for("http://127.0.0.1:1");
        let cases = [
            (Some("application/json"), "{not json"),
            (Some("application/json"), r#"{"query": 5}"#),
            (None, r#"{"query": "rust"}"#),
        ];
        for (content_type, body) in cases {
            let (status, json) = send(state.clone(), post_search(content_type, body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
            let error = json["error"].as_str().unwrap();
            assert!(!error.is_empty());
            assert_ne!(error, GENERIC_FAILURE_MESSAGE);
        }
    }

    #[tokio::test]
    async fn routed_blank_query_is_a_bad_request() {
        let (status, body) = send(
            state_for("http://127.0.0.1:1"),
            post_search(Some("application/json"), r#"{"query": "  ", "max": 4}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], EMPTY_QUERY_MESSAGE);
    }

    #[test]
    fn max_is_clamped() {
        assert_eq!(clamp_max(None), 6);
        assert_eq!(clamp_max(Some(1.0)), 3);
        assert_eq!(clamp_max(Some(-4.0)), 3);
        assert_eq!(clamp_max(Some(50.0)), 10);
        assert_eq!(clamp_max(Some(7.0)), 7);
        assert_eq!(clamp_max(Some(4.5)), 5);
    }

    #[tokio::test]
    async fn blank_query_is_rejected_without_fetching() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let state = state_for(server.url());

        for query in [None, Some(String::new()), Some("   ".to_string())] {
            let (status, body) = call(state.clone(), SearchRequest { query, max: None }).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], EMPTY_QUERY_MESSAGE);
        }
        m.assert_async().await;
    }

    #[tokio::test]
    async fn upstream_failure_maps_to_generic_500() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/results")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("upstream exploded")
            .create_async()
            .await;

        let (status, body) = call(
            state_for(server.url()),
            SearchRequest {
                query: Some("rust".into()),
                max: None,
            },
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], GENERIC_FAILURE_MESSAGE);
        assert!(!body.to_string().contains("503"));
    }

    #[tokio::test]
    async fn network_failure_maps_to_generic_500() {
        // Nothing listens on port 1.
        let (status, body) = call(
            state_for("http://127.0.0.1:1"),
            SearchRequest {
                query: Some("rust".into()),
                max: Some(3.0),
            },
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], GENERIC_FAILURE_MESSAGE);
    }

    #[tokio::test]
    async fn success_envelope() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/results")
            .match_query(Matcher::UrlEncoded(
                "search_query".into(),
                "rust async".into(),
            ))
            .with_status(200)
            .with_body(FIXTURE)
            .create_async()
            .await;

        let (status, body) = call(
            state_for(server.url()),
            SearchRequest {
                query: Some("  rust async ".into()),
                max: Some(1.0),
            },
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["query"], "rust async");
        let items = body["items"].as_array().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0]["id"], "AAAAAAAAAAA");
        assert_eq!(items[0]["publishedAt"], "há 2 dias");
        assert_eq!(items[1]["channelTitle"], "Canal C");

        let generated = body["generatedAt"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(generated).is_ok());
        assert!(generated.ends_with('Z'));
    }
}
