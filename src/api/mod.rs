use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::db::{Database, PredictionStats};
use crate::model::{predict_game, weights_info, GameInput, PredictionResult, WeightInfo};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

/// Build the Axum router for the prediction API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/predict", post(predict_handler))
        .route("/api/predictions", get(predictions_handler))
        .route("/api/predictions/latest", get(latest_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/weights", get(weights_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!("Prediction store error: {:#}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

/// POST /api/predict
async fn predict_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GameInput>, JsonRejection>,
) -> ApiResult<PredictionResult> {
    let Json(input) = payload.map_err(|e| (StatusCode::BAD_REQUEST, e.body_text()))?;
    input
        .validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let result = predict_game(&input);
    state.db.insert_prediction(&result, &input).map_err(internal)?;
    info!(
        "Predicted {} vs {}: {} ({:.2}%, {})",
        result.home_team,
        result.away_team,
        result.predicted_winner,
        result.winning_probability(),
        result.confidence_level
    );
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

/// GET /api/predictions?limit=50
async fn predictions_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Vec<PredictionResult>> {
    state
        .db
        .list_predictions(query.limit.unwrap_or(50))
        .map(Json)
        .map_err(internal)
}

/// GET /api/predictions/latest
async fn latest_handler(State(state): State<Arc<AppState>>) -> ApiResult<PredictionResult> {
    match state.db.latest_prediction().map_err(internal)? {
        Some(p) => Ok(Json(p)),
        None => Err((StatusCode::NOT_FOUND, "no predictions stored yet".into())),
    }
}

/// GET /api/stats
async fn stats_handler(State(state): State<Arc<AppState>>) -> ApiResult<PredictionStats> {
    state.db.get_stats().map(Json).map_err(internal)
}

/// GET /api/weights
async fn weights_handler() -> Json<Vec<WeightInfo>> {
    Json(weights_info())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> Arc<AppState> {
        Arc::new(AppState {
            db: Database::open(":memory:").unwrap(),
        })
    }

    #[tokio::test]
    async fn predict_stores_and_returns_result() {
        let state = state();
        let input = GameInput::with_defaults("Avalanche", "Stars");
        let Json(result) = predict_handler(State(state.clone()), Ok(Json(input)))
            .await
            .unwrap();
        assert_eq!(result.predicted_winner, "Avalanche");

        let Json(latest) = latest_handler(State(state.clone())).await.unwrap();
        assert_eq!(latest, result);

        let Json(stats) = stats_handler(State(state)).await.unwrap();
        assert_eq!(stats.total_predictions, 1);
    }

    #[tokio::test]
    async fn predict_rejects_blank_team() {
        let state = state();
        let input = GameInput::with_defaults("", "Stars");
        let (status, msg) = predict_handler(State(state.clone()), Ok(Json(input)))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(msg.contains("home team"));
        assert_eq!(state.db.get_stats().unwrap().total_predictions, 0);
    }

    #[tokio::test]
    async fn latest_is_404_when_empty() {
        let (status, _) = latest_handler(State(state())).await.unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn history_honours_limit() {
        let state = state();
        for home in ["Jets", "Wild", "Blues"] {
            let input = GameInput::with_defaults(home, "Preds");
            predict_handler(State(state.clone()), Ok(Json(input)))
                .await
                .unwrap();
        }
        let Json(list) = predictions_handler(
            State(state.clone()),
            Query(HistoryQuery { limit: Some(2) }),
        )
        .await
        .unwrap();
        let teams: Vec<_> = list.iter().map(|p| p.home_team.as_str()).collect();
        assert_eq!(teams, ["Wild", "Blues"]);
    }

    #[tokio::test]
    async fn weights_are_published() {
        let Json(weights) = weights_handler().await;
        assert_eq!(weights.len(), 9);
        let total: f64 = weights.iter().map(|w| w.weight).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }
}
