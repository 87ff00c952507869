use axum::{
    extract::{Path, State},
    Json,
};
use validator::Validate;

use crate::business_logic::config::ThresholdConfig;
use crate::business_logic::cup_handle::{find_cup_and_handle, CupHandleMatch};
use crate::business_logic::detector::Detection;
use crate::errors::AppError;
use crate::models::pattern::{CheckPatternRequest, CheckPatternResponse, PatternReport};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/check_pattern",
    request_body = CheckPatternRequest,
    responses(
        (status = 200, description = "Whether a cup-and-handle is present", body = CheckPatternResponse),
        (status = 400, description = "Unknown symbol or invalid thresholds", body = crate::errors::ErrorResponse),
        (status = 404, description = "No samples stored for the symbol", body = crate::errors::ErrorResponse),
        (status = 422, description = "Too few samples to detect", body = crate::errors::ErrorResponse)
    )
)]
pub async fn check_pattern(
    State(state): State<AppState>,
    Json(request): Json<CheckPatternRequest>,
) -> Result<Json<CheckPatternResponse>, AppError> {
    request
        .validate()
        .map_err(|err| AppError::Validation(err.to_string()))?;

    let symbol = normalize_symbol(&request.symbol);
    let thresholds = request
        .thresholds
        .as_ref()
        .unwrap_or(state.thresholds.as_ref());
    let (_, detection) = detect_for_symbol(&state, &symbol, thresholds)?;

    Ok(Json(CheckPatternResponse {
        symbol,
        cup_and_handle_detected: detection.is_match(),
    }))
}

#[utoipa::path(
    get,
    path = "/pattern/{symbol}",
    params(
        ("symbol" = String, Path, description = "Tracked ticker symbol", example = "AAPL")
    ),
    responses(
        (status = 200, description = "Turning points or rejection reason", body = PatternReport),
        (status = 400, description = "Unknown symbol", body = crate::errors::ErrorResponse),
        (status = 404, description = "No samples stored for the symbol", body = crate::errors::ErrorResponse),
        (status = 422, description = "Too few samples to detect", body = crate::errors::ErrorResponse)
    )
)]
pub async fn get_pattern_report(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<PatternReport>, AppError> {
    let symbol = normalize_symbol(&symbol);
    let (sample_count, detection) = detect_for_symbol(&state, &symbol, &state.thresholds)?;

    Ok(Json(PatternReport::new(symbol, sample_count, detection)))
}

fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

fn detect_for_symbol(
    state: &AppState,
    symbol: &str,
    thresholds: &ThresholdConfig,
) -> Result<(usize, Detection<CupHandleMatch>), AppError> {
    if !state.is_tracked(symbol) {
        return Err(AppError::Validation(format!(
            "Invalid stock symbol '{symbol}'"
        )));
    }

    let samples = state.samples.get_recent_samples(symbol);
    if samples.is_empty() {
        return Err(AppError::NotFound(format!(
            "No data stored for symbol '{symbol}'"
        )));
    }

    let detection = find_cup_and_handle(&samples, thresholds)?;
    tracing::debug!(
        "[{}] checked {} samples, detected: {}",
        symbol,
        samples.len(),
        detection.is_match()
    );

    Ok((samples.len(), detection))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::business_logic::config::Leg;
    use crate::business_logic::extrema::tests::make_samples;
    use crate::services::sample_store::RollingSampleStore;
    use axum::http::StatusCode;
    use std::sync::Arc;

    const CUP: [f64; 21] = [
        100.0, 94.0, 88.0, 82.0, 76.0, 70.0, 77.0, 84.0, 91.0, 98.0, 105.0, 101.0, 97.0, 94.0,
        90.0, 93.0, 96.0, 100.0, 103.0, 101.0, 99.0,
    ];

    fn make_state() -> AppState {
        let store = RollingSampleStore::default();
        store.ingest("AAPL", make_samples(&CUP));
        store.ingest("MSFT", make_samples(&[300.0; 21]));
        store.ingest("TSLA", make_samples(&[200.0, 201.0, 202.0]));

        AppState {
            samples: Arc::new(store),
            thresholds: Arc::new(ThresholdConfig::uniform(2, 2, 0.05)),
            symbols: Arc::new(
                ["AAPL", "MSFT", "TSLA", "NVDA"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            ),
        }
    }

    fn request(symbol: &str) -> CheckPatternRequest {
        CheckPatternRequest {
            symbol: symbol.to_string(),
            thresholds: None,
        }
    }

    #[tokio::test]
    async fn check_pattern_detects_cup() {
        let Json(response) = check_pattern(State(make_state()), Json(request("aapl")))
            .await
            .unwrap();

        assert_eq!(response.symbol, "AAPL");
        assert!(response.cup_and_handle_detected);
    }

    #[tokio::test]
    async fn flat_series_reports_false() {
        let Json(response) = check_pattern(State(make_state()), Json(request("MSFT")))
            .await
            .unwrap();

        assert!(!response.cup_and_handle_detected);
    }

    #[tokio::test]
    async fn caller_thresholds_override_defaults() {
        let mut body = request("AAPL");
        body.thresholds = Some(ThresholdConfig::uniform(2, 2, 0.05).with_distance(Leg::DE, 5));

        let Json(response) = check_pattern(State(make_state()), Json(body)).await.unwrap();
        assert!(!response.cup_and_handle_detected);
    }

    #[tokio::test]
    async fn invalid_caller_thresholds_are_bad_request() {
        let mut body = request("AAPL");
        body.thresholds = Some(ThresholdConfig::uniform(0, 2, 0.05));

        let error = check_pattern(State(make_state()), Json(body)).await.unwrap_err();
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn oversized_window_is_bad_request() {
        let mut body = request("AAPL");
        body.thresholds = Some(ThresholdConfig::uniform(usize::MAX / 2 + 1, 1, 0.05));

        let error = check_pattern(State(make_state()), Json(body)).await.unwrap_err();
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn error_statuses_are_distinct_from_no_pattern() {
        let untracked = check_pattern(State(make_state()), Json(request("IBM")))
            .await
            .unwrap_err();
        assert_eq!(untracked.status(), StatusCode::BAD_REQUEST);

        let empty = check_pattern(State(make_state()), Json(request("NVDA")))
            .await
            .unwrap_err();
        assert_eq!(empty.status(), StatusCode::NOT_FOUND);

        let short = check_pattern(State(make_state()), Json(request("TSLA")))
            .await
            .unwrap_err();
        assert_eq!(short.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let blank = check_pattern(State(make_state()), Json(request("")))
            .await
            .unwrap_err();
        assert_eq!(blank.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn report_lists_turning_points() {
        let Json(report) = get_pattern_report(State(make_state()), Path("aapl".to_string()))
            .await
            .unwrap();

        assert_eq!(report.sample_count, 21);
        let found = report.pattern.expect("pattern should be reported");
        assert_eq!(
            [found.a.index, found.b.index, found.c.index, found.d.index, found.e.index],
            [0, 5, 10, 14, 18]
        );
        assert!(report.rejection.is_none());
    }
}
