use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::core::service::{FundHoldings, HoldingsService};
use crate::error::{ErrorKind, NportError};

pub const INVALID_CIK_MESSAGE: &str = "Invalid CIK format. Please enter a numeric CIK.";
pub const NO_FILINGS_MESSAGE: &str = "No NPORT-P filings found for the provided CIK.";
pub const UNEXPECTED_ERROR_MESSAGE: &str =
    "An unexpected error occurred while processing your request.";

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn router(service: HoldingsService) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/api/cik/:cik", get(holdings_for_cik))
        .layer(CorsLayer::permissive())
        .with_state(service)
}

async fn index() -> &'static str {
    "API for NPORT-P fund holdings. Try GET /api/cik/{cik}"
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

async fn holdings_for_cik(
    State(service): State<HoldingsService>,
    Path(cik): Path<String>,
) -> Result<Json<FundHoldings>, ApiError> {
    info!("Getting NPORT-P holdings for CIK: {}", cik);
    let holdings = service.latest_holdings(&cik).await.map_err(|e| {
        let response = error_response(&e);
        match e.kind() {
            ErrorKind::Validation | ErrorKind::NotFound => {
                warn!("Rejected lookup for CIK {}: {}", cik, e)
            }
            _ => error!("Error occurred while processing CIK {}: {}", cik, e),
        }
        response
    })?;
    Ok(Json(holdings))
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Remote | ErrorKind::Parse | ErrorKind::Storage => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(e: &NportError) -> ApiError {
    let status = status_for(e.kind());
    let message = match e.kind() {
        ErrorKind::Validation => INVALID_CIK_MESSAGE,
        ErrorKind::NotFound => NO_FILINGS_MESSAGE,
        _ => UNEXPECTED_ERROR_MESSAGE,
    };
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}
