use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use super::domain::{SimulationCalculInput, SimulationOutcome};
use super::engine::SimulationEngine;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRequest {
    #[serde(flatten)]
    pub input: SimulationCalculInput,
    /// Evaluation date for date-gated rules; defaults to today.
    #[serde(default)]
    pub date_simulation: Option<NaiveDate>,
}

/// Router exposing the simulation endpoint.
pub fn simulation_router(engine: Arc<SimulationEngine>) -> Router {
    Router::new()
        .route("/api/simulation", post(simulate_handler))
        .with_state(engine)
}

pub(crate) async fn simulate_handler(
    State(engine): State<Arc<SimulationEngine>>,
    payload: Result<Json<SimulationRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "malformed simulation request");
            let payload = json!({
                "error": "requête invalide",
                "detail": rejection.body_text(),
            });
            return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
        }
    };

    if let Err(fields) = request.input.validate() {
        let payload = json!({
            "error": "données de simulation invalides",
            "fields": fields,
        });
        return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
    }

    let as_of = request
        .date_simulation
        .unwrap_or_else(|| Local::now().date_naive());
    let policy = engine.policy_at(as_of);

    match engine.simulate(&request.input, &policy) {
        SimulationOutcome::Eligible(result) => {
            info!(
                zone = %request.input.zone,
                amortissement = result.amortissement_annuel,
                "simulation served"
            );
            (StatusCode::OK, Json(*result)).into_response()
        }
        SimulationOutcome::Ineligible(reason) => {
            info!(motif = ?reason.motif, "simulation ineligible");
            (StatusCode::UNPROCESSABLE_ENTITY, Json(reason)).into_response()
        }
    }
}
