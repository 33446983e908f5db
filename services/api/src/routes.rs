use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use jeanbrun::leads::{
    lead_router, EmailSender, LeadCaptureService, LeadRepository, PartnerDirectory,
    RetentionService,
};
use jeanbrun::simulation::{simulation_router, SimulationEngine};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

pub(crate) fn with_api_routes<R, P, E>(
    engine: Arc<SimulationEngine>,
    capture: Arc<LeadCaptureService<R, P, E>>,
    retention: Arc<RetentionService<R>>,
) -> Router
where
    R: LeadRepository + 'static,
    P: PartnerDirectory + 'static,
    E: EmailSender + 'static,
{
    simulation_router(engine)
        .merge(lead_router(capture, retention))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::LoggingEmailSender;
    use crate::infra::InMemoryLeadRepository;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use jeanbrun::leads::{DispatchSettings, PartnerRoster, Platform, RetentionPolicy};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::Value;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn app(ready: bool) -> Router {
        let engine = Arc::new(SimulationEngine::default());
        let repository = Arc::new(InMemoryLeadRepository::default());
        let capture = Arc::new(LeadCaptureService::new(
            Arc::clone(&repository),
            Arc::new(PartnerRoster::default()),
            Arc::new(LoggingEmailSender::default()),
            Arc::clone(&engine),
            Platform::Jeanbrun,
            DispatchSettings::default(),
        ));
        let retention = Arc::new(RetentionService::new(
            repository,
            RetentionPolicy::default(),
        ));
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };

        with_api_routes(engine, capture, retention).layer(Extension(state))
    }

    async fn read_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let response = app(true)
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn readiness_follows_flag() {
        let response = app(false)
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(read_json(response).await["status"], "initializing");

        let response = app(true)
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_are_plain_text() {
        let response = app(true)
            .oneshot(Request::get("/metrics").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
    }

    #[tokio::test]
    async fn simulation_and_lead_routes_are_mounted() {
        let simulation = json!({
            "revenuNetImposable": 60000,
            "nombreParts": 2,
            "typeBien": "neuf",
            "prixAcquisition": 250000,
            "surface": 60,
            "zone": "B1",
            "niveauLoyer": "intermediaire",
            "dateSimulation": "2026-03-15"
        });
        let response = app(true)
            .oneshot(
                Request::post("/api/simulation")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(simulation.to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            read_json(response).await["amortissementAnnuel"].as_f64(),
            Some(7000.0)
        );

        let response = app(true)
            .oneshot(
                Request::post("/api/leads/unsubscribe")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({ "token": "inconnu" }).to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
