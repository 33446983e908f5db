use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};

use super::domain::{ConsentScope, LeadSubmission};
use super::notifications::EmailSender;
use super::partners::PartnerDirectory;
use super::repository::LeadRepository;
use super::retention::{RetentionService, UnsubscribeError};
use super::service::{LeadCaptureError, LeadCaptureService};

const GENERIC_FAILURE: &str = "Une erreur est survenue, merci de réessayer plus tard.";

pub struct LeadRoutes<R, P, E> {
    pub capture: Arc<LeadCaptureService<R, P, E>>,
    pub retention: Arc<RetentionService<R>>,
}

impl<R, P, E> Clone for LeadRoutes<R, P, E> {
    fn clone(&self) -> Self {
        Self {
            capture: Arc::clone(&self.capture),
            retention: Arc::clone(&self.retention),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnsubscribeRequest {
    pub token: String,
    #[serde(default = "all_consents")]
    pub scope: ConsentScope,
}

fn all_consents() -> ConsentScope {
    ConsentScope::Tout
}

/// Router exposing lead capture and unsubscribe endpoints.
pub fn lead_router<R, P, E>(
    capture: Arc<LeadCaptureService<R, P, E>>,
    retention: Arc<RetentionService<R>>,
) -> Router
where
    R: LeadRepository + 'static,
    P: PartnerDirectory + 'static,
    E: EmailSender + 'static,
{
    Router::new()
        .route("/api/leads", post(capture_handler::<R, P, E>))
        .route("/api/leads/unsubscribe", post(unsubscribe_handler::<R, P, E>))
        .with_state(LeadRoutes { capture, retention })
}

fn bad_request(rejection: JsonRejection) -> Response {
    warn!(error = %rejection.body_text(), "malformed lead payload");
    let payload = json!({
        "error": "requête invalide",
        "detail": rejection.body_text(),
    });
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}

pub(crate) async fn capture_handler<R, P, E>(
    State(routes): State<LeadRoutes<R, P, E>>,
    payload: Result<Json<LeadSubmission>, JsonRejection>,
) -> Response
where
    R: LeadRepository + 'static,
    P: PartnerDirectory + 'static,
    E: EmailSender + 'static,
{
    let submission = match payload {
        Ok(Json(submission)) => submission,
        Err(rejection) => return bad_request(rejection),
    };

    match routes.capture.submit(submission) {
        // Dispatch keeps running after the handle is dropped.
        Ok(capture) => {
            let payload = json!({
                "id": capture.lead.id,
                "status": capture.lead.status,
                "score": capture.score.total,
            });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Err(LeadCaptureError::Validation(error)) => {
            let payload = json!({
                "error": "certains champs sont invalides",
                "fields": error.errors,
            });
            (StatusCode::BAD_REQUEST, Json(payload)).into_response()
        }
        Err(LeadCaptureError::Repository(err)) => {
            error!(error = %err, "lead capture failed");
            let payload = json!({ "error": GENERIC_FAILURE });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

pub(crate) async fn unsubscribe_handler<R, P, E>(
    State(routes): State<LeadRoutes<R, P, E>>,
    payload: Result<Json<UnsubscribeRequest>, JsonRejection>,
) -> Response
where
    R: LeadRepository + 'static,
    P: PartnerDirectory + 'static,
    E: EmailSender + 'static,
{
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return bad_request(rejection),
    };

    match routes.retention.revoke_consents(&request.token, request.scope) {
        Ok(lead) => {
            let payload = json!({ "consents": lead.consents });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(UnsubscribeError::UnknownToken) => {
            let payload = json!({ "error": "lien de désinscription inconnu" });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(UnsubscribeError::Repository(err)) => {
            error!(error = %err, "unsubscribe failed");
            let payload = json!({ "error": GENERIC_FAILURE });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}
