use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

use super::dispatch::{DispatchReport, DispatchSettings, LeadDispatcher};
use super::domain::{Contact, Lead, LeadId, LeadStatus, LeadSubmission, Platform, Projet};
use super::notifications::EmailSender;
use super::partners::PartnerDirectory;
use super::repository::{LeadRepository, RepositoryError};
use super::scoring::{score, LeadScore, LeadSignals};
use super::validation::{normalize_french_phone, validate_submission, LeadValidationError};
use crate::simulation::{SimulationCalculInput, SimulationEngine, SimulationOutcome};

/// Result of a capture: the stored lead and the detached dispatch task.
#[derive(Debug)]
pub struct LeadCapture {
    pub lead: Lead,
    pub score: LeadScore,
    pub dispatch: JoinHandle<DispatchReport>,
}

#[derive(Debug, thiserror::Error)]
pub enum LeadCaptureError {
    #[error(transparent)]
    Validation(#[from] LeadValidationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Validates, scores and stores leads, then hands them to the dispatcher.
pub struct LeadCaptureService<R, P, E> {
    repository: Arc<R>,
    engine: Arc<SimulationEngine>,
    dispatcher: Arc<LeadDispatcher<R, P, E>>,
    platform: Platform,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn normalize_contact(contact: Contact) -> Contact {
    let telephone = trimmed(contact.telephone)
        .map(|phone| normalize_french_phone(&phone).unwrap_or(phone));
    Contact {
        email: trimmed(contact.email).map(|email| email.to_lowercase()),
        telephone,
        prenom: trimmed(contact.prenom),
        nom: trimmed(contact.nom),
    }
}

/// Declared figures win; the simulation fills the gaps.
fn complete_projet(declared: Projet, simulation: Option<&SimulationCalculInput>) -> Projet {
    let Some(input) = simulation else {
        return declared;
    };
    let financement = input.financement.as_ref();
    Projet {
        montant_investissement: declared
            .montant_investissement
            .or(Some(input.cout_operation())),
        revenus_mensuels: declared.revenus_mensuels.or_else(|| {
            financement
                .and_then(|f| f.revenus_mensuels)
                .or(Some(input.revenu_net_imposable / 12.0))
        }),
        apport: declared
            .apport
            .or_else(|| financement.map(|f| f.apport).filter(|apport| *apport > 0.0)),
        zone: declared.zone.or(Some(input.zone)),
    }
}

impl<R, P, E> LeadCaptureService<R, P, E>
where
    R: LeadRepository + 'static,
    P: PartnerDirectory + 'static,
    E: EmailSender + 'static,
{
    pub fn new(
        repository: Arc<R>,
        partners: Arc<P>,
        email: Arc<E>,
        engine: Arc<SimulationEngine>,
        platform: Platform,
        settings: DispatchSettings,
    ) -> Self {
        let dispatcher = Arc::new(LeadDispatcher::new(
            Arc::clone(&repository),
            partners,
            email,
            settings,
        ));
        Self {
            repository,
            engine,
            dispatcher,
            platform,
        }
    }

    pub fn dispatcher(&self) -> &Arc<LeadDispatcher<R, P, E>> {
        &self.dispatcher
    }

    /// Must run inside a Tokio runtime: dispatch is spawned on it.
    pub fn submit(&self, submission: LeadSubmission) -> Result<LeadCapture, LeadCaptureError> {
        self.submit_at(submission, Utc::now())
    }

    pub fn submit_at(
        &self,
        submission: LeadSubmission,
        now: DateTime<Utc>,
    ) -> Result<LeadCapture, LeadCaptureError> {
        validate_submission(&submission)?;

        let snapshot = submission.simulation.as_ref().map(|input| {
            let as_of = submission.date_simulation.unwrap_or_else(|| now.date_naive());
            self.snapshot(input, as_of)
        });

        let mut lead = Lead {
            id: LeadId::generate(),
            platform: self.platform,
            contact: normalize_contact(submission.contact),
            consents: submission.consents,
            projet: complete_projet(submission.projet, submission.simulation.as_ref()),
            simulation: snapshot,
            score: 0,
            status: LeadStatus::New,
            utm: submission.utm,
            unsubscribe_token: Uuid::new_v4().simple().to_string(),
            created_at: now,
            updated_at: now,
            dispatched_at: None,
            anonymized_at: None,
            promoter_id: None,
            broker_id: None,
        };
        let breakdown = score(&LeadSignals::from_lead(&lead));
        lead.score = breakdown.total;

        let stored = self.repository.insert(lead)?;
        info!(
            lead_id = %stored.id,
            platform = stored.platform.label(),
            score = stored.score,
            "lead captured"
        );

        let dispatch = self.dispatcher.spawn(stored.id);
        Ok(LeadCapture {
            lead: stored,
            score: breakdown,
            dispatch,
        })
    }

    fn snapshot(&self, input: &SimulationCalculInput, as_of: chrono::NaiveDate) -> Value {
        let policy = self.engine.policy_at(as_of);
        let result = match self.engine.simulate(input, &policy) {
            SimulationOutcome::Eligible(result) => json!(result),
            SimulationOutcome::Ineligible(reason) => json!(reason),
        };
        json!({
            "input": input,
            "result": result,
            "versionPolitique": policy.version,
            "dateSimulation": as_of,
        })
    }
}
