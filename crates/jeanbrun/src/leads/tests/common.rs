use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use crate::leads::domain::{
    ConsentScope, Consents, Contact, Lead, LeadId, LeadStatus, LeadSubmission, Platform,
    Projet, Utm,
};
use crate::leads::notifications::{EmailError, EmailMessage, EmailSender};
use crate::leads::partners::{
    BrokerData, PartnerId, PartnerRoster, PricingModel, PromoterData,
};
use crate::leads::repository::{LeadRepository, RepositoryError};
use crate::leads::{DispatchSettings, LeadCaptureService, LeadDispatcher};
use crate::simulation::{
    NiveauLoyer, SimulationCalculInput, SimulationEngine, TypeBien, ZoneFiscale,
};

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 2, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    leads: Mutex<HashMap<LeadId, Lead>>,
}

impl MemoryRepository {
    pub(super) fn get(&self, id: &LeadId) -> Lead {
        self.leads
            .lock()
            .expect("lock")
            .get(id)
            .cloned()
            .expect("stored lead")
    }

    fn change<F>(&self, id: &LeadId, apply: F) -> Result<Lead, RepositoryError>
    where
        F: FnOnce(&mut Lead) -> Result<(), RepositoryError>,
    {
        let mut guard = self.leads.lock().expect("lock");
        let lead = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        apply(lead)?;
        Ok(lead.clone())
    }
}

impl LeadRepository for MemoryRepository {
    fn insert(&self, lead: Lead) -> Result<Lead, RepositoryError> {
        let mut guard = self.leads.lock().expect("lock");
        if guard.contains_key(&lead.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(lead.id, lead.clone());
        Ok(lead)
    }

    fn fetch(&self, id: &LeadId) -> Result<Option<Lead>, RepositoryError> {
        Ok(self.leads.lock().expect("lock").get(id).cloned())
    }

    fn find_by_unsubscribe_token(&self, token: &str) -> Result<Option<Lead>, RepositoryError> {
        Ok(self
            .leads
            .lock()
            .expect("lock")
            .values()
            .find(|lead| lead.unsubscribe_token == token)
            .cloned())
    }

    fn created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Lead>, RepositoryError> {
        Ok(self
            .leads
            .lock()
            .expect("lock")
            .values()
            .filter(|lead| lead.created_at < cutoff)
            .cloned()
            .collect())
    }

    fn mark_dispatched(
        &self,
        id: &LeadId,
        promoter_id: Option<PartnerId>,
        broker_id: Option<PartnerId>,
        now: DateTime<Utc>,
    ) -> Result<Lead, RepositoryError> {
        self.change(id, |lead| {
            lead.mark_dispatched(promoter_id, broker_id, now)
                .map_err(RepositoryError::from)
        })
    }

    fn revoke_consents(
        &self,
        id: &LeadId,
        scope: ConsentScope,
        now: DateTime<Utc>,
    ) -> Result<Lead, RepositoryError> {
        self.change(id, |lead| {
            lead.revoke(scope, now);
            Ok(())
        })
    }

    fn anonymize(&self, id: &LeadId, now: DateTime<Utc>) -> Result<Lead, RepositoryError> {
        self.change(id, |lead| {
            lead.anonymize(now);
            Ok(())
        })
    }
}

pub(super) struct UnavailableRepository;

impl LeadRepository for UnavailableRepository {
    fn insert(&self, _lead: Lead) -> Result<Lead, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &LeadId) -> Result<Option<Lead>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_by_unsubscribe_token(&self, _token: &str) -> Result<Option<Lead>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn created_before(&self, _cutoff: DateTime<Utc>) -> Result<Vec<Lead>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn mark_dispatched(
        &self,
        _id: &LeadId,
        _promoter_id: Option<PartnerId>,
        _broker_id: Option<PartnerId>,
        _now: DateTime<Utc>,
    ) -> Result<Lead, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn revoke_consents(
        &self,
        _id: &LeadId,
        _scope: ConsentScope,
        _now: DateTime<Utc>,
    ) -> Result<Lead, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn anonymize(&self, _id: &LeadId, _now: DateTime<Utc>) -> Result<Lead, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Records every message; fails for the recipients listed in `failing`.
#[derive(Default)]
pub(super) struct RecordingSender {
    sent: Mutex<Vec<EmailMessage>>,
    failing: Vec<String>,
}

impl RecordingSender {
    pub(super) fn failing_for(recipient: &str) -> Self {
        Self {
            sent: Mutex::default(),
            failing: vec![recipient.to_string()],
        }
    }

    pub(super) fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().expect("lock").clone()
    }

    pub(super) fn recipients(&self) -> Vec<String> {
        self.sent().into_iter().map(|message| message.to).collect()
    }
}

impl EmailSender for RecordingSender {
    fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        if self.failing.contains(&message.to) {
            return Err(EmailError::Transport("smtp relay refused".to_string()));
        }
        self.sent.lock().expect("lock").push(message.clone());
        Ok(())
    }
}

pub(super) const PROMOTER_EMAIL: &str = "leads@promo-atlantique.fr";
pub(super) const BROKER_EMAIL: &str = "contact@courtageplus.fr";
pub(super) const PROSPECT_EMAIL: &str = "camille.martin@example.fr";

pub(super) fn roster() -> PartnerRoster {
    PartnerRoster::new(
        vec![PromoterData {
            id: PartnerId("p-atlantique".to_string()),
            name: "Promo Atlantique".to_string(),
            email: PROMOTER_EMAIL.to_string(),
            zones: vec![ZoneFiscale::B1, ZoneFiscale::B2],
            active: true,
            platforms: vec![Platform::Jeanbrun],
            pricing: PricingModel::ParLead,
            price_per_lead: Some(35.0),
        }],
        vec![
            BrokerData {
                id: PartnerId("c-plus".to_string()),
                name: "Courtage Plus".to_string(),
                email: BROKER_EMAIL.to_string(),
                zones: vec![ZoneFiscale::B1],
                active: true,
                pricing: PricingModel::Abonnement,
                price_per_lead: None,
            },
            BrokerData {
                id: PartnerId("c-dormant".to_string()),
                name: "Courtier en pause".to_string(),
                email: "pause@courtier.fr".to_string(),
                zones: vec![ZoneFiscale::B1],
                active: false,
                pricing: PricingModel::Abonnement,
                price_per_lead: None,
            },
        ],
    )
}

pub(super) fn simulation_input() -> SimulationCalculInput {
    SimulationCalculInput {
        revenu_net_imposable: 60_000.0,
        nombre_parts: 2.0,
        type_bien: TypeBien::Neuf,
        prix_acquisition: 250_000.0,
        montant_travaux: 0.0,
        surface: 45.0,
        zone: ZoneFiscale::B1,
        niveau_loyer: NiveauLoyer::Intermediaire,
        financement: None,
        revente: None,
        duree_detention: None,
        comparer_lmnp: false,
    }
}

pub(super) fn submission() -> LeadSubmission {
    LeadSubmission {
        contact: Contact {
            email: Some(" Camille.Martin@Example.fr ".to_string()),
            telephone: Some("06 12 34 56 78".to_string()),
            prenom: Some("Camille".to_string()),
            nom: Some("Martin".to_string()),
        },
        consents: Consents {
            promoteur: true,
            courtier: true,
            newsletter: false,
        },
        projet: Projet::default(),
        utm: Utm {
            source: Some("google".to_string()),
            campaign: Some("jeanbrun-2026".to_string()),
            ..Utm::default()
        },
        simulation: Some(simulation_input()),
        date_simulation: Some(now().date_naive()),
    }
}

/// Stored lead as capture would leave it, for dispatch and retention tests.
pub(super) fn stored_lead(created_at: DateTime<Utc>) -> Lead {
    Lead {
        id: LeadId::generate(),
        platform: Platform::Jeanbrun,
        contact: Contact {
            email: Some(PROSPECT_EMAIL.to_string()),
            telephone: Some("0612345678".to_string()),
            prenom: Some("Camille".to_string()),
            nom: Some("Martin".to_string()),
        },
        consents: Consents {
            promoteur: true,
            courtier: true,
            newsletter: true,
        },
        projet: Projet {
            montant_investissement: Some(250_000.0),
            revenus_mensuels: Some(5_000.0),
            apport: None,
            zone: None,
        },
        simulation: Some(json!({
            "input": { "zone": "B1" },
            "result": { "amortissementAnnuel": 7000, "economieImpotAnnuelle": 1466 },
        })),
        score: 72,
        status: LeadStatus::New,
        utm: Utm::default(),
        unsubscribe_token: format!("token-{}", created_at.timestamp()),
        created_at,
        updated_at: created_at,
        dispatched_at: None,
        anonymized_at: None,
        promoter_id: None,
        broker_id: None,
    }
}

pub(super) type TestDispatcher = LeadDispatcher<MemoryRepository, PartnerRoster, RecordingSender>;

pub(super) fn dispatcher_with(
    repository: Arc<MemoryRepository>,
    roster: PartnerRoster,
    sender: Arc<RecordingSender>,
) -> TestDispatcher {
    LeadDispatcher::new(
        repository,
        Arc::new(roster),
        sender,
        DispatchSettings::default(),
    )
}

pub(super) fn capture_service(
    repository: Arc<MemoryRepository>,
    sender: Arc<RecordingSender>,
) -> LeadCaptureService<MemoryRepository, PartnerRoster, RecordingSender> {
    LeadCaptureService::new(
        repository,
        Arc::new(roster()),
        sender,
        Arc::new(SimulationEngine::default()),
        Platform::Jeanbrun,
        DispatchSettings::default(),
    )
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("body");
    serde_json::from_slice(&body).expect("json body")
}
