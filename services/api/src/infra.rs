use chrono::{DateTime, NaiveDate, Utc};
use jeanbrun::config::AppConfig;
use jeanbrun::error::AppError;
use jeanbrun::leads::{
    ConsentScope, Lead, LeadId, LeadRepository, PartnerId, PartnerRoster, RepositoryError,
};
use jeanbrun::simulation::{BaremeFiscal, PolicyFlags, SimulationEngine};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryLeadRepository {
    records: Arc<Mutex<HashMap<LeadId, Lead>>>,
}

impl InMemoryLeadRepository {
    pub(crate) fn get(&self, id: &LeadId) -> Option<Lead> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        guard.get(id).cloned()
    }

    /// Apply one change to the stored row while holding the lock.
    fn modify<F>(&self, id: &LeadId, change: F) -> Result<Lead, RepositoryError>
    where
        F: FnOnce(&mut Lead) -> Result<(), RepositoryError>,
    {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let lead = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        change(lead)?;
        Ok(lead.clone())
    }
}

impl LeadRepository for InMemoryLeadRepository {
    fn insert(&self, lead: Lead) -> Result<Lead, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&lead.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(lead.id, lead.clone());
        Ok(lead)
    }

    fn fetch(&self, id: &LeadId) -> Result<Option<Lead>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn find_by_unsubscribe_token(&self, token: &str) -> Result<Option<Lead>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .find(|lead| lead.unsubscribe_token == token)
            .cloned())
    }

    fn created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Lead>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
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
        self.modify(id, |lead| {
            lead.mark_dispatched(promoter_id, broker_id, now)?;
            Ok(())
        })
    }

    fn revoke_consents(
        &self,
        id: &LeadId,
        scope: ConsentScope,
        now: DateTime<Utc>,
    ) -> Result<Lead, RepositoryError> {
        self.modify(id, |lead| {
            lead.revoke(scope, now);
            Ok(())
        })
    }

    fn anonymize(&self, id: &LeadId, now: DateTime<Utc>) -> Result<Lead, RepositoryError> {
        self.modify(id, |lead| {
            lead.anonymize(now);
            Ok(())
        })
    }
}

/// Engine over the configured fiscal tables and policy overrides.
pub(crate) fn load_engine(config: &AppConfig) -> Result<SimulationEngine, AppError> {
    let bareme = match &config.simulation.bareme_path {
        Some(path) => {
            let bareme = BaremeFiscal::from_json_path(path)?;
            info!(path = %path.display(), edition = bareme.edition, "fiscal tables loaded");
            bareme
        }
        None => BaremeFiscal::edition_2026(),
    };
    let flags = PolicyFlags::default().with_overrides(&config.simulation.policy);
    Ok(SimulationEngine::new(bareme, flags))
}

/// Partner roster from the configured CSV export, empty when none is set.
pub(crate) fn load_partners(config: &AppConfig) -> Result<PartnerRoster, AppError> {
    match &config.leads.partners_csv {
        Some(path) => {
            let roster = PartnerRoster::from_csv_path(path)?;
            info!(
                path = %path.display(),
                promoters = roster.promoters.len(),
                brokers = roster.brokers.len(),
                "partner roster loaded"
            );
            Ok(roster)
        }
        None => Ok(PartnerRoster::default()),
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
