use chrono::{DateTime, Utc};

use super::domain::{ConsentScope, InvalidTransition, Lead, LeadId};
use super::partners::PartnerId;

/// Data-access collaborator for leads.
///
/// Writes after insert are narrow: each one applies a single domain change to
/// the row as stored at write time, so concurrent dispatch, unsubscribe and
/// retention never overwrite each other's fields.
pub trait LeadRepository: Send + Sync {
    fn insert(&self, lead: Lead) -> Result<Lead, RepositoryError>;
    fn fetch(&self, id: &LeadId) -> Result<Option<Lead>, RepositoryError>;
    fn find_by_unsubscribe_token(&self, token: &str) -> Result<Option<Lead>, RepositoryError>;
    /// Leads created strictly before `cutoff`, anonymized ones included.
    fn created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Lead>, RepositoryError>;
    /// [`Lead::mark_dispatched`] on the stored row.
    fn mark_dispatched(
        &self,
        id: &LeadId,
        promoter_id: Option<PartnerId>,
        broker_id: Option<PartnerId>,
        now: DateTime<Utc>,
    ) -> Result<Lead, RepositoryError>;
    /// [`Lead::revoke`] on the stored row.
    fn revoke_consents(
        &self,
        id: &LeadId,
        scope: ConsentScope,
        now: DateTime<Utc>,
    ) -> Result<Lead, RepositoryError>;
    /// [`Lead::anonymize`] on the stored row.
    fn anonymize(&self, id: &LeadId, now: DateTime<Utc>) -> Result<Lead, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("lead already exists")]
    Conflict,
    #[error("lead not found")]
    NotFound,
    #[error(transparent)]
    Transition(#[from] InvalidTransition),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
