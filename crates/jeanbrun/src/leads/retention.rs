use std::sync::Arc;

use chrono::{DateTime, Months, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{ConsentScope, Lead, LeadId};
use super::repository::{LeadRepository, RepositoryError};

pub const DEFAULT_RETENTION_MONTHS: u32 = 36;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub months: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            months: DEFAULT_RETENTION_MONTHS,
        }
    }
}

impl RetentionPolicy {
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_months(Months::new(self.months))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionReport {
    pub examined: usize,
    pub anonymized: Vec<LeadId>,
    pub failed: Vec<LeadId>,
}

#[derive(Debug, thiserror::Error)]
pub enum UnsubscribeError {
    #[error("unknown unsubscribe token")]
    UnknownToken,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Consent revocation and PII retention over the lead store.
pub struct RetentionService<R> {
    repository: Arc<R>,
    policy: RetentionPolicy,
}

impl<R> RetentionService<R>
where
    R: LeadRepository + 'static,
{
    pub fn new(repository: Arc<R>, policy: RetentionPolicy) -> Self {
        Self { repository, policy }
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    pub fn revoke_consents(
        &self,
        token: &str,
        scope: ConsentScope,
    ) -> Result<Lead, UnsubscribeError> {
        self.revoke_consents_at(token, scope, Utc::now())
    }

    pub fn revoke_consents_at(
        &self,
        token: &str,
        scope: ConsentScope,
        now: DateTime<Utc>,
    ) -> Result<Lead, UnsubscribeError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(UnsubscribeError::UnknownToken);
        }
        let found = self
            .repository
            .find_by_unsubscribe_token(token)?
            .ok_or(UnsubscribeError::UnknownToken)?;

        let lead = match self.repository.revoke_consents(&found.id, scope, now) {
            Err(RepositoryError::NotFound) => return Err(UnsubscribeError::UnknownToken),
            other => other?,
        };
        info!(lead_id = %lead.id, scope = ?scope, "consents revoked");
        Ok(lead)
    }

    /// Anonymize every lead older than the retention window. A failing row is
    /// logged and reported; the sweep carries on.
    pub fn anonymize_expired(&self, now: DateTime<Utc>) -> Result<RetentionReport, RepositoryError> {
        let cutoff = self.policy.cutoff(now);
        let candidates = self.repository.created_before(cutoff)?;
        let mut report = RetentionReport {
            examined: candidates.len(),
            ..RetentionReport::default()
        };

        for lead in candidates.iter().filter(|lead| !lead.is_anonymized()) {
            let id = lead.id;
            match self.repository.anonymize(&id, now) {
                Ok(_) => report.anonymized.push(id),
                Err(err) => {
                    warn!(lead_id = %id, error = %err, "failed to anonymize lead");
                    report.failed.push(id);
                }
            }
        }

        info!(
            cutoff = %cutoff,
            examined = report.examined,
            anonymized = report.anonymized.len(),
            "retention sweep finished"
        );
        Ok(report)
    }
}
