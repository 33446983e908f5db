//! Best-effort routing of a persisted lead to partners.
//!
//! Dispatch runs detached from the request that captured the lead. Every step
//! is attempted independently and failures are only logged: there is no queue
//! and no retry, so a lead whose partner notifications all fail stays `new`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::domain::{Lead, LeadId, LeadStatus};
use super::notifications::{
    partner_notification, prospect_confirmation, EmailMessage, EmailSender,
};
use super::partners::{
    select_broker, select_promoter, PartnerDirectory, PartnerId, PartnerKind,
};
use super::repository::LeadRepository;
use crate::simulation::ZoneFiscale;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTarget {
    Promoteur,
    Courtier,
    Prospect,
}

impl From<PartnerKind> for NotificationTarget {
    fn from(kind: PartnerKind) -> Self {
        match kind {
            PartnerKind::Promoteur => NotificationTarget::Promoteur,
            PartnerKind::Courtier => NotificationTarget::Courtier,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum NotificationOutcome {
    Sent,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationReport {
    pub target: NotificationTarget,
    pub partner_id: Option<PartnerId>,
    #[serde(flatten)]
    pub outcome: NotificationOutcome,
}

/// What one dispatch attempt did for one lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    pub lead_id: LeadId,
    pub zone: Option<ZoneFiscale>,
    pub notifications: Vec<NotificationReport>,
    /// Status after the attempt; `None` when the lead could not be loaded.
    pub status: Option<LeadStatus>,
    pub errors: Vec<String>,
}

impl DispatchReport {
    fn new(lead_id: LeadId) -> Self {
        Self {
            lead_id,
            zone: None,
            notifications: Vec::new(),
            status: None,
            errors: Vec::new(),
        }
    }

    pub fn is_dispatched(&self) -> bool {
        self.status == Some(LeadStatus::Dispatched)
    }

    pub fn sent(&self, target: NotificationTarget) -> bool {
        self.notifications
            .iter()
            .any(|n| n.target == target && n.outcome == NotificationOutcome::Sent)
    }

    fn record(
        &mut self,
        target: NotificationTarget,
        partner_id: Option<PartnerId>,
        outcome: NotificationOutcome,
    ) {
        self.notifications.push(NotificationReport {
            target,
            partner_id,
            outcome,
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Base URL used in prospect-facing links.
    pub public_url: String,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            public_url: "https://www.simulateur-loi-jeanbrun.fr".to_string(),
        }
    }
}

struct Matched {
    id: PartnerId,
    name: String,
    email: String,
}

pub struct LeadDispatcher<R, P, E> {
    repository: Arc<R>,
    partners: Arc<P>,
    email: Arc<E>,
    settings: DispatchSettings,
}

impl<R, P, E> LeadDispatcher<R, P, E>
where
    R: LeadRepository + 'static,
    P: PartnerDirectory + 'static,
    E: EmailSender + 'static,
{
    pub fn new(
        repository: Arc<R>,
        partners: Arc<P>,
        email: Arc<E>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            repository,
            partners,
            email,
            settings,
        }
    }

    /// Launch dispatch on the blocking pool and return immediately.
    /// Dropping the handle leaves the task running.
    pub fn spawn(self: &Arc<Self>, lead_id: LeadId) -> JoinHandle<DispatchReport> {
        let dispatcher = Arc::clone(self);
        tokio::task::spawn_blocking(move || dispatcher.dispatch(&lead_id))
    }

    pub fn dispatch(&self, lead_id: &LeadId) -> DispatchReport {
        self.dispatch_at(lead_id, Utc::now())
    }

    pub fn dispatch_at(&self, lead_id: &LeadId, now: DateTime<Utc>) -> DispatchReport {
        let mut report = DispatchReport::new(*lead_id);

        let lead = match self.repository.fetch(lead_id) {
            Ok(Some(lead)) => lead,
            Ok(None) => {
                error!(lead_id = %lead_id, "dispatch skipped: lead not found");
                report.errors.push("lead not found".to_string());
                return report;
            }
            Err(err) => {
                error!(lead_id = %lead_id, error = %err, "dispatch skipped: lead lookup failed");
                report.errors.push(err.to_string());
                return report;
            }
        };

        report.status = Some(lead.status);
        if lead.status != LeadStatus::New || lead.is_anonymized() {
            warn!(lead_id = %lead_id, status = lead.status.label(), "lead already processed");
            return report;
        }

        let zone = lead.zone();
        report.zone = zone;
        if zone.is_none() {
            warn!(lead_id = %lead_id, "lead has no zone; partners cannot be matched");
            report.errors.push("no zone on lead".to_string());
        }

        let promoter = self.notify_partner(&lead, zone, PartnerKind::Promoteur, &mut report);
        let lead = self.reload(lead);
        let broker = self.notify_partner(&lead, zone, PartnerKind::Courtier, &mut report);
        let lead = self.reload(lead);

        match prospect_confirmation(&lead, &self.settings.public_url) {
            Some(message) => {
                let outcome = self.deliver(&lead, &message, NotificationTarget::Prospect);
                report.record(NotificationTarget::Prospect, None, outcome);
            }
            None => report.record(
                NotificationTarget::Prospect,
                None,
                NotificationOutcome::Skipped("no email".to_string()),
            ),
        }

        if promoter.is_some() || broker.is_some() {
            match self
                .repository
                .mark_dispatched(lead_id, promoter, broker, now)
            {
                Ok(stored) => report.status = Some(stored.status),
                Err(err) => {
                    error!(lead_id = %lead_id, error = %err, "failed to mark lead dispatched");
                    report.errors.push(err.to_string());
                }
            }
        } else {
            warn!(lead_id = %lead_id, "no partner notified; lead stays new");
        }

        info!(
            lead_id = %lead_id,
            zone = ?report.zone,
            dispatched = report.is_dispatched(),
            notifications = report.notifications.len(),
            "lead dispatch finished"
        );
        report
    }

    /// Latest stored copy, so consents revoked or contact data cleared while an
    /// email was in flight apply to the next step. Keeps `lead` when the row
    /// cannot be read.
    fn reload(&self, lead: Lead) -> Lead {
        match self.repository.fetch(&lead.id) {
            Ok(Some(current)) => current,
            Ok(None) => lead,
            Err(err) => {
                warn!(lead_id = %lead.id, error = %err, "lead reload failed; using loaded copy");
                lead
            }
        }
    }

    /// Match and notify one partner kind. Returns the partner id when the
    /// email went out.
    fn notify_partner(
        &self,
        lead: &Lead,
        zone: Option<ZoneFiscale>,
        kind: PartnerKind,
        report: &mut DispatchReport,
    ) -> Option<PartnerId> {
        let target = NotificationTarget::from(kind);
        let consented = match kind {
            PartnerKind::Promoteur => lead.consents.promoteur,
            PartnerKind::Courtier => lead.consents.courtier,
        };
        if !consented {
            report.record(target, None, NotificationOutcome::Skipped("no consent".into()));
            return None;
        }
        let Some(zone) = zone else {
            report.record(target, None, NotificationOutcome::Skipped("no zone".into()));
            return None;
        };

        let matched = match self.find_partner(lead, zone, kind) {
            Ok(Some(matched)) => matched,
            Ok(None) => {
                info!(lead_id = %lead.id, zone = %zone, kind = kind.label(), "no partner serves zone");
                report.record(target, None, NotificationOutcome::Skipped("no partner".into()));
                return None;
            }
            Err(message) => {
                error!(lead_id = %lead.id, kind = kind.label(), error = %message, "partner lookup failed");
                report.errors.push(message.clone());
                report.record(target, None, NotificationOutcome::Failed(message));
                return None;
            }
        };

        let message = partner_notification(lead, kind, &matched.name, &matched.email);
        let outcome = self.deliver(lead, &message, target);
        let sent = outcome == NotificationOutcome::Sent;
        report.record(target, Some(matched.id.clone()), outcome);
        sent.then_some(matched.id)
    }

    fn find_partner(
        &self,
        lead: &Lead,
        zone: ZoneFiscale,
        kind: PartnerKind,
    ) -> Result<Option<Matched>, String> {
        match kind {
            PartnerKind::Promoteur => {
                let promoters = self.partners.promoters(zone).map_err(|e| e.to_string())?;
                Ok(
                    select_promoter(&promoters, zone, lead.platform).map(|p| Matched {
                        id: p.id.clone(),
                        name: p.name.clone(),
                        email: p.email.clone(),
                    }),
                )
            }
            PartnerKind::Courtier => {
                let brokers = self.partners.brokers(zone).map_err(|e| e.to_string())?;
                Ok(select_broker(&brokers, zone).map(|b| Matched {
                    id: b.id.clone(),
                    name: b.name.clone(),
                    email: b.email.clone(),
                }))
            }
        }
    }

    fn deliver(
        &self,
        lead: &Lead,
        message: &EmailMessage,
        target: NotificationTarget,
    ) -> NotificationOutcome {
        match self.email.send(message) {
            Ok(()) => NotificationOutcome::Sent,
            Err(err) => {
                error!(
                    lead_id = %lead.id,
                    target = ?target,
                    error = %err,
                    "notification email failed"
                );
                NotificationOutcome::Failed(err.to_string())
            }
        }
    }
}
