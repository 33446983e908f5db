use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::partners::PartnerId;
use crate::simulation::{SimulationCalculInput, ZoneFiscale};

/// Identifier wrapper for captured leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadId(pub Uuid);

impl LeadId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for LeadId {
    type Err = uuid::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(raw.trim()).map(Self)
    }
}

/// Marketing site the lead came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "jeanbrun")]
    Jeanbrun,
    #[serde(rename = "stop-loyer", alias = "stop_loyer")]
    StopLoyer,
}

impl Platform {
    pub fn label(&self) -> &'static str {
        match self {
            Platform::Jeanbrun => "jeanbrun",
            Platform::StopLoyer => "stop-loyer",
        }
    }

    pub fn site_name(&self) -> &'static str {
        match self {
            Platform::Jeanbrun => "Simulateur Loi Jeanbrun",
            Platform::StopLoyer => "Stop Loyer",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "jeanbrun" => Ok(Platform::Jeanbrun),
            "stop-loyer" | "stop_loyer" | "stoployer" => Ok(Platform::StopLoyer),
            other => Err(format!("unknown platform '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    New,
    Dispatched,
    Contacted,
    Converted,
    Lost,
}

impl LeadStatus {
    pub fn label(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Dispatched => "dispatched",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Converted => "converted",
            LeadStatus::Lost => "lost",
        }
    }

    pub fn can_transition_to(&self, next: LeadStatus) -> bool {
        use LeadStatus::*;
        matches!(
            (self, next),
            (New, Dispatched)
                | (New, Lost)
                | (Dispatched, Contacted)
                | (Dispatched, Lost)
                | (Contacted, Converted)
                | (Contacted, Lost)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LeadStatus::Converted | LeadStatus::Lost)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("lead cannot move from {from} to {to}")]
pub struct InvalidTransition {
    pub from: &'static str,
    pub to: &'static str,
}

/// Personal data. Every field is nullable so retention can clear it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub telephone: Option<String>,
    #[serde(default)]
    pub prenom: Option<String>,
    #[serde(default)]
    pub nom: Option<String>,
}

fn filled(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

impl Contact {
    pub fn has_email(&self) -> bool {
        filled(&self.email)
    }

    pub fn has_phone(&self) -> bool {
        filled(&self.telephone)
    }

    pub fn has_name(&self) -> bool {
        filled(&self.prenom) || filled(&self.nom)
    }

    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.prenom.as_deref(), self.nom.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();
        parts.join(" ")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consents {
    #[serde(default)]
    pub promoteur: bool,
    #[serde(default)]
    pub courtier: bool,
    #[serde(default)]
    pub newsletter: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentScope {
    Promoteur,
    Courtier,
    Newsletter,
    Tout,
}

impl Consents {
    pub fn revoke(&mut self, scope: ConsentScope) {
        match scope {
            ConsentScope::Promoteur => self.promoteur = false,
            ConsentScope::Courtier => self.courtier = false,
            ConsentScope::Newsletter => self.newsletter = false,
            ConsentScope::Tout => *self = Consents::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Utm {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub medium: Option<String>,
    #[serde(default)]
    pub campaign: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub term: Option<String>,
}

/// Financial signals declared on the form, used for scoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Projet {
    pub montant_investissement: Option<f64>,
    pub revenus_mensuels: Option<f64>,
    pub apport: Option<f64>,
    pub zone: Option<ZoneFiscale>,
}

/// Persisted lead. Never deleted, only anonymized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: LeadId,
    pub platform: Platform,
    pub contact: Contact,
    pub consents: Consents,
    pub projet: Projet,
    /// `{input, result}` captured at submission time.
    pub simulation: Option<Value>,
    pub score: u8,
    pub status: LeadStatus,
    pub utm: Utm,
    pub unsubscribe_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub anonymized_at: Option<DateTime<Utc>>,
    pub promoter_id: Option<PartnerId>,
    pub broker_id: Option<PartnerId>,
}

impl Lead {
    /// Target zone: the simulated property first, then the declared project.
    pub fn zone(&self) -> Option<ZoneFiscale> {
        let from_snapshot = self.simulation.as_ref().and_then(|snapshot| {
            ["/input/zone", "/zone"]
                .iter()
                .find_map(|pointer| snapshot.pointer(pointer).and_then(Value::as_str))
                .and_then(|raw| raw.parse().ok())
        });
        from_snapshot.or(self.projet.zone)
    }

    pub fn transition(
        &mut self,
        next: LeadStatus,
        now: DateTime<Utc>,
    ) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status.label(),
                to: next.label(),
            });
        }
        self.status = next;
        self.updated_at = now;
        if next == LeadStatus::Dispatched {
            self.dispatched_at = Some(now);
        }
        Ok(())
    }

    /// Move a `new` lead to `dispatched` and record the partners that were
    /// notified. Contact and consents are left as they are.
    pub fn mark_dispatched(
        &mut self,
        promoter_id: Option<PartnerId>,
        broker_id: Option<PartnerId>,
        now: DateTime<Utc>,
    ) -> Result<(), InvalidTransition> {
        self.transition(LeadStatus::Dispatched, now)?;
        self.promoter_id = promoter_id;
        self.broker_id = broker_id;
        Ok(())
    }

    pub fn revoke(&mut self, scope: ConsentScope, now: DateTime<Utc>) {
        self.consents.revoke(scope);
        self.updated_at = now;
    }

    /// Null every personal field and every consent; the row itself stays.
    pub fn anonymize(&mut self, now: DateTime<Utc>) {
        self.contact = Contact::default();
        self.consents = Consents::default();
        self.anonymized_at = Some(now);
        self.updated_at = now;
    }

    pub fn is_anonymized(&self) -> bool {
        self.anonymized_at.is_some()
    }
}

/// Form payload accepted by the capture endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadSubmission {
    #[serde(flatten)]
    pub contact: Contact,
    #[serde(default)]
    pub consents: Consents,
    #[serde(flatten)]
    pub projet: Projet,
    #[serde(default)]
    pub utm: Utm,
    /// Simulation to run and snapshot with the lead.
    #[serde(default)]
    pub simulation: Option<SimulationCalculInput>,
    #[serde(default)]
    pub date_simulation: Option<NaiveDate>,
}
