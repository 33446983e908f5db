//! Lead capture, scoring and best-effort dispatch to partners, plus the
//! consent and retention operations over stored leads.

pub mod dispatch;
pub mod domain;
pub mod notifications;
pub mod partners;
pub mod repository;
pub mod retention;
pub mod router;
pub mod scoring;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use dispatch::{
    DispatchReport, DispatchSettings, LeadDispatcher, NotificationOutcome, NotificationTarget,
};
pub use domain::{
    ConsentScope, Consents, Contact, InvalidTransition, Lead, LeadId, LeadStatus,
    LeadSubmission, Platform, Projet, Utm,
};
pub use notifications::{EmailError, EmailMessage, EmailSender};
pub use partners::{
    BrokerData, PartnerDirectory, PartnerId, PartnerImportError, PartnerKind, PartnerLookupError,
    PartnerRoster, PricingModel, PromoterData,
};
pub use repository::{LeadRepository, RepositoryError};
pub use retention::{RetentionPolicy, RetentionReport, RetentionService, UnsubscribeError};
pub use router::lead_router;
pub use scoring::{score, LeadScore, LeadSignals};
pub use service::{LeadCapture, LeadCaptureError, LeadCaptureService};
pub use validation::LeadValidationError;
