//! Loi Jeanbrun tax simulation: eligibility, amortization, financing,
//! multi-year projection and regime comparison.
//!
//! Every computation is pure. Fiscal tables (`BaremeFiscal`) are injected
//! into the engine and the date-dependent rule switches (`Policy`) are passed
//! with each call.

pub mod amortissement;
pub mod bareme;
mod comparaison;
pub mod domain;
pub mod engine;
pub mod financement;
pub mod fiscal;
pub mod plus_value;
pub mod policy;
mod projection;
pub mod router;

#[cfg(test)]
mod tests;

pub use bareme::{BaremeError, BaremeFiscal};
pub use domain::{
    format_euros, AnalyseFinancement, ComparaisonRegimes, FinancementInput, Ineligibilite,
    MotifIneligibilite, NiveauLoyer, PlusValueResult, ProjectionAnnuelle, RegimeFiscal,
    ReventeInput, SimulationCalculInput, SimulationCalculResult, SimulationOutcome,
    SyntheseRegime, TypeBien, VerdictFinancement, ZoneFiscale,
};
pub use engine::SimulationEngine;
pub use policy::{Policy, PolicyFlags, PolicyOverrides};
pub use router::{simulation_router, SimulationRequest};
