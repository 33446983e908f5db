//! Loi Jeanbrun tax simulation engine and lead pipeline.
//!
//! `simulation` turns a household and property description into an
//! amortization-based tax projection. `leads` scores captured prospects,
//! stores them and dispatches them to partner promoters and brokers.

pub mod config;
pub mod error;
pub mod leads;
pub mod simulation;
pub mod telemetry;
pub mod validation;
