//! Weighted lead quality score. Used for prioritization only: every lead is
//! dispatched whatever its score.

use serde::{Deserialize, Serialize};

use super::domain::Lead;

const WEIGHT_COMPLETENESS: f64 = 0.25;
const WEIGHT_FINANCIAL: f64 = 0.30;
const WEIGHT_MATURITY: f64 = 0.25;
const WEIGHT_ENGAGEMENT: f64 = 0.20;

/// Boolean and numeric facts the score is computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LeadSignals {
    pub has_email: bool,
    pub has_phone: bool,
    pub has_name: bool,
    pub has_simulation: bool,
    pub montant_investissement: Option<f64>,
    pub revenus_mensuels: Option<f64>,
    pub apport: Option<f64>,
    pub consent_promoteur: bool,
    pub consent_courtier: bool,
}

impl LeadSignals {
    pub fn from_lead(lead: &Lead) -> Self {
        Self {
            has_email: lead.contact.has_email(),
            has_phone: lead.contact.has_phone(),
            has_name: lead.contact.has_name(),
            has_simulation: lead.simulation.is_some(),
            montant_investissement: lead.projet.montant_investissement,
            revenus_mensuels: lead.projet.revenus_mensuels,
            apport: lead.projet.apport,
            consent_promoteur: lead.consents.promoteur,
            consent_courtier: lead.consents.courtier,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadScore {
    pub completeness: u8,
    pub financial_capacity: u8,
    pub project_maturity: u8,
    pub engagement: u8,
    pub total: u8,
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|amount| amount.is_finite() && *amount > 0.0)
}

fn capped(points: u32) -> u8 {
    points.min(100) as u8
}

fn completeness(signals: &LeadSignals) -> u8 {
    let mut points = 0;
    if signals.has_email {
        points += 30;
    }
    if signals.has_phone {
        points += 30;
    }
    if signals.has_name {
        points += 20;
    }
    if signals.has_simulation {
        points += 20;
    }
    capped(points)
}

fn financial_capacity(signals: &LeadSignals) -> u8 {
    let mut points = 0;
    match positive(signals.montant_investissement) {
        Some(montant) if montant > 100_000.0 => points += 40,
        Some(montant) if montant > 50_000.0 => points += 20,
        _ => {}
    }
    match positive(signals.revenus_mensuels) {
        Some(revenus) if revenus > 4_000.0 => points += 40,
        Some(revenus) if revenus > 2_500.0 => points += 20,
        _ => {}
    }
    if positive(signals.apport).is_some() {
        points += 20;
    }
    capped(points)
}

fn project_maturity(signals: &LeadSignals) -> u8 {
    let mut points = 0;
    if signals.has_simulation {
        points += 60;
    }
    if positive(signals.montant_investissement).is_some() {
        points += 20;
    }
    if positive(signals.apport).is_some() {
        points += 20;
    }
    capped(points)
}

fn engagement(signals: &LeadSignals) -> u8 {
    let mut points = 0;
    if signals.consent_promoteur {
        points += 40;
    }
    if signals.consent_courtier {
        points += 40;
    }
    if signals.has_phone {
        points += 20;
    }
    capped(points)
}

pub fn score(signals: &LeadSignals) -> LeadScore {
    let completeness = completeness(signals);
    let financial_capacity = financial_capacity(signals);
    let project_maturity = project_maturity(signals);
    let engagement = engagement(signals);

    let weighted = WEIGHT_COMPLETENESS * f64::from(completeness)
        + WEIGHT_FINANCIAL * f64::from(financial_capacity)
        + WEIGHT_MATURITY * f64::from(project_maturity)
        + WEIGHT_ENGAGEMENT * f64::from(engagement);

    LeadScore {
        completeness,
        financial_capacity,
        project_maturity,
        engagement,
        total: weighted.round().clamp(0.0, 100.0) as u8,
    }
}
