//! Income tax helpers: quotient familial, marginal bracket and progressive tax.

use super::bareme::{BaremeFiscal, TrancheImpot};

pub fn quotient_familial(revenu: f64, parts: f64) -> f64 {
    if !(parts > 0.0) || !revenu.is_finite() {
        return 0.0;
    }
    revenu.max(0.0) / parts
}

/// Rate of the first bracket whose upper bound is at or above `quotient`.
pub fn taux_marginal(tranches: &[TrancheImpot], quotient: f64) -> f64 {
    tranches
        .iter()
        .find(|tranche| tranche.plafond.map_or(true, |plafond| quotient <= plafond))
        .map(|tranche| tranche.taux)
        .unwrap_or(0.0)
}

pub fn tmi(bareme: &BaremeFiscal, revenu: f64, parts: f64) -> f64 {
    taux_marginal(&bareme.tranches, quotient_familial(revenu, parts))
}

/// Progressive tax on a single part.
pub fn impot_par_part(tranches: &[TrancheImpot], quotient: f64) -> f64 {
    let mut impot = 0.0;
    let mut plancher = 0.0;
    for tranche in tranches {
        if quotient <= plancher {
            break;
        }
        let plafond = tranche.plafond.unwrap_or(f64::INFINITY);
        let assiette = quotient.min(plafond) - plancher;
        impot += assiette * tranche.taux;
        plancher = plafond;
    }
    impot
}

/// Household income tax: tax on one part multiplied by the number of parts.
pub fn impot_revenu(bareme: &BaremeFiscal, revenu: f64, parts: f64) -> f64 {
    if !(parts > 0.0) {
        return 0.0;
    }
    impot_par_part(&bareme.tranches, quotient_familial(revenu, parts)) * parts
}
