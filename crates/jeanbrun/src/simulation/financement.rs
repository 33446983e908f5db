use serde::{Deserialize, Serialize};

use super::bareme::SeuilsHcsf;
use super::domain::{AnalyseFinancement, FinancementInput, VerdictFinancement};

/// Monthly payment of an amortizing loan: `C·r / (1 − (1 + r)^−n)`.
///
/// `taux_annuel` is a percentage. Non-positive capital, rate or duration
/// yield a zero payment.
pub fn mensualite(capital: f64, taux_annuel: f64, duree_annees: u32) -> f64 {
    if !(capital > 0.0) || !(taux_annuel > 0.0) || duree_annees == 0 {
        return 0.0;
    }
    if !capital.is_finite() || !taux_annuel.is_finite() {
        return 0.0;
    }
    let r = taux_annuel / 100.0 / 12.0;
    let n = f64::from(duree_annees) * 12.0;
    capital * r / (1.0 - (1.0 + r).powf(-n))
}

pub fn mensualite_assurance(capital: f64, taux_assurance: f64) -> f64 {
    if !(capital > 0.0) || !(taux_assurance > 0.0) {
        return 0.0;
    }
    capital * taux_assurance / 100.0 / 12.0
}

/// Yearly aggregate of the monthly amortization table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcheanceAnnuelle {
    pub annee: u32,
    pub interets: f64,
    pub capital_rembourse: f64,
    pub assurance: f64,
    pub mensualites: f64,
    pub capital_restant_du: f64,
}

pub fn echeancier(
    capital: f64,
    taux_annuel: f64,
    duree_annees: u32,
    taux_assurance: f64,
) -> Vec<EcheanceAnnuelle> {
    let paiement = mensualite(capital, taux_annuel, duree_annees);
    if paiement == 0.0 {
        return Vec::new();
    }

    let r = taux_annuel / 100.0 / 12.0;
    let assurance_mensuelle = mensualite_assurance(capital, taux_assurance);
    let mut restant = capital;
    let mut lignes = Vec::with_capacity(duree_annees as usize);

    for annee in 1..=duree_annees {
        let mut interets = 0.0;
        let mut rembourse = 0.0;
        for _ in 0..12 {
            let interet = restant * r;
            let principal = (paiement - interet).min(restant);
            interets += interet;
            rembourse += principal;
            restant -= principal;
        }
        if annee == duree_annees {
            restant = 0.0;
        }
        lignes.push(EcheanceAnnuelle {
            annee,
            interets,
            capital_rembourse: rembourse,
            assurance: assurance_mensuelle * 12.0,
            mensualites: paiement * 12.0,
            capital_restant_du: restant.max(0.0),
        });
    }

    lignes
}

pub fn verdict(taux_endettement: f64, seuils: &SeuilsHcsf) -> VerdictFinancement {
    if taux_endettement <= seuils.recommande {
        VerdictFinancement::Financable
    } else if taux_endettement <= seuils.maximum {
        VerdictFinancement::Tendu
    } else {
        VerdictFinancement::Difficile
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Endettement {
    pub taux: f64,
    pub verdict: VerdictFinancement,
    pub confortable: bool,
    pub reste_a_vivre: f64,
}

/// Debt ratio of a household: (new payment + existing credit) / net monthly income.
pub fn analyser_endettement(
    mensualite: f64,
    revenus_mensuels: f64,
    autres_credits: f64,
    charges_fixes: f64,
    seuils: &SeuilsHcsf,
) -> Endettement {
    let dettes = mensualite.max(0.0) + autres_credits.max(0.0);
    let taux = if revenus_mensuels > 0.0 {
        dettes / revenus_mensuels
    } else if dettes > 0.0 {
        1.0
    } else {
        0.0
    };
    let verdict = if revenus_mensuels > 0.0 || dettes == 0.0 {
        verdict(taux, seuils)
    } else {
        VerdictFinancement::Difficile
    };

    Endettement {
        taux,
        verdict,
        confortable: verdict == VerdictFinancement::Financable && taux <= seuils.confortable,
        reste_a_vivre: revenus_mensuels - dettes - charges_fixes.max(0.0),
    }
}

pub fn montant_emprunte(cout_operation: f64, financement: &FinancementInput) -> f64 {
    (cout_operation - financement.apport.max(0.0)).max(0.0)
}

pub fn analyser(
    cout_operation: f64,
    revenu_annuel: f64,
    financement: &FinancementInput,
    seuils: &SeuilsHcsf,
) -> AnalyseFinancement {
    let capital = montant_emprunte(cout_operation, financement);
    let credit = mensualite(capital, financement.taux_interet, financement.duree_annees);
    let assurance = if credit > 0.0 {
        mensualite_assurance(capital, financement.taux_assurance)
    } else {
        0.0
    };
    let totale = credit + assurance;
    let revenus = financement
        .revenus_mensuels
        .unwrap_or(revenu_annuel / 12.0)
        .max(0.0);

    let endettement = analyser_endettement(
        totale,
        revenus,
        financement.autres_credits_mensuels,
        financement.charges_fixes_mensuelles,
        seuils,
    );

    let nombre_mois = f64::from(financement.duree_annees) * 12.0;
    let cout_total = if credit > 0.0 {
        totale * nombre_mois - capital
    } else {
        0.0
    };

    AnalyseFinancement {
        montant_emprunte: euros(capital),
        mensualite_credit: euros(credit),
        mensualite_assurance: euros(assurance),
        mensualite_totale: euros(totale),
        revenus_mensuels: euros(revenus),
        taux_endettement: arrondi(endettement.taux, 4),
        verdict: endettement.verdict,
        confortable: endettement.confortable,
        reste_a_vivre: euros(endettement.reste_a_vivre),
        cout_total_credit: euros(cout_total),
    }
}

pub(crate) fn euros(amount: f64) -> i64 {
    if amount.is_finite() {
        amount.round() as i64
    } else {
        0
    }
}

pub(crate) fn arrondi(value: f64, decimales: i32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let facteur = 10f64.powi(decimales);
    (value * facteur).round() / facteur
}
