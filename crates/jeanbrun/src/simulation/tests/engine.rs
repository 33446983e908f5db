use chrono::NaiveDate;

use super::common::*;
use crate::simulation::domain::{
    MotifIneligibilite, RegimeFiscal, ReventeInput, SimulationOutcome, DUREE_DETENTION_MAX,
};
use crate::simulation::policy::{Policy, PolicyFlags, PolicyOverrides};
use crate::simulation::SimulationEngine;

#[test]
fn new_build_in_b1_is_eligible_at_thirty_percent_bracket() {
    let engine = SimulationEngine::default();
    let outcome = engine.simulate(&neuf_b1(), &policy());
    let result = outcome.result().expect("eligible");

    assert!(result.eligible);
    assert_eq!(result.quotient_familial, 30_000);
    assert_eq!(result.tmi, 0.30);
    // 250 000 × 80 % × 3.5 % stays under the 8 000 € cap.
    assert_eq!(result.base_amortissable, 200_000);
    assert_eq!(result.amortissement_annuel, 7_000);
    assert_eq!(result.loyer_mensuel, 509);
    assert_eq!(result.loyer_annuel, 6_108);
    assert_eq!(result.duree_projection, 9);
    assert_eq!(result.projection.len(), 9);
    assert!(result.impot_apres <= result.impot_avant);
    assert!(result.economie_impot_totale > 0);
    assert!(result.financement.is_none());
    assert!(result.comparaison.is_none());
    assert_eq!(result.version_politique, "2026.1");
}

#[test]
fn existing_property_below_works_floor_reports_shortfall() {
    let engine = SimulationEngine::default();
    let outcome = engine.simulate(&ancien_sous_travaux(), &policy());

    let reason = outcome.ineligibilite().expect("ineligible");
    assert!(!reason.eligible);
    assert_eq!(reason.motif, MotifIneligibilite::TravauxInsuffisants);
    assert_eq!(reason.montant_manquant, Some(20_000.0));
    assert!(reason.message.contains("20 000 €"));
}

#[test]
fn existing_property_with_enough_works_uses_total_cost() {
    let engine = SimulationEngine::default();
    let mut input = ancien_sous_travaux();
    input.montant_travaux = 60_000.0;

    let outcome = engine.simulate(&input, &policy());
    let result = outcome.result().expect("eligible");
    assert_eq!(result.base_amortissable, 208_000);
    assert_eq!(result.amortissement_annuel, 7_280);
}

#[test]
fn simulation_outside_scheme_window_is_ineligible() {
    let engine = SimulationEngine::default();
    let late = Policy::default_at(NaiveDate::from_ymd_opt(2029, 2, 1).expect("date"));

    let outcome = engine.simulate(&neuf_b1(), &late);
    assert!(matches!(
        outcome,
        SimulationOutcome::Ineligible(ref reason) if reason.motif == MotifIneligibilite::HorsPeriode
    ));
}

#[test]
fn financing_analysis_is_attached_when_loan_is_provided() {
    let engine = SimulationEngine::default();
    let mut input = neuf_b1();
    input.financement = Some(credit());

    let outcome = engine.simulate(&input, &policy());
    let result = outcome.result().expect("eligible");
    let financement = result.financement.as_ref().expect("financing");

    assert_eq!(financement.montant_emprunte, 230_000);
    assert!(financement.mensualite_credit > 1_300);
    assert!(financement.taux_endettement > 0.0);
    assert!(result.projection[0].interets > 0);
    assert!(result.projection[0].capital_restant_du < 230_000);
    assert!(result.cashflow_mensuel < 0);
}

#[test]
fn regime_comparison_lists_three_regimes() {
    let engine = SimulationEngine::default();
    let mut input = neuf_b1();
    input.comparer_lmnp = true;

    let outcome = engine.simulate(&input, &policy());
    let comparaison = outcome
        .result()
        .and_then(|result| result.comparaison.clone())
        .expect("comparison");

    let regimes: Vec<RegimeFiscal> = comparaison.regimes.iter().map(|s| s.regime).collect();
    assert_eq!(
        regimes,
        vec![
            RegimeFiscal::Jeanbrun,
            RegimeFiscal::LmnpMicroBic,
            RegimeFiscal::LmnpReel
        ]
    );
    let best = comparaison
        .regimes
        .iter()
        .map(|s| s.cashflow_total)
        .max()
        .expect("regimes");
    let winner = comparaison
        .regimes
        .iter()
        .find(|s| s.regime == comparaison.meilleur)
        .expect("winner listed");
    assert_eq!(winner.cashflow_total, best);
}

#[test]
fn resale_reintegrates_depreciation_under_default_policy() {
    let engine = SimulationEngine::default();
    let mut input = neuf_b1();
    input.revente = Some(ReventeInput {
        prix_revente: Some(300_000.0),
    });

    let outcome = engine.simulate(&input, &policy());
    let result = outcome.result().expect("eligible");
    let plus_value = result.plus_value.as_ref().expect("capital gain");
    let cumulated: i64 = result.projection.iter().map(|l| l.amortissement).sum();

    assert_eq!(plus_value.duree_detention, 9);
    assert_eq!(plus_value.amortissements_reintegres, cumulated);
    assert!(plus_value.plus_value_brute > 0);
    assert!(!plus_value.exoneration_totale_ir);
}

#[test]
fn doubled_deficit_ceiling_follows_as_of_date_and_overrides() {
    let engine = SimulationEngine::default();
    let bareme = engine.bareme();

    let during = policy();
    assert_eq!(during.plafond_deficit(bareme), 21_400.0);

    let after = Policy::default_at(NaiveDate::from_ymd_opt(2028, 3, 1).expect("date"));
    assert_eq!(after.plafond_deficit(bareme), 10_700.0);

    let disabled = Policy::new(
        PolicyFlags::default().with_overrides(&PolicyOverrides {
            deficit_double_jusqu_au: Some(None),
            ..PolicyOverrides::default()
        }),
        as_of(),
    );
    assert_eq!(disabled.plafond_deficit(bareme), 10_700.0);
    assert_ne!(disabled.version, during.version);
}

#[test]
fn identical_inputs_give_identical_results() {
    let engine = SimulationEngine::default();
    let mut input = neuf_b1();
    input.financement = Some(credit());
    input.comparer_lmnp = true;

    assert_eq!(
        engine.simulate(&input, &policy()),
        engine.simulate(&input, &policy())
    );
}

#[test]
fn holding_period_is_capped_for_unvalidated_callers() {
    let engine = SimulationEngine::default();
    let mut input = neuf_b1();
    input.duree_detention = Some(u32::MAX);

    let outcome = engine.simulate(&input, &policy());
    let result = outcome.result().expect("eligible");

    assert_eq!(result.duree_projection, DUREE_DETENTION_MAX);
    assert_eq!(result.projection.len(), DUREE_DETENTION_MAX as usize);
}
