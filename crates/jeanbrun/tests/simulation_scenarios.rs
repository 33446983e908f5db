use chrono::NaiveDate;
use proptest::prelude::*;

use jeanbrun::simulation::bareme::BaremeFiscal;
use jeanbrun::simulation::financement::{analyser_endettement, mensualite};
use jeanbrun::simulation::fiscal::taux_marginal;
use jeanbrun::simulation::{
    FinancementInput, MotifIneligibilite, NiveauLoyer, Policy, ReventeInput,
    SimulationCalculInput, SimulationCalculResult, SimulationEngine, TypeBien,
    VerdictFinancement, ZoneFiscale,
};

fn policy() -> Policy {
    Policy::default_at(NaiveDate::from_ymd_opt(2026, 5, 4).expect("valid date"))
}

fn scenario_input() -> SimulationCalculInput {
    SimulationCalculInput {
        revenu_net_imposable: 60_000.0,
        nombre_parts: 2.0,
        type_bien: TypeBien::Neuf,
        prix_acquisition: 250_000.0,
        montant_travaux: 0.0,
        surface: 45.0,
        zone: ZoneFiscale::B1,
        niveau_loyer: NiveauLoyer::Intermediaire,
        financement: None,
        revente: None,
        duree_detention: None,
        comparer_lmnp: false,
    }
}

#[test]
fn new_build_household_lands_in_thirty_percent_bracket() {
    let engine = SimulationEngine::default();
    let outcome = engine.simulate(&scenario_input(), &policy());

    let result = outcome.result().expect("eligible result");
    assert!(result.eligible);
    assert!(result.amortissement_annuel > 0);
    assert_eq!(result.quotient_familial, 30_000);
    assert_eq!(result.tmi, 0.30);
}

#[test]
fn renovation_below_floor_reports_exact_shortfall() {
    let engine = SimulationEngine::default();
    let input = SimulationCalculInput {
        type_bien: TypeBien::Ancien,
        prix_acquisition: 200_000.0,
        montant_travaux: 40_000.0,
        ..scenario_input()
    };

    let outcome = engine.simulate(&input, &policy());
    let reason = outcome.ineligibilite().expect("ineligible");
    assert!(!reason.eligible);
    assert_eq!(reason.motif, MotifIneligibilite::TravauxInsuffisants);
    assert_eq!(reason.montant_manquant, Some(20_000.0));
}

#[test]
fn payment_above_regulatory_maximum_is_difficult() {
    let bareme = BaremeFiscal::edition_2026();
    let analyse = analyser_endettement(1_500.0, 4_000.0, 0.0, 0.0, &bareme.hcsf);
    assert_eq!(analyse.taux, 0.375);
    assert_eq!(analyse.verdict, VerdictFinancement::Difficile);
    assert_eq!(analyse.reste_a_vivre, 2_500.0);
}

#[test]
fn debt_ratio_boundaries_are_inclusive() {
    let bareme = BaremeFiscal::edition_2026();
    let at_recommended = analyser_endettement(1_320.0, 4_000.0, 0.0, 0.0, &bareme.hcsf);
    assert_eq!(at_recommended.verdict, VerdictFinancement::Financable);
    let at_maximum = analyser_endettement(1_400.0, 4_000.0, 0.0, 0.0, &bareme.hcsf);
    assert_eq!(at_maximum.verdict, VerdictFinancement::Tendu);
}

#[test]
fn degenerate_loans_cost_nothing() {
    assert_eq!(mensualite(0.0, 3.5, 20), 0.0);
    assert_eq!(mensualite(200_000.0, 0.0, 20), 0.0);
    assert_eq!(mensualite(200_000.0, 3.5, 0), 0.0);
    assert_eq!(mensualite(-5.0, 3.5, 20), 0.0);
}

#[test]
fn full_result_survives_json_round_trip() {
    let engine = SimulationEngine::default();
    let input = SimulationCalculInput {
        financement: Some(FinancementInput {
            apport: 25_000.0,
            taux_interet: 3.45,
            duree_annees: 22,
            taux_assurance: 0.34,
            revenus_mensuels: Some(5_200.0),
            autres_credits_mensuels: 180.0,
            charges_fixes_mensuelles: 400.0,
        }),
        revente: Some(ReventeInput { prix_revente: None }),
        duree_detention: Some(12),
        comparer_lmnp: true,
        ..scenario_input()
    };

    let outcome = engine.simulate(&input, &policy());
    let result = outcome.result().expect("eligible").clone();
    let encoded = serde_json::to_string(&result).expect("encode");
    let decoded: SimulationCalculResult = serde_json::from_str(&encoded).expect("decode");
    assert_eq!(decoded, result);
}

proptest! {
    #[test]
    fn marginal_rate_never_decreases_with_quotient(a in 0.0..400_000.0f64, b in 0.0..400_000.0f64) {
        let bareme = BaremeFiscal::edition_2026();
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(taux_marginal(&bareme.tranches, low) <= taux_marginal(&bareme.tranches, high));
    }

    #[test]
    fn marginal_rate_is_first_bracket_covering_quotient(quotient in 0.0..400_000.0f64) {
        let bareme = BaremeFiscal::edition_2026();
        let expected = bareme
            .tranches
            .iter()
            .find(|t| t.plafond.map_or(true, |p| quotient <= p))
            .map(|t| t.taux)
            .expect("last bracket is unbounded");
        prop_assert_eq!(taux_marginal(&bareme.tranches, quotient), expected);
    }

    #[test]
    fn payment_matches_closed_form(
        capital in 1_000.0..2_000_000.0f64,
        taux in 0.05..15.0f64,
        annees in 1u32..=30,
    ) {
        let r = taux / 100.0 / 12.0;
        let n = f64::from(annees) * 12.0;
        let expected = capital * r / (1.0 - (1.0 + r).powf(-n));
        let actual = mensualite(capital, taux, annees);
        prop_assert!((actual - expected).abs() <= expected.abs() * 1e-12);
        // the loan is fully repaid: total paid exceeds the capital
        prop_assert!(actual * n >= capital);
    }
}
