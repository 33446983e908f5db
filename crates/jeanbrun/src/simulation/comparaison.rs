use super::domain::{ComparaisonRegimes, ProjectionAnnuelle, RegimeFiscal, SyntheseRegime};
use super::financement::euros;
use super::projection::{projeter, Hypotheses};

fn synthese(
    regime: RegimeFiscal,
    lignes: &[ProjectionAnnuelle],
    impot_reference: i64,
) -> SyntheseRegime {
    let impot_supplementaire_total = lignes
        .iter()
        .map(|ligne| ligne.impot_avec_dispositif - impot_reference)
        .sum();
    let cashflow_total: i64 = lignes.iter().map(|ligne| ligne.cashflow).sum();
    let mois = (lignes.len() as i64 * 12).max(1);

    SyntheseRegime {
        regime,
        impot_supplementaire_total,
        cashflow_total,
        economie_impot_totale: lignes.last().map_or(0, |ligne| ligne.economie_cumulee),
        cashflow_mensuel_moyen: (cashflow_total as f64 / mois as f64).round() as i64,
    }
}

/// Run the same property through the furnished-rental regimes and rank them
/// by total cashflow. Ties keep the declaration order, Jeanbrun first.
pub(crate) fn comparer(
    hypotheses: &Hypotheses<'_>,
    jeanbrun: &[ProjectionAnnuelle],
) -> ComparaisonRegimes {
    let impot_reference = euros(hypotheses.impot_reference());

    let mut regimes = vec![synthese(RegimeFiscal::Jeanbrun, jeanbrun, impot_reference)];
    for regime in [RegimeFiscal::LmnpMicroBic, RegimeFiscal::LmnpReel] {
        let lignes = projeter(hypotheses, regime);
        regimes.push(synthese(regime, &lignes, impot_reference));
    }

    let mut meilleur = &regimes[0];
    for candidat in &regimes[1..] {
        if candidat.cashflow_total > meilleur.cashflow_total {
            meilleur = candidat;
        }
    }
    let meilleure_alternative = regimes[1..]
        .iter()
        .map(|synthese| synthese.cashflow_total)
        .max()
        .unwrap_or(regimes[0].cashflow_total);

    ComparaisonRegimes {
        meilleur: meilleur.regime,
        avantage_jeanbrun: regimes[0].cashflow_total - meilleure_alternative,
        regimes,
    }
}
