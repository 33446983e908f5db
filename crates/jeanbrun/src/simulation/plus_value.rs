use super::bareme::BaremeFiscal;
use super::domain::PlusValueResult;
use super::financement::{arrondi, euros};
use super::policy::Policy;

/// Income-tax allowance: 6 % per year held beyond the fifth, full exemption
/// once `annees_exoneration` is reached.
pub fn abattement_ir(annees: u32, annees_exoneration: u32) -> f64 {
    if annees >= annees_exoneration {
        return 1.0;
    }
    if annees <= 5 {
        return 0.0;
    }
    (f64::from(annees - 5) * 0.06).min(1.0)
}

/// Social-levy allowance: 1.65 %/year (6–21), 1.60 % the 22nd year, 9 %/year after.
pub fn abattement_ps(annees: u32) -> f64 {
    match annees {
        0..=5 => 0.0,
        6..=21 => f64::from(annees - 5) * 0.0165,
        22 => 16.0 * 0.0165 + 0.016,
        23..=29 => 16.0 * 0.0165 + 0.016 + f64::from(annees - 22) * 0.09,
        _ => 1.0,
    }
}

pub(crate) struct Cession {
    pub prix_acquisition: f64,
    pub travaux: f64,
    pub prix_revente: f64,
    pub duree_detention: u32,
    pub amortissements_cumules: f64,
}

pub(crate) fn calculer(cession: &Cession, bareme: &BaremeFiscal, policy: &Policy) -> PlusValueResult {
    let parametres = &bareme.plus_value;
    let frais = cession.prix_acquisition * parametres.forfait_frais_acquisition;
    let travaux = if cession.duree_detention > 5 {
        cession
            .travaux
            .max(cession.prix_acquisition * parametres.forfait_travaux)
    } else {
        cession.travaux
    };
    let reintegres = if policy.flags.reintegration_amortissements {
        cession.amortissements_cumules.max(0.0)
    } else {
        0.0
    };

    let prix_corrige = cession.prix_acquisition + frais + travaux - reintegres;
    let brute = (cession.prix_revente - prix_corrige).max(0.0);

    let annees_exoneration = policy.annees_exoneration_plus_value();
    let taux_ir = abattement_ir(cession.duree_detention, annees_exoneration);
    let taux_ps = abattement_ps(cession.duree_detention);
    let impot_ir = brute * (1.0 - taux_ir) * parametres.taux_ir;
    let prelevements = brute * (1.0 - taux_ps) * parametres.taux_ps;
    let total = impot_ir + prelevements;

    PlusValueResult {
        duree_detention: cession.duree_detention,
        prix_revente: euros(cession.prix_revente),
        prix_acquisition_corrige: euros(prix_corrige),
        amortissements_reintegres: euros(reintegres),
        plus_value_brute: euros(brute),
        abattement_ir: arrondi(taux_ir, 4),
        abattement_ps: arrondi(taux_ps, 4),
        impot_ir: euros(impot_ir),
        prelevements_sociaux: euros(prelevements),
        impot_total: euros(total),
        plus_value_nette: euros(brute - total),
        exoneration_totale_ir: taux_ir >= 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::policy::{PolicyFlags, PolicyOverrides};
    use chrono::NaiveDate;

    fn policy(exoneration_17: bool, reintegration: bool) -> Policy {
        let overrides = PolicyOverrides {
            exoneration_plus_value_17_ans: Some(exoneration_17),
            reintegration_amortissements: Some(reintegration),
            ..PolicyOverrides::default()
        };
        Policy::new(
            PolicyFlags::default().with_overrides(&overrides),
            NaiveDate::from_ymd_opt(2026, 6, 1).expect("date"),
        )
    }

    #[test]
    fn income_tax_allowance_schedule() {
        assert_eq!(abattement_ir(5, 22), 0.0);
        assert!((abattement_ir(6, 22) - 0.06).abs() < 1e-12);
        assert!((abattement_ir(21, 22) - 0.96).abs() < 1e-12);
        assert_eq!(abattement_ir(22, 22), 1.0);
        assert_eq!(abattement_ir(17, 17), 1.0);
        assert!(abattement_ir(16, 17) < 1.0);
    }

    #[test]
    fn social_levy_allowance_reaches_full_exemption_at_thirty() {
        assert_eq!(abattement_ps(5), 0.0);
        assert!((abattement_ps(22) - 0.28).abs() < 1e-9);
        assert!((abattement_ps(29) - 0.91).abs() < 1e-9);
        assert_eq!(abattement_ps(30), 1.0);
    }

    #[test]
    fn seventeen_year_flag_exempts_income_tax() {
        let bareme = BaremeFiscal::edition_2026();
        let cession = Cession {
            prix_acquisition: 200_000.0,
            travaux: 0.0,
            prix_revente: 300_000.0,
            duree_detention: 17,
            amortissements_cumules: 0.0,
        };
        let with_flag = calculer(&cession, &bareme, &policy(true, false));
        let without_flag = calculer(&cession, &bareme, &policy(false, false));
        assert!(with_flag.exoneration_totale_ir);
        assert_eq!(with_flag.impot_ir, 0);
        assert!(without_flag.impot_ir > 0);
        assert_eq!(with_flag.prelevements_sociaux, without_flag.prelevements_sociaux);
    }

    #[test]
    fn amortization_is_added_back_when_flagged() {
        let bareme = BaremeFiscal::edition_2026();
        let cession = Cession {
            prix_acquisition: 200_000.0,
            travaux: 0.0,
            prix_revente: 320_000.0,
            duree_detention: 9,
            amortissements_cumules: 63_000.0,
        };
        let reintegrated = calculer(&cession, &bareme, &policy(false, true));
        let plain = calculer(&cession, &bareme, &policy(false, false));
        assert_eq!(reintegrated.amortissements_reintegres, 63_000);
        assert_eq!(
            reintegrated.plus_value_brute - plain.plus_value_brute,
            63_000
        );
    }
}
