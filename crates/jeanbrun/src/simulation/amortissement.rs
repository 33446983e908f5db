use super::bareme::{BaremeFiscal, ParametresNiveau};
use super::domain::{
    format_euros, Ineligibilite, MotifIneligibilite, NiveauLoyer, SimulationCalculInput,
    TypeBien, ZoneFiscale,
};
use super::policy::Policy;

/// Existing property must carry works of at least the configured share of its price.
pub fn verifier_travaux(
    input: &SimulationCalculInput,
    bareme: &BaremeFiscal,
) -> Result<(), Ineligibilite> {
    if input.type_bien != TypeBien::Ancien {
        return Ok(());
    }

    let minimum = input.prix_acquisition * bareme.seuil_travaux_pct / 100.0;
    let travaux = input.montant_travaux.max(0.0);
    if travaux >= minimum {
        return Ok(());
    }

    let manquant = minimum - travaux;
    Err(Ineligibilite {
        eligible: false,
        motif: MotifIneligibilite::TravauxInsuffisants,
        montant_manquant: Some(manquant),
        message: format!(
            "Pour un bien ancien, les travaux doivent représenter au moins {} % du prix \
             d'acquisition, soit {}. Il manque {} de travaux pour être éligible.",
            bareme.seuil_travaux_pct,
            format_euros(minimum),
            format_euros(manquant)
        ),
    })
}

pub fn verifier_periode(policy: &Policy) -> Result<(), Ineligibilite> {
    if policy.dispositif_ouvert() {
        return Ok(());
    }
    Err(Ineligibilite {
        eligible: false,
        motif: MotifIneligibilite::HorsPeriode,
        montant_manquant: None,
        message: format!(
            "Le dispositif s'applique aux acquisitions réalisées entre le {} et le {}.",
            policy.flags.dispositif_debut.format("%d/%m/%Y"),
            policy.flags.dispositif_fin.format("%d/%m/%Y")
        ),
    })
}

pub fn verifier_eligibilite(
    input: &SimulationCalculInput,
    bareme: &BaremeFiscal,
    policy: &Policy,
) -> Result<(), Ineligibilite> {
    verifier_periode(policy)?;
    verifier_travaux(input, bareme)
}

/// Depreciable base: land is excluded through a flat ratio.
pub fn base_amortissable(input: &SimulationCalculInput, bareme: &BaremeFiscal) -> f64 {
    let base = match input.type_bien {
        TypeBien::Neuf => input.prix_acquisition * bareme.ratio_base_neuf,
        TypeBien::Ancien => input.cout_operation() * bareme.ratio_base_ancien,
    };
    base.max(0.0)
}

pub fn amortissement_annuel(base: f64, niveau: &ParametresNiveau) -> f64 {
    (base * niveau.taux_amortissement)
        .min(niveau.plafond_amortissement)
        .max(0.0)
}

/// Monthly rent at the tier ceiling, rounded to the euro.
pub fn estimer_loyer_mensuel(
    bareme: &BaremeFiscal,
    surface: f64,
    zone: ZoneFiscale,
    niveau: NiveauLoyer,
) -> f64 {
    if !(surface > 0.0) {
        return 0.0;
    }
    (surface * bareme.niveaux.get(niveau).loyers_m2.get(zone)).round()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn input(type_bien: TypeBien, prix: f64, travaux: f64) -> SimulationCalculInput {
        SimulationCalculInput {
            revenu_net_imposable: 60_000.0,
            nombre_parts: 2.0,
            type_bien,
            prix_acquisition: prix,
            montant_travaux: travaux,
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
    fn works_shortfall_is_exact() {
        let bareme = BaremeFiscal::edition_2026();
        let reason = verifier_travaux(&input(TypeBien::Ancien, 200_000.0, 40_000.0), &bareme)
            .expect_err("20 % of works is not enough");
        assert_eq!(reason.motif, MotifIneligibilite::TravauxInsuffisants);
        assert_eq!(reason.montant_manquant, Some(20_000.0));
        assert!(reason.message.contains("20 000 €"));
    }

    #[test]
    fn works_at_threshold_are_eligible() {
        let bareme = BaremeFiscal::edition_2026();
        assert!(verifier_travaux(&input(TypeBien::Ancien, 200_000.0, 60_000.0), &bareme).is_ok());
        assert!(verifier_travaux(&input(TypeBien::Neuf, 200_000.0, 0.0), &bareme).is_ok());
    }

    #[test]
    fn closed_window_is_reported() {
        let policy = Policy::default_at(NaiveDate::from_ymd_opt(2030, 1, 1).expect("date"));
        let reason = verifier_periode(&policy).expect_err("window closed");
        assert_eq!(reason.motif, MotifIneligibilite::HorsPeriode);
        assert!(reason.montant_manquant.is_none());
    }

    #[test]
    fn deduction_is_capped_per_tier() {
        let bareme = BaremeFiscal::edition_2026();
        let niveau = bareme.niveaux.get(NiveauLoyer::Intermediaire);
        assert!((amortissement_annuel(200_000.0, niveau) - 7_000.0).abs() < 1e-6);
        assert_eq!(amortissement_annuel(400_000.0, niveau), 8_000.0);
    }

    #[test]
    fn existing_base_includes_works() {
        let bareme = BaremeFiscal::edition_2026();
        let base = base_amortissable(&input(TypeBien::Ancien, 200_000.0, 60_000.0), &bareme);
        assert!((base - 208_000.0).abs() < 1e-6);
    }

    #[test]
    fn rent_uses_zone_and_tier_ceiling() {
        let bareme = BaremeFiscal::edition_2026();
        let loyer = estimer_loyer_mensuel(&bareme, 45.0, ZoneFiscale::B1, NiveauLoyer::Intermediaire);
        assert_eq!(loyer, 509.0);
        assert_eq!(
            estimer_loyer_mensuel(&bareme, 0.0, ZoneFiscale::B1, NiveauLoyer::Social),
            0.0
        );
    }
}
