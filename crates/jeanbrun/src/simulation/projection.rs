use super::bareme::BaremeFiscal;
use super::domain::{ProjectionAnnuelle, RegimeFiscal};
use super::financement::{euros, EcheanceAnnuelle};
use super::fiscal::impot_revenu;

/// Everything a projection pass needs, fixed for the whole holding period.
pub(crate) struct Hypotheses<'a> {
    pub bareme: &'a BaremeFiscal,
    pub plafond_deficit: f64,
    pub revenu: f64,
    pub parts: f64,
    pub loyer_annuel: f64,
    pub prix_acquisition: f64,
    pub cout_operation: f64,
    pub amortissement_annuel: f64,
    pub echeancier: &'a [EcheanceAnnuelle],
    pub duree: u32,
}

impl Hypotheses<'_> {
    pub fn impot_reference(&self) -> f64 {
        impot_revenu(self.bareme, self.revenu, self.parts)
    }

    fn impot(&self, revenu_locatif: f64, deficit: f64) -> f64 {
        impot_revenu(self.bareme, self.revenu + revenu_locatif - deficit, self.parts)
            + revenu_locatif.max(0.0) * self.bareme.taux_prelevements_sociaux
    }

    fn dotation(&self, regime: RegimeFiscal, annee: u32) -> f64 {
        match regime {
            RegimeFiscal::Jeanbrun => self.amortissement_annuel,
            RegimeFiscal::LmnpReel => {
                let lmnp = &self.bareme.lmnp;
                if annee <= lmnp.duree_amortissement_bati {
                    self.cout_operation * lmnp.quote_part_bati
                        / f64::from(lmnp.duree_amortissement_bati)
                } else {
                    0.0
                }
            }
            RegimeFiscal::LmnpMicroBic => 0.0,
        }
    }
}

struct Imposition {
    revenu_locatif: f64,
    deficit: f64,
    amortissement: f64,
}

/// Real-expense regime without any depreciation: charges and interest above
/// rents create a deficit imputable on global income up to the ceiling.
fn imposition_reelle(resultat: f64, plafond_deficit: f64) -> Imposition {
    if resultat >= 0.0 {
        Imposition {
            revenu_locatif: resultat,
            deficit: 0.0,
            amortissement: 0.0,
        }
    } else {
        Imposition {
            revenu_locatif: 0.0,
            deficit: (-resultat).min(plafond_deficit),
            amortissement: 0.0,
        }
    }
}

/// Depreciation never creates a deficit: the unused part is carried forward.
fn imposition_amortie(
    resultat: f64,
    disponible: f64,
    deficit_imputable: bool,
    plafond_deficit: f64,
) -> Imposition {
    if resultat > 0.0 {
        let applique = disponible.min(resultat);
        Imposition {
            revenu_locatif: resultat - applique,
            deficit: 0.0,
            amortissement: applique,
        }
    } else {
        let deficit = if deficit_imputable {
            (-resultat).min(plafond_deficit)
        } else {
            0.0
        };
        Imposition {
            revenu_locatif: 0.0,
            deficit,
            amortissement: 0.0,
        }
    }
}

pub(crate) fn projeter(hypotheses: &Hypotheses<'_>, regime: RegimeFiscal) -> Vec<ProjectionAnnuelle> {
    let bareme = hypotheses.bareme;
    let impot_reference = hypotheses.impot_reference();
    let mut report = 0.0;
    let mut cumul = 0.0;
    let mut lignes = Vec::with_capacity(hypotheses.duree as usize);

    for annee in 1..=hypotheses.duree {
        let indexation = (1.0 + bareme.revalorisation_loyers).powi(annee as i32 - 1);
        let loyers = hypotheses.loyer_annuel * indexation;
        let charges = loyers * bareme.taux_charges;

        let echeance = hypotheses.echeancier.get(annee as usize - 1);
        let interets = echeance.map_or(0.0, |e| e.interets);
        let assurance = echeance.map_or(0.0, |e| e.assurance);
        let mensualites = echeance.map_or(0.0, |e| e.mensualites);
        let capital_restant = echeance.map_or(0.0, |e| e.capital_restant_du);

        let resultat = loyers - charges - interets - assurance;
        let sans_dispositif = imposition_reelle(resultat, hypotheses.plafond_deficit);
        let impot_sans = hypotheses.impot(sans_dispositif.revenu_locatif, sans_dispositif.deficit);

        let avec_dispositif = match regime {
            RegimeFiscal::LmnpMicroBic => Imposition {
                revenu_locatif: loyers * (1.0 - bareme.lmnp.abattement_micro_bic),
                deficit: 0.0,
                amortissement: 0.0,
            },
            RegimeFiscal::Jeanbrun | RegimeFiscal::LmnpReel => {
                let disponible = report + hypotheses.dotation(regime, annee);
                let imposition = imposition_amortie(
                    resultat,
                    disponible,
                    regime == RegimeFiscal::Jeanbrun,
                    hypotheses.plafond_deficit,
                );
                report = disponible - imposition.amortissement;
                imposition
            }
        };
        let impot_avec = hypotheses.impot(avec_dispositif.revenu_locatif, avec_dispositif.deficit);

        let economie = impot_sans - impot_avec;
        cumul += economie;
        let cashflow = loyers - charges - mensualites - assurance - (impot_avec - impot_reference);

        let valeur = hypotheses.prix_acquisition
            * (1.0 + bareme.revalorisation_bien).powi(annee as i32);

        lignes.push(ProjectionAnnuelle {
            annee,
            loyers: euros(loyers),
            charges: euros(charges),
            interets: euros(interets),
            assurance: euros(assurance),
            amortissement: euros(avec_dispositif.amortissement),
            amortissement_reporte: euros(report),
            revenu_imposable_locatif: euros(
                avec_dispositif.revenu_locatif - avec_dispositif.deficit,
            ),
            deficit_impute: euros(avec_dispositif.deficit),
            impot_sans_dispositif: euros(impot_sans),
            impot_avec_dispositif: euros(impot_avec),
            economie_impot: euros(economie),
            cashflow: euros(cashflow),
            economie_cumulee: euros(cumul),
            capital_restant_du: euros(capital_restant),
            valeur_bien: euros(valeur),
            patrimoine_net: euros(valeur - capital_restant),
        });
    }

    lignes
}
