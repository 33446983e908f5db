use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use super::amortissement::{
    amortissement_annuel, base_amortissable, estimer_loyer_mensuel, verifier_eligibilite,
};
use super::bareme::BaremeFiscal;
use super::comparaison::comparer;
use super::domain::{
    RegimeFiscal, SimulationCalculInput, SimulationCalculResult, SimulationOutcome, TypeBien,
    DUREE_DETENTION_MAX,
};
use super::financement::{analyser, arrondi, echeancier, euros, montant_emprunte};
use super::fiscal::{quotient_familial, taux_marginal};
use super::plus_value::{calculer, Cession};
use super::policy::{Policy, PolicyFlags};
use super::projection::{projeter, Hypotheses};

/// Stateless engine: fiscal tables are injected once, the policy travels with
/// each call so callers can pin any flag set and any date.
#[derive(Debug, Clone)]
pub struct SimulationEngine {
    bareme: Arc<BaremeFiscal>,
    flags: PolicyFlags,
}

impl SimulationEngine {
    pub fn new(bareme: BaremeFiscal, flags: PolicyFlags) -> Self {
        Self {
            bareme: Arc::new(bareme),
            flags,
        }
    }

    pub fn bareme(&self) -> &BaremeFiscal {
        &self.bareme
    }

    pub fn flags(&self) -> &PolicyFlags {
        &self.flags
    }

    /// Policy built from the engine's configured flags, evaluated at `as_of`.
    pub fn policy_at(&self, as_of: NaiveDate) -> Policy {
        Policy::new(self.flags.clone(), as_of)
    }

    pub fn simulate(&self, input: &SimulationCalculInput, policy: &Policy) -> SimulationOutcome {
        let bareme = self.bareme.as_ref();

        if let Err(reason) = verifier_eligibilite(input, bareme, policy) {
            debug!(motif = ?reason.motif, "simulation ineligible");
            return SimulationOutcome::Ineligible(reason);
        }

        let quotient = quotient_familial(input.revenu_net_imposable, input.nombre_parts);
        let tmi = taux_marginal(&bareme.tranches, quotient);

        let niveau = bareme.niveaux.get(input.niveau_loyer);
        let base = base_amortissable(input, bareme);
        let amortissement = amortissement_annuel(base, niveau);

        let loyer_mensuel =
            estimer_loyer_mensuel(bareme, input.surface, input.zone, input.niveau_loyer);
        let loyer_annuel = loyer_mensuel * 12.0;
        let cout_operation = input.cout_operation();

        let financement = input.financement.as_ref().map(|financement| {
            analyser(
                cout_operation,
                input.revenu_net_imposable,
                financement,
                &bareme.hcsf,
            )
        });
        let table = input
            .financement
            .as_ref()
            .map(|financement| {
                echeancier(
                    montant_emprunte(cout_operation, financement),
                    financement.taux_interet,
                    financement.duree_annees,
                    financement.taux_assurance,
                )
            })
            .unwrap_or_default();

        let duree = input
            .duree_detention
            .filter(|duree| *duree > 0)
            .unwrap_or(bareme.duree_detention_defaut)
            .min(DUREE_DETENTION_MAX);

        let hypotheses = Hypotheses {
            bareme,
            plafond_deficit: policy.plafond_deficit(bareme),
            revenu: input.revenu_net_imposable.max(0.0),
            parts: input.nombre_parts,
            loyer_annuel,
            prix_acquisition: input.prix_acquisition,
            cout_operation,
            amortissement_annuel: amortissement,
            echeancier: &table,
            duree,
        };

        let projection = projeter(&hypotheses, RegimeFiscal::Jeanbrun);
        let comparaison = input
            .comparer_lmnp
            .then(|| comparer(&hypotheses, &projection));

        let plus_value = input.revente.as_ref().map(|revente| {
            let revalorisation = (1.0 + bareme.revalorisation_bien).powi(duree as i32);
            let amortissements_cumules: i64 =
                projection.iter().map(|ligne| ligne.amortissement).sum();
            calculer(
                &Cession {
                    prix_acquisition: input.prix_acquisition,
                    travaux: match input.type_bien {
                        TypeBien::Ancien => input.montant_travaux.max(0.0),
                        TypeBien::Neuf => 0.0,
                    },
                    prix_revente: revente
                        .prix_revente
                        .unwrap_or(input.prix_acquisition * revalorisation),
                    duree_detention: duree,
                    amortissements_cumules: amortissements_cumules as f64,
                },
                bareme,
                policy,
            )
        });

        let premiere = projection.first();
        let impot_avant = premiere.map_or(0, |ligne| ligne.impot_sans_dispositif);
        let impot_apres = premiere.map_or(0, |ligne| ligne.impot_avec_dispositif);
        let cashflow_annuel = premiere.map_or(0, |ligne| ligne.cashflow);
        let charges_annuelles = loyer_annuel * bareme.taux_charges;

        let (rendement_brut, rendement_net) = if cout_operation > 0.0 {
            (
                arrondi(loyer_annuel / cout_operation * 100.0, 2),
                arrondi((loyer_annuel - charges_annuelles) / cout_operation * 100.0, 2),
            )
        } else {
            (0.0, 0.0)
        };

        debug!(
            zone = %input.zone,
            niveau = input.niveau_loyer.label(),
            amortissement,
            "simulation computed"
        );

        SimulationOutcome::Eligible(Box::new(SimulationCalculResult {
            eligible: true,
            edition_bareme: bareme.edition,
            version_politique: policy.version.clone(),
            quotient_familial: euros(quotient),
            tmi,
            base_amortissable: euros(base),
            amortissement_annuel: euros(amortissement),
            plafond_amortissement: euros(niveau.plafond_amortissement),
            loyer_mensuel: euros(loyer_mensuel),
            loyer_annuel: euros(loyer_annuel),
            impot_avant,
            impot_apres,
            economie_impot_annuelle: impot_avant - impot_apres,
            economie_impot_totale: projection.last().map_or(0, |ligne| ligne.economie_cumulee),
            cashflow_mensuel: (cashflow_annuel as f64 / 12.0).round() as i64,
            rendement_brut,
            rendement_net,
            duree_projection: duree,
            financement,
            projection,
            plus_value,
            comparaison,
        }))
    }
}

impl Default for SimulationEngine {
    fn default() -> Self {
        Self::new(BaremeFiscal::edition_2026(), PolicyFlags::default())
    }
}
