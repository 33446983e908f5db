use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::validation::FieldErrors;

/// Geographic tier driving rent and price ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ZoneFiscale {
    #[serde(rename = "A_BIS", alias = "Abis", alias = "A-bis", alias = "A bis")]
    ABis,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "B1")]
    B1,
    #[serde(rename = "B2")]
    B2,
    #[serde(rename = "C")]
    C,
}

impl ZoneFiscale {
    pub const ALL: [ZoneFiscale; 5] = [
        ZoneFiscale::ABis,
        ZoneFiscale::A,
        ZoneFiscale::B1,
        ZoneFiscale::B2,
        ZoneFiscale::C,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ZoneFiscale::ABis => "A bis",
            ZoneFiscale::A => "A",
            ZoneFiscale::B1 => "B1",
            ZoneFiscale::B2 => "B2",
            ZoneFiscale::C => "C",
        }
    }
}

impl fmt::Display for ZoneFiscale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ZoneFiscale {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "abis" => Ok(ZoneFiscale::ABis),
            "a" => Ok(ZoneFiscale::A),
            "b1" => Ok(ZoneFiscale::B1),
            "b2" => Ok(ZoneFiscale::B2),
            "c" => Ok(ZoneFiscale::C),
            _ => Err(format!("unknown fiscal zone '{raw}' (expected A bis, A, B1, B2 or C)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeBien {
    Neuf,
    Ancien,
}

impl TypeBien {
    pub fn label(&self) -> &'static str {
        match self {
            TypeBien::Neuf => "neuf",
            TypeBien::Ancien => "ancien",
        }
    }
}

impl FromStr for TypeBien {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "neuf" => Ok(TypeBien::Neuf),
            "ancien" => Ok(TypeBien::Ancien),
            _ => Err(format!("unknown property type '{raw}' (expected neuf or ancien)")),
        }
    }
}

/// Rent commitment the investor signs up for; each level has its own rate and cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NiveauLoyer {
    Intermediaire,
    Social,
    Libre,
}

impl NiveauLoyer {
    pub fn label(&self) -> &'static str {
        match self {
            NiveauLoyer::Intermediaire => "intermediaire",
            NiveauLoyer::Social => "social",
            NiveauLoyer::Libre => "libre",
        }
    }
}

impl FromStr for NiveauLoyer {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "intermediaire" | "intermédiaire" => Ok(NiveauLoyer::Intermediaire),
            "social" => Ok(NiveauLoyer::Social),
            "libre" => Ok(NiveauLoyer::Libre),
            _ => Err(format!(
                "unknown rent tier '{raw}' (expected intermediaire, social or libre)"
            )),
        }
    }
}

/// Loan parameters. Rates are annual percentages (3.5 means 3.5 %).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancementInput {
    #[serde(default)]
    pub apport: f64,
    pub taux_interet: f64,
    pub duree_annees: u32,
    #[serde(default)]
    pub taux_assurance: f64,
    /// Net monthly household income; defaults to the annual taxable income / 12.
    #[serde(default)]
    pub revenus_mensuels: Option<f64>,
    #[serde(default)]
    pub autres_credits_mensuels: f64,
    #[serde(default)]
    pub charges_fixes_mensuelles: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReventeInput {
    /// Expected resale price; projected from the revaluation rate when absent.
    #[serde(default)]
    pub prix_revente: Option<f64>,
}

/// Longest holding period the projection covers, in years.
pub const DUREE_DETENTION_MAX: u32 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationCalculInput {
    pub revenu_net_imposable: f64,
    pub nombre_parts: f64,
    pub type_bien: TypeBien,
    pub prix_acquisition: f64,
    #[serde(default)]
    pub montant_travaux: f64,
    pub surface: f64,
    pub zone: ZoneFiscale,
    pub niveau_loyer: NiveauLoyer,
    #[serde(default)]
    pub financement: Option<FinancementInput>,
    #[serde(default)]
    pub revente: Option<ReventeInput>,
    #[serde(default)]
    pub duree_detention: Option<u32>,
    #[serde(default)]
    pub comparer_lmnp: bool,
}

impl SimulationCalculInput {
    /// Field-level checks run at the boundary before the engine sees the input.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.check(
            !(self.revenu_net_imposable.is_finite() && self.revenu_net_imposable > 0.0),
            "revenuNetImposable",
            "le revenu net imposable doit être positif",
        );
        errors.check(
            !(self.nombre_parts.is_finite() && (1.0..=10.0).contains(&self.nombre_parts)),
            "nombreParts",
            "le nombre de parts doit être compris entre 1 et 10",
        );
        errors.check(
            !(self.prix_acquisition.is_finite() && self.prix_acquisition > 0.0),
            "prixAcquisition",
            "le prix d'acquisition doit être positif",
        );
        errors.check(
            !(self.montant_travaux.is_finite() && self.montant_travaux >= 0.0),
            "montantTravaux",
            "le montant des travaux ne peut pas être négatif",
        );
        errors.check(
            !(self.surface.is_finite() && self.surface > 0.0),
            "surface",
            "la surface doit être positive",
        );
        errors.check(
            matches!(
                self.duree_detention,
                Some(duree) if duree == 0 || duree > DUREE_DETENTION_MAX
            ),
            "dureeDetention",
            "la durée de détention doit être comprise entre 1 et 30 ans",
        );

        if let Some(financement) = &self.financement {
            errors.check(
                !(financement.apport.is_finite() && financement.apport >= 0.0),
                "financement.apport",
                "l'apport ne peut pas être négatif",
            );
            errors.check(
                !(financement.taux_interet.is_finite()
                    && (0.0..=20.0).contains(&financement.taux_interet)),
                "financement.tauxInteret",
                "le taux d'intérêt doit être compris entre 0 et 20 %",
            );
            errors.check(
                financement.duree_annees > 30,
                "financement.dureeAnnees",
                "la durée du prêt ne peut pas dépasser 30 ans",
            );
            errors.check(
                !(financement.taux_assurance.is_finite()
                    && (0.0..=5.0).contains(&financement.taux_assurance)),
                "financement.tauxAssurance",
                "le taux d'assurance doit être compris entre 0 et 5 %",
            );
            errors.check(
                financement
                    .revenus_mensuels
                    .is_some_and(|value| !(value.is_finite() && value >= 0.0)),
                "financement.revenusMensuels",
                "les revenus mensuels ne peuvent pas être négatifs",
            );
        }

        if let Some(ReventeInput {
            prix_revente: Some(prix),
        }) = &self.revente
        {
            errors.check(
                !(prix.is_finite() && *prix > 0.0),
                "revente.prixRevente",
                "le prix de revente doit être positif",
            );
        }

        errors.into_result()
    }

    /// Total cost carried by the investor: works only count for existing property.
    pub fn cout_operation(&self) -> f64 {
        match self.type_bien {
            TypeBien::Neuf => self.prix_acquisition,
            TypeBien::Ancien => self.prix_acquisition + self.montant_travaux.max(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictFinancement {
    Financable,
    Tendu,
    Difficile,
}

impl VerdictFinancement {
    pub fn label(&self) -> &'static str {
        match self {
            VerdictFinancement::Financable => "financable",
            VerdictFinancement::Tendu => "tendu",
            VerdictFinancement::Difficile => "difficile",
        }
    }
}

/// HCSF affordability analysis of the loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyseFinancement {
    pub montant_emprunte: i64,
    pub mensualite_credit: i64,
    pub mensualite_assurance: i64,
    pub mensualite_totale: i64,
    pub revenus_mensuels: i64,
    pub taux_endettement: f64,
    pub verdict: VerdictFinancement,
    pub confortable: bool,
    pub reste_a_vivre: i64,
    pub cout_total_credit: i64,
}

/// One row of the multi-year projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionAnnuelle {
    pub annee: u32,
    pub loyers: i64,
    pub charges: i64,
    pub interets: i64,
    pub assurance: i64,
    pub amortissement: i64,
    pub amortissement_reporte: i64,
    pub revenu_imposable_locatif: i64,
    pub deficit_impute: i64,
    pub impot_sans_dispositif: i64,
    pub impot_avec_dispositif: i64,
    pub economie_impot: i64,
    pub cashflow: i64,
    pub economie_cumulee: i64,
    pub capital_restant_du: i64,
    pub valeur_bien: i64,
    pub patrimoine_net: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegimeFiscal {
    Jeanbrun,
    LmnpMicroBic,
    LmnpReel,
}

impl RegimeFiscal {
    pub fn label(&self) -> &'static str {
        match self {
            RegimeFiscal::Jeanbrun => "Loi Jeanbrun",
            RegimeFiscal::LmnpMicroBic => "LMNP micro-BIC",
            RegimeFiscal::LmnpReel => "LMNP réel",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyntheseRegime {
    pub regime: RegimeFiscal,
    /// Extra income tax caused by the investment over the holding period.
    pub impot_supplementaire_total: i64,
    pub cashflow_total: i64,
    pub economie_impot_totale: i64,
    pub cashflow_mensuel_moyen: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparaisonRegimes {
    pub regimes: Vec<SyntheseRegime>,
    pub meilleur: RegimeFiscal,
    /// Jeanbrun total cashflow minus the best alternative regime.
    pub avantage_jeanbrun: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlusValueResult {
    pub duree_detention: u32,
    pub prix_revente: i64,
    pub prix_acquisition_corrige: i64,
    pub amortissements_reintegres: i64,
    pub plus_value_brute: i64,
    pub abattement_ir: f64,
    pub abattement_ps: f64,
    pub impot_ir: i64,
    pub prelevements_sociaux: i64,
    pub impot_total: i64,
    pub plus_value_nette: i64,
    pub exoneration_totale_ir: bool,
}

/// Outcome of an eligible simulation. Currency amounts are whole euros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationCalculResult {
    pub eligible: bool,
    pub edition_bareme: u16,
    pub version_politique: String,
    pub quotient_familial: i64,
    pub tmi: f64,
    pub base_amortissable: i64,
    pub amortissement_annuel: i64,
    pub plafond_amortissement: i64,
    pub loyer_mensuel: i64,
    pub loyer_annuel: i64,
    pub impot_avant: i64,
    pub impot_apres: i64,
    pub economie_impot_annuelle: i64,
    pub economie_impot_totale: i64,
    pub cashflow_mensuel: i64,
    pub rendement_brut: f64,
    pub rendement_net: f64,
    pub duree_projection: u32,
    pub financement: Option<AnalyseFinancement>,
    pub projection: Vec<ProjectionAnnuelle>,
    pub plus_value: Option<PlusValueResult>,
    pub comparaison: Option<ComparaisonRegimes>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotifIneligibilite {
    TravauxInsuffisants,
    HorsPeriode,
}

/// Business-rule rejection; surfaced to the visitor with the exact gap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ineligibilite {
    pub eligible: bool,
    pub motif: MotifIneligibilite,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub montant_manquant: Option<f64>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimulationOutcome {
    Eligible(Box<SimulationCalculResult>),
    Ineligible(Ineligibilite),
}

impl SimulationOutcome {
    pub fn is_eligible(&self) -> bool {
        matches!(self, SimulationOutcome::Eligible(_))
    }

    pub fn result(&self) -> Option<&SimulationCalculResult> {
        match self {
            SimulationOutcome::Eligible(result) => Some(result),
            SimulationOutcome::Ineligible(_) => None,
        }
    }

    pub fn ineligibilite(&self) -> Option<&Ineligibilite> {
        match self {
            SimulationOutcome::Eligible(_) => None,
            SimulationOutcome::Ineligible(reason) => Some(reason),
        }
    }
}

/// Format an amount as French currency with thin grouping, e.g. `20 000 €`.
pub fn format_euros(amount: f64) -> String {
    let rounded = amount.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }
    if rounded < 0 {
        format!("-{grouped} €")
    } else {
        format!("{grouped} €")
    }
}
