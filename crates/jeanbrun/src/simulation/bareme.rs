use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::domain::{NiveauLoyer, ZoneFiscale, DUREE_DETENTION_MAX};

/// Income tax bracket. `plafond` is the inclusive upper bound of the
/// quotient familial; the last bracket is unbounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrancheImpot {
    pub plafond: Option<f64>,
    pub taux: f64,
}

/// Monthly rent ceiling per m², one value per fiscal zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoyersParZone {
    pub a_bis: f64,
    pub a: f64,
    pub b1: f64,
    pub b2: f64,
    pub c: f64,
}

impl LoyersParZone {
    pub fn get(&self, zone: ZoneFiscale) -> f64 {
        match zone {
            ZoneFiscale::ABis => self.a_bis,
            ZoneFiscale::A => self.a,
            ZoneFiscale::B1 => self.b1,
            ZoneFiscale::B2 => self.b2,
            ZoneFiscale::C => self.c,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParametresNiveau {
    pub taux_amortissement: f64,
    pub plafond_amortissement: f64,
    pub loyers_m2: LoyersParZone,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NiveauxLoyer {
    pub intermediaire: ParametresNiveau,
    pub social: ParametresNiveau,
    pub libre: ParametresNiveau,
}

impl NiveauxLoyer {
    pub fn get(&self, niveau: NiveauLoyer) -> &ParametresNiveau {
        match niveau {
            NiveauLoyer::Intermediaire => &self.intermediaire,
            NiveauLoyer::Social => &self.social,
            NiveauLoyer::Libre => &self.libre,
        }
    }

    fn iter(&self) -> impl Iterator<Item = (NiveauLoyer, &ParametresNiveau)> {
        [
            (NiveauLoyer::Intermediaire, &self.intermediaire),
            (NiveauLoyer::Social, &self.social),
            (NiveauLoyer::Libre, &self.libre),
        ]
        .into_iter()
    }
}

/// Debt-ratio thresholds from the HCSF recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeuilsHcsf {
    pub confortable: f64,
    pub recommande: f64,
    pub maximum: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParametresLmnp {
    pub abattement_micro_bic: f64,
    pub quote_part_bati: f64,
    pub duree_amortissement_bati: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParametresPlusValue {
    pub taux_ir: f64,
    pub taux_ps: f64,
    pub forfait_frais_acquisition: f64,
    pub forfait_travaux: f64,
}

/// Versioned fiscal tables. Nothing here is read at call time from the
/// outside world: the engine receives one edition and sticks to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaremeFiscal {
    pub edition: u16,
    pub tranches: Vec<TrancheImpot>,
    pub taux_prelevements_sociaux: f64,
    /// Minimum works, as a percentage of the acquisition price, for existing property.
    pub seuil_travaux_pct: f64,
    pub ratio_base_neuf: f64,
    pub ratio_base_ancien: f64,
    pub niveaux: NiveauxLoyer,
    pub hcsf: SeuilsHcsf,
    pub taux_charges: f64,
    pub revalorisation_loyers: f64,
    pub revalorisation_bien: f64,
    pub duree_detention_defaut: u32,
    pub deficit_plafond: f64,
    pub deficit_plafond_double: f64,
    pub lmnp: ParametresLmnp,
    pub plus_value: ParametresPlusValue,
}

#[derive(Debug, thiserror::Error)]
pub enum BaremeError {
    #[error("failed to read fiscal tables: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid fiscal tables JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid fiscal tables: {0}")]
    Invalid(String),
}

impl BaremeFiscal {
    /// Tables applied to 2026 simulations (income brackets of the 2024 scale).
    pub fn edition_2026() -> Self {
        Self {
            edition: 2026,
            tranches: vec![
                TrancheImpot {
                    plafond: Some(11_294.0),
                    taux: 0.0,
                },
                TrancheImpot {
                    plafond: Some(28_797.0),
                    taux: 0.11,
                },
                TrancheImpot {
                    plafond: Some(82_341.0),
                    taux: 0.30,
                },
                TrancheImpot {
                    plafond: Some(177_106.0),
                    taux: 0.41,
                },
                TrancheImpot {
                    plafond: None,
                    taux: 0.45,
                },
            ],
            taux_prelevements_sociaux: 0.172,
            seuil_travaux_pct: 30.0,
            ratio_base_neuf: 0.80,
            ratio_base_ancien: 0.80,
            niveaux: NiveauxLoyer {
                intermediaire: ParametresNiveau {
                    taux_amortissement: 0.035,
                    plafond_amortissement: 8_000.0,
                    loyers_m2: LoyersParZone {
                        a_bis: 18.89,
                        a: 14.03,
                        b1: 11.31,
                        b2: 9.83,
                        c: 9.83,
                    },
                },
                social: ParametresNiveau {
                    taux_amortissement: 0.045,
                    plafond_amortissement: 10_000.0,
                    loyers_m2: LoyersParZone {
                        a_bis: 15.11,
                        a: 11.22,
                        b1: 9.05,
                        b2: 7.86,
                        c: 7.86,
                    },
                },
                libre: ParametresNiveau {
                    taux_amortissement: 0.02,
                    plafond_amortissement: 6_000.0,
                    loyers_m2: LoyersParZone {
                        a_bis: 25.0,
                        a: 18.0,
                        b1: 13.5,
                        b2: 11.0,
                        c: 10.0,
                    },
                },
            },
            hcsf: SeuilsHcsf {
                confortable: 0.30,
                recommande: 0.33,
                maximum: 0.35,
            },
            taux_charges: 0.20,
            revalorisation_loyers: 0.015,
            revalorisation_bien: 0.01,
            duree_detention_defaut: 9,
            deficit_plafond: 10_700.0,
            deficit_plafond_double: 21_400.0,
            lmnp: ParametresLmnp {
                abattement_micro_bic: 0.50,
                quote_part_bati: 0.85,
                duree_amortissement_bati: 30,
            },
            plus_value: ParametresPlusValue {
                taux_ir: 0.19,
                taux_ps: 0.172,
                forfait_frais_acquisition: 0.075,
                forfait_travaux: 0.15,
            },
        }
    }

    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self, BaremeError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, BaremeError> {
        let bareme: Self = serde_json::from_reader(reader)?;
        bareme.validate()?;
        Ok(bareme)
    }

    pub fn validate(&self) -> Result<(), BaremeError> {
        let Some(last) = self.tranches.last() else {
            return Err(BaremeError::Invalid("no income tax bracket".to_string()));
        };
        if last.plafond.is_some() {
            return Err(BaremeError::Invalid(
                "the last income tax bracket must be unbounded".to_string(),
            ));
        }

        let mut previous_bound = f64::NEG_INFINITY;
        let mut previous_rate = 0.0;
        for (index, tranche) in self.tranches.iter().enumerate() {
            if !is_rate(tranche.taux) || tranche.taux < previous_rate {
                return Err(BaremeError::Invalid(format!(
                    "bracket {index}: rates must be in [0, 1] and non-decreasing"
                )));
            }
            previous_rate = tranche.taux;

            match tranche.plafond {
                Some(bound) if bound.is_finite() && bound > previous_bound => {
                    previous_bound = bound;
                }
                Some(_) => {
                    return Err(BaremeError::Invalid(format!(
                        "bracket {index}: upper bounds must be strictly increasing"
                    )))
                }
                None if index + 1 == self.tranches.len() => {}
                None => {
                    return Err(BaremeError::Invalid(format!(
                        "bracket {index}: only the last bracket may be unbounded"
                    )))
                }
            }
        }

        for (niveau, parametres) in self.niveaux.iter() {
            if !is_rate(parametres.taux_amortissement) || parametres.plafond_amortissement < 0.0 {
                return Err(BaremeError::Invalid(format!(
                    "rent tier {}: invalid amortization rate or cap",
                    niveau.label()
                )));
            }
            if ZoneFiscale::ALL
                .iter()
                .any(|zone| !(parametres.loyers_m2.get(*zone) > 0.0))
            {
                return Err(BaremeError::Invalid(format!(
                    "rent tier {}: every zone needs a positive rent ceiling",
                    niveau.label()
                )));
            }
        }

        let hcsf = &self.hcsf;
        if !(hcsf.confortable <= hcsf.recommande && hcsf.recommande <= hcsf.maximum)
            || !is_rate(hcsf.maximum)
        {
            return Err(BaremeError::Invalid(
                "HCSF thresholds must be ordered and within [0, 1]".to_string(),
            ));
        }

        let rates = [
            self.taux_prelevements_sociaux,
            self.ratio_base_neuf,
            self.ratio_base_ancien,
            self.taux_charges,
            self.lmnp.abattement_micro_bic,
            self.lmnp.quote_part_bati,
            self.plus_value.taux_ir,
            self.plus_value.taux_ps,
        ];
        if rates.iter().any(|rate| !is_rate(*rate)) {
            return Err(BaremeError::Invalid(
                "ratios and levy rates must be within [0, 1]".to_string(),
            ));
        }

        if self.duree_detention_defaut == 0 || self.lmnp.duree_amortissement_bati == 0 {
            return Err(BaremeError::Invalid(
                "durations must be at least one year".to_string(),
            ));
        }
        if self.duree_detention_defaut > DUREE_DETENTION_MAX {
            return Err(BaremeError::Invalid(format!(
                "default holding period cannot exceed {DUREE_DETENTION_MAX} years"
            )));
        }

        Ok(())
    }
}

impl Default for BaremeFiscal {
    fn default() -> Self {
        Self::edition_2026()
    }
}

fn is_rate(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}
