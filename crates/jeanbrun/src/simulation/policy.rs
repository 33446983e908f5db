use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::bareme::BaremeFiscal;

pub const POLICY_VERSION: &str = "2026.1";

/// Rule switches whose value depends on legislative timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyFlags {
    /// Full capital-gain income-tax exemption after 17 years instead of 22.
    pub exoneration_plus_value_17_ans: bool,
    /// Last day the doubled land-deficit ceiling applies.
    pub deficit_double_jusqu_au: Option<NaiveDate>,
    /// Deducted amortization is added back to the capital gain on resale.
    pub reintegration_amortissements: bool,
    pub dispositif_debut: NaiveDate,
    pub dispositif_fin: NaiveDate,
}

impl Default for PolicyFlags {
    fn default() -> Self {
        Self {
            exoneration_plus_value_17_ans: false,
            deficit_double_jusqu_au: NaiveDate::from_ymd_opt(2027, 12, 31),
            reintegration_amortissements: true,
            dispositif_debut: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap_or(NaiveDate::MIN),
            dispositif_fin: NaiveDate::from_ymd_opt(2028, 12, 31).unwrap_or(NaiveDate::MAX),
        }
    }
}

impl PolicyFlags {
    pub fn with_overrides(mut self, overrides: &PolicyOverrides) -> Self {
        if let Some(value) = overrides.exoneration_plus_value_17_ans {
            self.exoneration_plus_value_17_ans = value;
        }
        if let Some(value) = overrides.deficit_double_jusqu_au {
            self.deficit_double_jusqu_au = value;
        }
        if let Some(value) = overrides.reintegration_amortissements {
            self.reintegration_amortissements = value;
        }
        if let Some(value) = overrides.dispositif_debut {
            self.dispositif_debut = value;
        }
        if let Some(value) = overrides.dispositif_fin {
            self.dispositif_fin = value;
        }
        self
    }
}

/// Sparse set of flag changes. `None` leaves the underlying flag untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyOverrides {
    pub exoneration_plus_value_17_ans: Option<bool>,
    pub deficit_double_jusqu_au: Option<Option<NaiveDate>>,
    pub reintegration_amortissements: Option<bool>,
    pub dispositif_debut: Option<NaiveDate>,
    pub dispositif_fin: Option<NaiveDate>,
}

impl PolicyOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Stack `later` on top of `self`; the later value wins field by field.
    pub fn merge(self, later: PolicyOverrides) -> PolicyOverrides {
        PolicyOverrides {
            exoneration_plus_value_17_ans: later
                .exoneration_plus_value_17_ans
                .or(self.exoneration_plus_value_17_ans),
            deficit_double_jusqu_au: later
                .deficit_double_jusqu_au
                .or(self.deficit_double_jusqu_au),
            reintegration_amortissements: later
                .reintegration_amortissements
                .or(self.reintegration_amortissements),
            dispositif_debut: later.dispositif_debut.or(self.dispositif_debut),
            dispositif_fin: later.dispositif_fin.or(self.dispositif_fin),
        }
    }
}

/// Flag set evaluated at a given date. Built per call and passed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub version: String,
    pub as_of: NaiveDate,
    pub flags: PolicyFlags,
}

impl Policy {
    pub fn new(flags: PolicyFlags, as_of: NaiveDate) -> Self {
        let version = if flags == PolicyFlags::default() {
            POLICY_VERSION.to_string()
        } else {
            format!("{POLICY_VERSION}+custom")
        };
        Self {
            version,
            as_of,
            flags,
        }
    }

    pub fn default_at(as_of: NaiveDate) -> Self {
        Self::new(PolicyFlags::default(), as_of)
    }

    pub fn with_overrides(self, overrides: &PolicyOverrides) -> Self {
        let flags = self.flags.with_overrides(overrides);
        Self::new(flags, self.as_of)
    }

    pub fn dispositif_ouvert(&self) -> bool {
        self.flags.dispositif_debut <= self.as_of && self.as_of <= self.flags.dispositif_fin
    }

    pub fn deficit_double_actif(&self) -> bool {
        self.flags
            .deficit_double_jusqu_au
            .is_some_and(|fin| self.as_of <= fin)
    }

    pub fn plafond_deficit(&self, bareme: &BaremeFiscal) -> f64 {
        if self.deficit_double_actif() {
            bareme.deficit_plafond_double
        } else {
            bareme.deficit_plafond
        }
    }

    pub fn annees_exoneration_plus_value(&self) -> u32 {
        if self.flags.exoneration_plus_value_17_ans {
            17
        } else {
            22
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn default_policy_keeps_base_version() {
        let policy = Policy::default_at(date(2026, 6, 1));
        assert_eq!(policy.version, POLICY_VERSION);
        assert!(policy.dispositif_ouvert());
        assert_eq!(policy.annees_exoneration_plus_value(), 22);
    }

    #[test]
    fn doubled_deficit_ceiling_is_date_gated() {
        let bareme = BaremeFiscal::edition_2026();
        let before = Policy::default_at(date(2027, 12, 31));
        let after = Policy::default_at(date(2028, 1, 1));
        assert_eq!(before.plafond_deficit(&bareme), 21_400.0);
        assert_eq!(after.plafond_deficit(&bareme), 10_700.0);
    }

    #[test]
    fn scheme_window_closes_after_end_date() {
        assert!(!Policy::default_at(date(2025, 12, 31)).dispositif_ouvert());
        assert!(Policy::default_at(date(2028, 12, 31)).dispositif_ouvert());
        assert!(!Policy::default_at(date(2029, 1, 1)).dispositif_ouvert());
    }

    #[test]
    fn overrides_accumulate_and_later_values_win() {
        let first = PolicyOverrides {
            exoneration_plus_value_17_ans: Some(true),
            deficit_double_jusqu_au: Some(None),
            ..PolicyOverrides::default()
        };
        let second = PolicyOverrides {
            exoneration_plus_value_17_ans: Some(false),
            reintegration_amortissements: Some(false),
            ..PolicyOverrides::default()
        };
        let merged = first.merge(second);
        let policy = Policy::default_at(date(2026, 6, 1)).with_overrides(&merged);

        assert!(!policy.flags.exoneration_plus_value_17_ans);
        assert!(!policy.flags.reintegration_amortissements);
        assert!(!policy.deficit_double_actif());
        assert_eq!(policy.version, format!("{POLICY_VERSION}+custom"));
    }

    #[test]
    fn overrides_never_touch_the_defaults() {
        let overrides = PolicyOverrides {
            exoneration_plus_value_17_ans: Some(true),
            ..PolicyOverrides::default()
        };
        let custom = PolicyFlags::default().with_overrides(&overrides);
        assert!(custom.exoneration_plus_value_17_ans);
        assert!(!PolicyFlags::default().exoneration_plus_value_17_ans);
    }
}
