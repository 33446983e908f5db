//! Partner records (promoters and brokers) the dispatch step routes leads to.

mod import;
mod matching;

use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::Platform;
use crate::simulation::ZoneFiscale;

pub use import::{parse_partners, PartnerImportError};
pub use matching::{select_broker, select_promoter};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartnerId(pub String);

impl fmt::Display for PartnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartnerKind {
    Promoteur,
    Courtier,
}

impl PartnerKind {
    pub fn label(&self) -> &'static str {
        match self {
            PartnerKind::Promoteur => "promoteur",
            PartnerKind::Courtier => "courtier",
        }
    }
}

/// How a partner pays for leads; drives selection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingModel {
    Abonnement,
    ParLead,
    Commission,
}

impl PricingModel {
    pub(crate) fn rank(&self) -> u8 {
        match self {
            PricingModel::Abonnement => 0,
            PricingModel::ParLead => 1,
            PricingModel::Commission => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoterData {
    pub id: PartnerId,
    pub name: String,
    pub email: String,
    pub zones: Vec<ZoneFiscale>,
    pub active: bool,
    /// Platforms whose leads this promoter accepts; empty means all.
    #[serde(default)]
    pub platforms: Vec<Platform>,
    pub pricing: PricingModel,
    #[serde(default)]
    pub price_per_lead: Option<f64>,
}

impl PromoterData {
    pub fn accepts(&self, platform: Platform) -> bool {
        self.platforms.is_empty() || self.platforms.contains(&platform)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerData {
    pub id: PartnerId,
    pub name: String,
    pub email: String,
    pub zones: Vec<ZoneFiscale>,
    pub active: bool,
    pub pricing: PricingModel,
    #[serde(default)]
    pub price_per_lead: Option<f64>,
}

/// Common view used by the selection rule.
pub(crate) trait Partner {
    fn id(&self) -> &PartnerId;
    fn zones(&self) -> &[ZoneFiscale];
    fn active(&self) -> bool;
    fn pricing(&self) -> PricingModel;
    fn price_per_lead(&self) -> Option<f64>;

    fn serves(&self, zone: ZoneFiscale) -> bool {
        self.active() && self.zones().contains(&zone)
    }
}

macro_rules! impl_partner {
    ($ty:ty) => {
        impl Partner for $ty {
            fn id(&self) -> &PartnerId {
                &self.id
            }
            fn zones(&self) -> &[ZoneFiscale] {
                &self.zones
            }
            fn active(&self) -> bool {
                self.active
            }
            fn pricing(&self) -> PricingModel {
                self.pricing
            }
            fn price_per_lead(&self) -> Option<f64> {
                self.price_per_lead
            }
        }
    };
}

impl_partner!(PromoterData);
impl_partner!(BrokerData);

#[derive(Debug, thiserror::Error)]
pub enum PartnerLookupError {
    #[error("partner directory unavailable: {0}")]
    Unavailable(String),
}

/// Data-access collaborator returning active partners serving a zone.
pub trait PartnerDirectory: Send + Sync {
    fn promoters(&self, zone: ZoneFiscale) -> Result<Vec<PromoterData>, PartnerLookupError>;
    fn brokers(&self, zone: ZoneFiscale) -> Result<Vec<BrokerData>, PartnerLookupError>;
}

/// Partner list held in memory, typically loaded from a CSV export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartnerRoster {
    pub promoters: Vec<PromoterData>,
    pub brokers: Vec<BrokerData>,
}

impl PartnerRoster {
    pub fn new(promoters: Vec<PromoterData>, brokers: Vec<BrokerData>) -> Self {
        Self { promoters, brokers }
    }

    pub fn from_csv_path(path: impl AsRef<std::path::Path>) -> Result<Self, PartnerImportError> {
        let file = std::fs::File::open(path)?;
        parse_partners(file)
    }

    pub fn is_empty(&self) -> bool {
        self.promoters.is_empty() && self.brokers.is_empty()
    }
}

impl PartnerDirectory for PartnerRoster {
    fn promoters(&self, zone: ZoneFiscale) -> Result<Vec<PromoterData>, PartnerLookupError> {
        Ok(self
            .promoters
            .iter()
            .filter(|promoter| promoter.serves(zone))
            .cloned()
            .collect())
    }

    fn brokers(&self, zone: ZoneFiscale) -> Result<Vec<BrokerData>, PartnerLookupError> {
        Ok(self
            .brokers
            .iter()
            .filter(|broker| broker.serves(zone))
            .cloned()
            .collect())
    }
}
