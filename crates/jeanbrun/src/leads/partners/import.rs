use std::io::Read;

use serde::{Deserialize, Deserializer};

use super::{BrokerData, PartnerId, PartnerRoster, PricingModel, PromoterData};
use crate::leads::domain::Platform;
use crate::simulation::ZoneFiscale;

#[derive(Debug, thiserror::Error)]
pub enum PartnerImportError {
    #[error("failed to read partner file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed partner csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: {message}")]
    Invalid { line: usize, message: String },
}

#[derive(Debug, Deserialize)]
struct PartnerRow {
    kind: String,
    id: String,
    name: String,
    email: String,
    zones: String,
    #[serde(default, deserialize_with = "flag")]
    active: bool,
    #[serde(default)]
    platforms: String,
    pricing: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    price_per_lead: Option<f64>,
}

fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "oui" | "yes" | "actif"
    ))
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .replace(',', ".")
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(['|', ';'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

fn parse_pricing(raw: &str) -> Option<PricingModel> {
    match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "abonnement" | "subscription" => Some(PricingModel::Abonnement),
        "par_lead" | "per_lead" => Some(PricingModel::ParLead),
        "commission" => Some(PricingModel::Commission),
        _ => None,
    }
}

impl PartnerRow {
    fn zones(&self, line: usize) -> Result<Vec<ZoneFiscale>, PartnerImportError> {
        split_list(&self.zones)
            .map(|zone| {
                zone.parse().map_err(|message| PartnerImportError::Invalid { line, message })
            })
            .collect()
    }

    fn platforms(&self, line: usize) -> Result<Vec<Platform>, PartnerImportError> {
        split_list(&self.platforms)
            .map(|platform| {
                platform
                    .parse()
                    .map_err(|message| PartnerImportError::Invalid { line, message })
            })
            .collect()
    }
}

/// Parse a partner export with columns
/// `kind,id,name,email,zones,active,platforms,pricing,price_per_lead`.
/// Lists use `|` or `;` as separator.
pub fn parse_partners<R: Read>(reader: R) -> Result<PartnerRoster, PartnerImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut roster = PartnerRoster::default();

    for (index, record) in csv_reader.deserialize::<PartnerRow>().enumerate() {
        let row = record?;
        // header is line 1
        let line = index + 2;
        let pricing = parse_pricing(&row.pricing).ok_or_else(|| PartnerImportError::Invalid {
            line,
            message: format!("unknown pricing model '{}'", row.pricing),
        })?;
        let zones = row.zones(line)?;

        match row.kind.trim().to_ascii_lowercase().as_str() {
            "promoteur" | "promoter" => {
                let platforms = row.platforms(line)?;
                roster.promoters.push(PromoterData {
                    id: PartnerId(row.id),
                    name: row.name,
                    email: row.email,
                    zones,
                    active: row.active,
                    platforms,
                    pricing,
                    price_per_lead: row.price_per_lead,
                });
            }
            "courtier" | "broker" => roster.brokers.push(BrokerData {
                id: PartnerId(row.id),
                name: row.name,
                email: row.email,
                zones,
                active: row.active,
                pricing,
                price_per_lead: row.price_per_lead,
            }),
            other => {
                return Err(PartnerImportError::Invalid {
                    line,
                    message: format!("unknown partner kind '{other}'"),
                })
            }
        }
    }

    Ok(roster)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "\
kind,id,name,email,zones,active,platforms,pricing,price_per_lead
promoteur,p-1,Promo Atlantique,leads@promo-atlantique.fr,B1|B2,true,jeanbrun,par_lead,\"32,5\"
courtier,c-1,Courtage Plus,contact@courtageplus.fr,A_BIS;A;B1,oui,,abonnement,
courtier,c-2,Ancien Courtier,old@courtier.fr,C,false,,commission,
";

    #[test]
    fn parses_promoters_and_brokers() {
        let roster = parse_partners(EXPORT.as_bytes()).expect("roster");
        assert_eq!(roster.promoters.len(), 1);
        assert_eq!(roster.brokers.len(), 2);

        let promoter = &roster.promoters[0];
        assert_eq!(promoter.zones, vec![ZoneFiscale::B1, ZoneFiscale::B2]);
        assert_eq!(promoter.platforms, vec![Platform::Jeanbrun]);
        assert_eq!(promoter.price_per_lead, Some(32.5));

        let broker = &roster.brokers[0];
        assert!(broker.active);
        assert_eq!(broker.pricing, PricingModel::Abonnement);
        assert_eq!(broker.zones.first(), Some(&ZoneFiscale::ABis));
        assert!(!roster.brokers[1].active);
    }

    #[test]
    fn rejects_unknown_zone_with_line_number() {
        let export = "\
kind,id,name,email,zones,active,platforms,pricing,price_per_lead
courtier,c-1,Courtage,c@c.fr,B1|Z,true,,commission,
";
        match parse_partners(export.as_bytes()) {
            Err(PartnerImportError::Invalid { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected invalid row, got {other:?}"),
        }
    }
}
