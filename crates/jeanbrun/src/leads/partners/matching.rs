use std::cmp::Ordering;

use super::{BrokerData, Partner, PromoterData};
use crate::leads::domain::Platform;
use crate::simulation::ZoneFiscale;

/// Subscription first, then per-lead by ascending price, then commission.
/// Remaining ties go to the lowest partner id.
fn priority<P: Partner>(left: &P, right: &P) -> Ordering {
    left.pricing()
        .rank()
        .cmp(&right.pricing().rank())
        .then_with(|| match (left.price_per_lead(), right.price_per_lead()) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| left.id().cmp(right.id()))
}

pub fn select_promoter(
    candidates: &[PromoterData],
    zone: ZoneFiscale,
    platform: Platform,
) -> Option<&PromoterData> {
    candidates
        .iter()
        .filter(|promoter| promoter.serves(zone) && promoter.accepts(platform))
        .min_by(|a, b| priority(*a, *b))
}

pub fn select_broker(candidates: &[BrokerData], zone: ZoneFiscale) -> Option<&BrokerData> {
    candidates
        .iter()
        .filter(|broker| broker.serves(zone))
        .min_by(|a, b| priority(*a, *b))
}
