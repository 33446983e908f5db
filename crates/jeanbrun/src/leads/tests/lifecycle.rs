use serde_json::json;

use super::common::*;
use crate::leads::domain::{ConsentScope, LeadStatus};
use crate::simulation::ZoneFiscale;

#[test]
fn status_follows_the_lead_lifecycle() {
    use LeadStatus::*;
    assert!(New.can_transition_to(Dispatched));
    assert!(New.can_transition_to(Lost));
    assert!(Dispatched.can_transition_to(Contacted));
    assert!(Contacted.can_transition_to(Converted));
    assert!(Contacted.can_transition_to(Lost));

    assert!(!New.can_transition_to(Converted));
    assert!(!Dispatched.can_transition_to(New));
    assert!(!Converted.can_transition_to(Lost));
    assert!(Lost.is_terminal());
}

#[test]
fn invalid_transition_leaves_lead_untouched() {
    let mut lead = stored_lead(now());
    let error = lead
        .transition(LeadStatus::Converted, now())
        .expect_err("not allowed from new");
    assert_eq!(error.to_string(), "lead cannot move from new to converted");
    assert_eq!(lead.status, LeadStatus::New);
}

#[test]
fn zone_comes_from_snapshot_then_declared_project() {
    let mut lead = stored_lead(now());
    assert_eq!(lead.zone(), Some(ZoneFiscale::B1));

    lead.simulation = Some(json!({ "zone": "A bis" }));
    assert_eq!(lead.zone(), Some(ZoneFiscale::ABis));

    lead.simulation = None;
    lead.projet.zone = Some(ZoneFiscale::C);
    assert_eq!(lead.zone(), Some(ZoneFiscale::C));
}

#[test]
fn consents_are_revocable_independently() {
    let mut lead = stored_lead(now());
    lead.revoke(ConsentScope::Courtier, now());
    assert!(lead.consents.promoteur);
    assert!(!lead.consents.courtier);
    assert!(lead.consents.newsletter);

    lead.revoke(ConsentScope::Tout, now());
    assert!(!lead.consents.promoteur && !lead.consents.newsletter);
}
