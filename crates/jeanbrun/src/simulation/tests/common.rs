use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::simulation::domain::{
    FinancementInput, NiveauLoyer, SimulationCalculInput, TypeBien, ZoneFiscale,
};
use crate::simulation::policy::Policy;

pub(super) fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 15).expect("valid date")
}

pub(super) fn policy() -> Policy {
    Policy::default_at(as_of())
}

/// 60 000 € household, two parts, 45 m² new-build in B1 at the intermediate tier.
pub(super) fn neuf_b1() -> SimulationCalculInput {
    SimulationCalculInput {
        revenu_net_imposable: 60_000.0,
        nombre_parts: 2.0,
        type_bien: TypeBien::Neuf,
        prix_acquisition: 250_000.0,
        montant_travaux: 0.0,
        surface: 45.0,
        zone: ZoneFiscale::B1,
        niveau_loyer: NiveauLoyer::Intermediaire,
        financement: None,
        revente: None,
        duree_detention: None,
        comparer_lmnp: false,
    }
}

pub(super) fn ancien_sous_travaux() -> SimulationCalculInput {
    SimulationCalculInput {
        type_bien: TypeBien::Ancien,
        prix_acquisition: 200_000.0,
        montant_travaux: 40_000.0,
        ..neuf_b1()
    }
}

pub(super) fn credit() -> FinancementInput {
    FinancementInput {
        apport: 20_000.0,
        taux_interet: 3.6,
        duree_annees: 20,
        taux_assurance: 0.3,
        revenus_mensuels: Some(5_000.0),
        autres_credits_mensuels: 0.0,
        charges_fixes_mensuelles: 0.0,
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body");
    serde_json::from_slice(&body).expect("json body")
}
