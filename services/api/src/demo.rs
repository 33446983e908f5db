use crate::email::LoggingEmailSender;
use crate::infra::{load_engine, InMemoryLeadRepository};
use chrono::{Local, NaiveDate};
use clap::Args;
use jeanbrun::config::AppConfig;
use jeanbrun::error::AppError;
use jeanbrun::leads::{
    BrokerData, ConsentScope, Consents, Contact, DispatchReport, DispatchSettings,
    LeadCaptureService, LeadSubmission, NotificationOutcome, PartnerId, PartnerRoster, Platform,
    PricingModel, PromoterData, RetentionPolicy, RetentionService, Utm,
};
use jeanbrun::simulation::{
    format_euros, FinancementInput, NiveauLoyer, ReventeInput, SimulationCalculInput,
    SimulationCalculResult, SimulationEngine, SimulationOutcome, TypeBien, ZoneFiscale,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct SimulateArgs {
    /// Net taxable household income (EUR per year)
    #[arg(long)]
    pub(crate) revenu: f64,
    /// Number of tax parts
    #[arg(long, default_value_t = 1.0)]
    pub(crate) parts: f64,
    /// Property type (neuf or ancien)
    #[arg(long = "type", default_value = "neuf")]
    pub(crate) type_bien: TypeBien,
    /// Acquisition price (EUR)
    #[arg(long)]
    pub(crate) prix: f64,
    /// Living surface (m²)
    #[arg(long)]
    pub(crate) surface: f64,
    /// Fiscal zone (A bis, A, B1, B2 or C)
    #[arg(long)]
    pub(crate) zone: ZoneFiscale,
    /// Rent tier (intermediaire, social or libre)
    #[arg(long, default_value = "intermediaire")]
    pub(crate) niveau: NiveauLoyer,
    /// Renovation works for an existing property (EUR)
    #[arg(long, default_value_t = 0.0)]
    pub(crate) travaux: f64,
    /// Down payment (EUR), used with --taux and --duree
    #[arg(long, requires = "taux")]
    pub(crate) apport: Option<f64>,
    /// Annual loan rate in percent
    #[arg(long, requires = "duree")]
    pub(crate) taux: Option<f64>,
    /// Loan duration in years
    #[arg(long, requires = "taux")]
    pub(crate) duree: Option<u32>,
    /// Annual borrower insurance rate in percent
    #[arg(long, default_value_t = 0.0)]
    pub(crate) taux_assurance: f64,
    /// Holding period in years (defaults to the fiscal tables' value)
    #[arg(long)]
    pub(crate) detention: Option<u32>,
    /// Expected resale price; enables the capital-gain estimate
    #[arg(long)]
    pub(crate) revente: Option<f64>,
    /// Simulation date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
    /// Compare against the LMNP regimes
    #[arg(long)]
    pub(crate) lmnp: bool,
    /// Print the raw JSON result instead of the report
    #[arg(long)]
    pub(crate) json: bool,
}

impl SimulateArgs {
    pub(crate) fn input(&self) -> SimulationCalculInput {
        let financement = match (self.taux, self.duree) {
            (Some(taux_interet), Some(duree_annees)) => Some(FinancementInput {
                apport: self.apport.unwrap_or(0.0),
                taux_interet,
                duree_annees,
                taux_assurance: self.taux_assurance,
                revenus_mensuels: None,
                autres_credits_mensuels: 0.0,
                charges_fixes_mensuelles: 0.0,
            }),
            _ => None,
        };

        SimulationCalculInput {
            revenu_net_imposable: self.revenu,
            nombre_parts: self.parts,
            type_bien: self.type_bien,
            prix_acquisition: self.prix,
            montant_travaux: self.travaux,
            surface: self.surface,
            zone: self.zone,
            niveau_loyer: self.niveau,
            financement,
            revente: self.revente.map(|prix| ReventeInput {
                prix_revente: Some(prix),
            }),
            duree_detention: self.detention,
            comparer_lmnp: self.lmnp,
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Simulation date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
    /// Partner CSV export to use instead of the sample roster
    #[arg(long)]
    pub(crate) partners_csv: Option<PathBuf>,
    /// Platform stamped on the demo lead (jeanbrun or stop-loyer)
    #[arg(long, default_value = "jeanbrun")]
    pub(crate) platform: Platform,
}

pub(crate) fn run_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let input = args.input();
    input.validate()?;

    let config = AppConfig::load()?;
    let engine = load_engine(&config)?;
    let as_of = args.as_of.unwrap_or_else(|| Local::now().date_naive());
    let policy = engine.policy_at(as_of);

    let outcome = engine.simulate(&input, &policy);
    if args.json {
        let rendered = match &outcome {
            SimulationOutcome::Eligible(result) => serde_json::to_string_pretty(result),
            SimulationOutcome::Ineligible(reason) => serde_json::to_string_pretty(reason),
        }
        .map_err(std::io::Error::other)?;
        println!("{rendered}");
        return Ok(());
    }

    match outcome {
        SimulationOutcome::Eligible(result) => render_simulation(&input, &result),
        SimulationOutcome::Ineligible(reason) => {
            println!("Simulation Loi Jeanbrun ({as_of})");
            println!("- Non éligible: {}", reason.message);
        }
    }
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        as_of,
        partners_csv,
        platform,
    } = args;
    let as_of = as_of.unwrap_or_else(|| Local::now().date_naive());

    let roster = match partners_csv {
        Some(path) => PartnerRoster::from_csv_path(path)?,
        None => sample_roster(),
    };
    let engine = Arc::new(SimulationEngine::default());
    let repository = Arc::new(InMemoryLeadRepository::default());
    let outbox = LoggingEmailSender::with_outbox();

    let capture = LeadCaptureService::new(
        repository.clone(),
        Arc::new(roster),
        Arc::new(outbox.clone()),
        engine.clone(),
        platform,
        DispatchSettings::default(),
    );
    let retention = RetentionService::new(repository.clone(), RetentionPolicy::default());

    println!("Loi Jeanbrun pipeline demo ({as_of})");
    let input = sample_simulation();
    match engine.simulate(&input, &engine.policy_at(as_of)) {
        SimulationOutcome::Eligible(result) => render_simulation(&input, &result),
        SimulationOutcome::Ineligible(reason) => println!("- Non éligible: {}", reason.message),
    }

    let submission = LeadSubmission {
        contact: Contact {
            email: Some("Julie.Martin@example.fr".to_string()),
            telephone: Some("+33 6 12 34 56 78".to_string()),
            prenom: Some("Julie".to_string()),
            nom: Some("Martin".to_string()),
        },
        consents: Consents {
            promoteur: true,
            courtier: true,
            newsletter: false,
        },
        utm: Utm {
            source: Some("demo".to_string()),
            ..Utm::default()
        },
        simulation: Some(input),
        date_simulation: Some(as_of),
        ..LeadSubmission::default()
    };

    let captured = match capture.submit(submission) {
        Ok(captured) => captured,
        Err(err) => {
            println!("\nLead rejected: {err}");
            return Ok(());
        }
    };
    println!("\nLead captured");
    println!(
        "- id {} | platform {} | score {}/100",
        captured.lead.id, captured.lead.platform, captured.score.total
    );
    println!(
        "- completeness {} | financial capacity {} | maturity {} | engagement {}",
        captured.score.completeness,
        captured.score.financial_capacity,
        captured.score.project_maturity,
        captured.score.engagement
    );

    let report = captured.dispatch.await.map_err(std::io::Error::other)?;
    render_dispatch(&report);

    println!("\nOutbox ({} emails, logged only)", outbox.sent().len());
    for message in outbox.sent() {
        println!("  - {} <- {}", message.to, message.subject);
    }

    if let Some(stored) = repository.get(&captured.lead.id) {
        match retention.revoke_consents(&stored.unsubscribe_token, ConsentScope::Courtier) {
            Ok(lead) => println!(
                "\nUnsubscribe (courtier): promoteur={} courtier={} newsletter={}",
                lead.consents.promoteur, lead.consents.courtier, lead.consents.newsletter
            ),
            Err(err) => println!("\nUnsubscribe failed: {err}"),
        }
    }

    Ok(())
}

fn render_simulation(input: &SimulationCalculInput, result: &SimulationCalculResult) {
    let euros = |amount: i64| format_euros(amount as f64);

    println!(
        "Simulation Loi Jeanbrun (barème {}, politique {})",
        result.edition_bareme, result.version_politique
    );
    println!(
        "- {} en zone {} | loyer {} | {}",
        input.type_bien.label(),
        input.zone,
        input.niveau_loyer.label(),
        format_euros(input.cout_operation())
    );
    println!(
        "- TMI {:.0}% | quotient familial {}",
        result.tmi * 100.0,
        euros(result.quotient_familial)
    );
    println!(
        "- Base amortissable {} | amortissement annuel {} (plafond {})",
        euros(result.base_amortissable),
        euros(result.amortissement_annuel),
        euros(result.plafond_amortissement)
    );
    println!(
        "- Loyer estimé {} / mois | rendement brut {:.2}% | net {:.2}%",
        euros(result.loyer_mensuel),
        result.rendement_brut,
        result.rendement_net
    );
    println!(
        "- Impôt {} -> {} | économie {} / an, {} sur {} ans",
        euros(result.impot_avant),
        euros(result.impot_apres),
        euros(result.economie_impot_annuelle),
        euros(result.economie_impot_totale),
        result.duree_projection
    );
    println!("- Cash-flow {} / mois", euros(result.cashflow_mensuel));

    if let Some(financement) = &result.financement {
        println!(
            "Financement: {} empruntés | {} / mois | endettement {:.1}% ({})",
            euros(financement.montant_emprunte),
            euros(financement.mensualite_totale),
            financement.taux_endettement * 100.0,
            financement.verdict.label()
        );
    }

    println!("Projection:");
    for ligne in &result.projection {
        println!(
            "  {:>2}: loyers {} | amortissement {} | économie {} | cash-flow {} | patrimoine {}",
            ligne.annee,
            euros(ligne.loyers),
            euros(ligne.amortissement),
            euros(ligne.economie_impot),
            euros(ligne.cashflow),
            euros(ligne.patrimoine_net)
        );
    }

    if let Some(plus_value) = &result.plus_value {
        println!(
            "Revente après {} ans: plus-value {} | impôt {} | réintégration {}",
            plus_value.duree_detention,
            euros(plus_value.plus_value_brute),
            euros(plus_value.impot_total),
            euros(plus_value.amortissements_reintegres)
        );
    }

    if let Some(comparaison) = &result.comparaison {
        println!("Comparaison des régimes:");
        for synthese in &comparaison.regimes {
            println!(
                "  - {}: cash-flow {} | {} / mois",
                synthese.regime.label(),
                euros(synthese.cashflow_total),
                euros(synthese.cashflow_mensuel_moyen)
            );
        }
        println!("  meilleur: {}", comparaison.meilleur.label());
    }
}

fn render_dispatch(report: &DispatchReport) {
    println!("\nDispatch");
    println!(
        "- zone {} | status {}",
        report.zone.map_or("-", |zone| zone.label()),
        report.status.map_or("unknown", |status| status.label())
    );
    for notification in &report.notifications {
        let partner = notification
            .partner_id
            .as_ref()
            .map_or("-", |id| id.0.as_str());
        let outcome = match &notification.outcome {
            NotificationOutcome::Sent => "sent".to_string(),
            NotificationOutcome::Skipped(reason) => format!("skipped ({reason})"),
            NotificationOutcome::Failed(reason) => format!("failed ({reason})"),
        };
        println!("  - {:?} [{partner}]: {outcome}", notification.target);
    }
    for error in &report.errors {
        println!("  ! {error}");
    }
}

fn sample_simulation() -> SimulationCalculInput {
    SimulationCalculInput {
        revenu_net_imposable: 60_000.0,
        nombre_parts: 2.0,
        type_bien: TypeBien::Neuf,
        prix_acquisition: 250_000.0,
        montant_travaux: 0.0,
        surface: 45.0,
        zone: ZoneFiscale::B1,
        niveau_loyer: NiveauLoyer::Intermediaire,
        financement: Some(FinancementInput {
            apport: 20_000.0,
            taux_interet: 3.6,
            duree_annees: 20,
            taux_assurance: 0.3,
            revenus_mensuels: Some(5_000.0),
            autres_credits_mensuels: 0.0,
            charges_fixes_mensuelles: 0.0,
        }),
        revente: Some(ReventeInput::default()),
        duree_detention: None,
        comparer_lmnp: true,
    }
}

fn sample_roster() -> PartnerRoster {
    PartnerRoster::new(
        vec![PromoterData {
            id: PartnerId("promo-atlantique".to_string()),
            name: "Atlantique Promotion".to_string(),
            email: "leads@atlantique-promotion.fr".to_string(),
            zones: vec![ZoneFiscale::B1, ZoneFiscale::B2],
            active: true,
            platforms: Vec::new(),
            pricing: PricingModel::ParLead,
            price_per_lead: Some(35.0),
        }],
        vec![BrokerData {
            id: PartnerId("courtage-ouest".to_string()),
            name: "Courtage Ouest".to_string(),
            email: "contact@courtage-ouest.fr".to_string(),
            zones: vec![ZoneFiscale::B1],
            active: true,
            pricing: PricingModel::Abonnement,
            price_per_lead: None,
        }],
    )
}
