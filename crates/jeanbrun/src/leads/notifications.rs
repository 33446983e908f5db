use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::Lead;
use super::partners::PartnerKind;
use crate::simulation::format_euros;

/// Outbound email handed to the sending collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessage {
    pub to: String,
    #[serde(default)]
    pub to_name: Option<String>,
    pub subject: String,
    pub html_content: String,
    pub text_content: String,
}

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("email transport unavailable: {0}")]
    Transport(String),
    #[error("email rejected by provider ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Email-sending collaborator. Implementations must not retry.
pub trait EmailSender: Send + Sync {
    fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

pub(crate) fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn amount(value: Option<f64>) -> String {
    value.map_or_else(|| "non renseigné".to_string(), format_euros)
}

fn snapshot_amount(lead: &Lead, pointer: &str) -> Option<f64> {
    lead.simulation
        .as_ref()
        .and_then(|snapshot| snapshot.pointer(pointer))
        .and_then(Value::as_f64)
}

/// Label/value rows shared by the text and HTML renderings.
fn lead_rows(lead: &Lead) -> Vec<(&'static str, String)> {
    let contact = &lead.contact;
    let mut rows = vec![
        ("Nom", contact.display_name()),
        ("Email", contact.email.clone().unwrap_or_default()),
        ("Téléphone", contact.telephone.clone().unwrap_or_default()),
        (
            "Zone",
            lead.zone()
                .map(|zone| zone.label().to_string())
                .unwrap_or_else(|| "non renseignée".to_string()),
        ),
        ("Investissement", amount(lead.projet.montant_investissement)),
        ("Revenus mensuels", amount(lead.projet.revenus_mensuels)),
        ("Apport", amount(lead.projet.apport)),
        ("Score", format!("{}/100", lead.score)),
    ];
    if let Some(economie) = snapshot_amount(lead, "/result/economieImpotAnnuelle") {
        rows.push(("Économie d'impôt simulée", format!("{} / an", format_euros(economie))));
    }
    rows
}

fn render_text(intro: &str, rows: &[(&str, String)], outro: &str) -> String {
    let mut text = format!("{intro}\n\n");
    for (label, value) in rows {
        text.push_str(&format!("{label} : {value}\n"));
    }
    text.push('\n');
    text.push_str(outro);
    text
}

fn render_html(intro: &str, rows: &[(&str, String)], outro: &str) -> String {
    let mut html = format!("<p>{}</p><table>", escape_html(intro));
    for (label, value) in rows {
        html.push_str(&format!(
            "<tr><th align=\"left\">{}</th><td>{}</td></tr>",
            escape_html(label),
            escape_html(value)
        ));
    }
    html.push_str(&format!("</table><p>{}</p>", escape_html(outro)));
    html
}

/// Lead sheet sent to the matched promoter or broker.
pub fn partner_notification(
    lead: &Lead,
    kind: PartnerKind,
    partner_name: &str,
    partner_email: &str,
) -> EmailMessage {
    let zone = lead
        .zone()
        .map(|zone| zone.label().to_string())
        .unwrap_or_else(|| "?".to_string());
    let subject = format!(
        "[{}] Nouveau contact {} en zone {} (score {}/100)",
        lead.platform.site_name(),
        kind.label(),
        zone,
        lead.score
    );
    let intro = format!(
        "Bonjour {partner_name}, un investisseur a accepté d'être recontacté par un {}.",
        kind.label()
    );
    let outro = format!("Référence du contact : {}", lead.id);
    let rows = lead_rows(lead);

    EmailMessage {
        to: partner_email.to_string(),
        to_name: Some(partner_name.to_string()),
        subject,
        html_content: render_html(&intro, &rows, &outro),
        text_content: render_text(&intro, &rows, &outro),
    }
}

/// Confirmation sent to the prospect, with the unsubscribe link.
/// `None` when the lead carries no email address.
pub fn prospect_confirmation(lead: &Lead, public_url: &str) -> Option<EmailMessage> {
    let email = lead.contact.email.clone().filter(|e| !e.trim().is_empty())?;
    let name = lead.contact.display_name();
    let greeting = if name.is_empty() {
        "Bonjour,".to_string()
    } else {
        format!("Bonjour {name},")
    };
    let unsubscribe = format!(
        "{}/desinscription?token={}",
        public_url.trim_end_matches('/'),
        lead.unsubscribe_token
    );

    let mut rows = Vec::new();
    if let Some(amortissement) = snapshot_amount(lead, "/result/amortissementAnnuel") {
        rows.push(("Amortissement annuel", format_euros(amortissement)));
    }
    if let Some(economie) = snapshot_amount(lead, "/result/economieImpotAnnuelle") {
        rows.push(("Économie d'impôt", format!("{} / an", format_euros(economie))));
    }
    if let Some(cashflow) = snapshot_amount(lead, "/result/cashflowMensuel") {
        rows.push(("Cashflow mensuel", format_euros(cashflow)));
    }

    let intro = format!(
        "{greeting} merci pour votre demande sur {}. Un conseiller vous recontactera rapidement.",
        lead.platform.site_name()
    );
    let outro = format!("Pour ne plus être contacté : {unsubscribe}");

    Some(EmailMessage {
        to: email,
        to_name: (!name.is_empty()).then_some(name),
        subject: format!("Votre simulation {}", lead.platform.site_name()),
        html_content: render_html(&intro, &rows, &outro),
        text_content: render_text(&intro, &rows, &outro),
    })
}
