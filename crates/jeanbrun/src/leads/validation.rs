use crate::validation::FieldErrors;

use super::domain::LeadSubmission;

const MAX_NAME_LEN: usize = 100;
const MAX_EMAIL_LEN: usize = 254;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{errors}")]
pub struct LeadValidationError {
    pub errors: FieldErrors,
}

pub fn is_valid_email(raw: &str) -> bool {
    let email = raw.trim();
    if email.is_empty() || email.len() > MAX_EMAIL_LEN || email.contains(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        && !domain.ends_with('.')
}

/// Compact national form (`0612345678`) of a French number, if it is one.
pub fn normalize_french_phone(raw: &str) -> Option<String> {
    let compact: String = raw
        .chars()
        .filter(|ch| !matches!(ch, ' ' | '.' | '-' | '(' | ')'))
        .collect();
    let national = if let Some(rest) = compact.strip_prefix("+33") {
        format!("0{rest}")
    } else if let Some(rest) = compact.strip_prefix("0033") {
        format!("0{rest}")
    } else {
        compact
    };

    let bytes = national.as_bytes();
    let valid = bytes.len() == 10
        && bytes[0] == b'0'
        && (b'1'..=b'9').contains(&bytes[1])
        && bytes.iter().all(u8::is_ascii_digit);
    valid.then_some(national)
}

/// Field checks for a lead submission, nested simulation included.
pub fn validate_submission(submission: &LeadSubmission) -> Result<(), LeadValidationError> {
    let mut errors = FieldErrors::new();
    let contact = &submission.contact;

    match contact.email.as_deref().map(str::trim) {
        None | Some("") => errors.push("email", "l'adresse email est obligatoire"),
        Some(email) => errors.check(
            !is_valid_email(email),
            "email",
            "l'adresse email n'est pas valide",
        ),
    }

    if let Some(phone) = contact.telephone.as_deref().filter(|p| !p.trim().is_empty()) {
        errors.check(
            normalize_french_phone(phone).is_none(),
            "telephone",
            "le numéro de téléphone doit être un numéro français valide",
        );
    }

    for (field, value) in [("prenom", &contact.prenom), ("nom", &contact.nom)] {
        errors.check(
            value
                .as_deref()
                .is_some_and(|v| v.trim().chars().count() > MAX_NAME_LEN),
            field,
            "100 caractères maximum",
        );
    }

    for (field, value) in [
        ("montantInvestissement", submission.projet.montant_investissement),
        ("revenusMensuels", submission.projet.revenus_mensuels),
        ("apport", submission.projet.apport),
    ] {
        errors.check(
            value.is_some_and(|amount| !(amount.is_finite() && amount >= 0.0)),
            field,
            "le montant ne peut pas être négatif",
        );
    }

    if let Some(simulation) = &submission.simulation {
        if let Err(nested) = simulation.validate() {
            errors.extend_prefixed("simulation", nested);
        }
    }

    errors
        .into_result()
        .map_err(|errors| LeadValidationError { errors })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leads::domain::Contact;

    fn submission(email: Option<&str>, telephone: Option<&str>) -> LeadSubmission {
        LeadSubmission {
            contact: Contact {
                email: email.map(str::to_string),
                telephone: telephone.map(str::to_string),
                prenom: Some("Camille".to_string()),
                nom: Some("Martin".to_string()),
            },
            ..LeadSubmission::default()
        }
    }

    #[test]
    fn accepts_common_french_phone_notations() {
        assert_eq!(
            normalize_french_phone("06 12 34 56 78").as_deref(),
            Some("0612345678")
        );
        assert_eq!(
            normalize_french_phone("+33 6 12 34 56 78").as_deref(),
            Some("0612345678")
        );
        assert_eq!(
            normalize_french_phone("0033.1.23.45.67.89").as_deref(),
            Some("0123456789")
        );
        assert!(normalize_french_phone("0012345678").is_none());
        assert!(normalize_french_phone("06123").is_none());
    }

    #[test]
    fn email_is_required_and_checked() {
        let missing = validate_submission(&submission(None, None)).unwrap_err();
        assert!(missing.errors.contains("email"));

        let malformed = validate_submission(&submission(Some("camille@"), None)).unwrap_err();
        assert!(malformed.errors.contains("email"));

        assert!(validate_submission(&submission(Some("camille@example.fr"), None)).is_ok());
    }

    #[test]
    fn reports_every_invalid_field_at_once() {
        let mut lead = submission(Some("not-an-email"), Some("12"));
        lead.contact.nom = Some("x".repeat(101));
        lead.projet.apport = Some(-1.0);

        let error = validate_submission(&lead).unwrap_err();
        assert_eq!(error.errors.len(), 4);
        assert!(error.errors.contains("telephone"));
        assert!(error.errors.contains("nom"));
        assert!(error.errors.contains("apport"));
    }
}
