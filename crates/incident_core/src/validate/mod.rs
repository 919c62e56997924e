use crate::domain::{Incident, IncidentInput, ValidationWarning};
use crate::error::AppError;

fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::new(
            "VALIDATION_REQUIRED_FIELD",
            "Title and description are required.",
        )
        .with_details(format!("field={field}")));
    }
    Ok(())
}

/// Reject a title/description pair if either is blank after trimming.
pub fn validate_fields(title: &str, description: &str) -> Result<(), AppError> {
    require_text("title", title)?;
    require_text("description", description)
}

pub fn validate_input(input: &IncidentInput) -> Result<(), AppError> {
    validate_fields(&input.title, &input.description)
}

/// Checks applied to records read back from storage. An empty result means the record is
/// acceptable; any warning means it should be dropped.
pub fn validate_stored_incident(incident: &Incident) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if incident.id <= 0 {
        warnings.push(
            ValidationWarning::new("VALIDATION_ID_NOT_POSITIVE", "Incident id must be positive")
                .with_details(format!("id={}", incident.id)),
        );
    }

    for (field, value) in [
        ("title", &incident.title),
        ("description", &incident.description),
    ] {
        if value.trim().is_empty() {
            warnings.push(
                ValidationWarning::new(
                    "VALIDATION_REQUIRED_FIELD",
                    format!("Stored incident has an empty {field}"),
                )
                .with_details(format!("id={}", incident.id)),
            );
        }
    }

    warnings
}
