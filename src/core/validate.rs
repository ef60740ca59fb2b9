//! Structural validation of raw study payloads
//!
//! Turns one raw JSON object into a typed [`Study`] record or a
//! [`ValidationFailure`]. Validation is per record; a failure is routed to
//! the dead-letter queue by the orchestrator and never aborts the run, which
//! is why it is a dedicated type rather than an [`crate::domain::EtlError`]
//! variant.

use crate::domain::study::Study;
use serde_json::Value;

/// Diagnostic produced when a raw study fails structural validation
#[derive(Debug, Clone)]
pub struct ValidationFailure {
    pub message: String,
}

impl ValidationFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Validation error: {}", self.message)
    }
}

/// Best-effort extraction of the NCT ID for diagnostics
///
/// Reads `protocolSection.identificationModule.nctId` without requiring the
/// rest of the payload to be well-formed, so dead-letter entries can still
/// reference the study that produced them.
pub fn extract_nct_id(raw: &Value) -> Option<String> {
    raw.get("protocolSection")?
        .get("identificationModule")?
        .get("nctId")?
        .as_str()
        .map(|s| s.to_string())
}

/// Validate one raw study payload into a typed record
///
/// A record is invalid only if the NCT ID is missing or empty, or a present
/// field has the wrong JSON kind. Unknown fields pass through untouched.
pub fn validate_study(raw: &Value) -> Result<Study, ValidationFailure> {
    let study: Study = serde_json::from_value(raw.clone())
        .map_err(|e| ValidationFailure::new(e.to_string()))?;

    if study.nct_id().trim().is_empty() {
        return Err(ValidationFailure::new("nctId is empty"));
    }

    Ok(study)
}
