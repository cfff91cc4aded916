//! Advisory dossier checks.
//!
//! These are format checks only: a `sha256:` prefix on the digest, a non-empty
//! signature string and a non-empty component list. Nothing here establishes
//! cryptographic trust in the artifact, the signature or any attestation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::dossier::Dossier;

const DIGEST_PREFIX: &str = "sha256:";

/// Outcome of validating and demo-verifying a dossier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub ok: bool,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl VerificationReport {
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            ok: errors.is_empty(),
            errors,
        }
    }

    pub fn summary(&self) -> String {
        if self.ok {
            "dossier verified".to_string()
        } else {
            format!("dossier rejected: {}", self.errors.join("; "))
        }
    }
}

/// Run the advisory checks against an already-parsed dossier.
pub fn verify_dossier(dossier: &Dossier) -> VerificationReport {
    let mut errors = Vec::new();

    if !dossier.artifact.digest.starts_with(DIGEST_PREFIX) {
        errors.push(format!("artifact.digest must start with '{DIGEST_PREFIX}'"));
    }

    if dossier.signing.signature.is_empty() {
        errors.push("missing signing.signature".to_string());
    }

    if dossier.sbom.components.is_empty() {
        errors.push("sbom.components empty".to_string());
    }

    VerificationReport::from_errors(errors)
}

/// Parse raw JSON into a dossier, reporting structural failures as data.
pub fn parse_dossier(raw: Value) -> Result<Dossier, VerificationReport> {
    serde_json::from_value::<Dossier>(raw).map_err(|err| {
        VerificationReport::from_errors(vec![format!("schema validation error: {err}")])
    })
}

/// Structural validation followed by the advisory checks.
pub fn verify_raw(raw: Value) -> VerificationReport {
    match parse_dossier(raw) {
        Ok(dossier) => verify_dossier(&dossier),
        Err(report) => report,
    }
}
