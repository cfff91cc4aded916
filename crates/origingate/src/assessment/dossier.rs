use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Product name and version the dossier describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub version: String,
}

/// Content-addressed reference to the shipped artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub digest: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// Build provenance as declared by the builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub builder_id: String,
    pub build_region: String,
    pub timestamp: String,
    pub source_repo: String,
    pub commit: String,
}

/// Functional role of a dependency, used to weight its foreign-control risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criticality {
    Crypto,
    Auth,
    Network,
    Data,
    Ui,
    Other,
}

impl Criticality {
    pub const ALL: [Criticality; 6] = [
        Criticality::Crypto,
        Criticality::Auth,
        Criticality::Network,
        Criticality::Data,
        Criticality::Ui,
        Criticality::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Criticality::Crypto => "crypto",
            Criticality::Auth => "auth",
            Criticality::Network => "network",
            Criticality::Data => "data",
            Criticality::Ui => "ui",
            Criticality::Other => "other",
        }
    }

    /// Fixed weight applied to a component's risk when computing FOI.
    pub fn weight(&self) -> f64 {
        match self {
            Criticality::Crypto => 0.35,
            Criticality::Auth => 0.25,
            Criticality::Network => 0.20,
            Criticality::Data => 0.12,
            Criticality::Ui => 0.05,
            Criticality::Other => 0.03,
        }
    }
}

impl fmt::Display for Criticality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Single SBOM entry. `foreign_control_risk` is always within [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SbomComponent {
    pub name: String,
    pub version: String,
    pub supplier_jurisdiction: String,
    pub criticality: Criticality,
    #[serde(deserialize_with = "deserialize_risk")]
    pub foreign_control_risk: f64,
}

impl SbomComponent {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        supplier_jurisdiction: impl Into<String>,
        criticality: Criticality,
        foreign_control_risk: f64,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            supplier_jurisdiction: supplier_jurisdiction.into(),
            criticality,
            foreign_control_risk: clamp_risk(foreign_control_risk),
        }
    }
}

fn clamp_risk(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

fn deserialize_risk<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    if !raw.is_finite() {
        return Err(serde::de::Error::custom(
            "foreign_control_risk must be a finite number",
        ));
    }
    Ok(clamp_risk(raw))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sbom {
    pub format: String,
    pub components: Vec<SbomComponent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signing {
    pub key_jurisdiction: String,
    pub signature: String,
}

/// Where the product's control plane runs. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hosting {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_plane_region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<String>,
}

/// Supply-chain record for one artifact.
///
/// Dossiers are treated as immutable once deserialized; scoring only ever
/// borrows them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dossier {
    pub product: Product,
    pub artifact: Artifact,
    pub provenance: Provenance,
    pub sbom: Sbom,
    pub signing: Signing,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosting: Option<Hosting>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Dossier {
    pub fn hosting_jurisdiction(&self) -> Option<&str> {
        self.hosting
            .as_ref()
            .and_then(|hosting| hosting.jurisdiction.as_deref())
            .filter(|jurisdiction| !jurisdiction.is_empty())
    }
}
