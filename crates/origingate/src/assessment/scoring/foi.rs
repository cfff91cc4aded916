use std::cmp::Ordering;

use serde::Serialize;

use super::super::dossier::{Criticality, Dossier};
use super::signals::Signal;

/// Risk ceiling for components supplied from the target jurisdiction.
pub const DOMESTIC_RISK_CAP: f64 = 0.15;
/// Number of contributors surfaced in explanations.
pub const TOP_CONTRIBUTORS: usize = 8;

const FOI_SCALE: f64 = 100.0;
const SBOM_SIGNAL_MIDPOINT: f64 = 50.0;

/// Weighted risk contributed by one SBOM component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoiContribution {
    pub name: String,
    pub criticality: Criticality,
    pub supplier: String,
    /// Risk after the domestic cap has been applied.
    pub risk: f64,
    pub contribution: f64,
}

impl FoiContribution {
    pub fn explanation(&self) -> String {
        format!(
            "FOI contrib {:.3}: {} ({}) supplier={} risk={:.2}",
            self.contribution, self.name, self.criticality, self.supplier, self.risk
        )
    }
}

/// Foreign Origin Index for a dossier, scaled by 100 and not rounded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForeignOriginIndex {
    pub value: f64,
    /// Every component, highest contribution first; ties keep SBOM order.
    pub contributions: Vec<FoiContribution>,
}

impl ForeignOriginIndex {
    pub fn top_contributors(&self) -> &[FoiContribution] {
        let end = self.contributions.len().min(TOP_CONTRIBUTORS);
        &self.contributions[..end]
    }

    pub fn explanations(&self) -> Vec<String> {
        self.top_contributors()
            .iter()
            .map(FoiContribution::explanation)
            .collect()
    }
}

pub fn compute_foi(dossier: &Dossier, target: &str) -> ForeignOriginIndex {
    let target = target.to_ascii_uppercase();
    let mut total = 0.0;
    let mut contributions = Vec::with_capacity(dossier.sbom.components.len());

    for component in &dossier.sbom.components {
        let supplier = component.supplier_jurisdiction.to_ascii_uppercase();
        let mut risk = component.foreign_control_risk;
        if supplier == target {
            risk = risk.min(DOMESTIC_RISK_CAP);
        }

        let contribution = component.criticality.weight() * risk;
        total += contribution;
        contributions.push(FoiContribution {
            name: component.name.clone(),
            criticality: component.criticality,
            supplier,
            risk,
            contribution,
        });
    }

    // `sort_by` is stable, so equal contributions stay in SBOM order.
    contributions.sort_by(|a, b| {
        b.contribution
            .partial_cmp(&a.contribution)
            .unwrap_or(Ordering::Equal)
    });

    ForeignOriginIndex {
        value: total * FOI_SCALE,
        contributions,
    }
}

/// Map a scaled FOI onto the SBOM origin signal `O_c = 1 / (1 + FOI / 50)`.
pub fn sbom_signal_value(foi: f64) -> f64 {
    let value = 1.0 / (1.0 + foi / SBOM_SIGNAL_MIDPOINT);
    value.clamp(0.0, 1.0)
}

pub(crate) fn sbom_signal(foi: f64) -> Signal {
    let value = sbom_signal_value(foi);
    Signal {
        value,
        explanation: format!("SBOM signal from FOI={foi:.2} -> O_c={value:.2}"),
    }
}
