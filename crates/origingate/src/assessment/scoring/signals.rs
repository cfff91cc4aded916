use super::super::dossier::Dossier;

/// Region codes accepted as domestic when the target jurisdiction is `US`.
pub(crate) const US_BUILD_REGIONS: [&str; 6] = [
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "us-gov-east-1",
    "us-gov-west-1",
];

/// Hosting value used when the dossier does not say where it is hosted.
pub(crate) const NEUTRAL_HOSTING: f64 = 0.5;

/// Normalized origin signal in [0, 1] plus the line explaining it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Signal {
    pub value: f64,
    pub explanation: String,
}

impl Signal {
    fn binary(matched: bool, explanation: String) -> Self {
        Self {
            value: if matched { 1.0 } else { 0.0 },
            explanation,
        }
    }
}

pub(crate) fn build_signal(dossier: &Dossier, target: &str) -> Signal {
    let region = &dossier.provenance.build_region;

    if target.eq_ignore_ascii_case("US") {
        let lowered = region.to_ascii_lowercase();
        let domestic = US_BUILD_REGIONS.contains(&lowered.as_str());
        let label = if domestic { "US" } else { "non-US" };
        return Signal::binary(domestic, format!("Build region={region} -> {label}"));
    }

    Signal::binary(
        region.eq_ignore_ascii_case(target),
        format!("Build region={region} vs target={target}"),
    )
}

pub(crate) fn signing_signal(dossier: &Dossier, target: &str) -> Signal {
    let key_jurisdiction = dossier.signing.key_jurisdiction.to_ascii_uppercase();
    let target = target.to_ascii_uppercase();
    Signal::binary(
        key_jurisdiction == target,
        format!("Signing key jurisdiction={key_jurisdiction} vs target={target}"),
    )
}

pub(crate) fn hosting_signal(dossier: &Dossier, target: &str) -> Signal {
    let Some(jurisdiction) = dossier.hosting_jurisdiction() else {
        return Signal {
            value: NEUTRAL_HOSTING,
            explanation: "Hosting jurisdiction missing -> neutral 0.5".to_string(),
        };
    };

    let jurisdiction = jurisdiction.to_ascii_uppercase();
    let target = target.to_ascii_uppercase();
    Signal::binary(
        jurisdiction == target,
        format!("Hosting jurisdiction={jurisdiction} vs target={target}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::dossier::Hosting;
    use crate::assessment::tests::common::domestic_dossier;

    #[test]
    fn us_target_matches_enumerated_regions_only() {
        let mut dossier = domestic_dossier();
        dossier.provenance.build_region = "US-GOV-WEST-1".to_string();
        assert_eq!(build_signal(&dossier, "us").value, 1.0);

        dossier.provenance.build_region = "us-central-9".to_string();
        let signal = build_signal(&dossier, "US");
        assert_eq!(signal.value, 0.0);
        assert_eq!(signal.explanation, "Build region=us-central-9 -> non-US");

        dossier.provenance.build_region = "US".to_string();
        assert_eq!(build_signal(&dossier, "US").value, 0.0);
    }

    #[test]
    fn non_us_target_compares_region_verbatim() {
        let mut dossier = domestic_dossier();
        dossier.provenance.build_region = "eu".to_string();
        assert_eq!(build_signal(&dossier, "EU").value, 1.0);

        dossier.provenance.build_region = "eu-central-1".to_string();
        assert_eq!(build_signal(&dossier, "EU").value, 0.0);
    }

    #[test]
    fn signing_is_case_insensitive() {
        let mut dossier = domestic_dossier();
        dossier.signing.key_jurisdiction = "us".to_string();
        let signal = signing_signal(&dossier, "Us");
        assert_eq!(signal.value, 1.0);
        assert_eq!(signal.explanation, "Signing key jurisdiction=US vs target=US");
    }

    #[test]
    fn missing_hosting_is_neutral() {
        let mut dossier = domestic_dossier();
        dossier.hosting = None;
        assert_eq!(hosting_signal(&dossier, "US").value, NEUTRAL_HOSTING);

        dossier.hosting = Some(Hosting::default());
        assert_eq!(hosting_signal(&dossier, "US").value, NEUTRAL_HOSTING);

        dossier.hosting = Some(Hosting {
            jurisdiction: Some("SG".to_string()),
            ..Hosting::default()
        });
        assert_eq!(hosting_signal(&dossier, "US").value, 0.0);
    }
}
