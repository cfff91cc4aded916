use crate::infra::{build_service, policy_store, read_json, usage_context, PolicyStore};
use chrono::Local;
use clap::Args;
use origingate::assessment::{
    parse_dossier, verify_raw, write_csv, AssessRequest, Assessment, AssessmentError,
    DecideRequest, Decision, OriginScore, PortfolioEvaluator, PortfolioSummary, ScoreRequest,
};
use origingate::config::AppConfig;
use origingate::error::AppError;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEFAULT_POLICY: &str = "enterprise_moderate";

#[derive(Args, Debug)]
pub(crate) struct PolicyArgs {
    /// Policy name, resolved as <policy-dir>/<name>.yaml
    #[arg(long, default_value = DEFAULT_POLICY)]
    pub(crate) policy: String,
    /// Override the configured policy directory
    #[arg(long)]
    pub(crate) policy_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct VerifyArgs {
    /// Dossier JSON file
    pub(crate) dossier: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Dossier JSON file
    pub(crate) dossier: PathBuf,
    /// Target jurisdiction (defaults to APP_TARGET_JURISDICTION)
    #[arg(long)]
    pub(crate) target: Option<String>,
    /// Print the raw JSON response instead of a summary
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct AssessArgs {
    /// Dossier JSON file
    pub(crate) dossier: PathBuf,
    #[command(flatten)]
    pub(crate) policy: PolicyArgs,
    /// Usage amount the policy's fee is charged on
    #[arg(long)]
    pub(crate) usage: Option<f64>,
    /// Target jurisdiction (defaults to APP_TARGET_JURISDICTION)
    #[arg(long)]
    pub(crate) target: Option<String>,
    /// Print the raw JSON response instead of a summary
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct DecideArgs {
    /// Origin Confidence Score in [0, 1]
    #[arg(long)]
    pub(crate) ocs: f64,
    /// Foreign Origin Index
    #[arg(long)]
    pub(crate) foi: f64,
    #[command(flatten)]
    pub(crate) policy: PolicyArgs,
    /// Usage amount the policy's fee is charged on
    #[arg(long)]
    pub(crate) usage: Option<f64>,
}

#[derive(Args, Debug)]
pub(crate) struct PortfolioArgs {
    /// Directory holding labels.json and the dossiers it lists
    pub(crate) dir: PathBuf,
    #[command(flatten)]
    pub(crate) policy: PolicyArgs,
    /// Target jurisdiction (defaults to APP_TARGET_JURISDICTION)
    #[arg(long)]
    pub(crate) target: Option<String>,
    /// Write per-dossier rows to this CSV file
    #[arg(long)]
    pub(crate) csv: Option<PathBuf>,
}

pub(crate) fn run_verify(args: VerifyArgs) -> Result<(), AppError> {
    let report = verify_raw(read_json(&args.dossier)?);
    if report.ok {
        println!("{}: OK", args.dossier.display());
        return Ok(());
    }

    println!("{}: FAILED", args.dossier.display());
    for error in &report.errors {
        println!("  - {error}");
    }
    Err(AppError::Input(format!(
        "{} failed verification",
        args.dossier.display()
    )))
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = build_service(
        policy_store(config.assessment.policy_dir.clone()),
        &config.assessment,
    );
    let dossier =
        parse_dossier(read_json(&args.dossier)?).map_err(AssessmentError::Verification)?;

    let score = service.score(ScoreRequest {
        dossier,
        weights: None,
        target_jurisdiction: args.target,
    })?;

    if args.json {
        return print_json(&score);
    }
    render_score(&score);
    Ok(())
}

pub(crate) fn run_assess(args: AssessArgs) -> Result<(), AppError> {
    let (config, policies) = load_policies(&args.policy)?;
    let context = usage_context(&policies, &args.policy.policy, args.usage)?;
    let service = build_service(policies, &config.assessment);
    let dossier =
        parse_dossier(read_json(&args.dossier)?).map_err(AssessmentError::Verification)?;

    let assessment = service.assess(AssessRequest {
        dossier,
        policy_name: args.policy.policy.clone(),
        context,
        target_jurisdiction: args.target,
    })?;

    if args.json {
        return print_json(&assessment);
    }
    render_assessment(&args.policy.policy, &assessment);
    Ok(())
}

pub(crate) fn run_decide(args: DecideArgs) -> Result<(), AppError> {
    let (config, policies) = load_policies(&args.policy)?;
    let context = usage_context(&policies, &args.policy.policy, args.usage)?;
    let service = build_service(policies, &config.assessment);

    let decision = service.decide(DecideRequest {
        ocs: args.ocs,
        foi: args.foi,
        policy_name: args.policy.policy.clone(),
        context,
    })?;

    println!(
        "Policy {} | OCS {:.4} | FOI {:.2}",
        args.policy.policy, args.ocs, args.foi
    );
    render_decision(&decision);
    Ok(())
}

pub(crate) fn run_portfolio(args: PortfolioArgs) -> Result<(), AppError> {
    let (config, policies) = load_policies(&args.policy)?;
    let target = args
        .target
        .unwrap_or_else(|| config.assessment.default_target.clone());

    let summary = PortfolioEvaluator::new(policies.as_ref())
        .with_target(target)
        .evaluate(&args.dir, &args.policy.policy)?;

    render_portfolio(&args.dir, &summary);

    if let Some(path) = args.csv {
        let file = File::create(&path)?;
        write_csv(&summary.rows, file)?;
        println!("Rows written to {}", path.display());
    }
    Ok(())
}

fn load_policies(args: &PolicyArgs) -> Result<(AppConfig, Arc<PolicyStore>), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(dir) = &args.policy_dir {
        config.assessment.policy_dir = dir.clone();
    }
    let policies = policy_store(config.assessment.policy_dir.clone());
    Ok((config, policies))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::Input(format!("unable to render response: {err}")))?;
    println!("{rendered}");
    Ok(())
}

fn render_score(score: &OriginScore) {
    println!("OCS {:.4} | FOI {:.2}", score.ocs, score.foi);
    println!(
        "Signals: O_b={:.2} O_c={:.2} O_s={:.2} O_h={:.2}",
        score.signals.build, score.signals.sbom, score.signals.signing, score.signals.hosting
    );
    println!("Explanations:");
    for line in &score.explanations {
        println!("  - {line}");
    }
}

fn render_assessment(policy: &str, assessment: &Assessment) {
    println!(
        "Policy {} | OCS {:.4} | FOI {:.2}",
        policy, assessment.ocs, assessment.foi
    );
    render_decision(&assessment.decision);
    println!("Explanations:");
    for line in &assessment.explanations {
        println!("  - {line}");
    }
}

fn render_decision(decision: &Decision) {
    println!(
        "Verdict: {} (allow={}, fee ${:.2})",
        decision.verdict, decision.allow, decision.fee_usd
    );
    println!("Actions: {}", decision.actions.join(", "));
    println!("Reasons:");
    for reason in &decision.reasons {
        println!("  - {reason}");
    }
}

fn render_portfolio(dir: &Path, summary: &PortfolioSummary) {
    println!(
        "Portfolio {} under {} ({})",
        dir.display(),
        summary.policy,
        Local::now().format("%Y-%m-%d %H:%M")
    );
    println!("Verdicts:");
    for (verdict, count) in &summary.verdicts {
        println!("  - {verdict}: {count}");
    }
    println!("Invalid dossiers: {}", summary.invalid);

    let detection = &summary.detection;
    println!(
        "Foreign detection: tp={} fp={} fn={} tn={} | precision {:.3} | recall {:.3}",
        detection.tp,
        detection.fp,
        detection.fn_,
        detection.tn,
        detection.precision,
        detection.recall
    );
}
