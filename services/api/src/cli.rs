use crate::commands::{
    run_assess, run_decide, run_portfolio, run_score, run_verify, AssessArgs, DecideArgs,
    PortfolioArgs, ScoreArgs, VerifyArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use origingate::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "origingate",
    about = "Score software supply-chain origin and apply procurement policies",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Check a dossier file for structural and placeholder-signature problems
    Verify(VerifyArgs),
    /// Compute OCS, FOI and per-signal explanations for a dossier
    Score(ScoreArgs),
    /// Verify, score and decide a dossier under a named policy
    Assess(AssessArgs),
    /// Apply a policy to precomputed OCS/FOI values
    Decide(DecideArgs),
    /// Evaluate a labelled portfolio directory and report detection quality
    Portfolio(PortfolioArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the directory policies are loaded from
    #[arg(long)]
    pub(crate) policy_dir: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Verify(args) => run_verify(args),
        Command::Score(args) => run_score(args),
        Command::Assess(args) => run_assess(args),
        Command::Decide(args) => run_decide(args),
        Command::Portfolio(args) => run_portfolio(args),
    }
}
