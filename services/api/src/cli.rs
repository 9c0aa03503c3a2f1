use crate::demo::{
    run_batch, run_demo, run_evaluate, run_rules, BatchArgs, DemoArgs, EvaluateArgs, RulesArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use loan_expert::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Loan Expert",
    about = "Evaluate loan applicants with a forward and backward chaining rule engine",
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
    /// Evaluate a single applicant given on the command line
    Evaluate(EvaluateArgs),
    /// Evaluate every applicant in a JSON or CSV dataset
    Batch(BatchArgs),
    /// List the production rules and rule base statistics
    Rules(RulesArgs),
    /// Walk through the reference applicants with full reasoning traces
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Evaluate(args) => run_evaluate(args),
        Command::Batch(args) => run_batch(args),
        Command::Rules(args) => run_rules(args),
        Command::Demo(args) => run_demo(args),
    }
}
