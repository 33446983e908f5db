use crate::demo::{run_demo, run_simulate, DemoArgs, SimulateArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use jeanbrun::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Simulateur Loi Jeanbrun",
    about = "Run the Loi Jeanbrun simulation service or simulate from the command line",
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
    /// Simulate an investment and print the tax projection
    Simulate(SimulateArgs),
    /// Run a simulation, capture a lead and dispatch it with in-memory adapters
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
        Command::Simulate(args) => run_simulate(args),
        Command::Demo(args) => run_demo(args).await,
    }
}
