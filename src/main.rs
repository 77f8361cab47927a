use anyhow::Result;
use clap::{Parser, Subcommand};
use diversify::api::{ServeArgs, SimulateArgs, run_http_server, simulate_to_json};
use diversify::log::init_logging;

#[derive(Parser)]
#[command(
    name = "diversify",
    version,
    about = "Diversification and risk management game: portfolio allocation against a random threshold plus a market simulator"
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the game and its JSON API over HTTP
    Serve(ServeArgs),
    /// Print one simulated market run as JSON
    Simulate(SimulateArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Serve(args) => run_http_server(args).await.map_err(anyhow::Error::from),
        Commands::Simulate(args) => simulate_to_json(args)
            .map(|json| println!("{json}"))
            .map_err(anyhow::Error::msg),
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "diversify failed");
    }
    result
}
