use crate::console::{self, PredictArgs, TrendsArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use wildflame::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Wild Flame Watcher",
    about = "Predict forest-fire risk from weather readings over HTTP or the terminal",
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
    /// Open an interactive prediction session in the terminal
    Session,
    /// Run a single prediction from NAME=VALUE assignments
    Predict(PredictArgs),
    /// Print yearly fire / no-fire counts from the historical records
    Trends(TrendsArgs),
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
        Command::Session => tokio::task::spawn_blocking(console::run_session).await?,
        Command::Predict(args) => {
            tokio::task::spawn_blocking(move || console::run_predict(args)).await?
        }
        Command::Trends(args) => console::run_trends(args),
    }
}
