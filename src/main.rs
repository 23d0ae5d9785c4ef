use clap::Parser;
use fire_planner::api::cli::{Cli, run};
use fire_planner::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);
    run(cli).await
}
