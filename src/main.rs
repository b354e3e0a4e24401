use clap::Parser;

use smart_lamp_bridge::cli::{self, Cli};
use smart_lamp_bridge::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();
    cli::run(cli).await
}
