use clap::Parser;

use catalog_api::server::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    server::run(Cli::parse()).await
}
