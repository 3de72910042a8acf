use anyhow::Result;
use errorify::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
