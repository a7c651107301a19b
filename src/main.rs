#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = surveyhub::run().await {
        eprintln!("surveyhub fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
