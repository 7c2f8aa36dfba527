#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = reforge_rust::run().await {
        eprintln!("reforge-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
