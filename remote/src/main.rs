#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gate_remote::host::run().await
}
