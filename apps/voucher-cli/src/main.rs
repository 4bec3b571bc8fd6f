//! `voucher` binary entry point.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    voucher_cli::run().await
}
