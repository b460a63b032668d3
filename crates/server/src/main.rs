#[tokio::main]
async fn main() -> anyhow::Result<()> {
    studyrag_server::start().await
}
