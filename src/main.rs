#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let matches = mastervolt::cli::parse_args();
    mastervolt::cli::actions::run(&matches).await
}
