use clap::Parser;
use server::{
    AppState,
    config::{BoardConfig, CliArgs},
    open_store, serve,
};
use tokio::net::TcpListener;
use utils::logging::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = CliArgs::parse();
    let config = BoardConfig::load(&cli)?;
    init_tracing(&config.log_level);

    let store = open_store(&config).await?;
    let listener = TcpListener::bind(&config.bind_addr).await?;
    serve(listener, AppState::new(store)).await
}
