use anyhow::Result;
use clap::Parser;
use dataset_gateway::{
    client::{GatewayClient, render_health, render_list, render_upload},
    config::{
        AnalyticsConfig, Cli, ClientAction, ClientArgs, Command, GatewayConfig, client_gateway_url,
    },
    server,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Gateway(args) => server::run_gateway(GatewayConfig::from_env_and_args(args)?).await,
        Command::Analytics(args) => {
            server::run_analytics(AnalyticsConfig::from_env_and_args(args)?).await
        }
        Command::Client(args) => run_client(args).await,
    }
}

async fn run_client(args: ClientArgs) -> Result<()> {
    let client = GatewayClient::new(client_gateway_url(args.gateway_url));
    let report = match args.action {
        ClientAction::Health => render_health(&client.health().await?),
        ClientAction::Upload { path } => render_upload(&client.upload(&path).await?),
        ClientAction::List => render_list(&client.list().await?),
    };
    println!("{}", report);
    Ok(())
}
