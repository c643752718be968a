//! Finance News Agent Gateway server binary.

use finagent_server::{start_server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(
        port = config.port,
        output_dir = %config.output_dir.display(),
        "starting finagent server"
    );

    start_server(config).await
}
