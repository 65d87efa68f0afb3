//! visitgen - fill an analytics site with the deterministic fixture dataset.
//!
//! Runs the full generation sequence against the endpoints named in the
//! configuration file and tears the location registry down afterwards.
#![doc(html_no_source)]

use visitgen::config::Config;
use visitgen::fixture::ManyVisitsFixture;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    //Enable logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_file = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());
    tracing::info!("Starting visitgen with {}", config_file);

    let config = match Config::new(&config_file) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Can not read configuration: {}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = run(config).await {
        tracing::error!("Fixture generation failed: {}", err);
        std::process::exit(1);
    }
    tracing::info!("Fixture dataset generated");
}

async fn run(config: Config) -> anyhow::Result<()> {
    let mut fixture = ManyVisitsFixture::new(config)?;
    let result = fixture.setup().await;
    fixture.teardown();
    result
}
