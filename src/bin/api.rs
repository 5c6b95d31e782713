use std::sync::Arc;
use tax_advisor_client::{
    api::start_server, backend::HttpBackend, config::ClientConfig, TaxAdvisor, TaxNormalizer,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(config.env_filter())
        .init();

    info!("Tax Advisor Client - API Server");
    info!("Port: {}", config.port);
    info!("Backend: {}", config.backend_base_url);

    let backend = Arc::new(HttpBackend::from_config(&config)?);

    let advisor = Arc::new(TaxAdvisor::new(
        TaxNormalizer::default(),
        backend.clone(),
        backend,
    ));

    info!("Advisor initialized, starting API server");

    start_server(advisor, &config.bind_addr()).await?;

    Ok(())
}
