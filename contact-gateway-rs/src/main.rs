// contact-gateway-rs/src/main.rs
// Contact Gateway - HTTP entry point for CRM contact aggregation and webhooks
// Port 8788 by default (CONTACT_GATEWAY_SERVICE_PORT / CONTACT_GATEWAY_SERVICE_ADDR)

use std::sync::Arc;

use contact_gateway::logging::{init_logging, LoggingConfig};
use contact_gateway::{ContactGateway, SERVICE_NAME};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // before init_logging: .env may set RUST_LOG and LOG_FORMAT
    let dotenv_path = config_rs::load_dotenv();
    init_logging(&LoggingConfig::from_env())?;
    match dotenv_path {
        Some(path) => tracing::debug!(path = %path.display(), "loaded environment file"),
        None => tracing::debug!("no environment file found"),
    }

    let gateway = ContactGateway::from_env()?;

    for (section, err) in gateway.config_problems() {
        tracing::warn!(section, error = %err, "configuration incomplete; dependent routes answer 500");
    }

    let app = Arc::new(gateway).create_router();

    let addr = config_rs::get_bind_address(SERVICE_NAME, config_rs::get_default_port(SERVICE_NAME));
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        service = %config_rs::get_formatted_service_name(SERVICE_NAME),
        %addr,
        "Contact gateway listening"
    );

    axum::serve(listener, app).await?;

    Ok(())
}
