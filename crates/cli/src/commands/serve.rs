//! `pmrelay serve` - Start the relay HTTP server.

use pmrelay_config::AppConfig;
use pmrelay_core::Error;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| Error::Config {
        message: e.to_string(),
    })?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("pmrelay");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Provider:  {}", config.provider.api_url);
    println!("   Model:     {}", config.provider.model);

    pmrelay_gateway::start(config).await?;

    Ok(())
}
