//! `pmrelay config` - Show the effective configuration.

use pmrelay_config::AppConfig;
use pmrelay_core::Error;

pub fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| Error::Config {
        message: e.to_string(),
    })?;

    println!(
        "# {}",
        AppConfig::config_dir().join("config.toml").display()
    );
    println!("{}", config.to_redacted_toml());

    if !config.has_api_key() {
        println!("# No API key set (add provider.api_key or set OPENAI_API_KEY)");
    }

    Ok(())
}
