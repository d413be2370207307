//! `pmrelay doctor` - Diagnose configuration and provider reachability.

use pmrelay_config::AppConfig;
use pmrelay_core::provider::Provider;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("pmrelay doctor");
    println!("==============\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  ok    Config file found at {}", config_path.display());
    } else {
        println!("  info  No config file, using defaults and environment");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ok    Configuration valid");
            config
        }
        Err(e) => {
            println!("  FAIL  Configuration invalid: {e}");
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  ok    API key configured");
    } else {
        println!("  warn  No API key configured (set OPENAI_API_KEY)");
        issues += 1;
    }

    match pmrelay_providers::build_from_config(&config) {
        Ok(provider) => match provider.health_check().await {
            Ok(true) => println!("  ok    Provider reachable at {}", provider.api_url()),
            Ok(false) => {
                println!("  FAIL  Provider at {} rejected the request", provider.api_url());
                issues += 1;
            }
            Err(e) => {
                println!("  FAIL  Provider unreachable: {e}");
                issues += 1;
            }
        },
        Err(e) => {
            println!("  FAIL  Could not build provider: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
