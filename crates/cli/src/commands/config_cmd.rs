//! `momo config`: show the configuration file and effective settings.

use momo_config::AppConfig;
use momo_core::error::ProviderError;
use momo_core::provider::Provider;
use momo_providers::OpenAiCompatProvider;

pub async fn show(check: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let path = AppConfig::config_path();

    println!("Config file: {}", path.display());
    if !path.exists() {
        println!("(not created yet, defaults shown)");
    }
    println!("Memory file: {}", config.memory_path().display());
    println!();
    print!("{}", config.to_display_toml());

    if check {
        println!();
        let line = match OpenAiCompatProvider::from_config(&config) {
            Ok(provider) => endpoint_status(provider.base_url(), provider.health_check().await),
            Err(e) => format!("Endpoint: not checked ({e})"),
        };
        println!("{line}");
    }
    Ok(())
}

fn endpoint_status(base_url: &str, health: Result<bool, ProviderError>) -> String {
    match health {
        Ok(true) => format!("Endpoint: {base_url} is reachable"),
        Ok(false) => format!("Endpoint: {base_url} answered but rejected the request"),
        Err(e) => format!("Endpoint: {base_url} is unreachable ({e})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_status_lines() {
        let url = "https://api.example.com/v1";
        assert_eq!(
            endpoint_status(url, Ok(true)),
            "Endpoint: https://api.example.com/v1 is reachable"
        );
        assert!(endpoint_status(url, Ok(false)).contains("rejected"));
        let down = endpoint_status(url, Err(ProviderError::Network("connection refused".into())));
        assert!(down.contains("unreachable"));
        assert!(down.contains("connection refused"));
    }
}
