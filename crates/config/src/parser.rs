use crate::*;
use anyhow::{Context, Result};
use common::Mode;
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

#[instrument(skip(path))]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig> {
    let path = path.as_ref();
    info!("Loading configuration from: {:?}", path);

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    debug!("Config file content length: {} bytes", content.len());

    let config: EngineConfig =
        serde_yaml::from_str(&content).with_context(|| "Failed to parse YAML configuration")?;

    info!("Configuration loaded successfully");
    Ok(config)
}

#[instrument]
pub fn generate_default_config() -> EngineConfig {
    use defaults::*;

    EngineConfig {
        engine: EngineMeta {
            name: "OpenFeed".to_string(),
            version: "1.0.0".to_string(),
            mode: Mode::Demo,
        },
        instruments: vec![
            Instrument {
                symbol: "NIFTY".to_string(),
                name: "Nifty 50 Index".to_string(),
                base_price: 19500.0,
                volatility: 0.14,
                lot_size: 50,
                tick_size: 0.05,
                enabled: true,
            },
            Instrument {
                symbol: "BANKNIFTY".to_string(),
                name: "Bank Nifty Index".to_string(),
                base_price: 44500.0,
                volatility: 0.18,
                lot_size: 25,
                tick_size: 0.05,
                enabled: true,
            },
            Instrument {
                symbol: "FINNIFTY".to_string(),
                name: "Financial Services Index".to_string(),
                base_price: 19800.0,
                volatility: 0.16,
                lot_size: 25,
                tick_size: 0.05,
                enabled: true,
            },
        ],
        market_hours: default_market_hours(),
        simulation: default_simulation(),
        chain: default_chain(),
        cache: default_cache(),
        transport: default_transport(),
    }
}

#[instrument]
pub fn save_config<P: AsRef<Path> + std::fmt::Debug>(config: &EngineConfig, path: P) -> Result<()> {
    let path = path.as_ref();
    info!("Saving configuration to: {:?}", path);

    let yaml = serde_yaml::to_string(config)
        .with_context(|| "Failed to serialize configuration to YAML")?;

    fs::write(path, yaml).with_context(|| format!("Failed to write config file: {:?}", path))?;

    info!("Configuration saved successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_roundtrip() {
        let config = generate_default_config();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: EngineConfig = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(parsed.engine.name, config.engine.name);
        assert_eq!(parsed.instruments.len(), config.instruments.len());
        assert_eq!(parsed.cache.max_entries, config.cache.max_entries);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("openfeed.yaml");

        let config = generate_default_config();
        save_config(&config, &path).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.instruments[0].symbol, "NIFTY");
        assert_eq!(loaded.engine.mode, Mode::Demo);
    }

    #[test]
    fn test_minimal_config_applies_defaults() {
        let yaml = r#"
engine:
  name: test
  version: "0.1"
  mode: demo
instruments:
  - symbol: NIFTY
    name: Nifty 50
    base_price: 19500.0
    volatility: 0.14
    lot_size: 50
    tick_size: 0.05
"#;
        let config: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.simulation.tick_interval_ms, 1000);
        assert_eq!(config.chain.strike_count, 20);
        assert_eq!(config.transport.reconnect.max_attempts, 10);
        assert!(config.instruments[0].enabled);
    }
}
