use config::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;

const ENV_PREFIX: &str = "RELIEF_";

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub store: StoreSettings,
    pub events: EventSettings,
}

#[derive(Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: String,
}

#[derive(Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
}

#[derive(Deserialize, Clone)]
pub struct StoreSettings {
    /// Some store deployments have no edit endpoint; `PUT` then answers 501.
    pub allow_edit: bool,
}

#[derive(Deserialize, Clone)]
pub struct EventSettings {
    /// Per-subscriber backlog of the report event channel.
    pub capacity: usize,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());
        let env_map = collect_env_vars(std::env::vars());

        let s = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 4000)?
            .set_default("server.cors_origins", "*")?
            .set_default("database.url", "sqlite://data/relief.db")?
            .set_default("store.allow_edit", true)?
            .set_default("events.capacity", 100)?
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::File::with_name(&format!("config.{}", run_mode)).required(false))
            .add_source(config::File::from_str(
                &serde_json::to_string(&env_map)
                    .map_err(|e| ConfigError::Message(e.to_string()))?,
                config::FileFormat::Json,
            ))
            .build()?;

        s.try_deserialize()
    }
}

/// `RELIEF_SERVER__PORT=8080` becomes `server.port = "8080"`.
fn collect_env_vars(vars: impl Iterator<Item = (String, String)>) -> HashMap<String, String> {
    vars.filter(|(k, _)| k.starts_with(ENV_PREFIX))
        .map(|(k, v)| {
            let new_key = k
                .trim_start_matches(ENV_PREFIX)
                .replace("__", ".")
                .to_lowercase();
            (new_key, v)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        let vars = vec![
            ("RELIEF_SERVER__PORT".to_string(), "8080".to_string()),
            ("RELIEF_STORE__ALLOW_EDIT".to_string(), "false".to_string()),
            ("PATH".to_string(), "/usr/bin".to_string()),
        ];
        let map = collect_env_vars(vars.into_iter());
        assert_eq!(map.len(), 2);
        assert_eq!(map["server.port"], "8080");
        assert_eq!(map["store.allow_edit"], "false");
    }
}
