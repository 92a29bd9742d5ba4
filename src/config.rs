use std::env;

use tracing::{info, warn};

pub struct Config {
    pub mongo_uri: String,
    pub database: String,
    /// Prefix of generated short links, without a trailing slash.
    pub base_url: String,
}

impl Config {
    /// Reads the environment, after loading `.env` when one is present.
    pub fn load() -> Self {
        if let Err(e) = dotenv::dotenv() {
            info!("No .env file loaded: {e}");
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let load = |key: &str, default: &str| match lookup(key) {
            Some(value) if !value.trim().is_empty() => value,
            Some(_) => {
                warn!("{key} is empty, using default: {default}");
                default.to_string()
            }
            None => {
                info!("{key} not set, using default: {default}");
                default.to_string()
            }
        };

        Self {
            mongo_uri: load("MONGO_URI", "mongodb://localhost:27017/"),
            database: load("MONGO_DATABASE", "foodgram"),
            base_url: load("FOODGRAM_BASE_URL", "http://localhost:8000")
                .trim_end_matches('/')
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.mongo_uri, "mongodb://localhost:27017/");
        assert_eq!(config.database, "foodgram");
        assert_eq!(config.base_url, "http://localhost:8000");
    }

    #[test]
    fn test_overrides_and_trims_base_url() {
        let config = Config::from_lookup(|key| match key {
            "MONGO_DATABASE" => Some("recipes".into()),
            "FOODGRAM_BASE_URL" => Some("https://foodgram.example/".into()),
            "MONGO_URI" => Some("  ".into()),
            _ => None,
        });
        assert_eq!(config.database, "recipes");
        assert_eq!(config.base_url, "https://foodgram.example");
        assert_eq!(config.mongo_uri, "mongodb://localhost:27017/");
    }
}
