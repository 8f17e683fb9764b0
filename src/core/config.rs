use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub classifier: ClassifierConfig,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Which category strategy the classifier runs with. Severity is
/// rule-based under both.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassifierStrategy {
    Rules,
    Bayes,
}

impl FromStr for ClassifierStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rules" => Ok(Self::Rules),
            "bayes" | "model" => Ok(Self::Bayes),
            other => Err(format!("unknown classifier strategy: {other}")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ClassifierConfig {
    pub strategy: ClassifierStrategy,
    /// Optional TOML file overriding the built-in keyword taxonomy.
    pub rules_path: Option<PathBuf>,
    /// Where the trained model artifact lives (bayes strategy).
    pub model_path: PathBuf,
}

impl AppConfig {
    /// Read configuration from the environment. `.env` is loaded by
    /// the caller before this runs.
    pub fn from_env() -> Result<Self> {
        let host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .context("SERVER_PORT is not a valid port number")?;

        let url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let strategy = match env::var("CLASSIFIER_STRATEGY") {
            Ok(raw) => raw
                .parse::<ClassifierStrategy>()
                .map_err(anyhow::Error::msg)?,
            Err(_) => ClassifierStrategy::Rules,
        };
        let rules_path = env::var("CLASSIFIER_RULES_PATH").ok().map(PathBuf::from);
        let model_path = env::var("CLASSIFIER_MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/classifier-model.json"));

        Ok(Self {
            server: ServerConfig { host, port },
            database: DatabaseConfig { url },
            classifier: ClassifierConfig {
                strategy,
                rules_path,
                model_path,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_parses_both_variants() {
        assert_eq!(
            "rules".parse::<ClassifierStrategy>().unwrap(),
            ClassifierStrategy::Rules
        );
        assert_eq!(
            "BAYES".parse::<ClassifierStrategy>().unwrap(),
            ClassifierStrategy::Bayes
        );
        assert!("neural".parse::<ClassifierStrategy>().is_err());
    }
}
