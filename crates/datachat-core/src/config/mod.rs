pub mod app_config;
pub mod secrets;

pub use app_config::AppConfig;
pub use secrets::{ConfigError, SecretEntry, Secrets, SecretsFile, SecretsJsonRepository};
