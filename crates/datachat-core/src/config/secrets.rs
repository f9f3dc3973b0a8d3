use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const API_KEY_SECRET: &str = "OPENAI_API_KEY";
pub const ASSISTANT_ID_SECRET: &str = "OPENAI_ASSISTANT_ID";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing secret: '{0}'")]
    MissingSecret(&'static str),

    #[error("Cannot determine config directory")]
    NoConfigDir,

    #[error("Failed to read secrets file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid secrets file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A single key/value secret as stored on disk
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SecretEntry {
    pub key: String,
    pub value: String,
}

/// Contents of `secrets.json`
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SecretsFile {
    #[serde(default)]
    pub secrets: Vec<SecretEntry>,
}

impl SecretsFile {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.secrets
            .iter()
            .find(|s| s.key == key)
            .map(|s| s.value.as_str())
    }
}

/// Loads `SecretsFile` from `<config_dir>/datachat/secrets.json` or an explicit path
pub struct SecretsJsonRepository {
    file_path: PathBuf,
}

impl SecretsJsonRepository {
    /// Create repository with XDG-compliant path
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(Self {
            file_path: config_dir.join("datachat").join("secrets.json"),
        })
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// A missing file is an empty secret set, not an error
    pub async fn load(&self) -> Result<SecretsFile, ConfigError> {
        let path = self.file_path.clone();
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!(path = %path.display(), "No secrets file present");
            return Ok(SecretsFile::default());
        }

        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;

        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
    }
}

/// The two secrets the app cannot start without
#[derive(Clone)]
pub struct Secrets {
    api_key: String,
    assistant_id: String,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("api_key", &"<redacted>")
            .field("assistant_id", &self.assistant_id)
            .finish()
    }
}

impl Secrets {
    pub fn new(api_key: impl Into<String>, assistant_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            assistant_id: assistant_id.into(),
        }
    }

    /// Resolve each secret from `env` first, then from the secrets file.
    /// Blank values count as missing.
    pub fn resolve<F>(file: &SecretsFile, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &'static str| -> Result<String, ConfigError> {
            env(key)
                .or_else(|| file.get(key).map(str::to_string))
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::MissingSecret(key))
        };

        Ok(Self {
            api_key: lookup(API_KEY_SECRET)?,
            assistant_id: lookup(ASSISTANT_ID_SECRET)?,
        })
    }

    /// Resolve from `env` alone when it has both secrets; otherwise load the
    /// secrets file and fall back to it. The file is never touched, and its
    /// errors never surface, when the environment is complete.
    pub async fn load<F>(
        repo: Result<SecretsJsonRepository, ConfigError>,
        env: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Ok(secrets) = Self::resolve(&SecretsFile::default(), &env) {
            debug!("Secrets resolved from the environment");
            return Ok(secrets);
        }
        let file = repo?.load().await?;
        Self::resolve(&file, env)
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn assistant_id(&self) -> &str {
        &self.assistant_id
    }
}
