use std::path::PathBuf;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_UPLOAD_FILE_NAME: &str = "dataset.csv";

/// Sampling temperature for every run
pub const RUN_TEMPERATURE: f32 = 0.0;

/// Non-secret runtime settings
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_base: String,
    /// Name the serialized dataset is uploaded under
    pub upload_file_name: String,
    /// Where generated images are written for terminals that cannot draw them
    pub image_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        let cache = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("datachat");
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            upload_file_name: DEFAULT_UPLOAD_FILE_NAME.to_string(),
            image_dir: cache.join("images"),
            log_dir: cache.join("logs"),
        }
    }
}

impl AppConfig {
    pub fn with_api_base(mut self, api_base: Option<String>) -> Self {
        if let Some(base) = api_base.filter(|b| !b.trim().is_empty()) {
            self.api_base = base;
        }
        self
    }

    pub fn with_image_dir(mut self, dir: Option<PathBuf>) -> Self {
        if let Some(dir) = dir {
            self.image_dir = dir;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_api_base_keeps_default() {
        let config = AppConfig::default().with_api_base(Some("  ".into()));
        assert_eq!(config.api_base, DEFAULT_API_BASE);

        let config = AppConfig::default().with_api_base(Some("http://localhost:8080/v1".into()));
        assert_eq!(config.api_base, "http://localhost:8080/v1");
    }
}
