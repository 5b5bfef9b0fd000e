use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Settings of the listings query pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub page_size: u32,
    pub api_timeout: Duration,
    pub cache_ttl: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            api_timeout: Duration::from_secs(5),
            cache_ttl: Duration::from_secs(5 * 60),
        }
    }
}

/// Settings of the listing-creation wizard
#[derive(Debug, Clone)]
pub struct WizardConfig {
    pub lookup_debounce: Duration,
    pub lookup_min_chars: usize,
    pub places_country: String,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            lookup_debounce: Duration::from_millis(300),
            lookup_min_chars: 3,
            places_country: "fr".to_string(),
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub listings_api_url: String,
    pub api_timeout_secs: u64,
    pub page_size: u32,
    pub cache_ttl_secs: u64,
    pub cache_dir: PathBuf,
    pub cloudinary_cloud_name: String,
    pub cloudinary_upload_preset: String,
    pub google_places_api_key: Option<String>,
    pub places_country: String,
    pub firebase_api_key: Option<String>,
}

fn parsed<T: FromStr>(name: &str, default: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .with_context(|| format!("{} must be a valid number", name))
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let config = Self {
            listings_api_url: env::var("LISTINGS_API_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            api_timeout_secs: parsed("API_TIMEOUT_SECS", "5")?,
            page_size: parsed("PAGE_SIZE", "10")?,
            cache_ttl_secs: parsed("CACHE_TTL_SECS", "300")?,
            cache_dir: env::var("CACHE_DIR")
                .unwrap_or_else(|_| ".coloc-cache".to_string())
                .into(),
            cloudinary_cloud_name: env::var("CLOUDINARY_CLOUD_NAME")
                .unwrap_or_else(|_| "colocation".to_string()),
            cloudinary_upload_preset: env::var("CLOUDINARY_UPLOAD_PRESET")
                .unwrap_or_else(|_| "colocations".to_string()),
            google_places_api_key: env::var("GOOGLE_PLACES_API_KEY").ok(),
            places_country: env::var("PLACES_COUNTRY").unwrap_or_else(|_| "fr".to_string()),
            firebase_api_key: env::var("FIREBASE_API_KEY").ok(),
        };

        if config.page_size == 0 {
            anyhow::bail!("PAGE_SIZE must be at least 1");
        }
        Ok(config)
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            page_size: self.page_size,
            api_timeout: Duration::from_secs(self.api_timeout_secs),
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
        }
    }

    pub fn wizard(&self) -> WizardConfig {
        WizardConfig {
            places_country: self.places_country.clone(),
            ..WizardConfig::default()
        }
    }
}
