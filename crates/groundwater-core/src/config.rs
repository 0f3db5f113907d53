use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::{Result, anyhow};
use tracing::warn;

use crate::backend::DEFAULT_BACKEND_URL;
use crate::geolocation::{
    Coordinates, DeniedGeolocator, FixedGeolocator, Geolocator, IpGeolocator, DEFAULT_GEOIP_URL,
};
use crate::language::Language;

pub const BACKEND_URL_ENV: &str = "GROUNDWATER_BACKEND_URL";

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    pub backend_url: Option<String>,
    pub language: Option<String>,
    /// "auto", "off" or "deny"
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub geoip_url: Option<String>,
    pub log_level: Option<String>,
}

/// Where the startup position comes from
#[derive(Debug, Clone, PartialEq)]
pub enum LocationMode {
    Auto,
    Fixed(Coordinates),
    Denied,
    Off,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("groundwater-chat").join("config.json"))
    }

    /// Environment overrides the config file
    pub fn apply_env(self) -> Self {
        self.override_backend_url(std::env::var(BACKEND_URL_ENV).ok())
    }

    pub fn override_backend_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.backend_url = Some(url);
        }
        self
    }

    pub fn backend_url(&self) -> &str {
        self.backend_url.as_deref().unwrap_or(DEFAULT_BACKEND_URL)
    }

    pub fn language(&self) -> Language {
        match self.language.as_deref() {
            None => Language::default(),
            Some(code) => Language::from_code(code).unwrap_or_else(|| {
                warn!(code, "unsupported language, falling back to English");
                Language::default()
            }),
        }
    }

    pub fn location_mode(&self) -> LocationMode {
        match self.location.as_deref().map(str::to_lowercase).as_deref() {
            Some("off") => return LocationMode::Off,
            Some("deny") => return LocationMode::Denied,
            None | Some("auto") => {}
            Some(other) => warn!(mode = other, "unknown location mode, using auto"),
        }

        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => {
                LocationMode::Fixed(Coordinates { latitude, longitude })
            }
            _ => LocationMode::Auto,
        }
    }

    /// Position source for the configured mode, or `None` when location is off.
    pub fn geolocator(&self) -> Option<Arc<dyn Geolocator>> {
        match self.location_mode() {
            LocationMode::Off => None,
            LocationMode::Denied => Some(Arc::new(DeniedGeolocator)),
            LocationMode::Fixed(coordinates) => Some(Arc::new(FixedGeolocator::new(coordinates))),
            LocationMode::Auto => {
                let url = self.geoip_url.as_deref().unwrap_or(DEFAULT_GEOIP_URL);
                Some(Arc::new(IpGeolocator::new(url)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();

        assert_eq!(config.backend_url(), DEFAULT_BACKEND_URL);
        assert_eq!(config.language(), Language::En);
        assert_eq!(config.location_mode(), LocationMode::Auto);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"backend_url": "http://water.example/api", "language": "ta", "latitude": 11.6, "longitude": 78.1}"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.backend_url(), "http://water.example/api");
        assert_eq!(config.language(), Language::Ta);
        assert_eq!(
            config.location_mode(),
            LocationMode::Fixed(Coordinates {
                latitude: 11.6,
                longitude: 78.1
            })
        );
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_backend_url_override() {
        let config = Config {
            backend_url: Some("http://file/api".to_string()),
            ..Config::default()
        };

        let config = config.override_backend_url(Some("http://env/api".to_string()));
        assert_eq!(config.backend_url(), "http://env/api");

        let config = config.override_backend_url(None);
        assert_eq!(config.backend_url(), "http://env/api");

        let config = config.override_backend_url(Some("  ".to_string()));
        assert_eq!(config.backend_url(), "http://env/api");
    }

    #[test]
    fn test_unknown_language_falls_back_to_english() {
        let config = Config {
            language: Some("fr".to_string()),
            ..Config::default()
        };
        assert_eq!(config.language(), Language::En);
    }

    #[test]
    fn test_location_off_wins_over_coordinates() {
        let config = Config {
            location: Some("OFF".to_string()),
            latitude: Some(1.0),
            longitude: Some(2.0),
            ..Config::default()
        };
        assert_eq!(config.location_mode(), LocationMode::Off);
        assert!(config.geolocator().is_none());
    }

    #[test]
    fn test_location_deny() {
        let config = Config {
            location: Some("deny".to_string()),
            ..Config::default()
        };
        assert_eq!(config.location_mode(), LocationMode::Denied);
        assert!(config.geolocator().is_some());
    }

    #[test]
    fn test_half_coordinates_fall_back_to_auto() {
        let config = Config {
            latitude: Some(1.0),
            ..Config::default()
        };
        assert_eq!(config.location_mode(), LocationMode::Auto);
    }
}
