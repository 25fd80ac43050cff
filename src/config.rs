use std::fs;
use std::path::Path;
use std::time::Duration;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{FeedError, Result};

/// One detail-page family backed by its own endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionConfig {
    /// First path segment of entry URLs, e.g. `journalist` in `/journalist/42`.
    pub slug: String,
    #[serde(default)]
    pub label: String,
    pub endpoint: String,
    /// Form field carrying the requested id.
    pub id_field: String,
    /// Adds canonical link, keywords and article JSON-LD to the head.
    #[serde(default)]
    pub rich_meta: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub site_name: String,
    pub base_url: String,
    pub media_base_url: String,
    pub fallback_image: String,
    pub description_limit: usize,
    pub scroll_threshold: f64,
    pub scroll_throttle_ms: u64,
    pub rescan_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub sections: Vec<SectionConfig>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            site_name: "Portal News".to_string(),
            base_url: "http://localhost:3000".to_string(),
            media_base_url: "http://localhost:8000/storage".to_string(),
            fallback_image: "/images/og-default.jpg".to_string(),
            description_limit: 160,
            scroll_threshold: 200.0,
            scroll_throttle_ms: 100,
            rescan_delay_ms: 100,
            request_timeout_secs: 15,
            sections: vec![
                SectionConfig {
                    slug: "campus-corner".to_string(),
                    label: "Campus Corner".to_string(),
                    endpoint: "http://localhost:8000/api/campuscorner/detail".to_string(),
                    id_field: "campuscornerid".to_string(),
                    rich_meta: false,
                },
                SectionConfig {
                    slug: "journalist".to_string(),
                    label: "Journalist".to_string(),
                    endpoint: "http://localhost:8000/api/gujarat/detail".to_string(),
                    id_field: "gujaratid".to_string(),
                    rich_meta: true,
                },
            ],
        }
    }
}

impl PortalConfig {
    /// Load from YAML, or fall back to defaults when the file does not exist.
    pub fn load(config_path: &str) -> Result<Self> {
        if !Path::new(config_path).exists() {
            info!("Configuration file does not exist: {}, using defaults", config_path);
            return Ok(Self::default());
        }

        info!("Loading configuration from YAML file: {}", config_path);
        let contents = fs::read_to_string(config_path)?;
        let config = Self::from_yaml(&contents)?;
        debug!("Loaded {} sections", config.sections.len());
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: PortalConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.sections.is_empty() {
            return Err(FeedError::Config("at least one section is required".to_string()));
        }
        for section in &self.sections {
            if section.slug.trim().is_empty() || section.slug.contains('/') {
                return Err(FeedError::Config(format!("invalid section slug {:?}", section.slug)));
            }
            if section.id_field.trim().is_empty() {
                return Err(FeedError::Config(format!("section {} has no id_field", section.slug)));
            }
        }
        if self.description_limit < 4 {
            return Err(FeedError::Config("description_limit must be at least 4".to_string()));
        }
        Ok(())
    }

    pub fn section(&self, slug: &str) -> Result<&SectionConfig> {
        self.sections
            .iter()
            .find(|s| s.slug == slug)
            .ok_or_else(|| FeedError::UnknownSection(slug.to_string()))
    }

    pub fn scroll_throttle(&self) -> Duration {
        Duration::from_millis(self.scroll_throttle_ms)
    }

    pub fn rescan_delay(&self) -> Duration {
        Duration::from_millis(self.rescan_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_ship_both_sections() {
        let config = PortalConfig::default();
        assert_eq!(config.section("campus-corner").unwrap().id_field, "campuscornerid");
        let journalist = config.section("journalist").unwrap();
        assert_eq!(journalist.id_field, "gujaratid");
        assert!(journalist.rich_meta);
        assert_eq!(config.scroll_throttle(), Duration::from_millis(100));
    }

    #[test]
    fn unknown_section_is_an_error() {
        let config = PortalConfig::default();
        assert!(matches!(config.section("podcasts"), Err(FeedError::UnknownSection(s)) if s == "podcasts"));
    }

    #[test]
    fn yaml_overrides_keep_other_defaults() {
        let yaml = r#"
site_name: Gujarat Samachar
base_url: https://news.example.com
sections:
  - slug: journalist
    endpoint: https://api.example.com/gujarat/detail
    id_field: gujaratid
    rich_meta: true
"#;
        let config = PortalConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.site_name, "Gujarat Samachar");
        assert_eq!(config.description_limit, 160);
        assert_eq!(config.sections.len(), 1);
        assert_eq!(config.sections[0].label, "");
    }

    #[test]
    fn rejects_empty_sections_and_bad_slugs() {
        assert!(matches!(
            PortalConfig::from_yaml("sections: []"),
            Err(FeedError::Config(_))
        ));

        let yaml = r#"
sections:
  - slug: "a/b"
    endpoint: http://x
    id_field: id
"#;
        assert!(matches!(PortalConfig::from_yaml(yaml), Err(FeedError::Config(_))));
    }

    #[test]
    fn malformed_yaml_is_reported() {
        assert!(matches!(
            PortalConfig::from_yaml("sections: [unclosed"),
            Err(FeedError::Yaml(_))
        ));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = PortalConfig::load("/nonexistent/portal.yaml").unwrap();
        assert_eq!(config, PortalConfig::default());
    }
}
