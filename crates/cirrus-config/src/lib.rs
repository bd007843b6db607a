pub mod error;

pub use error::*;

use cirrus_cloud::{ImageLookup, ImageQuery, ProviderSettings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const CANDIDATES: [&str; 2] = ["cirrus.local.yaml", "cirrus.yaml"];

/// Declarative configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CirrusConfig {
    #[serde(flatten)]
    pub provider: ProviderSettings,

    /// Network areas by local name (the state address)
    #[serde(default)]
    pub network_areas: BTreeMap<String, NetworkAreaSpec>,

    /// Image lookups by local name
    #[serde(default)]
    pub images: BTreeMap<String, ImageSpec>,
}

/// A managed network area
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkAreaSpec {
    pub area_id: String,
    /// Declared ranges, in the order the user cares about. Required and
    /// non-empty: an empty set would delete every remote range.
    pub network_ranges: Vec<String>,
}

/// An image lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSpec {
    pub project_id: String,
    #[serde(default)]
    pub region: Option<String>,
    /// Direct id; skips name matching and filtering
    #[serde(default)]
    pub image_id: Option<String>,
    #[serde(flatten)]
    pub query: ImageQuery,
}

impl ImageSpec {
    pub fn lookup(&self) -> ImageLookup {
        match &self.image_id {
            Some(id) => ImageLookup::ById(id.clone()),
            None => ImageLookup::Query(self.query.clone()),
        }
    }
}

impl CirrusConfig {
    pub fn network_area(&self, name: &str) -> Option<&NetworkAreaSpec> {
        self.network_areas.get(name)
    }

    pub fn image(&self, name: &str) -> Option<&ImageSpec> {
        self.images.get(name)
    }

    /// Reject areas without ranges and image lookups that mix a direct id
    /// with a query
    pub fn validate(&self) -> Result<()> {
        for (name, area) in &self.network_areas {
            if area.network_ranges.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "network area `{}`: network_ranges must list at least one range",
                    name
                )));
            }
        }

        for (name, image) in &self.images {
            if image.image_id.is_some() && image.query.has_criteria() {
                return Err(ConfigError::Invalid(format!(
                    "image `{}`: image_id cannot be combined with name, name_regex or filter",
                    name
                )));
            }
        }

        Ok(())
    }
}

/// Load and validate a configuration file
pub fn load_config(path: &Path) -> Result<CirrusConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: CirrusConfig =
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    config.validate()?;

    tracing::debug!(
        "Loaded {} network area(s) and {} image(s) from {}",
        config.network_areas.len(),
        config.images.len(),
        path.display()
    );
    Ok(config)
}

/// Find the configuration file.
///
/// Search order:
/// 1. `CIRRUS_CONFIG_PATH`
/// 2. current directory: `cirrus.local.yaml`, `cirrus.yaml`
/// 3. `./.cirrus/` with the same names
/// 4. `~/.config/cirrus/cirrus.yaml`
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var("CIRRUS_CONFIG_PATH") {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!(
            "CIRRUS_CONFIG_PATH points to {} which does not exist",
            path.display()
        );
    }

    let current_dir = std::env::current_dir()?;
    for dir in [current_dir.clone(), current_dir.join(".cirrus")] {
        if let Some(path) = CANDIDATES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
        {
            return Ok(path);
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("cirrus").join("cirrus.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    const SAMPLE: &str = r#"
region: eu01
enable_beta_resources: true
network_areas:
  main:
    area_id: area-1
    network_ranges:
      - 10.0.1.0/24
      - 10.0.2.0/24
images:
  ubuntu:
    project_id: p-1
    name_regex: "^Ubuntu"
    sort_ascending: true
    filter:
      distro: ubuntu
      uefi: true
  pinned:
    project_id: p-1
    image_id: img-7
"#;

    #[test]
    fn test_load_sample() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cirrus.yaml");
        fs::write(&path, SAMPLE).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.provider.region.as_deref(), Some("eu01"));
        assert!(config.provider.enable_beta_resources);

        let area = config.network_area("main").unwrap();
        assert_eq!(area.network_ranges, vec!["10.0.1.0/24", "10.0.2.0/24"]);

        let ubuntu = config.image("ubuntu").unwrap();
        assert!(ubuntu.query.sort_ascending);
        assert_eq!(ubuntu.query.filter.distro.as_deref(), Some("ubuntu"));
        assert_eq!(ubuntu.query.filter.uefi, Some(true));
        assert!(matches!(ubuntu.lookup(), ImageLookup::Query(_)));

        let pinned = config.image("pinned").unwrap();
        assert_eq!(pinned.lookup(), ImageLookup::ById("img-7".to_string()));
    }

    #[test]
    fn test_image_id_conflicts_with_query() {
        let yaml = r#"
images:
  bad:
    project_id: p-1
    image_id: img-1
    name: Ubuntu
"#;
        let config: CirrusConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_image_id_with_empty_query_fields() {
        let yaml = r#"
images:
  pinned:
    project_id: p-1
    image_id: img-1
    name: ""
    name_regex: ""
"#;
        let config: CirrusConfig = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();
        assert_eq!(
            config.image("pinned").unwrap().lookup(),
            ImageLookup::ById("img-1".to_string())
        );
    }

    #[test]
    fn test_network_ranges_are_required() {
        let yaml = r#"
network_areas:
  main:
    area_id: area-1
"#;
        let err = serde_yaml::from_str::<CirrusConfig>(yaml).unwrap_err();
        assert!(err.to_string().contains("network_ranges"));
    }

    #[test]
    fn test_empty_network_ranges_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cirrus.yaml");
        fs::write(
            &path,
            "network_areas:\n  main:\n    area_id: area-1\n    network_ranges: []\n",
        )
        .unwrap();

        match load_config(&path) {
            Err(ConfigError::Invalid(message)) => assert!(message.contains("`main`")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_image_name_is_exact_match_query() {
        let yaml = r#"
images:
  debian:
    project_id: p-1
    name: Debian 12
"#;
        let config: CirrusConfig = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();

        let debian = config.image("debian").unwrap();
        assert_eq!(debian.query.name.as_deref(), Some("Debian 12"));
        assert!(!debian.query.sort_ascending);
        assert!(config.network_areas.is_empty());
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cirrus.yaml");
        fs::write(&path, "network_areas: [").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("cirrus.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_config_file_local_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("cirrus.yaml"), "{}").unwrap();
        fs::write(temp_dir.path().join("cirrus.local.yaml"), "{}").unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();
        let result = temp_env::with_var_unset("CIRRUS_CONFIG_PATH", find_config_file);
        std::env::set_current_dir(original_dir).unwrap();

        assert!(result.unwrap().ends_with("cirrus.local.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_config_file_in_cirrus_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        let cirrus_dir = temp_dir.path().join(".cirrus");
        fs::create_dir(&cirrus_dir).unwrap();
        fs::write(cirrus_dir.join("cirrus.yaml"), "{}").unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();
        let result = temp_env::with_var_unset("CIRRUS_CONFIG_PATH", find_config_file);
        std::env::set_current_dir(original_dir).unwrap();

        assert!(result.unwrap().ends_with(".cirrus/cirrus.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_config_file_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.yaml");
        fs::write(&config_path, "{}").unwrap();

        let result = temp_env::with_var(
            "CIRRUS_CONFIG_PATH",
            Some(config_path.to_str().unwrap()),
            find_config_file,
        );

        assert_eq!(result.unwrap(), config_path);
    }
}
