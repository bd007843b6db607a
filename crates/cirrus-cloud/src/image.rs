//! Image resolution
//!
//! Picks exactly one image out of a catalog listing: match by exact name,
//! regex or nothing at all, stable-sort by name, apply the structured
//! filter, take the first survivor.

use crate::error::{CloudError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A catalog image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    pub name: Option<String>,
    pub status: Option<String>,
    pub disk_format: Option<String>,
    pub min_disk_size: Option<i64>,
    pub min_ram: Option<i64>,
    pub protected: Option<bool>,
    pub scope: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub config: ImageConfig,
}

/// Structured image attributes decoded from the remote `config` bag
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageConfig {
    pub operating_system: Option<String>,
    pub operating_system_distro: Option<String>,
    pub operating_system_version: Option<String>,
    pub uefi: Option<bool>,
    pub secure_boot: Option<bool>,
    pub boot_menu: Option<bool>,
    pub cdrom_bus: Option<String>,
    pub disk_bus: Option<String>,
    pub nic_model: Option<String>,
    pub rescue_bus: Option<String>,
    pub rescue_device: Option<String>,
    pub video_model: Option<String>,
    pub virtio_scsi: Option<bool>,
}

/// Structured filter. Unset fields impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFilter {
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub distro: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub uefi: Option<bool>,
    #[serde(default)]
    pub secure_boot: Option<bool>,
}

impl ImageFilter {
    pub fn is_empty(&self) -> bool {
        non_empty(&self.os).is_none()
            && non_empty(&self.distro).is_none()
            && non_empty(&self.version).is_none()
            && self.uefi.is_none()
            && self.secure_boot.is_none()
    }

    /// Whether `image` satisfies every specified field
    pub fn matches(&self, image: &Image) -> bool {
        let config = &image.config;

        str_condition(&self.os, &config.operating_system)
            && str_condition(&self.distro, &config.operating_system_distro)
            && str_condition(&self.version, &config.operating_system_version)
            && bool_condition(self.uefi, config.uefi)
            && bool_condition(self.secure_boot, config.secure_boot)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn str_condition(wanted: &Option<String>, actual: &Option<String>) -> bool {
    match non_empty(wanted) {
        None => true,
        Some(wanted) => actual.as_deref() == Some(wanted),
    }
}

fn bool_condition(wanted: Option<bool>, actual: Option<bool>) -> bool {
    match wanted {
        None => true,
        Some(wanted) => actual == Some(wanted),
    }
}

/// Selection criteria for the pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageQuery {
    /// Exact, case-sensitive name
    #[serde(default)]
    pub name: Option<String>,
    /// Regular expression matched against the name
    #[serde(default)]
    pub name_regex: Option<String>,
    #[serde(default)]
    pub filter: ImageFilter,
    /// Sort matches by name ascending instead of descending
    #[serde(default)]
    pub sort_ascending: bool,
}

impl ImageQuery {
    /// Whether any of name, name_regex or filter constrains the lookup.
    /// Empty strings count as unset.
    pub fn has_criteria(&self) -> bool {
        non_empty(&self.name).is_some()
            || non_empty(&self.name_regex).is_some()
            || !self.filter.is_empty()
    }
}

/// How the caller wants to find an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageLookup {
    /// Direct id; bypasses the pipeline entirely
    ById(String),
    Query(ImageQuery),
}

/// Outcome of a resolution
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found(Image),
    /// Nothing survived matching and filtering. Not an error.
    NoMatch,
}

impl Resolution {
    pub fn into_option(self) -> Option<Image> {
        match self {
            Resolution::Found(image) => Some(image),
            Resolution::NoMatch => None,
        }
    }
}

enum NameMatcher {
    Exact(String),
    Pattern(Regex),
    Any,
}

impl NameMatcher {
    fn from_query(query: &ImageQuery) -> Result<Self> {
        let name = non_empty(&query.name);
        let pattern = non_empty(&query.name_regex);

        match (name, pattern) {
            (Some(_), Some(_)) => Err(CloudError::InvalidInput(
                "name and name_regex are mutually exclusive".to_string(),
            )),
            (Some(name), None) => Ok(NameMatcher::Exact(name.to_string())),
            (None, Some(pattern)) => Regex::new(pattern)
                .map(NameMatcher::Pattern)
                .map_err(|e| {
                    CloudError::InvalidInput(format!("invalid name_regex {:?}: {}", pattern, e))
                }),
            (None, None) => Ok(NameMatcher::Any),
        }
    }

    fn matches(&self, image: &Image) -> bool {
        match self {
            NameMatcher::Any => true,
            NameMatcher::Exact(name) => image.name.as_deref() == Some(name.as_str()),
            NameMatcher::Pattern(re) => image.name.as_deref().is_some_and(|n| re.is_match(n)),
        }
    }
}

/// Order two optional names. Missing names sort last in both directions.
pub fn compare_names(a: Option<&str>, b: Option<&str>, ascending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if ascending => a.cmp(b),
        (Some(a), Some(b)) => b.cmp(a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Match, sort and filter `catalog`, best candidate first.
///
/// The sort is stable: equal names, and images without a name, keep their
/// catalog order.
pub fn rank_images<'a>(catalog: &'a [Image], query: &ImageQuery) -> Result<Vec<&'a Image>> {
    let matcher = NameMatcher::from_query(query)?;

    let mut matched: Vec<&Image> = catalog.iter().filter(|i| matcher.matches(i)).collect();

    if matched.len() > 1 {
        matched.sort_by(|a, b| {
            compare_names(a.name.as_deref(), b.name.as_deref(), query.sort_ascending)
        });
    }

    matched.retain(|i| query.filter.matches(i));
    Ok(matched)
}

/// Run match, sort, filter and select over `catalog`.
///
/// Must only be used when no direct image id was supplied.
pub fn resolve_image(catalog: &[Image], query: &ImageQuery) -> Result<Resolution> {
    let winner = rank_images(catalog, query)?.into_iter().next();

    Ok(match winner {
        Some(image) => {
            tracing::debug!("Resolved image {} ({:?})", image.id, image.name);
            Resolution::Found(image.clone())
        }
        None => Resolution::NoMatch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(id: &str, name: Option<&str>) -> Image {
        Image {
            id: id.to_string(),
            name: name.map(str::to_string),
            ..Default::default()
        }
    }

    fn os_image(id: &str, name: &str, os: &str, distro: &str, version: &str) -> Image {
        Image {
            config: ImageConfig {
                operating_system: Some(os.to_string()),
                operating_system_distro: Some(distro.to_string()),
                operating_system_version: Some(version.to_string()),
                ..Default::default()
            },
            ..image(id, Some(name))
        }
    }

    fn query() -> ImageQuery {
        ImageQuery::default()
    }

    fn sorted_names(catalog: &[Image], ascending: bool) -> Vec<Option<&str>> {
        let mut images: Vec<&Image> = catalog.iter().collect();
        images.sort_by(|a, b| compare_names(a.name.as_deref(), b.name.as_deref(), ascending));
        images.iter().map(|i| i.name.as_deref()).collect()
    }

    #[test]
    fn test_missing_names_sort_last() {
        let catalog = vec![image("1", None), image("2", Some("b")), image("3", Some("a"))];

        assert_eq!(
            sorted_names(&catalog, true),
            vec![Some("a"), Some("b"), None]
        );
        assert_eq!(
            sorted_names(&catalog, false),
            vec![Some("b"), Some("a"), None]
        );
    }

    #[test]
    fn test_exact_name_is_case_sensitive() {
        let catalog = vec![image("1", Some("Ubuntu 22.04")), image("2", Some("ubuntu 22.04"))];
        let q = ImageQuery {
            name: Some("ubuntu 22.04".to_string()),
            ..query()
        };

        let found = resolve_image(&catalog, &q).unwrap().into_option().unwrap();
        assert_eq!(found.id, "2");
    }

    #[test]
    fn test_regex_match_sorted_descending_by_default() {
        let catalog = vec![
            image("1", Some("Ubuntu 20.04")),
            image("2", Some("Ubuntu 24.04")),
            image("3", Some("Debian 12")),
            image("4", Some("Ubuntu 22.04")),
        ];
        let q = ImageQuery {
            name_regex: Some("^Ubuntu".to_string()),
            ..query()
        };

        let found = resolve_image(&catalog, &q).unwrap().into_option().unwrap();
        assert_eq!(found.id, "2");

        let q = ImageQuery {
            sort_ascending: true,
            ..q
        };
        let found = resolve_image(&catalog, &q).unwrap().into_option().unwrap();
        assert_eq!(found.id, "1");
    }

    #[test]
    fn test_invalid_regex_is_invalid_input() {
        let catalog = vec![image("1", Some("a"))];
        let q = ImageQuery {
            name_regex: Some("([".to_string()),
            ..query()
        };

        let err = resolve_image(&catalog, &q).unwrap_err();
        assert!(matches!(err, CloudError::InvalidInput(_)));
    }

    #[test]
    fn test_name_and_regex_are_exclusive() {
        let q = ImageQuery {
            name: Some("a".to_string()),
            name_regex: Some("a".to_string()),
            ..query()
        };

        assert!(matches!(
            resolve_image(&[], &q),
            Err(CloudError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_filter_checks_only_specified_fields() {
        let debian = os_image("1", "Debian 12", "linux", "debian", "12");
        let ubuntu = os_image("2", "Ubuntu 24.04", "linux", "ubuntu", "24.04");

        let os_only = ImageFilter {
            os: Some("linux".to_string()),
            ..Default::default()
        };
        assert!(os_only.matches(&debian));
        assert!(os_only.matches(&ubuntu));

        let os_and_distro = ImageFilter {
            os: Some("linux".to_string()),
            distro: Some("ubuntu".to_string()),
            ..Default::default()
        };
        assert!(!os_and_distro.matches(&debian));
        assert!(os_and_distro.matches(&ubuntu));
    }

    #[test]
    fn test_filter_fails_on_missing_attribute() {
        let bare = image("1", Some("bare"));
        let filter = ImageFilter {
            uefi: Some(false),
            ..Default::default()
        };

        assert!(!filter.matches(&bare));
        assert!(ImageFilter::default().matches(&bare));
        assert!(ImageFilter::default().is_empty());
    }

    #[test]
    fn test_empty_query_returns_first_after_sort() {
        let catalog = vec![image("1", Some("alpha")), image("2", None), image("3", Some("zeta"))];

        let descending = resolve_image(&catalog, &query()).unwrap();
        assert_eq!(descending.into_option().unwrap().id, "3");

        let ascending = ImageQuery {
            sort_ascending: true,
            ..query()
        };
        let found = resolve_image(&catalog, &ascending).unwrap();
        assert_eq!(found.into_option().unwrap().id, "1");
    }

    #[test]
    fn test_sort_is_stable_for_equal_and_missing_names() {
        let catalog = vec![
            image("1", None),
            image("2", Some("a")),
            image("3", None),
            image("4", Some("a")),
        ];

        for ascending in [true, false] {
            let q = ImageQuery {
                sort_ascending: ascending,
                ..query()
            };
            let ids: Vec<&str> = rank_images(&catalog, &q)
                .unwrap()
                .iter()
                .map(|i| i.id.as_str())
                .collect();
            assert_eq!(ids, vec!["2", "4", "1", "3"]);

            let winner = resolve_image(&catalog, &q).unwrap().into_option().unwrap();
            assert_eq!(winner.id, "2");
        }
    }

    #[test]
    fn test_missing_names_keep_catalog_order_under_filter() {
        let mut first = image("1", None);
        first.config.uefi = Some(false);
        let mut second = image("3", None);
        second.config.uefi = Some(true);
        let catalog = vec![first, image("2", Some("a")), second];

        let q = ImageQuery {
            filter: ImageFilter {
                uefi: Some(true),
                ..Default::default()
            },
            ..query()
        };
        let found = resolve_image(&catalog, &q).unwrap().into_option().unwrap();
        assert_eq!(found.id, "3");
    }

    #[test]
    fn test_has_criteria_ignores_empty_strings() {
        assert!(!query().has_criteria());
        assert!(
            !ImageQuery {
                name: Some(String::new()),
                name_regex: Some(String::new()),
                filter: ImageFilter {
                    os: Some(String::new()),
                    ..Default::default()
                },
                ..query()
            }
            .has_criteria()
        );
        assert!(
            ImageQuery {
                name: Some("Debian 12".to_string()),
                ..query()
            }
            .has_criteria()
        );
        assert!(
            ImageQuery {
                filter: ImageFilter {
                    secure_boot: Some(true),
                    ..Default::default()
                },
                ..query()
            }
            .has_criteria()
        );
    }

    #[test]
    fn test_filter_applied_after_sort() {
        let catalog = vec![
            os_image("1", "Ubuntu 22.04", "linux", "ubuntu", "22.04"),
            os_image("2", "Ubuntu 24.04 Minimal", "linux", "ubuntu-minimal", "24.04"),
            os_image("3", "Ubuntu 24.04", "linux", "ubuntu", "24.04"),
        ];
        let q = ImageQuery {
            name_regex: Some("Ubuntu".to_string()),
            filter: ImageFilter {
                distro: Some("ubuntu".to_string()),
                ..Default::default()
            },
            ..query()
        };

        let found = resolve_image(&catalog, &q).unwrap().into_option().unwrap();
        assert_eq!(found.id, "3");
    }

    #[test]
    fn test_no_match_is_not_an_error() {
        let catalog = vec![image("1", Some("Debian 12"))];
        let q = ImageQuery {
            name: Some("Windows".to_string()),
            ..query()
        };

        assert_eq!(resolve_image(&catalog, &q).unwrap(), Resolution::NoMatch);
        assert_eq!(resolve_image(&[], &query()).unwrap(), Resolution::NoMatch);
    }
}
