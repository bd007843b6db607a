//! IaaS REST API client
//!
//! Thin wrappers over the network-area and image endpoints. Wire types stay
//! private to this module; callers get the mapped domain types.

use crate::error::{IaasError, Result};
use cirrus_cloud::{CloudError, Image, ImageConfig, ParamKind, ParamSchema, RemoteItem};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const DEFAULT_API_URL: &str = "https://iaas.api.cirrus.cloud";

/// Connection settings for the IaaS API
#[derive(Debug, Clone)]
pub struct IaasConfig {
    pub api_url: String,
    pub token: String,
    pub organization_id: Option<String>,
}

impl IaasConfig {
    /// Read `CIRRUS_TOKEN`, `CIRRUS_API_URL` and `CIRRUS_ORGANIZATION_ID`
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("CIRRUS_TOKEN")
            .map_err(|_| IaasError::MissingEnvVar("CIRRUS_TOKEN".to_string()))?;
        let api_url =
            std::env::var("CIRRUS_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let organization_id = std::env::var("CIRRUS_ORGANIZATION_ID").ok();

        Ok(Self {
            api_url,
            token,
            organization_id,
        })
    }
}

/// A network area as reported by the API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkArea {
    pub id: String,
    pub name: Option<String>,
    pub default_nameservers: Vec<String>,
    pub network_ranges: Vec<RemoteItem>,
}

/// IaaS API client
pub struct IaasClient {
    client: reqwest::Client,
    api_url: String,
    token: String,
    organization_id: Option<String>,
}

impl IaasClient {
    pub fn new(config: IaasConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token,
            organization_id: config.organization_id,
        }
    }

    fn organization_id(&self) -> Result<&str> {
        self.organization_id.as_deref().ok_or_else(|| {
            IaasError::InvalidConfig("organization id is required for network areas".to_string())
        })
    }

    fn area_url(&self, area_id: &str) -> Result<String> {
        Ok(format!(
            "{}/v1/organizations/{}/network-areas/{}",
            self.api_url,
            self.organization_id()?,
            area_id
        ))
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = request.bearer_auth(&self.token).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn send_empty(&self, request: reqwest::RequestBuilder) -> Result<()> {
        let response = request.bearer_auth(&self.token).send().await?;
        check_status(response).await?;
        Ok(())
    }

    /// Get a network area with its nameservers and ranges
    pub async fn get_network_area(&self, area_id: &str) -> Result<NetworkArea> {
        let url = self.area_url(area_id)?;
        tracing::debug!("GET {}", url);

        let area: ApiNetworkArea = self.send(self.client.get(&url)).await?;
        let ipv4 = area.ipv4.unwrap_or_default();

        Ok(NetworkArea {
            id: area
                .area_id
                .ok_or(CloudError::MissingField {
                    resource: "network area",
                    field: "areaId",
                })?,
            name: area.name,
            default_nameservers: ipv4.default_nameservers.unwrap_or_default(),
            network_ranges: to_remote_items(ipv4.network_ranges.unwrap_or_default())?,
        })
    }

    /// List the network ranges of an area
    pub async fn list_network_ranges(&self, area_id: &str) -> Result<Vec<RemoteItem>> {
        let url = format!("{}/network-ranges", self.area_url(area_id)?);
        tracing::debug!("GET {}", url);

        let list: ApiList<ApiNetworkRange> = self.send(self.client.get(&url)).await?;
        to_remote_items(list.items)
    }

    /// Create one network range; returns the created item
    pub async fn create_network_range(&self, area_id: &str, prefix: &str) -> Result<RemoteItem> {
        let url = format!("{}/network-ranges", self.area_url(area_id)?);
        tracing::debug!("POST {} prefix={}", url, prefix);

        let body = CreateNetworkRangesRequest {
            ipv4: vec![NetworkRangePrefix {
                prefix: prefix.to_string(),
            }],
        };
        let list: ApiList<ApiNetworkRange> = self.send(self.client.post(&url).json(&body)).await?;

        to_remote_items(list.items)?
            .into_iter()
            .find(|item| item.key == prefix)
            .ok_or_else(|| IaasError::Api {
                status: 200,
                message: format!("created range {} missing from response", prefix),
            })
    }

    /// Delete a network range by id
    pub async fn delete_network_range(&self, area_id: &str, range_id: &str) -> Result<()> {
        let url = format!("{}/network-ranges/{}", self.area_url(area_id)?, range_id);
        tracing::debug!("DELETE {}", url);

        self.send_empty(self.client.delete(&url)).await
    }

    /// List the images visible to a project in a region
    pub async fn list_images(&self, project_id: &str, region: &str) -> Result<Vec<Image>> {
        let url = format!(
            "{}/v2/projects/{}/regions/{}/images",
            self.api_url, project_id, region
        );
        tracing::debug!("GET {}", url);

        let list: ApiList<ApiImage> = self.send(self.client.get(&url)).await?;
        list.items.into_iter().map(to_image).collect()
    }

    /// Get a single image by id
    pub async fn get_image(&self, project_id: &str, region: &str, image_id: &str) -> Result<Image> {
        let url = format!(
            "{}/v2/projects/{}/regions/{}/images/{}",
            self.api_url, project_id, region, image_id
        );
        tracing::debug!("GET {}", url);

        let image: ApiImage = self.send(self.client.get(&url)).await?;
        to_image(image)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .and_then(|e| e.message)
        .unwrap_or(body);

    Err(IaasError::Api {
        status: status.as_u16(),
        message,
    })
}

fn to_remote_items(ranges: Vec<ApiNetworkRange>) -> Result<Vec<RemoteItem>> {
    ranges
        .into_iter()
        .map(|range| -> Result<RemoteItem> {
            let remote_id = range.network_range_id.ok_or(CloudError::MissingField {
                resource: "network range",
                field: "networkRangeId",
            })?;
            let prefix = range.prefix.ok_or(CloudError::MissingField {
                resource: "network range",
                field: "prefix",
            })?;
            Ok(RemoteItem::new(prefix, remote_id))
        })
        .collect()
}

/// Declared shapes of the image `config` bag
fn image_config_schema() -> ParamSchema {
    ParamSchema::new()
        .with("bootMenu", ParamKind::Bool)
        .with("cdromBus", ParamKind::Str)
        .with("diskBus", ParamKind::Str)
        .with("nicModel", ParamKind::Str)
        .with("operatingSystem", ParamKind::Str)
        .with("operatingSystemDistro", ParamKind::Str)
        .with("operatingSystemVersion", ParamKind::Str)
        .with("rescueBus", ParamKind::Str)
        .with("rescueDevice", ParamKind::Str)
        .with("secureBoot", ParamKind::Bool)
        .with("uefi", ParamKind::Bool)
        .with("videoModel", ParamKind::Str)
        .with("virtioScsi", ParamKind::Bool)
}

fn to_image(image: ApiImage) -> Result<Image> {
    let id = image.id.ok_or(CloudError::MissingField {
        resource: "image",
        field: "id",
    })?;

    let bag = image_config_schema().decode(&image.config.unwrap_or_default())?;
    let text = |key: &str| bag.str(key).map(str::to_string);

    let config = ImageConfig {
        operating_system: text("operatingSystem"),
        operating_system_distro: text("operatingSystemDistro"),
        operating_system_version: text("operatingSystemVersion"),
        uefi: bag.bool("uefi"),
        secure_boot: bag.bool("secureBoot"),
        boot_menu: bag.bool("bootMenu"),
        cdrom_bus: text("cdromBus"),
        disk_bus: text("diskBus"),
        nic_model: text("nicModel"),
        rescue_bus: text("rescueBus"),
        rescue_device: text("rescueDevice"),
        video_model: text("videoModel"),
        virtio_scsi: bag.bool("virtioScsi"),
    };

    let labels = image
        .labels
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| match value {
            Value::String(s) => (key, s),
            other => (key, other.to_string()),
        })
        .collect::<BTreeMap<_, _>>();

    Ok(Image {
        id,
        name: image.name,
        status: image.status,
        disk_format: image.disk_format,
        min_disk_size: image.min_disk_size,
        min_ram: image.min_ram,
        protected: image.protected,
        scope: image.scope,
        labels,
        config,
    })
}

// ============ API Types ============

#[derive(Debug, Deserialize)]
struct ApiList<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiNetworkArea {
    area_id: Option<String>,
    name: Option<String>,
    ipv4: Option<ApiAreaIpv4>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiAreaIpv4 {
    default_nameservers: Option<Vec<String>>,
    network_ranges: Option<Vec<ApiNetworkRange>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiNetworkRange {
    network_range_id: Option<String>,
    prefix: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateNetworkRangesRequest {
    ipv4: Vec<NetworkRangePrefix>,
}

#[derive(Debug, Serialize)]
struct NetworkRangePrefix {
    prefix: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiImage {
    id: Option<String>,
    name: Option<String>,
    status: Option<String>,
    disk_format: Option<String>,
    min_disk_size: Option<i64>,
    min_ram: Option<i64>,
    protected: Option<bool>,
    scope: Option<String>,
    labels: Option<Map<String, Value>>,
    config: Option<Map<String, Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{bearer_token, body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> IaasClient {
        IaasClient::new(IaasConfig {
            api_url: server.uri(),
            token: "test-token".to_string(),
            organization_id: Some("org-1".to_string()),
        })
    }

    #[tokio::test]
    async fn test_get_network_area() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/organizations/org-1/network-areas/area-1"))
            .and(bearer_token("test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "areaId": "area-1",
                "name": "main",
                "ipv4": {
                    "defaultNameservers": ["1.1.1.1", "8.8.8.8"],
                    "networkRanges": [
                        {"networkRangeId": "r1", "prefix": "10.0.0.0/24"}
                    ]
                }
            })))
            .mount(&server)
            .await;

        let area = client(&server).get_network_area("area-1").await.unwrap();
        assert_eq!(area.name.as_deref(), Some("main"));
        assert_eq!(area.default_nameservers, vec!["1.1.1.1", "8.8.8.8"]);
        assert_eq!(area.network_ranges, vec![RemoteItem::new("10.0.0.0/24", "r1")]);
    }

    #[tokio::test]
    async fn test_range_without_id_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/organizations/org-1/network-areas/area-1/network-ranges"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"prefix": "10.0.0.0/24"}]
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .list_network_ranges("area-1")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IaasError::Cloud(CloudError::MissingField {
                field: "networkRangeId",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_create_network_range() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/organizations/org-1/network-areas/area-1/network-ranges"))
            .and(body_json(json!({"ipv4": [{"prefix": "10.0.3.0/24"}]})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "items": [
                    {"networkRangeId": "r1", "prefix": "10.0.0.0/24"},
                    {"networkRangeId": "r4", "prefix": "10.0.3.0/24"}
                ]
            })))
            .mount(&server)
            .await;

        let created = client(&server)
            .create_network_range("area-1", "10.0.3.0/24")
            .await
            .unwrap();
        assert_eq!(created, RemoteItem::new("10.0.3.0/24", "r4"));
    }

    #[tokio::test]
    async fn test_api_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/organizations/org-1/network-areas/area-1/network-ranges/r9"))
            .respond_with(
                ResponseTemplate::new(409).set_body_json(json!({"message": "range in use"})),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .delete_network_range("area-1", "r9")
            .await
            .unwrap_err();
        match err {
            IaasError::Api { status, message } => {
                assert_eq!(status, 409);
                assert_eq!(message, "range in use");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_list_images_decodes_config() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/projects/p-1/regions/eu01/images"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "id": "img-1",
                    "name": "Ubuntu 24.04",
                    "diskFormat": "qcow2",
                    "labels": {"team": "infra", "tier": 2},
                    "config": {
                        "operatingSystem": "linux",
                        "operatingSystemDistro": "ubuntu",
                        "operatingSystemVersion": "24.04",
                        "uefi": true,
                        "secureBoot": false,
                        "somethingNew": [1, 2]
                    }
                }]
            })))
            .mount(&server)
            .await;

        let images = client(&server).list_images("p-1", "eu01").await.unwrap();
        assert_eq!(images.len(), 1);

        let image = &images[0];
        assert_eq!(image.config.operating_system_distro.as_deref(), Some("ubuntu"));
        assert_eq!(image.config.uefi, Some(true));
        assert_eq!(image.config.secure_boot, Some(false));
        assert_eq!(image.labels.get("tier").map(String::as_str), Some("2"));
    }

    #[tokio::test]
    async fn test_image_config_with_wrong_shape_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/projects/p-1/regions/eu01/images"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"id": "img-1", "config": {"uefi": "true"}}]
            })))
            .mount(&server)
            .await;

        let err = client(&server).list_images("p-1", "eu01").await.unwrap_err();
        assert!(matches!(
            err,
            IaasError::Cloud(CloudError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_missing_organization() {
        let client = IaasClient::new(IaasConfig {
            api_url: "http://localhost/".to_string(),
            token: "t".to_string(),
            organization_id: None,
        });
        assert!(matches!(
            client.area_url("a"),
            Err(IaasError::InvalidConfig(_))
        ));
    }

    #[test]
    #[serial_test::serial]
    fn test_config_from_env() {
        temp_env::with_vars(
            [
                ("CIRRUS_TOKEN", Some("secret")),
                ("CIRRUS_API_URL", None),
                ("CIRRUS_ORGANIZATION_ID", Some("org-9")),
            ],
            || {
                let config = IaasConfig::from_env().unwrap();
                assert_eq!(config.token, "secret");
                assert_eq!(config.api_url, DEFAULT_API_URL);
                assert_eq!(config.organization_id.as_deref(), Some("org-9"));
            },
        );

        temp_env::with_var_unset("CIRRUS_TOKEN", || {
            assert!(matches!(
                IaasConfig::from_env(),
                Err(IaasError::MissingEnvVar(_))
            ));
        });
    }
}
