//! Image data source

use crate::client::IaasClient;
use crate::error::Result;
use cirrus_cloud::{CloudError, Image, ImageLookup, ProviderSession, Resolution, resolve_image};

/// Looks up a single image for a project
pub struct ImageDataSource<'a> {
    client: &'a IaasClient,
    session: &'a ProviderSession,
}

impl<'a> ImageDataSource<'a> {
    pub fn new(client: &'a IaasClient, session: &'a ProviderSession) -> Self {
        Self { client, session }
    }

    /// Resolve `lookup` in `project_id`.
    ///
    /// A direct id must exist. A query that matches nothing is logged and
    /// returns `None`.
    pub async fn read(
        &self,
        project_id: &str,
        region: Option<&str>,
        lookup: &ImageLookup,
    ) -> Result<Option<Image>> {
        let region = self.session.region(region)?;

        match lookup {
            ImageLookup::ById(image_id) => {
                match self.client.get_image(project_id, region, image_id).await {
                    Ok(image) => Ok(Some(image)),
                    Err(e) if e.is_not_found() => {
                        Err(CloudError::ResourceNotFound(format!("image {}", image_id)).into())
                    }
                    Err(e) => Err(e),
                }
            }
            ImageLookup::Query(query) => {
                let catalog = self.client.list_images(project_id, region).await?;
                tracing::debug!("Resolving image among {} candidate(s)", catalog.len());

                match resolve_image(&catalog, query)? {
                    Resolution::Found(image) => Ok(Some(image)),
                    Resolution::NoMatch => {
                        tracing::warn!(
                            "No image in project {} matches name={:?} name_regex={:?} filter={:?}",
                            project_id,
                            query.name,
                            query.name_regex,
                            query.filter
                        );
                        Ok(None)
                    }
                }
            }
        }
    }
}
