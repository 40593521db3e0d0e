//! Sites on the Classic API (`/JSSResource/sites`)

use serde::{Deserialize, Serialize};

use super::common::{path_segment, CreatedId};
use super::{ApiError, Client};

const BASE_PATH: &str = "/JSSResource/sites";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Site {
    #[serde(default)]
    pub id: i64,
    pub name: String,
}

impl Site {
    pub fn new(name: &str) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    site: T,
}

pub struct SitesApi<'a> {
    client: &'a Client,
}

impl<'a> SitesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /JSSResource/sites/id/{id}
    pub async fn get(&self, id: i64) -> Result<Site, ApiError> {
        let envelope: Envelope<Site> = self.client.get(&id_path(id)).await?;
        Ok(envelope.site)
    }

    /// GET /JSSResource/sites/name/{name}
    pub async fn get_by_name(&self, name: &str) -> Result<Site, ApiError> {
        let envelope: Envelope<Site> = self.client.get(&name_path(name)).await?;
        Ok(envelope.site)
    }

    /// POST /JSSResource/sites/id/0, returning the new ID
    pub async fn create(&self, site: &Site) -> Result<i64, ApiError> {
        let envelope: Envelope<CreatedId> = self
            .client
            .post(&id_path(0), &Envelope { site: Body::from(site) })
            .await?;
        Ok(envelope.site.id)
    }

    /// PUT /JSSResource/sites/id/{id}
    pub async fn update(&self, id: i64, site: &Site) -> Result<(), ApiError> {
        self.client
            .put(&id_path(id), &Envelope { site: Body::from(site) })
            .await
    }

    /// PUT /JSSResource/sites/name/{name}
    pub async fn update_by_name(&self, name: &str, site: &Site) -> Result<(), ApiError> {
        self.client
            .put(&name_path(name), &Envelope { site: Body::from(site) })
            .await
    }

    /// DELETE /JSSResource/sites/id/{id}
    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.client.delete(&id_path(id)).await
    }

    /// DELETE /JSSResource/sites/name/{name}
    pub async fn delete_by_name(&self, name: &str) -> Result<(), ApiError> {
        self.client.delete(&name_path(name)).await
    }
}

#[derive(Serialize)]
struct Body<'a> {
    name: &'a str,
}

impl<'a> From<&'a Site> for Body<'a> {
    fn from(site: &'a Site) -> Self {
        Self { name: &site.name }
    }
}

fn id_path(id: i64) -> String {
    format!("{}/id/{}", BASE_PATH, id)
}

fn name_path(name: &str) -> String {
    format!("{}/name/{}", BASE_PATH, path_segment(name))
}
