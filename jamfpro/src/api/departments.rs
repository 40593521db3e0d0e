//! Departments on the Jamf Pro API (`/api/v1/departments`)

use serde::{Deserialize, Serialize};

use super::common::{path_segment, ApiQueryParams, HrefResponse, ResultsPage};
use super::{ApiError, Client};

const BASE_PATH: &str = "/api/v1/departments";
const KIND: &str = "Department";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
}

impl Department {
    pub fn new(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
        }
    }
}

pub struct DepartmentsApi<'a> {
    client: &'a Client,
}

impl<'a> DepartmentsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/v1/departments/{id}
    pub async fn get(&self, id: &str) -> Result<Department, ApiError> {
        self.client
            .get(&format!("{}/{}", BASE_PATH, path_segment(id)))
            .await
    }

    /// GET /api/v1/departments?filter=name=="{name}"
    pub async fn get_by_name(&self, name: &str) -> Result<Department, ApiError> {
        let query = ApiQueryParams::new()
            .first_page(100)
            .filter_eq("name", name);
        let page: ResultsPage<Department> = self
            .client
            .get(&format!("{}{}", BASE_PATH, query.to_query_string()))
            .await?;

        page.results
            .into_iter()
            .find(|d| d.name == name)
            .ok_or_else(|| ApiError::NotFound {
                kind: KIND,
                name: name.to_string(),
            })
    }

    /// POST /api/v1/departments, returning the new ID
    pub async fn create(&self, department: &Department) -> Result<String, ApiError> {
        let created: HrefResponse = self.client.post(BASE_PATH, &Body::from(department)).await?;
        Ok(created.id)
    }

    /// PUT /api/v1/departments/{id}
    pub async fn update(&self, id: &str, department: &Department) -> Result<(), ApiError> {
        self.client
            .put(
                &format!("{}/{}", BASE_PATH, path_segment(id)),
                &Body::from(department),
            )
            .await
    }

    /// Resolves the ID for `name`, then updates by ID
    pub async fn update_by_name(&self, name: &str, department: &Department) -> Result<String, ApiError> {
        let id = self.id_for_name(name).await?;
        self.update(&id, department).await?;
        Ok(id)
    }

    /// DELETE /api/v1/departments/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&format!("{}/{}", BASE_PATH, path_segment(id)))
            .await
    }

    pub async fn delete_by_name(&self, name: &str) -> Result<(), ApiError> {
        let id = self.id_for_name(name).await?;
        self.delete(&id).await
    }

    async fn id_for_name(&self, name: &str) -> Result<String, ApiError> {
        let found = self.get_by_name(name).await?;
        found.id.ok_or_else(|| {
            ApiError::ParseError(format!("department '{}' was returned without an id", name))
        })
    }
}

// The ID travels in the path, never in the body.
#[derive(Serialize)]
struct Body<'a> {
    name: &'a str,
}

impl<'a> From<&'a Department> for Body<'a> {
    fn from(department: &'a Department) -> Self {
        Self {
            name: &department.name,
        }
    }
}
