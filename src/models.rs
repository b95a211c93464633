//! Model listing and retrieval.

use reqwest::Method;
use serde::Deserialize;

use crate::client::Client;
use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Model {
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub owned_by: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelList {
    #[serde(default)]
    pub object: String,
    pub data: Vec<Model>,
}

impl Client {
    /// List the models available to the configured account.
    pub async fn list_models(&self) -> Result<ModelList, Error> {
        let req = self.request(Method::GET, "/models").build()?;
        self.send_request(req).await
    }

    /// Fetch one model by id.
    pub async fn retrieve_model(&self, id: &str) -> Result<Model, Error> {
        let req = self.request(Method::GET, &format!("/models/{id}")).build()?;
        self.send_request(req).await
    }
}
