use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use larder_core::service::RecipeProvider;
use larder_core::spoonacular::{
    CandidateRecipe, FIND_BY_INGREDIENTS_PATH, INFORMATION_BULK_PATH, RecipeInformation,
    RecipeQuery, RemoteServiceError, information_path, parse_candidates, parse_information,
    parse_information_bulk,
};

pub struct SpoonacularClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SpoonacularClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("larder/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// GET `path` with the API key attached. The raw response is returned so
    /// callers can decide what a given status means.
    async fn get(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<reqwest::Response, RemoteServiceError> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "spoonacular request");
        self.client
            .get(&url)
            .query(&[("apiKey", self.api_key.as_str())])
            .query(params)
            .send()
            .await
            .map_err(|e| RemoteServiceError::Transport(e.to_string()))
    }

    async fn json_body(response: reqwest::Response) -> Result<Value, RemoteServiceError> {
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteServiceError::Status {
                status: status.as_u16(),
            });
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| RemoteServiceError::UnexpectedShape(e.to_string()))
    }
}

#[async_trait]
impl RecipeProvider for SpoonacularClient {
    async fn find_by_ingredients(
        &self,
        query: &RecipeQuery,
    ) -> Result<Vec<CandidateRecipe>, RemoteServiceError> {
        let response = self.get(FIND_BY_INGREDIENTS_PATH, &query.to_params()).await?;
        parse_candidates(Self::json_body(response).await?)
    }

    async fn information_bulk(
        &self,
        ids: &[i64],
    ) -> Result<Vec<RecipeInformation>, RemoteServiceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let response = self.get(INFORMATION_BULK_PATH, &[("ids", ids)]).await?;
        parse_information_bulk(Self::json_body(response).await?)
    }

    async fn information(&self, id: i64) -> Result<Option<RecipeInformation>, RemoteServiceError> {
        let response = self
            .get(
                &information_path(id),
                &[("includeNutrition", "false".to_string())],
            )
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        parse_information(Self::json_body(response).await?)
    }
}
