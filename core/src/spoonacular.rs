//! Wire types for the Spoonacular recipe API.
//!
//! Responses are decoded from `serde_json::Value` so that shape violations
//! surface as [`RemoteServiceError::UnexpectedShape`] instead of passing
//! through untyped.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.spoonacular.com";
pub const FIND_BY_INGREDIENTS_PATH: &str = "/recipes/findByIngredients";
pub const INFORMATION_BULK_PATH: &str = "/recipes/informationBulk";

#[must_use]
pub fn information_path(id: i64) -> String {
    format!("/recipes/{id}/information")
}

#[must_use]
pub fn default_image_url(id: i64) -> String {
    format!("https://spoonacular.com/recipeImages/{id}-556x370.jpg")
}

#[derive(Debug, Error)]
pub enum RemoteServiceError {
    #[error("failed to reach recipe service: {0}")]
    Transport(String),

    #[error("recipe service returned HTTP {status}")]
    Status { status: u16 },

    #[error("unexpected response from recipe service: {0}")]
    UnexpectedShape(String),
}

/// `ranking` parameter of the find-by-ingredients endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingMode {
    MaximizeUsed,
    MinimizeMissing,
}

impl RankingMode {
    #[must_use]
    pub fn as_param(self) -> &'static str {
        match self {
            Self::MaximizeUsed => "1",
            Self::MinimizeMissing => "2",
        }
    }
}

/// Outbound request for the find-by-ingredients endpoint. The API key is
/// added by the client, not stored here.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeQuery {
    pub ingredients: String,
    pub diet: Option<String>,
    pub intolerances: Option<String>,
    pub cuisine: Option<String>,
    pub query: Option<String>,
    pub number: u32,
    pub ranking: RankingMode,
    pub ignore_pantry: bool,
}

impl RecipeQuery {
    #[must_use]
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("ingredients", self.ingredients.clone())];
        if let Some(diet) = &self.diet {
            params.push(("diet", diet.clone()));
        }
        if let Some(intolerances) = &self.intolerances {
            params.push(("intolerances", intolerances.clone()));
        }
        if let Some(cuisine) = &self.cuisine {
            params.push(("cuisine", cuisine.clone()));
        }
        if let Some(query) = &self.query {
            params.push(("query", query.clone()));
        }
        params.push(("number", self.number.to_string()));
        params.push(("ranking", self.ranking.as_param().to_string()));
        params.push(("ignorePantry", self.ignore_pantry.to_string()));
        params
    }
}

/// One element of the find-by-ingredients response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecipe {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub missed_ingredient_count: Option<u32>,
    #[serde(default)]
    pub used_ingredient_count: Option<u32>,
}

/// A recipe information record. Known fields are typed; everything else the
/// service sends is kept in `extra` so detail responses pass it through.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeInformation {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_in_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servings: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub diets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spoonacular_score: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn expect_array(body: Value, endpoint: &str) -> Result<Vec<Value>, RemoteServiceError> {
    match body {
        Value::Array(items) => Ok(items),
        other => Err(RemoteServiceError::UnexpectedShape(format!(
            "{endpoint}: expected a JSON array, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn decode_items<T: for<'de> Deserialize<'de>>(
    items: Vec<Value>,
    endpoint: &str,
) -> Result<Vec<T>, RemoteServiceError> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value(item).map_err(|e| {
                RemoteServiceError::UnexpectedShape(format!("{endpoint}: item {i}: {e}"))
            })
        })
        .collect()
}

pub fn parse_candidates(body: Value) -> Result<Vec<CandidateRecipe>, RemoteServiceError> {
    let items = expect_array(body, "findByIngredients")?;
    decode_items(items, "findByIngredients")
}

pub fn parse_information_bulk(body: Value) -> Result<Vec<RecipeInformation>, RemoteServiceError> {
    let items = expect_array(body, "informationBulk")?;
    decode_items(items, "informationBulk")
}

/// `null` means the service has nothing for this id.
pub fn parse_information(body: Value) -> Result<Option<RecipeInformation>, RemoteServiceError> {
    match body {
        Value::Null => Ok(None),
        Value::Object(_) => serde_json::from_value(body)
            .map(Some)
            .map_err(|e| RemoteServiceError::UnexpectedShape(format!("information: {e}"))),
        other => Err(RemoteServiceError::UnexpectedShape(format!(
            "information: expected an object, got {}",
            json_kind(&other)
        ))),
    }
}
