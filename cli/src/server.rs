use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{
        Path, Query, Request, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use serde::{Deserialize, Deserializer, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use larder_core::models::{
    FieldError, MAX_PAGE_LIMIT, NewIngredient, PantryIngredient, RecipeFilters, RecipePage,
    RecipeSummary, SavedRecipe, SortKey, UpdateIngredient, User, UserPreferences,
    parse_recipe_id, validate_ingredient_update, validate_new_ingredient, validate_preferences,
};
use larder_core::service::{LarderService, RecipeDetailView, ServiceError};
use larder_core::spoonacular::RemoteServiceError;

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB

/// How requests are mapped to a user.
#[derive(Clone)]
pub enum AuthMode {
    /// `Authorization: Bearer <token>` must match a stored user.
    Token,
    /// Every request acts as this user. For local development only.
    SingleUser(User),
}

#[derive(Clone)]
struct AppState {
    service: Arc<LarderService>,
    auth: AuthMode,
}

// --- Request / Response types ---

fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Deserialize)]
#[allow(clippy::option_option)]
struct UpdateIngredientRequest {
    name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    amount: Option<Option<i64>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    unit: Option<Option<String>>,
}

#[derive(Deserialize)]
struct RecipesQuery {
    sort: Option<String>,
    diet: Option<String>,
    cuisine: Option<String>,
    query: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<FieldError>,
}

// --- Error handling ---

enum ApiError {
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },
    Unauthorized,
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    /// `message` is all the client sees; `source` is only logged.
    Remote {
        message: &'static str,
        source: RemoteServiceError,
    },
    Internal(anyhow::Error),
}

impl ApiError {
    fn validation(errors: Vec<FieldError>) -> Self {
        Self::Validation {
            message: "Validation failed".to_string(),
            errors,
        }
    }

    fn bad_request(field: &str, detail: String) -> Self {
        Self::validation(vec![FieldError::new(field, detail)])
    }

    /// Map a service error from a handler that calls the recipe service,
    /// reporting remote failures as `message`.
    fn remote(message: &'static str) -> impl FnOnce(ServiceError) -> Self {
        move |err| match err {
            ServiceError::Remote(source) => Self::Remote { message, source },
            other => Self::from(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            Self::Validation { message, errors } => (StatusCode::BAD_REQUEST, message, errors),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Invalid or missing API token".to_string(),
                Vec::new(),
            ),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, Vec::new()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg, Vec::new()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg, Vec::new()),
            Self::Remote { message, source } => {
                error!("recipe service failure ({message}): {source}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    message.to_string(),
                    Vec::new(),
                )
            }
            Self::Internal(err) => {
                error!("internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    Vec::new(),
                )
            }
        };
        (status, Json(ErrorResponse { message, errors })).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(msg) => Self::NotFound(msg),
            ServiceError::Forbidden(msg) => Self::Forbidden(msg),
            ServiceError::Conflict(msg) => Self::Conflict(msg),
            ServiceError::Remote(source) => Self::Remote {
                message: "Failed to fetch recipes",
                source,
            },
            ServiceError::Storage(e) => Self::Internal(e),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request("body", rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request("query", rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request("id", rejection.body_text())
    }
}

// --- Middleware ---

async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let user = match &state.auth {
        AuthMode::SingleUser(user) => user.clone(),
        AuthMode::Token => {
            let token = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::trim)
                .filter(|t| !t.is_empty());

            let Some(token) = token else {
                return ApiError::Unauthorized.into_response();
            };
            match state.service.authenticate(token) {
                Ok(Some(user)) => user,
                Ok(None) => {
                    warn!("rejected request with unknown API token");
                    return ApiError::Unauthorized.into_response();
                }
                Err(e) => return ApiError::from(e).into_response(),
            }
        }
    };
    request.extensions_mut().insert(user);
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Handlers ---

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn current_user(Extension(user): Extension<User>) -> Json<User> {
    Json(user)
}

async fn list_recipes(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    query: Result<Query<RecipesQuery>, QueryRejection>,
) -> Result<Json<RecipePage>, ApiError> {
    let Query(q) = query?;

    let limit = q.limit.unwrap_or(RecipeFilters::default().limit);
    if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
        return Err(ApiError::bad_request(
            "limit",
            format!("limit must be between 1 and {MAX_PAGE_LIMIT}"),
        ));
    }

    let filters = RecipeFilters {
        sort: q.sort.as_deref().map_or(SortKey::Match, SortKey::parse),
        diet: q.diet,
        cuisine: q.cuisine,
        query: q.query,
        limit,
        offset: q.offset.unwrap_or(0),
    };

    let page = state
        .service
        .recommend(user.id, &filters)
        .await
        .map_err(ApiError::remote("Failed to fetch recipes"))?;
    Ok(Json(page))
}

async fn get_recipe(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<Json<RecipeDetailView>, ApiError> {
    let id = parse_recipe_id(&id).map_err(|e| ApiError::validation(vec![e]))?;
    let detail = state
        .service
        .recipe_detail(user.id, id)
        .await
        .map_err(ApiError::remote("Failed to fetch recipe details"))?;
    Ok(Json(detail))
}

async fn list_saved_recipes(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<RecipeSummary>>, ApiError> {
    let recipes = state
        .service
        .saved_recipes(user.id)
        .await
        .map_err(ApiError::remote("Failed to fetch saved recipes"))?;
    Ok(Json(recipes))
}

async fn save_recipe(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<SavedRecipe>), ApiError> {
    let id = parse_recipe_id(&id).map_err(|e| ApiError::validation(vec![e]))?;
    let saved = state
        .service
        .save_recipe(user.id, id)
        .await
        .map_err(ApiError::remote("Failed to save recipe"))?;
    Ok((StatusCode::CREATED, Json(saved)))
}

async fn unsave_recipe(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_recipe_id(&id).map_err(|e| ApiError::validation(vec![e]))?;
    state.service.unsave_recipe(user.id, &id.to_string())?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_pantry(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<PantryIngredient>>, ApiError> {
    Ok(Json(state.service.list_pantry(user.id)?))
}

async fn add_pantry_item(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    payload: Result<Json<NewIngredient>, JsonRejection>,
) -> Result<(StatusCode, Json<PantryIngredient>), ApiError> {
    let Json(req) = payload?;
    validate_new_ingredient(&req).map_err(ApiError::validation)?;
    let item = state.service.add_pantry_item(user.id, &req)?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn update_pantry_item(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateIngredientRequest>, JsonRejection>,
) -> Result<Json<PantryIngredient>, ApiError> {
    let Path(id) = id?;
    let Json(req) = payload?;
    let update = UpdateIngredient {
        name: req.name,
        amount: req.amount,
        unit: req.unit,
    };
    validate_ingredient_update(&update).map_err(ApiError::validation)?;
    let item = state.service.update_pantry_item(user.id, id, &update)?;
    Ok(Json(item))
}

async fn delete_pantry_item(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    state.service.remove_pantry_item(user.id, id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_preferences(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<UserPreferences>, ApiError> {
    Ok(Json(state.service.get_preferences(user.id)?))
}

async fn update_preferences(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    payload: Result<Json<UserPreferences>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(prefs) = payload?;
    validate_preferences(&prefs).map_err(ApiError::validation)?;
    state.service.update_preferences(user.id, &prefs)?;
    Ok(Json(MessageResponse {
        message: "Preferences updated successfully",
    }))
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/user", get(current_user))
        .route("/api/recipes", get(list_recipes))
        .route("/api/recipes/{id}", get(get_recipe))
        .route("/api/user/recipes/saved", get(list_saved_recipes))
        .route(
            "/api/user/recipes/saved/{id}",
            post(save_recipe).delete(unsave_recipe),
        )
        .route("/api/user/pantry", get(list_pantry).post(add_pantry_item))
        .route(
            "/api/user/pantry/{id}",
            patch(update_pantry_item).delete(delete_pantry_item),
        )
        .route(
            "/api/user/preferences",
            get(get_preferences).post(update_preferences),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .route("/api/health", get(health))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(
    service: LarderService,
    port: u16,
    bind: &str,
    auth: AuthMode,
) -> anyhow::Result<()> {
    match &auth {
        AuthMode::Token => {
            eprintln!("Authentication: bearer tokens (create one with `larder user create <name>`)");
        }
        AuthMode::SingleUser(user) => {
            eprintln!(
                "Warning: Authentication disabled (--no-auth). All requests act as '{}'.",
                user.username
            );
            if bind != "127.0.0.1" && bind != "localhost" {
                eprintln!(
                    "Warning: Listening on {bind} with no authentication. Any device on your network can access this API."
                );
            }
        }
    }

    let state = AppState {
        service: Arc::new(service),
        auth,
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}")).await?;
    info!(%bind, port, "server listening");
    eprintln!("Listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use larder_core::db::Database;
    use larder_core::service::RecipeProvider;
    use larder_core::spoonacular::{CandidateRecipe, RecipeInformation, RecipeQuery};
    use serde_json::{Map, Value, json};
    use tower::ServiceExt;

    #[derive(Default)]
    struct StubProvider {
        candidates: Vec<CandidateRecipe>,
        infos: Vec<RecipeInformation>,
    }

    #[async_trait]
    impl RecipeProvider for StubProvider {
        async fn find_by_ingredients(
            &self,
            _query: &RecipeQuery,
        ) -> Result<Vec<CandidateRecipe>, RemoteServiceError> {
            Ok(self.candidates.clone())
        }

        async fn information_bulk(
            &self,
            ids: &[i64],
        ) -> Result<Vec<RecipeInformation>, RemoteServiceError> {
            Ok(self
                .infos
                .iter()
                .filter(|i| ids.contains(&i.id))
                .cloned()
                .collect())
        }

        async fn information(
            &self,
            id: i64,
        ) -> Result<Option<RecipeInformation>, RemoteServiceError> {
            Ok(self.infos.iter().find(|i| i.id == id).cloned())
        }
    }

    /// Every call fails, except `information` when `information_ok` is set.
    #[derive(Default)]
    struct FailingProvider {
        information_ok: bool,
    }

    #[async_trait]
    impl RecipeProvider for FailingProvider {
        async fn find_by_ingredients(
            &self,
            _query: &RecipeQuery,
        ) -> Result<Vec<CandidateRecipe>, RemoteServiceError> {
            Err(RemoteServiceError::Transport("connection refused".to_string()))
        }

        async fn information_bulk(
            &self,
            _ids: &[i64],
        ) -> Result<Vec<RecipeInformation>, RemoteServiceError> {
            Err(RemoteServiceError::Status { status: 503 })
        }

        async fn information(
            &self,
            id: i64,
        ) -> Result<Option<RecipeInformation>, RemoteServiceError> {
            if self.information_ok {
                Ok(Some(info(id, 20)))
            } else {
                Err(RemoteServiceError::Status { status: 503 })
            }
        }
    }

    fn info(id: i64, minutes: u32) -> RecipeInformation {
        let mut extra = Map::new();
        extra.insert("instructions".to_string(), json!("Cook it."));
        RecipeInformation {
            id,
            title: format!("Recipe {id}"),
            image: None,
            ready_in_minutes: Some(minutes),
            servings: Some(2),
            summary: Some("Tasty".to_string()),
            diets: vec!["vegetarian".to_string()],
            spoonacular_score: Some(80.0),
            extra,
        }
    }

    fn stocked_provider() -> StubProvider {
        StubProvider {
            candidates: (1..=3)
                .map(|id| CandidateRecipe {
                    id,
                    title: None,
                    missed_ingredient_count: Some(u32::try_from(3 - id).unwrap()),
                    used_ingredient_count: Some(1),
                })
                .collect(),
            infos: vec![info(1, 15), info(2, 35), info(3, 60)],
        }
    }

    struct TestApp {
        router: Router,
        service: Arc<LarderService>,
    }

    impl TestApp {
        fn new(provider: Arc<dyn RecipeProvider>, single_user: bool) -> Self {
            let service = LarderService::new(Database::open_in_memory().unwrap(), provider);
            let auth = if single_user {
                AuthMode::SingleUser(service.ensure_user("local").unwrap())
            } else {
                AuthMode::Token
            };
            let service = Arc::new(service);
            let router = build_router(AppState {
                service: service.clone(),
                auth,
            });
            Self { router, service }
        }

        fn token(&self, username: &str) -> String {
            self.service.create_user(username).unwrap().api_token
        }

        async fn send(
            &self,
            method: &str,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = axum::http::Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header("Authorization", format!("Bearer {token}"));
            }
            let body = match body {
                Some(v) => {
                    builder = builder.header("content-type", "application/json");
                    Body::from(v.to_string())
                }
                None => Body::empty(),
            };
            let response = self
                .router
                .clone()
                .oneshot(builder.body(body).unwrap())
                .await
                .unwrap();
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let json = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, json)
        }
    }

    fn local_app() -> TestApp {
        TestApp::new(Arc::new(stocked_provider()), true)
    }

    #[tokio::test]
    async fn health_is_open() {
        let app = TestApp::new(Arc::new(StubProvider::default()), false);
        let (status, body) = app.send("GET", "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn auth_missing_token_returns_401() {
        let app = TestApp::new(Arc::new(StubProvider::default()), false);
        let (status, body) = app.send("GET", "/api/user/pantry", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid or missing API token");
    }

    #[tokio::test]
    async fn auth_wrong_token_returns_401() {
        let app = TestApp::new(Arc::new(StubProvider::default()), false);
        app.token("alice");
        let (status, _) = app
            .send("GET", "/api/user/pantry", Some("wrong-token"), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn auth_token_resolves_user() {
        let app = TestApp::new(Arc::new(StubProvider::default()), false);
        let token = app.token("alice");
        let (status, body) = app.send("GET", "/api/user", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "alice");
        assert!(body.get("apiToken").is_none());
    }

    #[tokio::test]
    async fn security_headers_on_auth_failure() {
        let app = TestApp::new(Arc::new(StubProvider::default()), false);
        let response = app
            .router
            .clone()
            .oneshot(
                axum::http::Request::get("/api/user/pantry")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
        assert_eq!(
            response.headers().get("content-security-policy").unwrap(),
            "default-src 'none'"
        );
    }

    #[tokio::test]
    async fn list_recipes_returns_page_and_total() {
        let app = local_app();
        app.send("POST", "/api/user/pantry", None, Some(json!({"name": "eggs"})))
            .await;

        let (status, body) = app.send("GET", "/api/recipes?limit=2", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 3);
        let recipes = body["recipes"].as_array().unwrap();
        assert_eq!(recipes.len(), 2);
        // Fewest missing ingredients first.
        assert_eq!(recipes[0]["id"], "3");
        assert_eq!(recipes[0]["difficulty"], "Hard");
        assert_eq!(recipes[0]["rating"], 4.0);
        assert_eq!(recipes[0]["isSaved"], false);
        assert_eq!(
            recipes[0]["image"],
            "https://spoonacular.com/recipeImages/3-556x370.jpg"
        );
    }

    #[tokio::test]
    async fn list_recipes_sort_by_time() {
        let app = local_app();
        let (_, body) = app.send("GET", "/api/recipes?sort=time", None, None).await;
        let minutes: Vec<u64> = body["recipes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["readyInMinutes"].as_u64().unwrap())
            .collect();
        assert_eq!(minutes, vec![15, 35, 60]);
    }

    #[tokio::test]
    async fn list_recipes_rejects_bad_limit() {
        let app = local_app();
        for uri in [
            "/api/recipes?limit=0",
            "/api/recipes?limit=101",
            "/api/recipes?limit=abc",
            "/api/recipes?offset=-1",
        ] {
            let (status, body) = app.send("GET", uri, None, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(body["errors"].is_array(), "{uri}");
        }
    }

    #[tokio::test]
    async fn list_recipes_without_candidates_is_empty() {
        let app = TestApp::new(Arc::new(StubProvider::default()), true);
        let (status, body) = app.send("GET", "/api/recipes", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"recipes": [], "total": 0}));
    }

    #[tokio::test]
    async fn remote_failure_is_generic_500() {
        let app = TestApp::new(Arc::new(FailingProvider::default()), true);
        let (status, body) = app.send("GET", "/api/recipes", None, None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Failed to fetch recipes");
        assert!(!body.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn remote_failure_message_names_the_operation() {
        let app = TestApp::new(Arc::new(FailingProvider::default()), true);

        let (status, body) = app.send("GET", "/api/recipes/1", None, None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Failed to fetch recipe details");

        let (status, body) = app
            .send("POST", "/api/user/recipes/saved/1", None, None)
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Failed to save recipe");
    }

    #[tokio::test]
    async fn saved_list_remote_failure_message() {
        let app = TestApp::new(
            Arc::new(FailingProvider {
                information_ok: true,
            }),
            true,
        );
        let (status, _) = app
            .send("POST", "/api/user/recipes/saved/5", None, None)
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = app.send("GET", "/api/user/recipes/saved", None, None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Failed to fetch saved recipes");
        assert!(body.get("errors").is_none());
    }

    #[tokio::test]
    async fn get_recipe_detail() {
        let app = local_app();

        let (status, body) = app.send("GET", "/api/recipes/2", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Recipe 2");
        assert_eq!(body["instructions"], "Cook it.");
        assert_eq!(body["isSaved"], false);

        let (status, _) = app.send("GET", "/api/recipes/999", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = app.send("GET", "/api/recipes/abc", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["field"], "id");
    }

    #[tokio::test]
    async fn save_recipe_lifecycle() {
        let app = local_app();

        let (status, body) = app
            .send("POST", "/api/user/recipes/saved/1", None, None)
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["recipeId"], "1");
        assert_eq!(body["title"], "Recipe 1");

        let (status, _) = app
            .send("POST", "/api/user/recipes/saved/1", None, None)
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = app.send("GET", "/api/user/recipes/saved", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let saved = body.as_array().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0]["isSaved"], true);

        let (_, body) = app.send("GET", "/api/recipes/1", None, None).await;
        assert_eq!(body["isSaved"], true);

        let (status, body) = app
            .send("DELETE", "/api/user/recipes/saved/1", None, None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);

        let (status, _) = app
            .send("DELETE", "/api/user/recipes/saved/1", None, None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn save_unknown_recipe_is_404() {
        let app = local_app();
        let (status, _) = app
            .send("POST", "/api/user/recipes/saved/999", None, None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn saved_list_empty_without_remote_call() {
        // Would 500 if the remote were consulted.
        let app = TestApp::new(Arc::new(FailingProvider::default()), true);
        let (status, body) = app.send("GET", "/api/user/recipes/saved", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn pantry_create_validates() {
        let app = local_app();

        let (status, body) = app
            .send("POST", "/api/user/pantry", None, Some(json!({"name": "  "})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["field"], "name");

        let (status, body) = app
            .send("POST", "/api/user/pantry", None, Some(json!({"amount": 2})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["field"], "body");

        let (status, body) = app
            .send(
                "POST",
                "/api/user/pantry",
                None,
                Some(json!({"name": "rice", "amount": 500, "unit": "g"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["name"], "rice");
        assert_eq!(body["amount"], 500);
    }

    #[tokio::test]
    async fn pantry_patch_clears_with_explicit_null() {
        let app = local_app();
        let (_, created) = app
            .send(
                "POST",
                "/api/user/pantry",
                None,
                Some(json!({"name": "milk", "amount": 1, "unit": "l"})),
            )
            .await;
        let uri = format!("/api/user/pantry/{}", created["id"]);

        let (status, body) = app
            .send("PATCH", &uri, None, Some(json!({"unit": null})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["unit"], Value::Null);
        assert_eq!(body["amount"], 1);
        assert_eq!(body["name"], "milk");

        let (status, _) = app.send("PATCH", &uri, None, Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .send("PATCH", "/api/user/pantry/9999", None, Some(json!({"name": "x"})))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn pantry_other_users_row_is_403() {
        let app = TestApp::new(Arc::new(StubProvider::default()), false);
        let alice = app.token("alice");
        let bob = app.token("bob");

        let (_, created) = app
            .send(
                "POST",
                "/api/user/pantry",
                Some(&alice),
                Some(json!({"name": "saffron"})),
            )
            .await;
        let uri = format!("/api/user/pantry/{}", created["id"]);

        let (status, _) = app
            .send("PATCH", &uri, Some(&bob), Some(json!({"name": "paprika"})))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = app.send("DELETE", &uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, pantry) = app.send("GET", "/api/user/pantry", Some(&alice), None).await;
        assert_eq!(pantry[0]["name"], "saffron");

        let (status, _) = app.send("DELETE", &uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn preferences_roundtrip() {
        let app = local_app();

        let (status, body) = app.send("GET", "/api/user/preferences", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["settings"]["prioritizeHealthy"], true);
        assert_eq!(body["diets"], json!([]));

        let mut prefs = body.clone();
        prefs["diets"] = json!([{"id": "gluten-free", "name": "", "active": true}]);
        prefs["avoidIngredients"] = json!([{"id": "peanut", "name": "", "active": false}]);
        let (status, body) = app
            .send("POST", "/api/user/preferences", None, Some(prefs.clone()))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Preferences updated successfully");

        // Posting again must not duplicate keys.
        app.send("POST", "/api/user/preferences", None, Some(prefs))
            .await;

        let (_, body) = app.send("GET", "/api/user/preferences", None, None).await;
        assert_eq!(
            body["diets"],
            json!([{"id": "gluten-free", "name": "Gluten Free", "active": true}])
        );
        assert_eq!(body["avoidIngredients"][0]["active"], false);
    }

    #[tokio::test]
    async fn preferences_malformed_body_is_400() {
        let app = local_app();
        let (status, body) = app
            .send(
                "POST",
                "/api/user/preferences",
                None,
                Some(json!({"diets": "vegan"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());
    }
}
