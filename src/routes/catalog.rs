use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::catalog::{
        ColorList, CreateColorRequest, CreateSizeRequest, SizeList, UpdateColorRequest,
        UpdateSizeRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Color, Size},
    response::ApiResponse,
    services::catalog_service,
    state::AppState,
};

pub fn sizes_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sizes).post(create_size))
        .route("/{id}", axum::routing::put(update_size).delete(delete_size))
}

pub fn colors_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_colors).post(create_color))
        .route(
            "/{id}",
            axum::routing::put(update_color).delete(delete_color),
        )
}

#[utoipa::path(
    get,
    path = "/api/sizes",
    responses(
        (status = 200, description = "List sizes", body = ApiResponse<SizeList>)
    ),
    tag = "Catalog"
)]
pub async fn list_sizes(State(state): State<AppState>) -> AppResult<Json<ApiResponse<SizeList>>> {
    let resp = catalog_service::list_sizes(&state.pool).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/sizes",
    request_body = CreateSizeRequest,
    responses(
        (status = 201, description = "Create size", body = ApiResponse<Size>),
        (status = 400, description = "Bad request"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn create_size(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateSizeRequest>,
) -> AppResult<Json<ApiResponse<Size>>> {
    let resp = catalog_service::create_size(&state.pool, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/sizes/{id}",
    params(
        ("id" = Uuid, Path, description = "Size ID")
    ),
    request_body = UpdateSizeRequest,
    responses(
        (status = 200, description = "Updated size", body = ApiResponse<Size>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn update_size(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSizeRequest>,
) -> AppResult<Json<ApiResponse<Size>>> {
    let resp = catalog_service::update_size(&state.pool, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/sizes/{id}",
    params(
        ("id" = Uuid, Path, description = "Size ID")
    ),
    responses(
        (status = 200, description = "Deleted size"),
        (status = 400, description = "Size is in use"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn delete_size(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = catalog_service::delete_size(&state.pool, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/colors",
    responses(
        (status = 200, description = "List colors", body = ApiResponse<ColorList>)
    ),
    tag = "Catalog"
)]
pub async fn list_colors(State(state): State<AppState>) -> AppResult<Json<ApiResponse<ColorList>>> {
    let resp = catalog_service::list_colors(&state.pool).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/colors",
    request_body = CreateColorRequest,
    responses(
        (status = 201, description = "Create color", body = ApiResponse<Color>),
        (status = 400, description = "Bad request"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn create_color(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateColorRequest>,
) -> AppResult<Json<ApiResponse<Color>>> {
    let resp = catalog_service::create_color(&state.pool, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/colors/{id}",
    params(
        ("id" = Uuid, Path, description = "Color ID")
    ),
    request_body = UpdateColorRequest,
    responses(
        (status = 200, description = "Updated color", body = ApiResponse<Color>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn update_color(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateColorRequest>,
) -> AppResult<Json<ApiResponse<Color>>> {
    let resp = catalog_service::update_color(&state.pool, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/colors/{id}",
    params(
        ("id" = Uuid, Path, description = "Color ID")
    ),
    responses(
        (status = 200, description = "Deleted color"),
        (status = 400, description = "Color is in use"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn delete_color(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = catalog_service::delete_color(&state.pool, &user, id).await?;
    Ok(Json(resp))
}
