use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::movies::{CreateMovieRequest, MovieList, NamedRequest, UpdateMovieRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::{CatalogRef, MovieDetail},
    response::ApiResponse,
    routes::params::MovieQuery,
    services::movie_service::{self, CatalogKind},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_movies).post(create_movie))
        .route("/genres", get(list_genres).post(create_genre))
        .route("/stars", get(list_stars).post(create_star))
        .route("/directors", get(list_directors).post(create_director))
        .route(
            "/certifications",
            get(list_certifications).post(create_certification),
        )
        .route(
            "/{uuid}",
            get(get_movie).patch(update_movie).delete(delete_movie),
        )
}

#[utoipa::path(
    get,
    path = "/api/movies",
    params(MovieQuery),
    responses(
        (status = 200, description = "Filtered, sorted page of movies", body = ApiResponse<MovieList>)
    ),
    tag = "Movies"
)]
pub async fn list_movies(
    State(state): State<AppState>,
    Query(query): Query<MovieQuery>,
) -> AppResult<Json<ApiResponse<MovieList>>> {
    let resp = movie_service::list_movies(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/movies/{uuid}",
    params(
        ("uuid" = Uuid, Path, description = "Movie UUID")
    ),
    responses(
        (status = 200, description = "Movie detail", body = ApiResponse<MovieDetail>),
        (status = 404, description = "Movie not found")
    ),
    tag = "Movies"
)]
pub async fn get_movie(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> AppResult<Json<ApiResponse<MovieDetail>>> {
    let resp = movie_service::get_movie(&state, uuid).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/movies",
    request_body = CreateMovieRequest,
    responses(
        (status = 201, description = "Movie created", body = ApiResponse<MovieDetail>),
        (status = 400, description = "Unknown certification, genre, director or star"),
        (status = 403, description = "Moderator role required"),
        (status = 409, description = "Movie already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Movies"
)]
pub async fn create_movie(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateMovieRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<MovieDetail>>)> {
    let resp = movie_service::create_movie(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    patch,
    path = "/api/movies/{uuid}",
    params(
        ("uuid" = Uuid, Path, description = "Movie UUID")
    ),
    request_body = UpdateMovieRequest,
    responses(
        (status = 200, description = "Movie updated", body = ApiResponse<MovieDetail>),
        (status = 403, description = "Moderator role required"),
        (status = 404, description = "Movie not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Movies"
)]
pub async fn update_movie(
    State(state): State<AppState>,
    user: AuthUser,
    Path(uuid): Path<Uuid>,
    Json(payload): Json<UpdateMovieRequest>,
) -> AppResult<Json<ApiResponse<MovieDetail>>> {
    let resp = movie_service::update_movie(&state, &user, uuid, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/movies/{uuid}",
    params(
        ("uuid" = Uuid, Path, description = "Movie UUID")
    ),
    responses(
        (status = 200, description = "Movie deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Movie not found"),
        (status = 409, description = "Movie is part of an order")
    ),
    security(("bearer_auth" = [])),
    tag = "Movies"
)]
pub async fn delete_movie(
    State(state): State<AppState>,
    user: AuthUser,
    Path(uuid): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = movie_service::delete_movie(&state, &user, uuid).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/movies/genres",
    responses((status = 200, description = "All genres", body = ApiResponse<Vec<CatalogRef>>)),
    tag = "Movies"
)]
pub async fn list_genres(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<CatalogRef>>>> {
    Ok(Json(
        movie_service::list_references(&state, CatalogKind::Genre).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/movies/genres",
    request_body = NamedRequest,
    responses(
        (status = 201, description = "Genre created", body = ApiResponse<CatalogRef>),
        (status = 409, description = "Genre already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Movies"
)]
pub async fn create_genre(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<NamedRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CatalogRef>>)> {
    let resp = movie_service::create_reference(&state, &user, CatalogKind::Genre, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/movies/stars",
    responses((status = 200, description = "All stars", body = ApiResponse<Vec<CatalogRef>>)),
    tag = "Movies"
)]
pub async fn list_stars(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<CatalogRef>>>> {
    Ok(Json(
        movie_service::list_references(&state, CatalogKind::Star).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/movies/stars",
    request_body = NamedRequest,
    responses(
        (status = 201, description = "Star created", body = ApiResponse<CatalogRef>),
        (status = 409, description = "Star already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Movies"
)]
pub async fn create_star(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<NamedRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CatalogRef>>)> {
    let resp = movie_service::create_reference(&state, &user, CatalogKind::Star, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/movies/directors",
    responses((status = 200, description = "All directors", body = ApiResponse<Vec<CatalogRef>>)),
    tag = "Movies"
)]
pub async fn list_directors(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<CatalogRef>>>> {
    Ok(Json(
        movie_service::list_references(&state, CatalogKind::Director).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/movies/directors",
    request_body = NamedRequest,
    responses(
        (status = 201, description = "Director created", body = ApiResponse<CatalogRef>),
        (status = 409, description = "Director already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Movies"
)]
pub async fn create_director(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<NamedRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CatalogRef>>)> {
    let resp =
        movie_service::create_reference(&state, &user, CatalogKind::Director, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/movies/certifications",
    responses((status = 200, description = "All certifications", body = ApiResponse<Vec<CatalogRef>>)),
    tag = "Movies"
)]
pub async fn list_certifications(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<CatalogRef>>>> {
    Ok(Json(
        movie_service::list_references(&state, CatalogKind::Certification).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/movies/certifications",
    request_body = NamedRequest,
    responses(
        (status = 201, description = "Certification created", body = ApiResponse<CatalogRef>),
        (status = 409, description = "Certification already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Movies"
)]
pub async fn create_certification(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<NamedRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CatalogRef>>)> {
    let resp =
        movie_service::create_reference(&state, &user, CatalogKind::Certification, payload)
            .await?;
    Ok((StatusCode::CREATED, Json(resp)))
}
