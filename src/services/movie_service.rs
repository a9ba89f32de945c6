use std::collections::BTreeSet;

use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::movies::{CreateMovieRequest, MovieList, NamedRequest, UpdateMovieRequest},
    entity::{
        Certifications, Directors, Genres, MovieDirectors, MovieGenres, MovieStars, Movies,
        OrderItems, Stars, certifications, directors, genres, movie_directors, movie_genres,
        movie_stars, movies, order_items, stars,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, authorize},
    models::{CatalogRef, MovieDetail, MovieShort, UserRole},
    response::{ApiResponse, Meta},
    routes::params::{MOVIES_PER_PAGE, MovieQuery, MovieSortBy, SortOrder},
    state::AppState,
};

/// Reference tables a moderator maintains next to the movies themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Genre,
    Star,
    Director,
    Certification,
}

impl CatalogKind {
    pub fn label(&self) -> &'static str {
        match self {
            CatalogKind::Genre => "Genre",
            CatalogKind::Star => "Star",
            CatalogKind::Director => "Director",
            CatalogKind::Certification => "Certification",
        }
    }
}

pub async fn list_movies(
    state: &AppState,
    query: MovieQuery,
) -> AppResult<ApiResponse<MovieList>> {
    let (page, limit, offset) = query.pagination().normalize_with(MOVIES_PER_PAGE);
    let condition = movie_filter(&query);

    let sort_col = match query.sort_by.unwrap_or(MovieSortBy::Year) {
        MovieSortBy::Price => movies::Column::Price,
        MovieSortBy::Year => movies::Column::Year,
        MovieSortBy::Imdb => movies::Column::Imdb,
        MovieSortBy::Votes => movies::Column::Votes,
    };

    let mut finder = Movies::find().filter(condition);
    finder = match query.order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };
    // stable pages when the sort key ties
    finder = finder.order_by_asc(movies::Column::Id);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .find_also_related(Certifications)
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|(movie, cert)| MovieShort::from_entity(movie, cert.map(CatalogRef::from)))
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Movies", MovieList { items }, Some(meta)))
}

fn movie_filter(query: &MovieQuery) -> Condition {
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        condition = condition.add(Expr::col(movies::Column::Name).ilike(format!("%{search}%")));
    }
    if let Some(year) = query.year {
        condition = condition.add(movies::Column::Year.eq(year));
    }
    if let Some(imdb_min) = query.imdb_min {
        condition = condition.add(movies::Column::Imdb.gte(imdb_min));
    }
    if let Some(imdb_max) = query.imdb_max {
        condition = condition.add(movies::Column::Imdb.lte(imdb_max));
    }
    if let Some(certification_id) = query.certification_id {
        condition = condition.add(movies::Column::CertificationId.eq(certification_id));
    }
    if let Some(genre_id) = query.genre_id {
        condition = condition.add(
            movies::Column::Id.in_subquery(
                Query::select()
                    .column(movie_genres::Column::MovieId)
                    .from(MovieGenres)
                    .and_where(movie_genres::Column::GenreId.eq(genre_id))
                    .to_owned(),
            ),
        );
    }
    if let Some(director_id) = query.director_id {
        condition = condition.add(
            movies::Column::Id.in_subquery(
                Query::select()
                    .column(movie_directors::Column::MovieId)
                    .from(MovieDirectors)
                    .and_where(movie_directors::Column::DirectorId.eq(director_id))
                    .to_owned(),
            ),
        );
    }
    if let Some(star_id) = query.star_id {
        condition = condition.add(
            movies::Column::Id.in_subquery(
                Query::select()
                    .column(movie_stars::Column::MovieId)
                    .from(MovieStars)
                    .and_where(movie_stars::Column::StarId.eq(star_id))
                    .to_owned(),
            ),
        );
    }

    condition
}

pub async fn get_movie(state: &AppState, uuid: Uuid) -> AppResult<ApiResponse<MovieDetail>> {
    let movie = find_by_uuid(&state.orm, uuid).await?;
    let detail = movie_detail(&state.orm, movie).await?;
    Ok(ApiResponse::success("Movie", detail, Some(Meta::empty())))
}

pub async fn list_references(
    state: &AppState,
    kind: CatalogKind,
) -> AppResult<ApiResponse<Vec<CatalogRef>>> {
    let items: Vec<CatalogRef> = match kind {
        CatalogKind::Genre => Genres::find()
            .order_by_asc(genres::Column::Name)
            .all(&state.orm)
            .await?
            .into_iter()
            .map(CatalogRef::from)
            .collect(),
        CatalogKind::Star => Stars::find()
            .order_by_asc(stars::Column::Name)
            .all(&state.orm)
            .await?
            .into_iter()
            .map(CatalogRef::from)
            .collect(),
        CatalogKind::Director => Directors::find()
            .order_by_asc(directors::Column::Name)
            .all(&state.orm)
            .await?
            .into_iter()
            .map(CatalogRef::from)
            .collect(),
        CatalogKind::Certification => Certifications::find()
            .order_by_asc(certifications::Column::Name)
            .all(&state.orm)
            .await?
            .into_iter()
            .map(CatalogRef::from)
            .collect(),
    };
    Ok(ApiResponse::success("OK", items, Some(Meta::empty())))
}

pub async fn create_reference(
    state: &AppState,
    user: &AuthUser,
    kind: CatalogKind,
    payload: NamedRequest,
) -> AppResult<ApiResponse<CatalogRef>> {
    authorize(user, UserRole::Moderator)?;
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name must not be empty".into()));
    }
    let conflict = format!("{} already exists", kind.label());

    let created: CatalogRef = match kind {
        CatalogKind::Genre => genres::ActiveModel {
            id: NotSet,
            name: Set(name),
        }
        .insert(&state.orm)
        .await
        .map_err(|err| AppError::conflict_on_unique(err, &conflict))?
        .into(),
        CatalogKind::Star => stars::ActiveModel {
            id: NotSet,
            name: Set(name),
        }
        .insert(&state.orm)
        .await
        .map_err(|err| AppError::conflict_on_unique(err, &conflict))?
        .into(),
        CatalogKind::Director => directors::ActiveModel {
            id: NotSet,
            name: Set(name),
        }
        .insert(&state.orm)
        .await
        .map_err(|err| AppError::conflict_on_unique(err, &conflict))?
        .into(),
        CatalogKind::Certification => certifications::ActiveModel {
            id: NotSet,
            name: Set(name),
        }
        .insert(&state.orm)
        .await
        .map_err(|err| AppError::conflict_on_unique(err, &conflict))?
        .into(),
    };

    Ok(ApiResponse::success(
        format!("{} created", kind.label()),
        created,
        Some(Meta::empty()),
    ))
}

pub async fn create_movie(
    state: &AppState,
    user: &AuthUser,
    payload: CreateMovieRequest,
) -> AppResult<ApiResponse<MovieDetail>> {
    authorize(user, UserRole::Moderator)?;
    validate_movie_fields(
        &payload.name,
        payload.year,
        payload.time,
        payload.imdb,
        payload.price,
    )?;

    let genre_ids = dedup_ids(&payload.genre_ids);
    let director_ids = dedup_ids(&payload.director_ids);
    let star_ids = dedup_ids(&payload.star_ids);

    let txn = state.orm.begin().await?;
    ensure_certification(&txn, payload.certification_id).await?;
    ensure_genres(&txn, &genre_ids).await?;
    ensure_directors(&txn, &director_ids).await?;
    ensure_stars(&txn, &star_ids).await?;

    let movie = movies::ActiveModel {
        id: NotSet,
        uuid: Set(Uuid::new_v4()),
        name: Set(payload.name.trim().to_string()),
        year: Set(payload.year),
        time: Set(payload.time),
        imdb: Set(payload.imdb),
        votes: Set(payload.votes),
        meta_score: Set(payload.meta_score),
        gross: Set(payload.gross),
        description: Set(payload.description),
        price: Set(payload.price),
        certification_id: Set(payload.certification_id),
        created_at: NotSet,
    }
    .insert(&txn)
    .await
    .map_err(|err| AppError::conflict_on_unique(err, "Movie already exists"))?;

    link_genres(&txn, movie.id, &genre_ids).await?;
    link_directors(&txn, movie.id, &director_ids).await?;
    link_stars(&txn, movie.id, &star_ids).await?;

    let detail = movie_detail(&txn, movie).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "movie_create",
        "movies",
        serde_json::json!({ "movie_id": detail.id, "uuid": detail.uuid }),
    )
    .await;

    Ok(ApiResponse::success(
        "Movie created",
        detail,
        Some(Meta::empty()),
    ))
}

pub async fn update_movie(
    state: &AppState,
    user: &AuthUser,
    uuid: Uuid,
    payload: UpdateMovieRequest,
) -> AppResult<ApiResponse<MovieDetail>> {
    authorize(user, UserRole::Moderator)?;

    let txn = state.orm.begin().await?;
    let existing = find_by_uuid(&txn, uuid).await?;
    validate_movie_fields(
        payload.name.as_deref().unwrap_or(&existing.name),
        payload.year.unwrap_or(existing.year),
        payload.time.unwrap_or(existing.time),
        payload.imdb.unwrap_or(existing.imdb),
        payload.price.unwrap_or(existing.price),
    )?;
    let movie_id = existing.id;

    let mut active: movies::ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(year) = payload.year {
        active.year = Set(year);
    }
    if let Some(time) = payload.time {
        active.time = Set(time);
    }
    if let Some(imdb) = payload.imdb {
        active.imdb = Set(imdb);
    }
    if let Some(votes) = payload.votes {
        active.votes = Set(votes);
    }
    if let Some(meta_score) = payload.meta_score {
        active.meta_score = Set(Some(meta_score));
    }
    if let Some(gross) = payload.gross {
        active.gross = Set(Some(gross));
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(certification_id) = payload.certification_id {
        ensure_certification(&txn, certification_id).await?;
        active.certification_id = Set(certification_id);
    }
    let movie = active
        .update(&txn)
        .await
        .map_err(|err| AppError::conflict_on_unique(err, "Movie already exists"))?;

    if let Some(ids) = payload.genre_ids {
        let ids = dedup_ids(&ids);
        ensure_genres(&txn, &ids).await?;
        MovieGenres::delete_many()
            .filter(movie_genres::Column::MovieId.eq(movie_id))
            .exec(&txn)
            .await?;
        link_genres(&txn, movie_id, &ids).await?;
    }
    if let Some(ids) = payload.director_ids {
        let ids = dedup_ids(&ids);
        ensure_directors(&txn, &ids).await?;
        MovieDirectors::delete_many()
            .filter(movie_directors::Column::MovieId.eq(movie_id))
            .exec(&txn)
            .await?;
        link_directors(&txn, movie_id, &ids).await?;
    }
    if let Some(ids) = payload.star_ids {
        let ids = dedup_ids(&ids);
        ensure_stars(&txn, &ids).await?;
        MovieStars::delete_many()
            .filter(movie_stars::Column::MovieId.eq(movie_id))
            .exec(&txn)
            .await?;
        link_stars(&txn, movie_id, &ids).await?;
    }

    let detail = movie_detail(&txn, movie).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "movie_update",
        "movies",
        serde_json::json!({ "movie_id": movie_id, "uuid": uuid }),
    )
    .await;

    Ok(ApiResponse::success("Updated", detail, Some(Meta::empty())))
}

/// Movies that appear on any order are kept so the order history stays intact.
pub async fn delete_movie(
    state: &AppState,
    user: &AuthUser,
    uuid: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    authorize(user, UserRole::Moderator)?;
    let movie = find_by_uuid(&state.orm, uuid).await?;

    let ordered = OrderItems::find()
        .filter(order_items::Column::MovieId.eq(movie.id))
        .count(&state.orm)
        .await?;
    if ordered > 0 {
        return Err(AppError::Conflict(
            "Movie is referenced by orders and cannot be deleted".into(),
        ));
    }

    let movie_id = movie.id;
    movie.delete(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "movie_delete",
        "movies",
        serde_json::json!({ "movie_id": movie_id, "uuid": uuid }),
    )
    .await;

    Ok(ApiResponse::message("Deleted"))
}

async fn find_by_uuid<C: ConnectionTrait>(conn: &C, uuid: Uuid) -> AppResult<movies::Model> {
    Movies::find()
        .filter(movies::Column::Uuid.eq(uuid))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("Movie"))
}

async fn movie_detail<C: ConnectionTrait>(conn: &C, movie: movies::Model) -> AppResult<MovieDetail> {
    let certification = movie
        .find_related(Certifications)
        .one(conn)
        .await?
        .map(CatalogRef::from);
    let genres = movie
        .find_related(Genres)
        .order_by_asc(genres::Column::Name)
        .all(conn)
        .await?
        .into_iter()
        .map(CatalogRef::from)
        .collect();
    let directors = movie
        .find_related(Directors)
        .order_by_asc(directors::Column::Name)
        .all(conn)
        .await?
        .into_iter()
        .map(CatalogRef::from)
        .collect();
    let stars = movie
        .find_related(Stars)
        .order_by_asc(stars::Column::Name)
        .all(conn)
        .await?
        .into_iter()
        .map(CatalogRef::from)
        .collect();

    Ok(MovieDetail {
        id: movie.id,
        uuid: movie.uuid,
        name: movie.name,
        year: movie.year,
        time: movie.time,
        imdb: movie.imdb,
        votes: movie.votes,
        meta_score: movie.meta_score,
        gross: movie.gross,
        description: movie.description,
        price: movie.price,
        certification,
        genres,
        directors,
        stars,
    })
}

fn validate_movie_fields(name: &str, year: i32, time: i32, imdb: f64, price: i64) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("Movie name must not be empty".into()));
    }
    if !(1888..=2100).contains(&year) {
        return Err(AppError::BadRequest("Year is out of range".into()));
    }
    if time <= 0 {
        return Err(AppError::BadRequest("Time must be positive".into()));
    }
    if !(0.0..=10.0).contains(&imdb) {
        return Err(AppError::BadRequest("IMDb rating must be between 0 and 10".into()));
    }
    if price < 0 {
        return Err(AppError::BadRequest("Price must not be negative".into()));
    }
    Ok(())
}

fn dedup_ids(ids: &[i32]) -> Vec<i32> {
    ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

fn check_found(found: u64, ids: &[i32], label: &str) -> AppResult<()> {
    if found != ids.len() as u64 {
        return Err(AppError::BadRequest(format!("Unknown {label} id")));
    }
    Ok(())
}

async fn ensure_certification<C: ConnectionTrait>(conn: &C, id: i32) -> AppResult<()> {
    Certifications::find_by_id(id)
        .one(conn)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::BadRequest("Unknown certification id".into()))
}

async fn ensure_genres<C: ConnectionTrait>(conn: &C, ids: &[i32]) -> AppResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let found = Genres::find()
        .filter(genres::Column::Id.is_in(ids.to_vec()))
        .count(conn)
        .await?;
    check_found(found, ids, "genre")
}

async fn ensure_directors<C: ConnectionTrait>(conn: &C, ids: &[i32]) -> AppResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let found = Directors::find()
        .filter(directors::Column::Id.is_in(ids.to_vec()))
        .count(conn)
        .await?;
    check_found(found, ids, "director")
}

async fn ensure_stars<C: ConnectionTrait>(conn: &C, ids: &[i32]) -> AppResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let found = Stars::find()
        .filter(stars::Column::Id.is_in(ids.to_vec()))
        .count(conn)
        .await?;
    check_found(found, ids, "star")
}

async fn link_genres<C: ConnectionTrait>(conn: &C, movie_id: i64, ids: &[i32]) -> AppResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    MovieGenres::insert_many(ids.iter().map(|&genre_id| movie_genres::ActiveModel {
        movie_id: Set(movie_id),
        genre_id: Set(genre_id),
    }))
    .exec_without_returning(conn)
    .await?;
    Ok(())
}

async fn link_directors<C: ConnectionTrait>(conn: &C, movie_id: i64, ids: &[i32]) -> AppResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    MovieDirectors::insert_many(ids.iter().map(|&director_id| movie_directors::ActiveModel {
        movie_id: Set(movie_id),
        director_id: Set(director_id),
    }))
    .exec_without_returning(conn)
    .await?;
    Ok(())
}

async fn link_stars<C: ConnectionTrait>(conn: &C, movie_id: i64, ids: &[i32]) -> AppResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    MovieStars::insert_many(ids.iter().map(|&star_id| movie_stars::ActiveModel {
        movie_id: Set(movie_id),
        star_id: Set(star_id),
    }))
    .exec_without_returning(conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_relation_ids_collapse() {
        assert_eq!(dedup_ids(&[3, 1, 3, 2, 1]), vec![1, 2, 3]);
    }

    #[test]
    fn movie_fields_are_range_checked() {
        assert!(validate_movie_fields("Heat", 1995, 170, 8.3, 999).is_ok());
        assert!(validate_movie_fields(" ", 1995, 170, 8.3, 999).is_err());
        assert!(validate_movie_fields("Heat", 1995, 0, 8.3, 999).is_err());
        assert!(validate_movie_fields("Heat", 1995, 170, 11.0, 999).is_err());
        assert!(validate_movie_fields("Heat", 1995, 170, 8.3, -1).is_err());
    }

    #[test]
    fn missing_relation_ids_are_reported() {
        assert!(check_found(2, &[1, 2], "genre").is_ok());
        let err = check_found(1, &[1, 2], "genre").unwrap_err();
        assert_eq!(err.to_string(), "Bad Request Unknown genre id");
    }
}
