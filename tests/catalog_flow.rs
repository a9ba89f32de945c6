mod common;

use cinema_api::{
    dto::movies::{CreateMovieRequest, NamedRequest, UpdateMovieRequest},
    error::AppError,
    models::UserRole,
    routes::params::{MovieQuery, MovieSortBy, SortOrder},
    services::movie_service::{self, CatalogKind},
};
use uuid::Uuid;

fn named(prefix: &str) -> NamedRequest {
    NamedRequest {
        name: format!("{prefix} {}", Uuid::new_v4().simple()),
    }
}

#[tokio::test]
async fn moderators_curate_the_catalog() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let app = common::setup(&url, false).await?;
    let state = &app.state;
    let viewer = common::create_user(state, UserRole::User).await?;
    let moderator = common::create_user(state, UserRole::Moderator).await?;

    assert!(matches!(
        movie_service::create_reference(state, &viewer, CatalogKind::Genre, named("Noir")).await,
        Err(AppError::Forbidden)
    ));

    let genre_name = named("Noir");
    let genre = movie_service::create_reference(
        state,
        &moderator,
        CatalogKind::Genre,
        NamedRequest {
            name: genre_name.name.clone(),
        },
    )
    .await?
    .data
    .expect("genre");
    assert!(matches!(
        movie_service::create_reference(state, &moderator, CatalogKind::Genre, genre_name).await,
        Err(AppError::Conflict(msg)) if msg == "Genre already exists"
    ));

    let certification = movie_service::create_reference(
        state,
        &moderator,
        CatalogKind::Certification,
        named("PG"),
    )
    .await?
    .data
    .expect("certification");
    let director = movie_service::create_reference(
        state,
        &moderator,
        CatalogKind::Director,
        named("Director"),
    )
    .await?
    .data
    .expect("director");
    let star = movie_service::create_reference(state, &moderator, CatalogKind::Star, named("Star"))
        .await?
        .data
        .expect("star");

    let genres = movie_service::list_references(state, CatalogKind::Genre)
        .await?
        .data
        .expect("genres");
    assert!(genres.contains(&genre));

    let title = format!("Heist {}", Uuid::new_v4().simple());
    let request = || CreateMovieRequest {
        name: title.clone(),
        year: 1999,
        time: 120,
        imdb: 7.5,
        votes: 10,
        meta_score: Some(70.0),
        gross: None,
        description: "A careful plan".into(),
        price: 499,
        certification_id: certification.id,
        genre_ids: vec![genre.id, genre.id],
        director_ids: vec![director.id],
        star_ids: vec![star.id],
    };

    let created = movie_service::create_movie(state, &moderator, request())
        .await?
        .data
        .expect("movie");
    assert_eq!(created.genres, vec![genre.clone()]);
    assert_eq!(created.directors, vec![director.clone()]);
    assert_eq!(created.stars, vec![star.clone()]);
    assert_eq!(created.certification, Some(certification.clone()));

    // name, year and time identify a movie
    assert!(matches!(
        movie_service::create_movie(state, &moderator, request()).await,
        Err(AppError::Conflict(_))
    ));

    let mut unknown = request();
    unknown.name = format!("Other {}", Uuid::new_v4().simple());
    unknown.genre_ids = vec![i32::MAX];
    assert!(matches!(
        movie_service::create_movie(state, &moderator, unknown).await,
        Err(AppError::BadRequest(_))
    ));

    let found = movie_service::list_movies(
        state,
        MovieQuery {
            q: Some(title.to_uppercase()),
            genre_id: Some(genre.id),
            director_id: Some(director.id),
            star_id: Some(star.id),
            sort_by: Some(MovieSortBy::Price),
            order: Some(SortOrder::Asc),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("movies");
    assert_eq!(found.items.len(), 1);
    assert_eq!(found.items[0].uuid, created.uuid);

    let none = movie_service::list_movies(
        state,
        MovieQuery {
            q: Some(title.clone()),
            imdb_min: Some(8.0),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("movies");
    assert!(none.items.is_empty());

    let updated = movie_service::update_movie(
        state,
        &moderator,
        created.uuid,
        UpdateMovieRequest {
            price: Some(599),
            star_ids: Some(Vec::new()),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("movie");
    assert_eq!(updated.price, 599);
    assert!(updated.stars.is_empty());
    assert_eq!(updated.genres, vec![genre]);

    assert!(matches!(
        movie_service::update_movie(
            state,
            &moderator,
            created.uuid,
            UpdateMovieRequest {
                price: Some(-1),
                ..Default::default()
            },
        )
        .await,
        Err(AppError::BadRequest(_))
    ));

    movie_service::delete_movie(state, &moderator, created.uuid).await?;
    assert!(matches!(
        movie_service::get_movie(state, created.uuid).await,
        Err(AppError::NotFound(_))
    ));

    Ok(())
}
