use cinema_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    security::hash_password,
};
use uuid::Uuid;

const CERTIFICATIONS: [&str; 4] = ["G", "PG", "PG-13", "R"];
const GENRES: [&str; 5] = ["Drama", "Crime", "Action", "Sci-Fi", "Comedy"];
const DIRECTORS: [&str; 3] = ["Christopher Nolan", "Frank Darabont", "Quentin Tarantino"];
const STARS: [&str; 4] = [
    "Tim Robbins",
    "Morgan Freeman",
    "Leonardo DiCaprio",
    "Uma Thurman",
];

struct SeedMovie {
    name: &'static str,
    year: i32,
    time: i32,
    imdb: f64,
    votes: i32,
    description: &'static str,
    price: i64,
    certification: &'static str,
    genres: &'static [&'static str],
    director: &'static str,
    stars: &'static [&'static str],
}

const MOVIES: [SeedMovie; 3] = [
    SeedMovie {
        name: "The Shawshank Redemption",
        year: 1994,
        time: 142,
        imdb: 9.3,
        votes: 2_900_000,
        description: "Two imprisoned men bond over a number of years.",
        price: 999,
        certification: "R",
        genres: &["Drama"],
        director: "Frank Darabont",
        stars: &["Tim Robbins", "Morgan Freeman"],
    },
    SeedMovie {
        name: "Inception",
        year: 2010,
        time: 148,
        imdb: 8.8,
        votes: 2_500_000,
        description: "A thief who steals secrets through dream-sharing technology.",
        price: 1299,
        certification: "PG-13",
        genres: &["Action", "Sci-Fi"],
        director: "Christopher Nolan",
        stars: &["Leonardo DiCaprio"],
    },
    SeedMovie {
        name: "Pulp Fiction",
        year: 1994,
        time: 154,
        imdb: 8.9,
        votes: 2_200_000,
        description: "The lives of two mob hitmen and a boxer intertwine.",
        price: 799,
        certification: "R",
        genres: &["Crime", "Drama"],
        director: "Quentin Tarantino",
        stars: &["Uma Thurman"],
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let admin_id = ensure_user(&pool, "admin@example.com", "Admin123!", "ADMIN").await?;
    let moderator_id =
        ensure_user(&pool, "moderator@example.com", "Moderator123!", "MODERATOR").await?;
    let user_id = ensure_user(&pool, "user@example.com", "User1234!", "USER").await?;

    for name in CERTIFICATIONS {
        ensure_named(&pool, "certifications", name).await?;
    }
    for name in GENRES {
        ensure_named(&pool, "genres", name).await?;
    }
    for name in DIRECTORS {
        ensure_named(&pool, "directors", name).await?;
    }
    for name in STARS {
        ensure_named(&pool, "stars", name).await?;
    }
    seed_movies(&pool).await?;

    println!(
        "Seed completed. Admin ID: {admin_id}, Moderator ID: {moderator_id}, User ID: {user_id}"
    );
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    group: &str,
) -> anyhow::Result<Uuid> {
    let password_hash =
        hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    // Seeded accounts skip e-mail activation.
    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, is_active, group_id)
        VALUES ($1, $2, $3, TRUE, (SELECT id FROM user_groups WHERE name = $4))
        ON CONFLICT (email) DO UPDATE
            SET group_id = EXCLUDED.group_id, is_active = TRUE, updated_at = now()
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(group)
    .fetch_one(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO user_profiles (id, user_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .execute(pool)
    .await?;

    println!("Ensured user {email} (group={group})");
    Ok(user_id)
}

/// `table` is always one of the fixed reference tables above.
async fn ensure_named(pool: &sqlx::PgPool, table: &str, name: &str) -> anyhow::Result<i32> {
    sqlx::query(&format!(
        "INSERT INTO {table} (name) VALUES ($1) ON CONFLICT (name) DO NOTHING"
    ))
    .bind(name)
    .execute(pool)
    .await?;

    let (id,): (i32,) = sqlx::query_as(&format!("SELECT id FROM {table} WHERE name = $1"))
        .bind(name)
        .fetch_one(pool)
        .await?;
    Ok(id)
}

async fn seed_movies(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    for movie in MOVIES {
        let certification_id = ensure_named(pool, "certifications", movie.certification).await?;

        let inserted: Option<(i64,)> = sqlx::query_as(
            r#"
            INSERT INTO movies
                (uuid, name, year, time, imdb, votes, description, price, certification_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (name, year, time) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(movie.name)
        .bind(movie.year)
        .bind(movie.time)
        .bind(movie.imdb)
        .bind(movie.votes)
        .bind(movie.description)
        .bind(movie.price)
        .bind(certification_id)
        .fetch_optional(pool)
        .await?;

        // Already seeded on a previous run.
        let Some((movie_id,)) = inserted else {
            continue;
        };

        for genre in movie.genres {
            let genre_id = ensure_named(pool, "genres", genre).await?;
            sqlx::query("INSERT INTO movie_genres (movie_id, genre_id) VALUES ($1, $2)")
                .bind(movie_id)
                .bind(genre_id)
                .execute(pool)
                .await?;
        }

        let director_id = ensure_named(pool, "directors", movie.director).await?;
        sqlx::query("INSERT INTO movie_directors (movie_id, director_id) VALUES ($1, $2)")
            .bind(movie_id)
            .bind(director_id)
            .execute(pool)
            .await?;

        for star in movie.stars {
            let star_id = ensure_named(pool, "stars", star).await?;
            sqlx::query("INSERT INTO movie_stars (movie_id, star_id) VALUES ($1, $2)")
                .bind(movie_id)
                .bind(star_id)
                .execute(pool)
                .await?;
        }
    }

    println!("Seeded movies");
    Ok(())
}
