use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CartMovieRequest {
    pub movie_id: i64,
}
