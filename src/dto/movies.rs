use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::MovieShort;

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct MovieList {
    #[schema(value_type = Vec<MovieShort>)]
    pub items: Vec<MovieShort>,
}

/// Body for creating a genre, star, director or certification.
#[derive(Debug, Deserialize, ToSchema)]
pub struct NamedRequest {
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMovieRequest {
    pub name: String,
    pub year: i32,
    pub time: i32,
    pub imdb: f64,
    pub votes: i32,
    pub meta_score: Option<f64>,
    pub gross: Option<f64>,
    pub description: String,
    /// Minor currency units.
    pub price: i64,
    pub certification_id: i32,
    #[serde(default)]
    pub genre_ids: Vec<i32>,
    #[serde(default)]
    pub director_ids: Vec<i32>,
    #[serde(default)]
    pub star_ids: Vec<i32>,
}

/// Absent fields are left untouched; a present id list replaces the relation.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateMovieRequest {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub time: Option<i32>,
    pub imdb: Option<f64>,
    pub votes: Option<i32>,
    pub meta_score: Option<f64>,
    pub gross: Option<f64>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub certification_id: Option<i32>,
    pub genre_ids: Option<Vec<i32>>,
    pub director_ids: Option<Vec<i32>>,
    pub star_ids: Option<Vec<i32>>,
}
