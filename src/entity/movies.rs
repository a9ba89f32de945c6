use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "movies")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub uuid: Uuid,
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
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::certifications::Entity",
        from = "Column::CertificationId",
        to = "super::certifications::Column::Id"
    )]
    Certifications,
    #[sea_orm(has_many = "super::movie_genres::Entity")]
    MovieGenres,
    #[sea_orm(has_many = "super::movie_directors::Entity")]
    MovieDirectors,
    #[sea_orm(has_many = "super::movie_stars::Entity")]
    MovieStars,
    #[sea_orm(has_many = "super::order_items::Entity")]
    OrderItems,
}

impl Related<super::certifications::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Certifications.def()
    }
}

impl Related<super::genres::Entity> for Entity {
    fn to() -> RelationDef {
        super::movie_genres::Relation::Genres.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::movie_genres::Relation::Movies.def().rev())
    }
}

impl Related<super::directors::Entity> for Entity {
    fn to() -> RelationDef {
        super::movie_directors::Relation::Directors.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::movie_directors::Relation::Movies.def().rev())
    }
}

impl Related<super::stars::Entity> for Entity {
    fn to() -> RelationDef {
        super::movie_stars::Relation::Stars.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::movie_stars::Relation::Movies.def().rev())
    }
}

impl Related<super::order_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
