pub mod activation_tokens;
pub mod audit_logs;
pub mod cart_items;
pub mod carts;
pub mod certifications;
pub mod directors;
pub mod genres;
pub mod movie_directors;
pub mod movie_genres;
pub mod movie_stars;
pub mod movies;
pub mod order_items;
pub mod orders;
pub mod password_reset_tokens;
pub mod payment_items;
pub mod payments;
pub mod refresh_tokens;
pub mod stars;
pub mod user_groups;
pub mod user_profiles;
pub mod users;

pub use activation_tokens::Entity as ActivationTokens;
pub use audit_logs::Entity as AuditLogs;
pub use cart_items::Entity as CartItems;
pub use carts::Entity as Carts;
pub use certifications::Entity as Certifications;
pub use directors::Entity as Directors;
pub use genres::Entity as Genres;
pub use movie_directors::Entity as MovieDirectors;
pub use movie_genres::Entity as MovieGenres;
pub use movie_stars::Entity as MovieStars;
pub use movies::Entity as Movies;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use password_reset_tokens::Entity as PasswordResetTokens;
pub use payment_items::Entity as PaymentItems;
pub use payments::Entity as Payments;
pub use refresh_tokens::Entity as RefreshTokens;
pub use stars::Entity as Stars;
pub use user_groups::Entity as UserGroups;
pub use user_profiles::Entity as UserProfiles;
pub use users::Entity as Users;
