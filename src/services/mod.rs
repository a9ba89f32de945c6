pub mod account_service;
pub mod cart_service;
pub mod movie_service;
pub mod order_service;
pub mod payment_service;
