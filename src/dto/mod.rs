pub mod auth;
pub mod cart;
pub mod catalog;
pub mod categories;
pub mod favorites;
pub mod orders;
pub mod products;
