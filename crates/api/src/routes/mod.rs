pub mod books;
pub mod cart;
pub mod categories;
pub mod covers;
pub mod favourites;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod users;
