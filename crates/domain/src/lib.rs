//! Domain layer for the bookstore backend.
//!
//! Services are generic over [`storage::Store`] and own a handle to it:
//! - [`CartService`] reserves and releases stock through cart entries
//! - [`OrderService`] converts a cart into an order in one transaction
//! - [`CatalogService`], [`CoverService`], [`CategoryService`] manage the catalog
//! - [`UserService`] handles accounts, password hashing and bearer tokens
//! - [`FavouriteService`] tracks favourite books

pub mod cart;
pub mod catalog;
pub mod category;
pub mod cover;
pub mod error;
pub mod favourite;
pub mod order;
pub mod password;
pub mod token;
pub mod user;

pub use cart::{Cart, CartService};
pub use catalog::{BookDetails, CatalogService, MAX_PRICE_CENTS, MAX_QUANTITY};
pub use category::CategoryService;
pub use cover::{CoverImage, CoverService, ImageEncoding};
pub use error::{DomainError, Result};
pub use favourite::FavouriteService;
pub use order::OrderService;
pub use token::{Claims, TokenIssuer};
pub use user::{Session, UserProfile, UserService};
