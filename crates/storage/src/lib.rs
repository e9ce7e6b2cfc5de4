//! Relational store for the bookstore backend.
//!
//! [`Store`] exposes per-entity CRUD and [`StoreTx`] the transaction scope used
//! by multi-row workflows (cart reservation, order placement). Two
//! implementations are provided: [`InMemoryStore`] for tests and local runs,
//! and [`PostgresStore`] backed by `sqlx`.

pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod query;
pub mod store;

pub use common::{BookId, CategoryId, CoverId, Discount, Money, OrderId, UserId};
pub use error::{Result, StoreError};
pub use memory::{InMemoryStore, InMemoryTx};
pub use models::{
    Book, CartEntry, Category, Cover, NewBook, NewCover, NewOrder, NewUser, Order, OrderLine,
    User,
};
pub use postgres::{PostgresStore, PostgresTx};
pub use query::{
    BookListQuery, BookPage, BookSorting, DEFAULT_PAGE_SIZE, FIRST_PAGE, MAX_PAGE_SIZE, QueryError,
};
pub use store::{Store, StoreTx};
