//! Shared types for the bookstore backend.

pub mod ids;
pub mod money;

pub use ids::{BookId, CategoryId, CoverId, OrderId, UserId};
pub use money::{Discount, DiscountError, Money};
