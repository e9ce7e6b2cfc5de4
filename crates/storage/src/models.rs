//! Row models shared by every store implementation.

use chrono::{DateTime, Utc};
use common::{BookId, CategoryId, CoverId, Discount, Money, OrderId, UserId};

/// A registered user. `password_hash` holds the Argon2 PHC string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub address: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub address: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// A cover image stored as raw bytes with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cover {
    pub id: CoverId,
    pub encoding: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct NewCover {
    pub encoding: String,
    pub content: Vec<u8>,
}

/// A catalog book.
///
/// `quantity` is the stock still available for reservation; copies held in
/// carts have already been subtracted. `purchase_count` is derived from placed
/// order lines and is ignored on writes.
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub description: String,
    pub category_id: CategoryId,
    pub cover_id: CoverId,
    pub price: Money,
    pub quantity: i32,
    pub discount: Discount,
    pub added_at: DateTime<Utc>,
    pub purchase_count: i64,
}

impl Book {
    /// Unit price after the discount is applied.
    pub fn effective_price(&self) -> Money {
        self.price.discounted(self.discount)
    }
}

#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub description: String,
    pub category_id: CategoryId,
    pub cover_id: CoverId,
    pub price: Money,
    pub quantity: i32,
    pub discount: Discount,
    pub added_at: DateTime<Utc>,
}

/// A reservation of `quantity` copies at a price frozen when it was created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartEntry {
    pub user_id: UserId,
    pub book_id: BookId,
    pub quantity: i32,
    pub price_per_unit: Money,
}

impl CartEntry {
    /// `None` when the line does not fit in [`Money`].
    pub fn line_total(&self) -> Option<Money> {
        self.price_per_unit.checked_multiply(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub book_id: BookId,
    pub quantity: i32,
    pub price_per_unit: Money,
}

impl From<&CartEntry> for OrderLine {
    fn from(entry: &CartEntry) -> Self {
        Self {
            book_id: entry.book_id,
            quantity: entry.quantity,
            price_per_unit: entry.price_per_unit,
        }
    }
}

/// A placed order with its lines. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub applied_at: DateTime<Utc>,
    pub total_price: Money,
    pub lines: Vec<OrderLine>,
}

/// Order header written at the start of order placement.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub applied_at: DateTime<Utc>,
    pub total_price: Money,
}
