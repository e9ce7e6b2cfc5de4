//! Cart reservation.
//!
//! Adding a book to the cart holds the requested copies against the book's
//! available quantity; removing the entry gives them back. Each operation
//! runs in a single store transaction so the cart and the inventory never
//! disagree.

use storage::{Book, BookId, CartEntry, Money, Store, StoreTx, UserId};

use crate::error::{DomainError, Result};

/// A user's cart with its running total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    pub user_id: UserId,
    pub entries: Vec<CartEntry>,
    pub total: Money,
}

/// Sum of quantity times frozen price over every entry.
pub(crate) fn cart_total(entries: &[CartEntry]) -> Result<Money> {
    entries
        .iter()
        .map(CartEntry::line_total)
        .collect::<Option<Vec<_>>>()
        .and_then(Money::checked_sum)
        .ok_or_else(|| DomainError::invalid("cart total is out of range"))
}

/// Stock of `book` once `entry` is handed back.
pub(crate) fn restocked(book: &Book, entry: &CartEntry) -> Result<i32> {
    book.quantity
        .checked_add(entry.quantity)
        .ok_or_else(|| DomainError::invalid("book quantity is out of range"))
}

/// Service for cart reservations.
pub struct CartService<S: Store> {
    store: S,
}

impl<S: Store> CartService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Reserves `quantity` copies of a book for the user at its current
    /// effective price.
    #[tracing::instrument(skip(self))]
    pub async fn add_to_cart(
        &self,
        user_id: UserId,
        book_id: BookId,
        quantity: i32,
    ) -> Result<CartEntry> {
        if quantity < 1 {
            return Err(DomainError::invalid("quantity must be at least 1"));
        }

        let mut tx = self.store.begin().await?;

        if !tx.user_exists(user_id).await? {
            return Err(DomainError::NotFound("user"));
        }
        let book = tx
            .get_book(book_id)
            .await?
            .ok_or(DomainError::NotFound("book"))?;

        if quantity > book.quantity {
            tracing::warn!(
                requested = quantity,
                available = book.quantity,
                "cart reservation exceeds stock"
            );
            return Err(DomainError::invalid(format!(
                "invalid quantity: requested {quantity}, available {}",
                book.quantity
            )));
        }
        if tx.get_cart_entry(user_id, book_id).await?.is_some() {
            return Err(DomainError::conflict("book is already in the cart"));
        }

        let entry = CartEntry {
            user_id,
            book_id,
            quantity,
            price_per_unit: book.effective_price(),
        };
        tx.insert_cart_entry(&entry).await?;
        tx.set_book_quantity(book_id, book.quantity - quantity)
            .await?;
        tx.commit().await?;

        metrics::counter!("cart_reservations_total").increment(1);
        tracing::info!(%user_id, %book_id, quantity, "books reserved");

        Ok(entry)
    }

    /// Drops a cart entry and returns its copies to the book.
    #[tracing::instrument(skip(self))]
    pub async fn remove_from_cart(&self, user_id: UserId, book_id: BookId) -> Result<CartEntry> {
        let mut tx = self.store.begin().await?;

        let entry = tx
            .get_cart_entry(user_id, book_id)
            .await?
            .ok_or(DomainError::NotFound("cart entry"))?;
        let book = tx
            .get_book(book_id)
            .await?
            .ok_or(DomainError::NotFound("book"))?;

        tx.delete_cart_entry(user_id, book_id).await?;
        tx.set_book_quantity(book_id, restocked(&book, &entry)?)
            .await?;
        tx.commit().await?;

        metrics::counter!("cart_releases_total").increment(1);
        tracing::info!(%user_id, %book_id, quantity = entry.quantity, "reservation released");

        Ok(entry)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_cart(&self, user_id: UserId) -> Result<Cart> {
        if !self.store.user_exists(user_id).await? {
            return Err(DomainError::NotFound("user"));
        }
        let entries = self.store.cart_entries(user_id).await?;
        let total = cart_total(&entries)?;
        Ok(Cart {
            user_id,
            entries,
            total,
        })
    }
}
