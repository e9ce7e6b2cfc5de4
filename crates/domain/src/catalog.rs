//! Book catalog.

use chrono::Utc;
use storage::{
    Book, BookId, BookListQuery, BookPage, CategoryId, Discount, Money, NewBook, Store, StoreTx,
};

use crate::cover::CoverImage;
use crate::error::{DomainError, Result};

/// Highest list price a book may carry, in cents.
pub const MAX_PRICE_CENTS: i64 = 1_000_000_000;

/// Highest stock a book may carry.
pub const MAX_QUANTITY: i32 = 1_000_000;

/// Editable book fields.
#[derive(Debug, Clone)]
pub struct BookDetails {
    pub title: String,
    pub description: String,
    pub category_id: CategoryId,
    pub price: Money,
    pub quantity: i32,
    pub discount: Discount,
}

impl BookDetails {
    fn check(&self) -> Result<()> {
        if self.price.is_negative() || self.price.cents() > MAX_PRICE_CENTS {
            return Err(DomainError::invalid(format!(
                "price must be between 0 and {MAX_PRICE_CENTS} cents"
            )));
        }
        if !(0..=MAX_QUANTITY).contains(&self.quantity) {
            return Err(DomainError::invalid(format!(
                "quantity must be between 0 and {MAX_QUANTITY}"
            )));
        }
        Ok(())
    }
}

/// Service for the book catalog.
pub struct CatalogService<S: Store> {
    store: S,
}

impl<S: Store> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates a book together with its cover in one transaction.
    #[tracing::instrument(skip(self, details, cover), fields(title = %details.title))]
    pub async fn create_book(&self, details: BookDetails, cover: CoverImage) -> Result<Book> {
        details.check()?;
        if !self.store.category_exists(details.category_id).await? {
            return Err(DomainError::NotFound("category"));
        }

        let mut tx = self.store.begin().await?;
        let cover = tx.insert_cover(cover.into_new_cover()).await?;
        let book = tx
            .insert_book(NewBook {
                title: details.title,
                description: details.description,
                category_id: details.category_id,
                cover_id: cover.id,
                price: details.price,
                quantity: details.quantity,
                discount: details.discount,
                added_at: Utc::now(),
            })
            .await?;
        tx.commit().await?;

        tracing::info!(book_id = %book.id, cover_id = %cover.id, "book created");
        Ok(book)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_book(&self, id: BookId) -> Result<Book> {
        self.store
            .get_book(id)
            .await?
            .ok_or(DomainError::NotFound("book"))
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_books(&self, query: BookListQuery) -> Result<BookPage> {
        Ok(self.store.list_books(&query).await?)
    }

    #[tracing::instrument(skip(self, details))]
    pub async fn update_book(&self, id: BookId, details: BookDetails) -> Result<Book> {
        details.check()?;
        let existing = self.get_book(id).await?;
        if details.category_id != existing.category_id
            && !self.store.category_exists(details.category_id).await?
        {
            return Err(DomainError::NotFound("category"));
        }

        let book = Book {
            title: details.title,
            description: details.description,
            category_id: details.category_id,
            price: details.price,
            quantity: details.quantity,
            discount: details.discount,
            ..existing
        };
        self.store.update_book(&book).await?;
        tracing::info!(book_id = %id, "book updated");
        Ok(book)
    }

    /// Deletes a book with its cover, favourites and cart entries.
    #[tracing::instrument(skip(self))]
    pub async fn delete_book(&self, id: BookId) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let book = tx.get_book(id).await?.ok_or(DomainError::NotFound("book"))?;
        tx.delete_book(id).await?;
        tx.delete_cover(book.cover_id).await?;
        tx.commit().await?;

        tracing::info!(book_id = %id, "book deleted");
        Ok(())
    }
}
