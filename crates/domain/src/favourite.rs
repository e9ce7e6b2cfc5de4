//! User favourites.

use storage::{Book, BookId, Store, UserId};

use crate::error::{DomainError, Result};

/// Service for a user's favourite books.
pub struct FavouriteService<S: Store> {
    store: S,
}

impl<S: Store> FavouriteService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Marks a book as favourite. Adding it twice is a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn add_favourite(&self, user_id: UserId, book_id: BookId) -> Result<()> {
        if !self.store.user_exists(user_id).await? {
            return Err(DomainError::NotFound("user"));
        }
        if !self.store.book_exists(book_id).await? {
            return Err(DomainError::NotFound("book"));
        }
        self.store.add_favourite(user_id, book_id).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_favourites(&self, user_id: UserId) -> Result<Vec<Book>> {
        if !self.store.user_exists(user_id).await? {
            return Err(DomainError::NotFound("user"));
        }
        Ok(self.store.list_favourites(user_id).await?)
    }

    /// Unmarks a book. Removing a book that was not a favourite succeeds.
    #[tracing::instrument(skip(self))]
    pub async fn remove_favourite(&self, user_id: UserId, book_id: BookId) -> Result<()> {
        if !self.store.book_exists(book_id).await? {
            return Err(DomainError::NotFound("book"));
        }
        if !self.store.remove_favourite(user_id, book_id).await? {
            tracing::debug!(%user_id, %book_id, "book was not a favourite");
        }
        Ok(())
    }
}
