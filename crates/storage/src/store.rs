use async_trait::async_trait;

use crate::{
    Book, BookId, BookListQuery, BookPage, CartEntry, Category, CategoryId, Cover, CoverId,
    NewBook, NewCover, NewOrder, NewUser, Order, OrderId, OrderLine, Result, User, UserId,
};

/// Core trait for store implementations.
///
/// Single-row operations run directly against the store. Anything that must
/// change several rows together goes through [`Store::begin`] and the
/// returned [`StoreTx`]. Lookups by id return `Ok(None)` when the row is
/// absent; `Err` is reserved for store failures and constraint violations.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Store: Send + Sync {
    /// Transaction handle produced by [`Store::begin`].
    type Tx: StoreTx;

    /// Opens a transaction. Dropping the handle without calling
    /// [`StoreTx::commit`] rolls every write back.
    ///
    /// Do not call other `Store` methods while a transaction from the same
    /// task is open; use the transaction's own methods instead.
    async fn begin(&self) -> Result<Self::Tx>;

    // -- users --

    async fn create_user(&self, user: NewUser) -> Result<User>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>>;

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn list_users(&self) -> Result<Vec<User>>;

    /// Overwrites every column of the user row except `joined_at`.
    async fn update_user(&self, user: &User) -> Result<()>;

    async fn user_exists(&self, id: UserId) -> Result<bool>;

    async fn username_taken(&self, username: &str) -> Result<bool>;

    async fn email_taken(&self, email: &str) -> Result<bool>;

    // -- categories --

    async fn create_category(&self, name: &str) -> Result<Category>;

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>>;

    async fn list_categories(&self) -> Result<Vec<Category>>;

    async fn update_category(&self, category: &Category) -> Result<()>;

    /// Fails with `Conflict` while books still reference the category.
    async fn delete_category(&self, id: CategoryId) -> Result<()>;

    async fn category_exists(&self, id: CategoryId) -> Result<bool>;

    async fn category_name_taken(&self, name: &str) -> Result<bool>;

    // -- covers --

    async fn get_cover(&self, id: CoverId) -> Result<Option<Cover>>;

    async fn update_cover(&self, cover: &Cover) -> Result<()>;

    // -- books --

    async fn get_book(&self, id: BookId) -> Result<Option<Book>>;

    async fn book_exists(&self, id: BookId) -> Result<bool>;

    /// Returns one page of the catalog ordered by the query's sorting, ties
    /// broken by ascending id.
    async fn list_books(&self, query: &BookListQuery) -> Result<BookPage>;

    /// Overwrites the editable columns of a book (title, description,
    /// category, price, quantity, discount).
    async fn update_book(&self, book: &Book) -> Result<()>;

    // -- favourites --

    /// Marks a book as favourite. Adding an existing favourite is a no-op.
    async fn add_favourite(&self, user_id: UserId, book_id: BookId) -> Result<()>;

    async fn list_favourites(&self, user_id: UserId) -> Result<Vec<Book>>;

    /// Returns `false` when the pair was not a favourite.
    async fn remove_favourite(&self, user_id: UserId, book_id: BookId) -> Result<bool>;

    // -- cart --

    async fn cart_entries(&self, user_id: UserId) -> Result<Vec<CartEntry>>;

    // -- orders --

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists orders newest first, optionally for a single user. Every order
    /// carries its lines.
    async fn list_orders(&self, user_id: Option<UserId>) -> Result<Vec<Order>>;
}

/// A transaction scope over the store.
///
/// Writes become visible to other callers only after [`StoreTx::commit`].
#[async_trait]
pub trait StoreTx: Send + Sized {
    async fn user_exists(&mut self, id: UserId) -> Result<bool>;

    /// Deletes a user with their favourites, cart entries and orders.
    async fn delete_user(&mut self, id: UserId) -> Result<()>;

    /// Reads a book and locks it for the rest of the transaction.
    async fn get_book(&mut self, id: BookId) -> Result<Option<Book>>;

    async fn insert_book(&mut self, book: NewBook) -> Result<Book>;

    /// Sets the available quantity. Negative quantities are a `Conflict`.
    async fn set_book_quantity(&mut self, id: BookId, quantity: i32) -> Result<()>;

    /// Deletes a book together with its favourites and cart entries.
    async fn delete_book(&mut self, id: BookId) -> Result<()>;

    async fn insert_cover(&mut self, cover: NewCover) -> Result<Cover>;

    async fn delete_cover(&mut self, id: CoverId) -> Result<()>;

    async fn get_cart_entry(&mut self, user_id: UserId, book_id: BookId)
    -> Result<Option<CartEntry>>;

    async fn cart_entries(&mut self, user_id: UserId) -> Result<Vec<CartEntry>>;

    /// Fails with `Conflict` if the user already has the book in the cart.
    async fn insert_cart_entry(&mut self, entry: &CartEntry) -> Result<()>;

    async fn delete_cart_entry(&mut self, user_id: UserId, book_id: BookId) -> Result<()>;

    /// Deletes every cart entry of the user, returning how many were removed.
    async fn clear_cart(&mut self, user_id: UserId) -> Result<u64>;

    /// Inserts an order header and returns its generated id.
    async fn insert_order(&mut self, order: NewOrder) -> Result<OrderId>;

    async fn insert_order_line(&mut self, order_id: OrderId, line: &OrderLine) -> Result<()>;

    /// Makes every write of this transaction visible.
    async fn commit(self) -> Result<()>;
}
