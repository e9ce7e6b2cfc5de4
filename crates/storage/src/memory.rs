use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    Book, BookId, BookListQuery, BookPage, BookSorting, CartEntry, Category, CategoryId, Cover,
    CoverId, NewBook, NewCover, NewOrder, NewUser, Order, OrderId, OrderLine, Result, StoreError,
    User, UserId,
    store::{Store, StoreTx},
};

#[derive(Debug, Clone, Default)]
struct Tables {
    last_id: i64,
    users: BTreeMap<UserId, User>,
    categories: BTreeMap<CategoryId, Category>,
    covers: BTreeMap<CoverId, Cover>,
    books: BTreeMap<BookId, Book>,
    favourites: BTreeSet<(UserId, BookId)>,
    cart: BTreeMap<(UserId, BookId), CartEntry>,
    // Headers only; lines live in `order_lines`.
    orders: BTreeMap<OrderId, Order>,
    order_lines: Vec<(OrderId, OrderLine)>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn purchase_count(&self, book_id: BookId) -> i64 {
        self.order_lines
            .iter()
            .filter(|(_, line)| line.book_id == book_id)
            .map(|(_, line)| i64::from(line.quantity))
            .sum()
    }

    fn book_view(&self, book: &Book) -> Book {
        Book {
            purchase_count: self.purchase_count(book.id),
            ..book.clone()
        }
    }

    fn order_view(&self, header: &Order) -> Order {
        let lines = self
            .order_lines
            .iter()
            .filter(|(order_id, _)| *order_id == header.id)
            .map(|(_, line)| line.clone())
            .collect();
        Order {
            lines,
            ..header.clone()
        }
    }

    fn cart_entries(&self, user_id: UserId) -> Vec<CartEntry> {
        self.cart
            .values()
            .filter(|entry| entry.user_id == user_id)
            .cloned()
            .collect()
    }

    fn username_taken_by_other(&self, username: &str, id: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|u| u.username == username && Some(u.id) != id)
    }

    fn email_taken_by_other(&self, email: &str, id: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != id)
    }

    fn category_name_taken_by_other(&self, name: &str, id: Option<CategoryId>) -> bool {
        self.categories
            .values()
            .any(|c| c.name == name && Some(c.id) != id)
    }
}

fn compare_books(sorting: BookSorting, a: &Book, b: &Book) -> Ordering {
    let primary = match sorting {
        BookSorting::Popularity => b.purchase_count.cmp(&a.purchase_count),
        BookSorting::Latest => b.added_at.cmp(&a.added_at),
        BookSorting::PriceAsc => a.effective_price().cmp(&b.effective_price()),
        BookSorting::PriceDesc => b.effective_price().cmp(&a.effective_price()),
    };
    primary.then(a.id.cmp(&b.id))
}

#[derive(Debug, Default)]
struct Faults {
    order_lines: AtomicBool,
    book_quantity: AtomicBool,
}

/// In-memory store implementation for testing and local runs.
///
/// Provides the same interface as the PostgreSQL implementation. Transactions
/// hold the table lock for their whole lifetime and work on a private copy
/// that replaces the tables on commit.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    faults: Arc<Faults>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent order-line insert fail.
    pub fn fail_order_line_inserts(&self, fail: bool) {
        self.faults.order_lines.store(fail, AtomicOrdering::SeqCst);
    }

    /// Makes every subsequent book-quantity write fail.
    pub fn fail_book_quantity_writes(&self, fail: bool) {
        self.faults.book_quantity.store(fail, AtomicOrdering::SeqCst);
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.tables.lock().await.orders.len()
    }

    /// Returns the total number of order lines stored.
    pub async fn order_line_count(&self) -> usize {
        self.tables.lock().await.order_lines.len()
    }
}

/// Transaction over an [`InMemoryStore`].
pub struct InMemoryTx {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
    faults: Arc<Faults>,
}

#[async_trait]
impl Store for InMemoryStore {
    type Tx = InMemoryTx;

    async fn begin(&self) -> Result<InMemoryTx> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(InMemoryTx {
            guard,
            working,
            faults: self.faults.clone(),
        })
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.tables.lock().await;
        if tables.username_taken_by_other(&user.username, None) {
            return Err(StoreError::Conflict("unique_username".to_string()));
        }
        if tables.email_taken_by_other(&user.email, None) {
            return Err(StoreError::Conflict("unique_email".to_string()));
        }
        let user = User {
            id: UserId::new(tables.next_id()),
            name: user.name,
            username: user.username,
            password_hash: user.password_hash,
            email: user.email,
            address: user.address,
            joined_at: user.joined_at,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.tables.lock().await.users.values().cloned().collect())
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let mut tables = self.tables.lock().await;
        if tables.username_taken_by_other(&user.username, Some(user.id)) {
            return Err(StoreError::Conflict("unique_username".to_string()));
        }
        if tables.email_taken_by_other(&user.email, Some(user.id)) {
            return Err(StoreError::Conflict("unique_email".to_string()));
        }
        if let Some(existing) = tables.users.get_mut(&user.id) {
            *existing = User {
                joined_at: existing.joined_at,
                ..user.clone()
            };
        }
        Ok(())
    }

    async fn user_exists(&self, id: UserId) -> Result<bool> {
        Ok(self.tables.lock().await.users.contains_key(&id))
    }

    async fn username_taken(&self, username: &str) -> Result<bool> {
        Ok(self
            .tables
            .lock()
            .await
            .username_taken_by_other(username, None))
    }

    async fn email_taken(&self, email: &str) -> Result<bool> {
        Ok(self.tables.lock().await.email_taken_by_other(email, None))
    }

    async fn create_category(&self, name: &str) -> Result<Category> {
        let mut tables = self.tables.lock().await;
        if tables.category_name_taken_by_other(name, None) {
            return Err(StoreError::Conflict("unique_category_name".to_string()));
        }
        let category = Category {
            id: CategoryId::new(tables.next_id()),
            name: name.to_string(),
        };
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>> {
        Ok(self.tables.lock().await.categories.get(&id).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self
            .tables
            .lock()
            .await
            .categories
            .values()
            .cloned()
            .collect())
    }

    async fn update_category(&self, category: &Category) -> Result<()> {
        let mut tables = self.tables.lock().await;
        if tables.category_name_taken_by_other(&category.name, Some(category.id)) {
            return Err(StoreError::Conflict("unique_category_name".to_string()));
        }
        if let Some(existing) = tables.categories.get_mut(&category.id) {
            existing.name = category.name.clone();
        }
        Ok(())
    }

    async fn delete_category(&self, id: CategoryId) -> Result<()> {
        let mut tables = self.tables.lock().await;
        if tables.books.values().any(|b| b.category_id == id) {
            return Err(StoreError::Conflict("books_category_id_fkey".to_string()));
        }
        tables.categories.remove(&id);
        Ok(())
    }

    async fn category_exists(&self, id: CategoryId) -> Result<bool> {
        Ok(self.tables.lock().await.categories.contains_key(&id))
    }

    async fn category_name_taken(&self, name: &str) -> Result<bool> {
        Ok(self
            .tables
            .lock()
            .await
            .category_name_taken_by_other(name, None))
    }

    async fn get_cover(&self, id: CoverId) -> Result<Option<Cover>> {
        Ok(self.tables.lock().await.covers.get(&id).cloned())
    }

    async fn update_cover(&self, cover: &Cover) -> Result<()> {
        let mut tables = self.tables.lock().await;
        if let Some(existing) = tables.covers.get_mut(&cover.id) {
            *existing = cover.clone();
        }
        Ok(())
    }

    async fn get_book(&self, id: BookId) -> Result<Option<Book>> {
        let tables = self.tables.lock().await;
        Ok(tables.books.get(&id).map(|b| tables.book_view(b)))
    }

    async fn book_exists(&self, id: BookId) -> Result<bool> {
        Ok(self.tables.lock().await.books.contains_key(&id))
    }

    async fn list_books(&self, query: &BookListQuery) -> Result<BookPage> {
        let tables = self.tables.lock().await;
        let mut books: Vec<Book> = tables.books.values().map(|b| tables.book_view(b)).collect();
        books.sort_by(|a, b| compare_books(query.sorting(), a, b));

        let total_books = books.len() as u64;
        let books = books
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.page_size() as usize)
            .collect();

        Ok(BookPage {
            books,
            total_books,
            total_pages: query.total_pages(total_books),
        })
    }

    async fn update_book(&self, book: &Book) -> Result<()> {
        let mut tables = self.tables.lock().await;
        if book.quantity < 0 {
            return Err(StoreError::Conflict("books_quantity_check".to_string()));
        }
        if !tables.categories.contains_key(&book.category_id) {
            return Err(StoreError::Conflict("books_category_id_fkey".to_string()));
        }
        if let Some(existing) = tables.books.get_mut(&book.id) {
            existing.title = book.title.clone();
            existing.description = book.description.clone();
            existing.category_id = book.category_id;
            existing.price = book.price;
            existing.quantity = book.quantity;
            existing.discount = book.discount;
        }
        Ok(())
    }

    async fn add_favourite(&self, user_id: UserId, book_id: BookId) -> Result<()> {
        let mut tables = self.tables.lock().await;
        if !tables.users.contains_key(&user_id) || !tables.books.contains_key(&book_id) {
            return Err(StoreError::Conflict("favourites_fkey".to_string()));
        }
        tables.favourites.insert((user_id, book_id));
        Ok(())
    }

    async fn list_favourites(&self, user_id: UserId) -> Result<Vec<Book>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .favourites
            .iter()
            .filter(|(uid, _)| *uid == user_id)
            .filter_map(|(_, bid)| tables.books.get(bid))
            .map(|b| tables.book_view(b))
            .collect())
    }

    async fn remove_favourite(&self, user_id: UserId, book_id: BookId) -> Result<bool> {
        Ok(self
            .tables
            .lock()
            .await
            .favourites
            .remove(&(user_id, book_id)))
    }

    async fn cart_entries(&self, user_id: UserId) -> Result<Vec<CartEntry>> {
        Ok(self.tables.lock().await.cart_entries(user_id))
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let tables = self.tables.lock().await;
        Ok(tables.orders.get(&id).map(|o| tables.order_view(o)))
    }

    async fn list_orders(&self, user_id: Option<UserId>) -> Result<Vec<Order>> {
        let tables = self.tables.lock().await;
        let mut headers: Vec<&Order> = tables
            .orders
            .values()
            .filter(|o| user_id.is_none_or(|uid| o.user_id == uid))
            .collect();
        headers.sort_by(|a, b| b.applied_at.cmp(&a.applied_at).then(b.id.cmp(&a.id)));

        Ok(headers.into_iter().map(|o| tables.order_view(o)).collect())
    }
}

#[async_trait]
impl StoreTx for InMemoryTx {
    async fn user_exists(&mut self, id: UserId) -> Result<bool> {
        Ok(self.working.users.contains_key(&id))
    }

    async fn delete_user(&mut self, id: UserId) -> Result<()> {
        let tables = &mut self.working;
        tables.users.remove(&id);
        tables.favourites.retain(|(uid, _)| *uid != id);
        tables.cart.retain(|(uid, _), _| *uid != id);

        let removed: BTreeSet<OrderId> = tables
            .orders
            .values()
            .filter(|o| o.user_id == id)
            .map(|o| o.id)
            .collect();
        tables.orders.retain(|order_id, _| !removed.contains(order_id));
        tables
            .order_lines
            .retain(|(order_id, _)| !removed.contains(order_id));
        Ok(())
    }

    async fn get_book(&mut self, id: BookId) -> Result<Option<Book>> {
        let tables = &self.working;
        Ok(tables.books.get(&id).map(|b| tables.book_view(b)))
    }

    async fn insert_book(&mut self, book: NewBook) -> Result<Book> {
        let tables = &mut self.working;
        if !tables.categories.contains_key(&book.category_id) {
            return Err(StoreError::Conflict("books_category_id_fkey".to_string()));
        }
        if !tables.covers.contains_key(&book.cover_id) {
            return Err(StoreError::Conflict("books_cover_id_fkey".to_string()));
        }
        if book.quantity < 0 {
            return Err(StoreError::Conflict("books_quantity_check".to_string()));
        }
        let book = Book {
            id: BookId::new(tables.next_id()),
            title: book.title,
            description: book.description,
            category_id: book.category_id,
            cover_id: book.cover_id,
            price: book.price,
            quantity: book.quantity,
            discount: book.discount,
            added_at: book.added_at,
            purchase_count: 0,
        };
        tables.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn set_book_quantity(&mut self, id: BookId, quantity: i32) -> Result<()> {
        if self.faults.book_quantity.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::Unavailable(
                "book quantity writes disabled".to_string(),
            ));
        }
        if quantity < 0 {
            return Err(StoreError::Conflict("books_quantity_check".to_string()));
        }
        if let Some(book) = self.working.books.get_mut(&id) {
            book.quantity = quantity;
        }
        Ok(())
    }

    async fn delete_book(&mut self, id: BookId) -> Result<()> {
        let tables = &mut self.working;
        tables.books.remove(&id);
        tables.favourites.retain(|(_, bid)| *bid != id);
        tables.cart.retain(|(_, bid), _| *bid != id);
        Ok(())
    }

    async fn insert_cover(&mut self, cover: NewCover) -> Result<Cover> {
        let tables = &mut self.working;
        let cover = Cover {
            id: CoverId::new(tables.next_id()),
            encoding: cover.encoding,
            content: cover.content,
        };
        tables.covers.insert(cover.id, cover.clone());
        Ok(cover)
    }

    async fn delete_cover(&mut self, id: CoverId) -> Result<()> {
        let tables = &mut self.working;
        if tables.books.values().any(|b| b.cover_id == id) {
            return Err(StoreError::Conflict("books_cover_id_fkey".to_string()));
        }
        tables.covers.remove(&id);
        Ok(())
    }

    async fn get_cart_entry(
        &mut self,
        user_id: UserId,
        book_id: BookId,
    ) -> Result<Option<CartEntry>> {
        Ok(self.working.cart.get(&(user_id, book_id)).cloned())
    }

    async fn cart_entries(&mut self, user_id: UserId) -> Result<Vec<CartEntry>> {
        Ok(self.working.cart_entries(user_id))
    }

    async fn insert_cart_entry(&mut self, entry: &CartEntry) -> Result<()> {
        let tables = &mut self.working;
        let key = (entry.user_id, entry.book_id);
        if tables.cart.contains_key(&key) {
            return Err(StoreError::Conflict("cart_entries_pkey".to_string()));
        }
        if !tables.users.contains_key(&entry.user_id) || !tables.books.contains_key(&entry.book_id)
        {
            return Err(StoreError::Conflict("cart_entries_fkey".to_string()));
        }
        tables.cart.insert(key, entry.clone());
        Ok(())
    }

    async fn delete_cart_entry(&mut self, user_id: UserId, book_id: BookId) -> Result<()> {
        self.working.cart.remove(&(user_id, book_id));
        Ok(())
    }

    async fn clear_cart(&mut self, user_id: UserId) -> Result<u64> {
        let before = self.working.cart.len();
        self.working.cart.retain(|(uid, _), _| *uid != user_id);
        Ok((before - self.working.cart.len()) as u64)
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<OrderId> {
        let tables = &mut self.working;
        if !tables.users.contains_key(&order.user_id) {
            return Err(StoreError::Conflict("orders_user_id_fkey".to_string()));
        }
        let id = OrderId::new(tables.next_id());
        tables.orders.insert(
            id,
            Order {
                id,
                user_id: order.user_id,
                applied_at: order.applied_at,
                total_price: order.total_price,
                lines: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn insert_order_line(&mut self, order_id: OrderId, line: &OrderLine) -> Result<()> {
        if self.faults.order_lines.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::Unavailable(
                "order line inserts disabled".to_string(),
            ));
        }
        let tables = &mut self.working;
        if !tables.orders.contains_key(&order_id) {
            return Err(StoreError::Conflict("order_lines_order_id_fkey".to_string()));
        }
        if tables
            .order_lines
            .iter()
            .any(|(oid, l)| *oid == order_id && l.book_id == line.book_id)
        {
            return Err(StoreError::Conflict("order_lines_pkey".to_string()));
        }
        tables.order_lines.push((order_id, line.clone()));
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        let InMemoryTx {
            mut guard, working, ..
        } = self;
        *guard = working;
        Ok(())
    }
}
