use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};

use crate::{
    Book, BookId, BookListQuery, BookPage, BookSorting, CartEntry, Category, CategoryId, Cover,
    CoverId, Discount, Money, NewBook, NewCover, NewOrder, NewUser, Order, OrderId, OrderLine,
    Result, StoreError, User, UserId,
    store::{Store, StoreTx},
};

const USER_COLUMNS: &str = "id, name, username, password, email, address, joined_at";

const BOOK_COLUMNS: &str = r#"
    b.id, b.title, b.description, b.category_id, b.cover_id, b.price_cents, b.quantity,
    b.discount, b.added_at,
    COALESCE((SELECT SUM(ol.quantity) FROM order_lines ol WHERE ol.book_id = b.id), 0)::BIGINT
        AS purchase_count
"#;

const CART_COLUMNS: &str = "user_id, book_id, quantity, price_per_unit_cents";

/// Maps a sorting mode to its `ORDER BY` clause. Ties always break on id.
fn order_clause(sorting: BookSorting) -> &'static str {
    match sorting {
        BookSorting::Popularity => "purchase_count DESC, b.id ASC",
        BookSorting::Latest => "b.added_at DESC, b.id ASC",
        BookSorting::PriceAsc => "ROUND((b.price_cents * (1 - b.discount))::NUMERIC) ASC, b.id ASC",
        BookSorting::PriceDesc => "ROUND((b.price_cents * (1 - b.discount))::NUMERIC) DESC, b.id ASC",
    }
}

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("database migrations applied");
        Ok(())
    }

    async fn orders_with_lines(&self, headers: Vec<PgRow>) -> Result<Vec<Order>> {
        let mut orders = Vec::with_capacity(headers.len());
        for row in headers {
            let mut order = row_to_order_header(&row)?;
            let lines = sqlx::query(
                r#"
                SELECT book_id, quantity, price_per_unit_cents
                FROM order_lines
                WHERE order_id = $1
                ORDER BY book_id ASC
                "#,
            )
            .bind(order.id.as_i64())
            .fetch_all(&self.pool)
            .await?;
            order.lines = lines
                .iter()
                .map(row_to_order_line)
                .collect::<Result<Vec<_>>>()?;
            orders.push(order);
        }
        Ok(orders)
    }
}

fn row_to_user(row: &PgRow) -> Result<User> {
    Ok(User {
        id: UserId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password")?,
        email: row.try_get("email")?,
        address: row.try_get("address")?,
        joined_at: row.try_get::<DateTime<Utc>, _>("joined_at")?,
    })
}

fn row_to_category(row: &PgRow) -> Result<Category> {
    Ok(Category {
        id: CategoryId::new(row.try_get("id")?),
        name: row.try_get("name")?,
    })
}

fn row_to_cover(row: &PgRow) -> Result<Cover> {
    Ok(Cover {
        id: CoverId::new(row.try_get("id")?),
        encoding: row.try_get("encoding")?,
        content: row.try_get("content")?,
    })
}

fn row_to_book(row: &PgRow) -> Result<Book> {
    let discount: f64 = row.try_get("discount")?;
    Ok(Book {
        id: BookId::new(row.try_get("id")?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        category_id: CategoryId::new(row.try_get("category_id")?),
        cover_id: CoverId::new(row.try_get("cover_id")?),
        price: Money::from_cents(row.try_get("price_cents")?),
        quantity: row.try_get("quantity")?,
        discount: Discount::new(discount).map_err(|e| StoreError::Decode(e.to_string()))?,
        added_at: row.try_get::<DateTime<Utc>, _>("added_at")?,
        purchase_count: row.try_get("purchase_count")?,
    })
}

fn row_to_cart_entry(row: &PgRow) -> Result<CartEntry> {
    Ok(CartEntry {
        user_id: UserId::new(row.try_get("user_id")?),
        book_id: BookId::new(row.try_get("book_id")?),
        quantity: row.try_get("quantity")?,
        price_per_unit: Money::from_cents(row.try_get("price_per_unit_cents")?),
    })
}

fn row_to_order_header(row: &PgRow) -> Result<Order> {
    Ok(Order {
        id: OrderId::new(row.try_get("id")?),
        user_id: UserId::new(row.try_get("user_id")?),
        applied_at: row.try_get::<DateTime<Utc>, _>("applied_at")?,
        total_price: Money::from_cents(row.try_get("total_price_cents")?),
        lines: Vec::new(),
    })
}

fn row_to_order_line(row: &PgRow) -> Result<OrderLine> {
    Ok(OrderLine {
        book_id: BookId::new(row.try_get("book_id")?),
        quantity: row.try_get("quantity")?,
        price_per_unit: Money::from_cents(row.try_get("price_per_unit_cents")?),
    })
}

#[async_trait]
impl Store for PostgresStore {
    type Tx = PostgresTx;

    async fn begin(&self) -> Result<PostgresTx> {
        Ok(PostgresTx {
            tx: self.pool.begin().await?,
        })
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (name, username, password, email, address, joined_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.name)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.email)
        .bind(&user.address)
        .bind(user.joined_at)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from_database)?;

        row_to_user(&row)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id ASC"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_user).collect()
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET name = $1, username = $2, email = $3, password = $4, address = $5
            WHERE id = $6
            "#,
        )
        .bind(&user.name)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.address)
        .bind(user.id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_database)?;
        Ok(())
    }

    async fn user_exists(&self, id: UserId) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
                .bind(id.as_i64())
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn username_taken(&self, username: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn email_taken(&self, email: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn create_category(&self, name: &str) -> Result<Category> {
        let row = sqlx::query("INSERT INTO categories (name) VALUES ($1) RETURNING id, name")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::from_database)?;
        row_to_category(&row)
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>> {
        let row = sqlx::query("SELECT id, name FROM categories WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_category).transpose()
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query("SELECT id, name FROM categories ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_category).collect()
    }

    async fn update_category(&self, category: &Category) -> Result<()> {
        sqlx::query("UPDATE categories SET name = $1 WHERE id = $2")
            .bind(&category.name)
            .bind(category.id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_database)?;
        Ok(())
    }

    async fn delete_category(&self, id: CategoryId) -> Result<()> {
        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_database)?;
        Ok(())
    }

    async fn category_exists(&self, id: CategoryId) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM categories WHERE id = $1)")
                .bind(id.as_i64())
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn category_name_taken(&self, name: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM categories WHERE name = $1)")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn get_cover(&self, id: CoverId) -> Result<Option<Cover>> {
        let row = sqlx::query("SELECT id, encoding, content FROM covers WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_cover).transpose()
    }

    async fn update_cover(&self, cover: &Cover) -> Result<()> {
        sqlx::query("UPDATE covers SET encoding = $1, content = $2 WHERE id = $3")
            .bind(&cover.encoding)
            .bind(&cover.content)
            .bind(cover.id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_book(&self, id: BookId) -> Result<Option<Book>> {
        let row = sqlx::query(&format!("SELECT {BOOK_COLUMNS} FROM books b WHERE b.id = $1"))
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_book).transpose()
    }

    async fn book_exists(&self, id: BookId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM books WHERE id = $1)")
            .bind(id.as_i64())
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn list_books(&self, query: &BookListQuery) -> Result<BookPage> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {BOOK_COLUMNS} FROM books b ORDER BY {} LIMIT $1 OFFSET $2",
            order_clause(query.sorting())
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(query.page_size()))
            .bind(query.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        let total_books = total as u64;
        Ok(BookPage {
            books: rows.iter().map(row_to_book).collect::<Result<Vec<_>>>()?,
            total_books,
            total_pages: query.total_pages(total_books),
        })
    }

    async fn update_book(&self, book: &Book) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE books
            SET title = $1, description = $2, category_id = $3, price_cents = $4,
                quantity = $5, discount = $6
            WHERE id = $7
            "#,
        )
        .bind(&book.title)
        .bind(&book.description)
        .bind(book.category_id.as_i64())
        .bind(book.price.cents())
        .bind(book.quantity)
        .bind(book.discount.fraction())
        .bind(book.id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_database)?;
        Ok(())
    }

    async fn add_favourite(&self, user_id: UserId, book_id: BookId) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO favourites (user_id, book_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, book_id) DO NOTHING
            "#,
        )
        .bind(user_id.as_i64())
        .bind(book_id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_database)?;
        Ok(())
    }

    async fn list_favourites(&self, user_id: UserId) -> Result<Vec<Book>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {BOOK_COLUMNS}
            FROM books b
            JOIN favourites f ON f.book_id = b.id
            WHERE f.user_id = $1
            ORDER BY b.id ASC
            "#
        ))
        .bind(user_id.as_i64())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_book).collect()
    }

    async fn remove_favourite(&self, user_id: UserId, book_id: BookId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM favourites WHERE user_id = $1 AND book_id = $2")
            .bind(user_id.as_i64())
            .bind(book_id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn cart_entries(&self, user_id: UserId) -> Result<Vec<CartEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT {CART_COLUMNS} FROM cart_entries WHERE user_id = $1 ORDER BY book_id ASC"
        ))
        .bind(user_id.as_i64())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_cart_entry).collect()
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(
            "SELECT id, user_id, applied_at, total_price_cents FROM orders WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.orders_with_lines(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_orders(&self, user_id: Option<UserId>) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, applied_at, total_price_cents
            FROM orders
            WHERE $1::BIGINT IS NULL OR user_id = $1
            ORDER BY applied_at DESC, id DESC
            "#,
        )
        .bind(user_id.map(|id| id.as_i64()))
        .fetch_all(&self.pool)
        .await?;

        self.orders_with_lines(rows).await
    }
}

/// Transaction over a [`PostgresStore`].
pub struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PostgresTx {
    async fn user_exists(&mut self, id: UserId) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
                .bind(id.as_i64())
                .fetch_one(&mut *self.tx)
                .await?;
        Ok(exists)
    }

    async fn delete_user(&mut self, id: UserId) -> Result<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_i64())
            .execute(&mut *self.tx)
            .await
            .map_err(StoreError::from_database)?;
        Ok(())
    }

    async fn get_book(&mut self, id: BookId) -> Result<Option<Book>> {
        let row = sqlx::query(&format!(
            "SELECT {BOOK_COLUMNS} FROM books b WHERE b.id = $1 FOR UPDATE OF b"
        ))
        .bind(id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.as_ref().map(row_to_book).transpose()
    }

    async fn insert_book(&mut self, book: NewBook) -> Result<Book> {
        let row = sqlx::query(
            r#"
            INSERT INTO books
                (title, description, category_id, cover_id, price_cents, quantity, discount, added_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&book.title)
        .bind(&book.description)
        .bind(book.category_id.as_i64())
        .bind(book.cover_id.as_i64())
        .bind(book.price.cents())
        .bind(book.quantity)
        .bind(book.discount.fraction())
        .bind(book.added_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(StoreError::from_database)?;

        Ok(Book {
            id: BookId::new(row.try_get("id")?),
            title: book.title,
            description: book.description,
            category_id: book.category_id,
            cover_id: book.cover_id,
            price: book.price,
            quantity: book.quantity,
            discount: book.discount,
            added_at: book.added_at,
            purchase_count: 0,
        })
    }

    async fn set_book_quantity(&mut self, id: BookId, quantity: i32) -> Result<()> {
        sqlx::query("UPDATE books SET quantity = $1 WHERE id = $2")
            .bind(quantity)
            .bind(id.as_i64())
            .execute(&mut *self.tx)
            .await
            .map_err(StoreError::from_database)?;
        Ok(())
    }

    async fn delete_book(&mut self, id: BookId) -> Result<()> {
        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id.as_i64())
            .execute(&mut *self.tx)
            .await
            .map_err(StoreError::from_database)?;
        Ok(())
    }

    async fn insert_cover(&mut self, cover: NewCover) -> Result<Cover> {
        let id: i64 =
            sqlx::query_scalar("INSERT INTO covers (encoding, content) VALUES ($1, $2) RETURNING id")
                .bind(&cover.encoding)
                .bind(&cover.content)
                .fetch_one(&mut *self.tx)
                .await?;
        Ok(Cover {
            id: CoverId::new(id),
            encoding: cover.encoding,
            content: cover.content,
        })
    }

    async fn delete_cover(&mut self, id: CoverId) -> Result<()> {
        sqlx::query("DELETE FROM covers WHERE id = $1")
            .bind(id.as_i64())
            .execute(&mut *self.tx)
            .await
            .map_err(StoreError::from_database)?;
        Ok(())
    }

    async fn get_cart_entry(
        &mut self,
        user_id: UserId,
        book_id: BookId,
    ) -> Result<Option<CartEntry>> {
        let row = sqlx::query(&format!(
            "SELECT {CART_COLUMNS} FROM cart_entries WHERE user_id = $1 AND book_id = $2 FOR UPDATE"
        ))
        .bind(user_id.as_i64())
        .bind(book_id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.as_ref().map(row_to_cart_entry).transpose()
    }

    async fn cart_entries(&mut self, user_id: UserId) -> Result<Vec<CartEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT {CART_COLUMNS} FROM cart_entries WHERE user_id = $1 ORDER BY book_id ASC FOR UPDATE"
        ))
        .bind(user_id.as_i64())
        .fetch_all(&mut *self.tx)
        .await?;
        rows.iter().map(row_to_cart_entry).collect()
    }

    async fn insert_cart_entry(&mut self, entry: &CartEntry) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO cart_entries ({CART_COLUMNS}) VALUES ($1, $2, $3, $4)"
        ))
        .bind(entry.user_id.as_i64())
        .bind(entry.book_id.as_i64())
        .bind(entry.quantity)
        .bind(entry.price_per_unit.cents())
        .execute(&mut *self.tx)
        .await
        .map_err(StoreError::from_database)?;
        Ok(())
    }

    async fn delete_cart_entry(&mut self, user_id: UserId, book_id: BookId) -> Result<()> {
        sqlx::query("DELETE FROM cart_entries WHERE user_id = $1 AND book_id = $2")
            .bind(user_id.as_i64())
            .bind(book_id.as_i64())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn clear_cart(&mut self, user_id: UserId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cart_entries WHERE user_id = $1")
            .bind(user_id.as_i64())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<OrderId> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO orders (user_id, applied_at, total_price_cents)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(order.user_id.as_i64())
        .bind(order.applied_at)
        .bind(order.total_price.cents())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(StoreError::from_database)?;
        Ok(OrderId::new(id))
    }

    async fn insert_order_line(&mut self, order_id: OrderId, line: &OrderLine) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO order_lines (order_id, book_id, quantity, price_per_unit_cents)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(order_id.as_i64())
        .bind(line.book_id.as_i64())
        .bind(line.quantity)
        .bind(line.price_per_unit.cents())
        .execute(&mut *self.tx)
        .await
        .map_err(StoreError::from_database)?;
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
