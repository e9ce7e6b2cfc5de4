//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p storage --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::PgPool;
use storage::{
    BookId, BookListQuery, BookSorting, CartEntry, CategoryId, Discount, Money, NewBook, NewCover,
    NewOrder, NewUser, OrderLine, PostgresStore, Store, StoreError, StoreTx, UserId,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            // Run migrations using raw_sql to execute multiple statements
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_bookstore_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query(
        "TRUNCATE TABLE order_lines, orders, cart_entries, favourites, books, covers, \
         categories, users RESTART IDENTITY CASCADE",
    )
    .execute(&pool)
    .await
    .unwrap();

    PostgresStore::new(pool)
}

async fn seed_user(store: &PostgresStore, username: &str) -> UserId {
    store
        .create_user(NewUser {
            name: "Reader".to_string(),
            username: username.to_string(),
            password_hash: "hash".to_string(),
            email: format!("{username}@example.com"),
            address: "1 Library Lane".to_string(),
            joined_at: Utc::now(),
        })
        .await
        .unwrap()
        .id
}

async fn seed_category(store: &PostgresStore) -> CategoryId {
    store.create_category("fiction").await.unwrap().id
}

async fn seed_book(
    store: &PostgresStore,
    category_id: CategoryId,
    price_cents: i64,
    quantity: i32,
    discount: f64,
    added_offset_secs: i64,
) -> BookId {
    let mut tx = store.begin().await.unwrap();
    let cover = tx
        .insert_cover(NewCover {
            encoding: "image/png".to_string(),
            content: vec![0x89, 0x50, 0x4e, 0x47],
        })
        .await
        .unwrap();
    let book = tx
        .insert_book(NewBook {
            title: format!("Book {price_cents}"),
            description: "A book".to_string(),
            category_id,
            cover_id: cover.id,
            price: Money::from_cents(price_cents),
            quantity,
            discount: Discount::new(discount).unwrap(),
            added_at: Utc::now() + Duration::seconds(added_offset_secs),
        })
        .await
        .unwrap();
    tx.commit().await.unwrap();
    book.id
}

#[tokio::test]
async fn test_user_round_trip_and_unique_username() {
    let store = get_test_store().await;
    let id = seed_user(&store, "alice").await;

    let user = store.get_user(id).await.unwrap().unwrap();
    assert_eq!(user.username, "alice");
    assert!(store.username_taken("alice").await.unwrap());
    assert!(store.email_taken("alice@example.com").await.unwrap());

    let err = store
        .create_user(NewUser {
            name: "Other".to_string(),
            username: "alice".to_string(),
            password_hash: "hash".to_string(),
            email: "other@example.com".to_string(),
            address: "2 Library Lane".to_string(),
            joined_at: Utc::now(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(ref c) if c == "unique_username"));
}

#[tokio::test]
async fn test_book_round_trip_keeps_discount() {
    let store = get_test_store().await;
    let category = seed_category(&store).await;
    let id = seed_book(&store, category, 2000, 10, 0.1, 0).await;

    let book = store.get_book(id).await.unwrap().unwrap();
    assert_eq!(book.price, Money::from_cents(2000));
    assert_eq!(book.discount.fraction(), 0.1);
    assert_eq!(book.effective_price(), Money::from_cents(1800));
    assert_eq!(book.purchase_count, 0);
}

#[tokio::test]
async fn test_uncommitted_transaction_rolls_back() {
    let store = get_test_store().await;
    let category = seed_category(&store).await;
    let id = seed_book(&store, category, 1000, 5, 0.0, 0).await;

    {
        let mut tx = store.begin().await.unwrap();
        tx.set_book_quantity(id, 1).await.unwrap();
    }

    let book = store.get_book(id).await.unwrap().unwrap();
    assert_eq!(book.quantity, 5);
}

#[tokio::test]
async fn test_negative_quantity_is_conflict() {
    let store = get_test_store().await;
    let category = seed_category(&store).await;
    let id = seed_book(&store, category, 1000, 5, 0.0, 0).await;

    let mut tx = store.begin().await.unwrap();
    let err = tx.set_book_quantity(id, -1).await.unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn test_duplicate_cart_entry_is_conflict() {
    let store = get_test_store().await;
    let user = seed_user(&store, "bob").await;
    let category = seed_category(&store).await;
    let book = seed_book(&store, category, 1000, 5, 0.0, 0).await;

    let entry = CartEntry {
        user_id: user,
        book_id: book,
        quantity: 2,
        price_per_unit: Money::from_cents(1000),
    };

    let mut tx = store.begin().await.unwrap();
    tx.insert_cart_entry(&entry).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let err = tx.insert_cart_entry(&entry).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(ref c) if c == "cart_entries_pkey"));
}

#[tokio::test]
async fn test_order_lines_drive_purchase_count() {
    let store = get_test_store().await;
    let user = seed_user(&store, "carol").await;
    let category = seed_category(&store).await;
    let book = seed_book(&store, category, 1000, 5, 0.0, 0).await;

    let mut tx = store.begin().await.unwrap();
    let order_id = tx
        .insert_order(NewOrder {
            user_id: user,
            applied_at: Utc::now(),
            total_price: Money::from_cents(3000),
        })
        .await
        .unwrap();
    tx.insert_order_line(
        order_id,
        &OrderLine {
            book_id: book,
            quantity: 3,
            price_per_unit: Money::from_cents(1000),
        },
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let order = store.get_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.lines.len(), 1);
    assert_eq!(order.total_price, Money::from_cents(3000));

    let book = store.get_book(book).await.unwrap().unwrap();
    assert_eq!(book.purchase_count, 3);

    let orders = store.list_orders(Some(user)).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert!(store.list_orders(Some(UserId::new(999))).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_books_sorts_and_paginates() {
    let store = get_test_store().await;
    let category = seed_category(&store).await;
    for i in 0..5 {
        seed_book(&store, category, 1000 + i * 100, 1, 0.0, i).await;
    }

    let query = BookListQuery::new(BookSorting::PriceAsc, 2, 2).unwrap();
    let page = store.list_books(&query).await.unwrap();
    assert_eq!(page.total_books, 5);
    assert_eq!(page.total_pages, 3);
    let prices: Vec<i64> = page.books.iter().map(|b| b.price.cents()).collect();
    assert_eq!(prices, vec![1200, 1300]);

    let query = BookListQuery::new(BookSorting::Latest, 1, 8).unwrap();
    let page = store.list_books(&query).await.unwrap();
    assert_eq!(page.books.first().unwrap().price.cents(), 1400);
}

#[tokio::test]
async fn test_category_in_use_cannot_be_deleted() {
    let store = get_test_store().await;
    let category = seed_category(&store).await;
    seed_book(&store, category, 1000, 1, 0.0, 0).await;

    let err = store.delete_category(category).await.unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn test_delete_user_cascades() {
    let store = get_test_store().await;
    let user = seed_user(&store, "dave").await;
    let category = seed_category(&store).await;
    let book = seed_book(&store, category, 1000, 5, 0.0, 0).await;
    store.add_favourite(user, book).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    tx.delete_user(user).await.unwrap();
    tx.commit().await.unwrap();

    assert!(!store.user_exists(user).await.unwrap());
    assert!(store.list_favourites(user).await.unwrap().is_empty());
}
