//! Response bodies. Field names are camelCase on the wire.

use chrono::{DateTime, Utc};
use domain::Cart;
use serde::Serialize;
use storage::{
    Book, BookId, BookPage, CartEntry, Category, CategoryId, Cover, CoverId, Discount, Money,
    Order, OrderId, OrderLine, User, UserId,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: UserId,
    pub name: String,
    pub username: String,
    pub email: String,
    pub address: String,
    pub joined_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            username: user.username,
            email: user.email,
            address: user.address,
            joined_at: user.joined_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginView {
    pub token: String,
    pub user: UserView,
}

#[derive(Debug, Serialize)]
pub struct CategoryView {
    pub id: CategoryId,
    pub name: String,
}

impl From<Category> for CategoryView {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CoverView {
    pub id: CoverId,
    pub encoding: String,
}

impl From<Cover> for CoverView {
    fn from(cover: Cover) -> Self {
        Self {
            id: cover.id,
            encoding: cover.encoding,
        }
    }
}

/// Prices are integer cents.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookView {
    pub id: BookId,
    pub title: String,
    pub description: String,
    pub category_id: CategoryId,
    pub cover_id: CoverId,
    pub price: Money,
    pub effective_price: Money,
    pub quantity: i32,
    pub discount: Discount,
    pub added_at: DateTime<Utc>,
    pub purchase_count: i64,
}

impl From<Book> for BookView {
    fn from(book: Book) -> Self {
        Self {
            effective_price: book.effective_price(),
            id: book.id,
            title: book.title,
            description: book.description,
            category_id: book.category_id,
            cover_id: book.cover_id,
            price: book.price,
            quantity: book.quantity,
            discount: book.discount,
            added_at: book.added_at,
            purchase_count: book.purchase_count,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPageView {
    pub books: Vec<BookView>,
    pub page: u32,
    pub limit: u32,
    pub total_books: u64,
    pub total_pages: u64,
}

impl BookPageView {
    pub fn new(page: BookPage, number: u32, limit: u32) -> Self {
        Self {
            books: page.books.into_iter().map(BookView::from).collect(),
            page: number,
            limit,
            total_books: page.total_books,
            total_pages: page.total_pages,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEntryView {
    pub book_id: BookId,
    pub quantity: i32,
    pub price_per_unit: Money,
}

impl From<CartEntry> for CartEntryView {
    fn from(entry: CartEntry) -> Self {
        Self {
            book_id: entry.book_id,
            quantity: entry.quantity,
            price_per_unit: entry.price_per_unit,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub user_id: UserId,
    pub entries: Vec<CartEntryView>,
    pub total: Money,
}

impl From<Cart> for CartView {
    fn from(cart: Cart) -> Self {
        Self {
            user_id: cart.user_id,
            entries: cart.entries.into_iter().map(CartEntryView::from).collect(),
            total: cart.total,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineView {
    pub book_id: BookId,
    pub quantity: i32,
    pub price_per_unit: Money,
}

impl From<OrderLine> for OrderLineView {
    fn from(line: OrderLine) -> Self {
        Self {
            book_id: line.book_id,
            quantity: line.quantity,
            price_per_unit: line.price_per_unit,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: OrderId,
    pub user_id: UserId,
    pub applied_at: DateTime<Utc>,
    pub total_price: Money,
    pub lines: Vec<OrderLineView>,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            applied_at: order.applied_at,
            total_price: order.total_price,
            lines: order.lines.into_iter().map(OrderLineView::from).collect(),
        }
    }
}
