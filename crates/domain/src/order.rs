//! Order placement.

use chrono::Utc;
use storage::{NewOrder, Order, OrderId, OrderLine, Store, StoreTx, UserId};

use crate::cart::cart_total;
use crate::error::{DomainError, Result};

/// Service turning carts into orders.
pub struct OrderService<S: Store> {
    store: S,
}

impl<S: Store> OrderService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Converts the user's whole cart into one order.
    ///
    /// The order header, every order line and the cart cleanup are written in
    /// one transaction; a failure at any step leaves no trace. Prices come from
    /// the cart entries, never from the current catalog, and book rows are not
    /// touched. An empty cart yields `Ok(None)`.
    #[tracing::instrument(skip(self))]
    pub async fn place_order(&self, user_id: UserId) -> Result<Option<Order>> {
        let mut tx = self.store.begin().await?;

        if !tx.user_exists(user_id).await? {
            return Err(DomainError::NotFound("user"));
        }

        let entries = tx.cart_entries(user_id).await?;
        if entries.is_empty() {
            tracing::info!(%user_id, "cart is empty, no order placed");
            return Ok(None);
        }

        let total_price = cart_total(&entries)?;
        let applied_at = Utc::now();
        let order_id = tx
            .insert_order(NewOrder {
                user_id,
                applied_at,
                total_price,
            })
            .await?;

        let lines: Vec<OrderLine> = entries.iter().map(OrderLine::from).collect();
        for line in &lines {
            tx.insert_order_line(order_id, line).await?;
        }
        tx.clear_cart(user_id).await?;
        tx.commit().await?;

        metrics::counter!("orders_placed_total").increment(1);
        metrics::histogram!("order_total_cents").record(total_price.cents() as f64);
        tracing::info!(%user_id, %order_id, total = %total_price, lines = lines.len(), "order placed");

        Ok(Some(Order {
            id: order_id,
            user_id,
            applied_at,
            total_price,
            lines,
        }))
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or(DomainError::NotFound("order"))
    }

    /// Lists every order, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        Ok(self.store.list_orders(None).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        if !self.store.user_exists(user_id).await? {
            return Err(DomainError::NotFound("user"));
        }
        Ok(self.store.list_orders(Some(user_id)).await?)
    }
}
