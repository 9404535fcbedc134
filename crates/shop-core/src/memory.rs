//! # In-Memory Store
//!
//! A [`CommerceStore`] backed by id-keyed tables behind one `RwLock`.
//! Each trait method takes the lock once, so every call is a transaction.

use crate::cart::{Cart, CartId, CartLine, CartLineId, CartWithLines};
use crate::catalog::{Category, CategoryId, Product, ProductId, SeedCatalog, User, UserId};
use crate::error::{CommerceError, CommerceResult};
use crate::money::Amount;
use crate::order::{NewOrder, Order, OrderId, OrderLine, OrderLineId, OrderStatus, OrderWithLines};
use crate::store::CommerceStore;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    categories: HashMap<CategoryId, Category>,
    products: BTreeMap<ProductId, Product>,
    carts: HashMap<CartId, Cart>,
    /// Unique index: one cart per user
    cart_by_user: HashMap<UserId, CartId>,
    cart_lines: BTreeMap<CartLineId, CartLine>,
    orders: BTreeMap<OrderId, Order>,
    order_lines: BTreeMap<OrderLineId, OrderLine>,
    last_cart_id: i64,
    last_cart_line_id: i64,
    last_order_id: i64,
    last_order_line_id: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

impl Tables {
    fn cart_with_lines(&self, cart: &Cart) -> CartWithLines {
        let lines = self
            .cart_lines
            .values()
            .filter(|line| line.cart_id == cart.id)
            .cloned()
            .collect();
        CartWithLines {
            cart: cart.clone(),
            lines,
        }
    }

    fn cart_mut(&mut self, cart_id: CartId) -> CommerceResult<&mut Cart> {
        self.carts
            .get_mut(&cart_id)
            .ok_or_else(|| CommerceError::NotFound(format!("cart {}", cart_id)))
    }

    fn line_id_for(&self, cart_id: CartId, product_id: ProductId) -> Option<CartLineId> {
        self.cart_lines
            .values()
            .find(|line| line.cart_id == cart_id && line.product_id == product_id)
            .map(|line| line.id)
    }
}

/// In-memory implementation of the store port
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with users, categories and products
    pub fn from_catalog(catalog: SeedCatalog) -> Self {
        let mut tables = Tables::default();
        for user in catalog.users {
            tables.users.insert(user.id, user);
        }
        for category in catalog.categories {
            tables.categories.insert(category.id, category);
        }
        for product in catalog.products {
            tables.products.insert(product.id, product);
        }
        Self {
            tables: RwLock::new(tables),
        }
    }

    pub async fn insert_product(&self, product: Product) {
        self.tables.write().await.products.insert(product.id, product);
    }

    /// Insert an order record with a caller-chosen id (imports, fixtures).
    /// Line ids are assigned by the store.
    pub async fn import_order(&self, order: Order, lines: Vec<(ProductId, u32, Amount)>) {
        let mut tables = self.tables.write().await;
        tables.last_order_id = tables.last_order_id.max(order.id);
        for (product_id, quantity, price_at_order) in lines {
            let id = next_id(&mut tables.last_order_line_id);
            tables.order_lines.insert(
                id,
                OrderLine {
                    id,
                    order_id: order.id,
                    product_id,
                    quantity,
                    price_at_order,
                },
            );
        }
        tables.orders.insert(order.id, order);
    }

    /// Number of orders held
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }
}

#[async_trait]
impl CommerceStore for InMemoryStore {
    async fn find_user(&self, user_id: UserId) -> CommerceResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&user_id).cloned())
    }

    async fn find_product(&self, product_id: ProductId) -> CommerceResult<Option<Product>> {
        Ok(self.tables.read().await.products.get(&product_id).cloned())
    }

    async fn list_products(&self) -> CommerceResult<Vec<Product>> {
        Ok(self.tables.read().await.products.values().cloned().collect())
    }

    async fn find_category(&self, category_id: CategoryId) -> CommerceResult<Option<Category>> {
        Ok(self.tables.read().await.categories.get(&category_id).cloned())
    }

    async fn find_cart_with_lines(&self, user_id: UserId) -> CommerceResult<Option<CartWithLines>> {
        let tables = self.tables.read().await;
        Ok(tables
            .cart_by_user
            .get(&user_id)
            .and_then(|cart_id| tables.carts.get(cart_id))
            .map(|cart| tables.cart_with_lines(cart)))
    }

    async fn upsert_cart(&self, user_id: UserId) -> CommerceResult<CartWithLines> {
        let mut tables = self.tables.write().await;

        if let Some(cart) = tables
            .cart_by_user
            .get(&user_id)
            .and_then(|cart_id| tables.carts.get(cart_id))
        {
            return Ok(tables.cart_with_lines(cart));
        }

        let id = next_id(&mut tables.last_cart_id);
        let cart = Cart {
            id,
            user_id,
            version: 0,
        };
        tables.carts.insert(id, cart.clone());
        tables.cart_by_user.insert(user_id, id);
        debug!(user_id, cart_id = id, "created cart");

        Ok(CartWithLines {
            cart,
            lines: Vec::new(),
        })
    }

    async fn add_cart_line(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
        price_at_add: Amount,
    ) -> CommerceResult<CartLine> {
        let mut tables = self.tables.write().await;
        tables.cart_mut(cart_id)?;

        let line = match tables.line_id_for(cart_id, product_id) {
            Some(line_id) => {
                let line = tables.cart_lines.get_mut(&line_id).ok_or_else(|| {
                    CommerceError::Internal(format!("cart line {} vanished", line_id))
                })?;
                line.quantity = line.quantity.checked_add(quantity).ok_or_else(|| {
                    CommerceError::InvalidState("quantity is too large".to_string())
                })?;
                line.clone()
            }
            None => {
                let id = next_id(&mut tables.last_cart_line_id);
                let line = CartLine {
                    id,
                    cart_id,
                    product_id,
                    quantity,
                    price_at_add,
                };
                tables.cart_lines.insert(id, line.clone());
                line
            }
        };

        tables.cart_mut(cart_id)?.version += 1;
        Ok(line)
    }

    async fn set_cart_line_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> CommerceResult<Option<CartLine>> {
        let mut tables = self.tables.write().await;
        let Some(line_id) = tables.line_id_for(cart_id, product_id) else {
            return Ok(None);
        };

        tables.cart_mut(cart_id)?.version += 1;
        Ok(tables.cart_lines.get_mut(&line_id).map(|line| {
            line.quantity = quantity;
            line.clone()
        }))
    }

    async fn remove_cart_line(&self, cart_id: CartId, product_id: ProductId) -> CommerceResult<bool> {
        let mut tables = self.tables.write().await;
        let Some(line_id) = tables.line_id_for(cart_id, product_id) else {
            return Ok(false);
        };

        tables.cart_mut(cart_id)?.version += 1;
        tables.cart_lines.remove(&line_id);
        Ok(true)
    }

    async fn commit_checkout(&self, cart: &Cart, order: NewOrder) -> CommerceResult<OrderWithLines> {
        let mut tables = self.tables.write().await;

        match tables.carts.get(&cart.id) {
            None => {
                return Err(CommerceError::InvalidState(format!(
                    "cart {} was already checked out",
                    cart.id
                )))
            }
            Some(current) if current.version != cart.version || current.user_id != cart.user_id => {
                return Err(CommerceError::InvalidState(format!(
                    "cart {} changed during checkout",
                    cart.id
                )))
            }
            Some(_) => {}
        }

        // Delete the cart and its lines
        tables.carts.remove(&cart.id);
        tables.cart_by_user.remove(&cart.user_id);
        tables.cart_lines.retain(|_, line| line.cart_id != cart.id);

        // Insert the order and its lines
        let order_id = next_id(&mut tables.last_order_id);
        let header = Order {
            id: order_id,
            user_id: order.user_id,
            created_at: order.created_at,
            status: OrderStatus::Pending,
            total_amount: order.total_amount,
            shipping_address: order.shipping_address,
        };
        let mut lines = Vec::with_capacity(order.lines.len());
        for new_line in order.lines {
            let id = next_id(&mut tables.last_order_line_id);
            let line = OrderLine {
                id,
                order_id,
                product_id: new_line.product_id,
                quantity: new_line.quantity,
                price_at_order: new_line.price_at_order,
            };
            tables.order_lines.insert(id, line.clone());
            lines.push(line);
        }
        tables.orders.insert(order_id, header.clone());

        Ok(OrderWithLines {
            order: header,
            lines,
        })
    }

    async fn find_order(&self, order_id: OrderId) -> CommerceResult<Option<Order>> {
        Ok(self.tables.read().await.orders.get(&order_id).cloned())
    }

    async fn lines_by_order_id(&self, order_id: OrderId) -> CommerceResult<Vec<OrderLine>> {
        Ok(self
            .tables
            .read()
            .await
            .order_lines
            .values()
            .filter(|line| line.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn orders_by_user(&self, user_id: UserId) -> CommerceResult<Vec<Order>> {
        Ok(self
            .tables
            .read()
            .await
            .orders
            .values()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn compare_and_set_order_status(
        &self,
        order_id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> CommerceResult<bool> {
        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| CommerceError::NotFound(format!("order {}", order_id)))?;

        if order.status != expected {
            return Ok(false);
        }
        order.status = next;
        Ok(true)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::order::NewOrderLine;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::Barrier;

    /// Delegates to an [`InMemoryStore`] while forcing callers to interleave.
    ///
    /// In lockstep mode two callers must both finish `find_cart_with_lines`
    /// (or `find_order`) before either continues, so both act on the same
    /// snapshot.
    pub(crate) struct InterleavingStore {
        pub(crate) inner: Arc<InMemoryStore>,
        lockstep: Option<Barrier>,
        checkout_before_add: AtomicBool,
        pub(crate) status_conflicts: AtomicUsize,
    }

    impl InterleavingStore {
        pub(crate) fn lockstep(inner: Arc<InMemoryStore>) -> Self {
            Self {
                inner,
                lockstep: Some(Barrier::new(2)),
                checkout_before_add: AtomicBool::new(false),
                status_conflicts: AtomicUsize::new(0),
            }
        }

        /// The next `add_cart_line` finds its cart already checked out
        pub(crate) fn checkout_before_next_add(inner: Arc<InMemoryStore>) -> Self {
            Self {
                inner,
                lockstep: None,
                checkout_before_add: AtomicBool::new(true),
                status_conflicts: AtomicUsize::new(0),
            }
        }

        async fn rendezvous(&self) {
            if let Some(barrier) = &self.lockstep {
                barrier.wait().await;
            }
        }
    }

    #[async_trait]
    impl CommerceStore for InterleavingStore {
        async fn find_user(&self, user_id: UserId) -> CommerceResult<Option<User>> {
            self.inner.find_user(user_id).await
        }

        async fn find_product(&self, product_id: ProductId) -> CommerceResult<Option<Product>> {
            self.inner.find_product(product_id).await
        }

        async fn list_products(&self) -> CommerceResult<Vec<Product>> {
            self.inner.list_products().await
        }

        async fn find_category(&self, category_id: CategoryId) -> CommerceResult<Option<Category>> {
            self.inner.find_category(category_id).await
        }

        async fn find_cart_with_lines(
            &self,
            user_id: UserId,
        ) -> CommerceResult<Option<CartWithLines>> {
            let cart = self.inner.find_cart_with_lines(user_id).await;
            self.rendezvous().await;
            cart
        }

        async fn upsert_cart(&self, user_id: UserId) -> CommerceResult<CartWithLines> {
            self.inner.upsert_cart(user_id).await
        }

        async fn add_cart_line(
            &self,
            cart_id: CartId,
            product_id: ProductId,
            quantity: u32,
            price_at_add: Amount,
        ) -> CommerceResult<CartLine> {
            if self.checkout_before_add.swap(false, Ordering::SeqCst) {
                let cart = self.inner.tables.read().await.carts.get(&cart_id).cloned();
                if let Some(cart) = cart {
                    let order = NewOrder::pending(cart.user_id, "elsewhere", Vec::new())?;
                    self.inner.commit_checkout(&cart, order).await?;
                }
            }
            self.inner
                .add_cart_line(cart_id, product_id, quantity, price_at_add)
                .await
        }

        async fn set_cart_line_quantity(
            &self,
            cart_id: CartId,
            product_id: ProductId,
            quantity: u32,
        ) -> CommerceResult<Option<CartLine>> {
            self.inner
                .set_cart_line_quantity(cart_id, product_id, quantity)
                .await
        }

        async fn remove_cart_line(
            &self,
            cart_id: CartId,
            product_id: ProductId,
        ) -> CommerceResult<bool> {
            self.inner.remove_cart_line(cart_id, product_id).await
        }

        async fn commit_checkout(
            &self,
            cart: &Cart,
            order: NewOrder,
        ) -> CommerceResult<OrderWithLines> {
            self.inner.commit_checkout(cart, order).await
        }

        async fn find_order(&self, order_id: OrderId) -> CommerceResult<Option<Order>> {
            let order = self.inner.find_order(order_id).await;
            self.rendezvous().await;
            order
        }

        async fn lines_by_order_id(&self, order_id: OrderId) -> CommerceResult<Vec<OrderLine>> {
            self.inner.lines_by_order_id(order_id).await
        }

        async fn orders_by_user(&self, user_id: UserId) -> CommerceResult<Vec<Order>> {
            self.inner.orders_by_user(user_id).await
        }

        async fn compare_and_set_order_status(
            &self,
            order_id: OrderId,
            expected: OrderStatus,
            next: OrderStatus,
        ) -> CommerceResult<bool> {
            let applied = self
                .inner
                .compare_and_set_order_status(order_id, expected, next)
                .await?;
            if !applied {
                self.status_conflicts.fetch_add(1, Ordering::SeqCst);
            }
            Ok(applied)
        }
    }

    /// Users 1 and 2; product 100 at 10.00 and product 200 at 5.00
    pub(crate) fn seeded_store() -> InMemoryStore {
        InMemoryStore::from_catalog(SeedCatalog {
            users: vec![
                User {
                    id: 1,
                    name: "Asha".to_string(),
                    email: "asha@example.com".to_string(),
                },
                User {
                    id: 2,
                    name: "Ravi".to_string(),
                    email: "ravi@example.com".to_string(),
                },
            ],
            categories: vec![Category {
                id: 10,
                name: "Books".to_string(),
                description: None,
            }],
            products: vec![
                Product {
                    id: 100,
                    name: "Product A".to_string(),
                    description: String::new(),
                    price: Amount::new(dec!(10.00)),
                    stock_quantity: 10,
                    image_url: Some("https://cdn.example.com/a.png".to_string()),
                    category_id: 10,
                },
                Product {
                    id: 200,
                    name: "Product B".to_string(),
                    description: String::new(),
                    price: Amount::new(dec!(5.00)),
                    stock_quantity: 10,
                    image_url: None,
                    category_id: 10,
                },
            ],
        })
    }

    fn single_line_order(user_id: UserId) -> NewOrder {
        NewOrder::pending(
            user_id,
            "somewhere",
            vec![NewOrderLine {
                product_id: 100,
                quantity: 1,
                price_at_order: Amount::new(dec!(10.00)),
            }],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_one_cart_per_user() {
        let store = seeded_store();
        let a = store.upsert_cart(1).await.unwrap();
        let b = store.upsert_cart(1).await.unwrap();
        let c = store.upsert_cart(2).await.unwrap();

        assert_eq!(a.cart.id, b.cart.id);
        assert_ne!(a.cart.id, c.cart.id);
    }

    #[tokio::test]
    async fn test_line_mutations_bump_version() {
        let store = seeded_store();
        let cart = store.upsert_cart(1).await.unwrap().cart;

        store
            .add_cart_line(cart.id, 100, 1, Amount::new(dec!(10.00)))
            .await
            .unwrap();
        let line = store
            .add_cart_line(cart.id, 100, 2, Amount::new(dec!(99.00)))
            .await
            .unwrap();

        assert_eq!(line.quantity, 3);
        assert_eq!(line.price_at_add, Amount::new(dec!(10.00)));
        let current = store.find_cart_with_lines(1).await.unwrap().unwrap();
        assert_eq!(current.cart.version, 2);
    }

    #[tokio::test]
    async fn test_commit_checkout_deletes_cart() {
        let store = seeded_store();
        let cart = store.upsert_cart(1).await.unwrap().cart;

        let placed = store
            .commit_checkout(&cart, single_line_order(1))
            .await
            .unwrap();

        assert_eq!(placed.order.status, OrderStatus::Pending);
        assert!(store.find_cart_with_lines(1).await.unwrap().is_none());
        assert_eq!(store.lines_by_order_id(placed.order.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_commit_checkout_rejects_stale_cart() {
        let store = seeded_store();
        let stale = store.upsert_cart(1).await.unwrap().cart;
        store
            .add_cart_line(stale.id, 100, 1, Amount::new(dec!(10.00)))
            .await
            .unwrap();

        let err = store
            .commit_checkout(&stale, single_line_order(1))
            .await
            .unwrap_err();

        assert!(matches!(err, CommerceError::InvalidState(_)));
        assert_eq!(store.order_count().await, 0);
        assert!(store.find_cart_with_lines(1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_commit_checkout_after_cart_deleted() {
        let store = seeded_store();
        let cart = store.upsert_cart(1).await.unwrap().cart;
        store
            .add_cart_line(cart.id, 100, 1, Amount::new(dec!(10.00)))
            .await
            .unwrap();
        let read = store.find_cart_with_lines(1).await.unwrap().unwrap();

        // Another caller checks the same cart out, then the user starts a new one
        store
            .commit_checkout(&read.cart, single_line_order(1))
            .await
            .unwrap();
        let replacement = store.upsert_cart(1).await.unwrap().cart;

        let err = store
            .commit_checkout(&read.cart, single_line_order(1))
            .await
            .unwrap_err();

        assert!(matches!(err, CommerceError::InvalidState(ref m) if m.contains("already checked out")));
        assert_eq!(store.order_count().await, 1);
        assert_eq!(
            store.find_cart_with_lines(1).await.unwrap().map(|c| c.cart.id),
            Some(replacement.id)
        );
    }

    #[tokio::test]
    async fn test_compare_and_set_status() {
        let store = seeded_store();
        let cart = store.upsert_cart(1).await.unwrap().cart;
        let id = store
            .commit_checkout(&cart, single_line_order(1))
            .await
            .unwrap()
            .order
            .id;

        assert!(store
            .compare_and_set_order_status(id, OrderStatus::Pending, OrderStatus::Paid)
            .await
            .unwrap());
        assert!(!store
            .compare_and_set_order_status(id, OrderStatus::Pending, OrderStatus::Failed)
            .await
            .unwrap());
        assert_eq!(
            store.find_order(id).await.unwrap().map(|o| o.status),
            Some(OrderStatus::Paid)
        );
        assert!(matches!(
            store
                .compare_and_set_order_status(9999, OrderStatus::Pending, OrderStatus::Paid)
                .await,
            Err(CommerceError::NotFound(_))
        ));
    }
}
